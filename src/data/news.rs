//! Agricultural news from RSS 2.0 and Atom feeds.
//!
//! Feeds are read with a small tag scanner rather than a full XML parser:
//! only titles, links and dates are needed, and feed markup in the wild is
//! often not well-formed enough for a strict parser anyway.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{HttpConfig, NewsConfig};
use crate::data::http::{HttpFetcher, ACCEPT_FEED};
use crate::data::{DataPoint, DataSource};
use crate::market::category::categorize;
use crate::market::models::{Category, MIN_RELEVANCE};
use crate::market::relevance::score;

/// A news item passed to the briefing prompt and recorded in `daily.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub link: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub relevance: u8,
}

impl Headline {
    pub fn new(title: &str, link: &str, source: &str, published: Option<String>) -> Self {
        Self {
            title: title.to_string(),
            link: link.to_string(),
            source: source.to_string(),
            published,
            category: categorize(title),
            relevance: score(title).score,
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.relevance >= MIN_RELEVANCE
    }
}

/// One RSS or Atom feed.
pub struct FeedSource {
    http: HttpFetcher,
    name: String,
    url: String,
    max_items: usize,
}

impl FeedSource {
    pub fn new(http: HttpFetcher, name: &str, url: &str, max_items: usize) -> Self {
        Self {
            http,
            name: name.to_string(),
            url: url.to_string(),
            max_items,
        }
    }

    /// Google News RSS search for one term.
    pub fn search(http: HttpFetcher, base_url: &str, term: &str, max_items: usize) -> Self {
        let encoded = urlencoding::encode(term);
        let url = format!("{base_url}?q={encoded}&hl=en-US&gl=US&ceid=US:en");
        Self::new(http, &format!("Google News: {term}"), &url, max_items)
    }
}

#[async_trait]
impl DataSource for FeedSource {
    async fn fetch(&self) -> Result<Vec<DataPoint>> {
        let body = self.http.get_text(&self.url, ACCEPT_FEED).await?;
        let items = parse_feed_items(&body, self.max_items);
        if items.is_empty() && !looks_like_feed(&body) {
            bail!("response from {} is not an RSS or Atom feed", self.url);
        }

        let fetched = items.len();
        let headlines: Vec<DataPoint> = items
            .into_iter()
            .map(|item| Headline::new(&item.title, &item.link, &self.name, item.published))
            .filter(Headline::is_relevant)
            .map(DataPoint::Headline)
            .collect();
        debug!(
            source = %self.name,
            fetched,
            kept = headlines.len(),
            "Feed items scored"
        );
        Ok(headlines)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Configured feeds followed by one search source per term.
pub fn news_sources(news: &NewsConfig, http: &HttpConfig) -> Result<Vec<FeedSource>> {
    let fetcher = HttpFetcher::new(&http.user_agent, http.news_timeout())?;
    let mut sources: Vec<FeedSource> = news
        .feeds
        .iter()
        .map(|f| FeedSource::new(fetcher.clone(), &f.name, &f.url, news.max_items_per_feed))
        .collect();
    sources.extend(news.search_terms.iter().map(|term| {
        FeedSource::search(fetcher.clone(), &news.search_base_url, term, news.max_items_per_feed)
    }));

    info!(sources = sources.len(), "News sources configured");
    Ok(sources)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
}

fn looks_like_feed(body: &str) -> bool {
    ["<rss", "<feed", "<rdf:RDF", "<channel"]
        .iter()
        .any(|marker| body.contains(marker))
}

/// Extract up to `limit` items from an RSS `<item>` or Atom `<entry>` list.
pub fn parse_feed_items(xml: &str, limit: usize) -> Vec<FeedItem> {
    let mut blocks = element_blocks(xml, "item");
    let atom = blocks.is_empty();
    if atom {
        blocks = element_blocks(xml, "entry");
    }

    let mut items = Vec::new();
    for block in blocks {
        let title = extract_xml_tag(block, "title").unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let link = if atom {
            extract_attr(block, "link", "href")
        } else {
            extract_xml_tag(block, "link")
        }
        .unwrap_or_default();
        let published = ["pubDate", "published", "updated", "dc:date"]
            .iter()
            .find_map(|tag| extract_xml_tag(block, tag));

        items.push(FeedItem {
            title,
            link,
            published,
        });
        if items.len() >= limit {
            break;
        }
    }

    if items.is_empty() {
        warn!("Feed contained no items");
    }
    items
}

/// Inner text of every `<tag ...>...</tag>` element, in document order.
fn element_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut rest = xml;

    while let Some(start) = find_open_tag(rest, tag) {
        let after = &rest[start..];
        let Some(end) = after.find(&close) else {
            break;
        };
        blocks.push(&after[..end]);
        rest = &after[end + close.len()..];
    }
    blocks
}

/// Byte offset of `<tag` followed by `>`, `/` or whitespace, so `<link`
/// does not match `<linkage`.
fn find_open_tag(text: &str, tag: &str) -> Option<usize> {
    let needle = format!("<{tag}");
    let mut from = 0;
    while let Some(pos) = text[from..].find(&needle) {
        let at = from + pos;
        let after = at + needle.len();
        match text[after..].chars().next() {
            Some('>' | '/') => return Some(at),
            Some(c) if c.is_whitespace() => return Some(at),
            _ => from = after,
        }
    }
    None
}

fn extract_xml_tag(text: &str, tag: &str) -> Option<String> {
    let open = find_open_tag(text, tag)?;
    let head_end = open + text[open..].find('>')?;
    if text[..head_end].ends_with('/') {
        return None;
    }
    let content_start = head_end + 1;
    let close = format!("</{tag}>");
    let end = content_start + text[content_start..].find(&close)?;

    let value = clean_text(&text[content_start..end]);
    (!value.is_empty()).then_some(value)
}

/// Attribute value from the first `<tag ...>` head, e.g. Atom `<link href="...">`.
fn extract_attr(text: &str, tag: &str, attr: &str) -> Option<String> {
    let open = find_open_tag(text, tag)?;
    let head = &text[open..open + text[open..].find('>')?];
    let needle = format!("{attr}=\"");
    let start = head.find(&needle)? + needle.len();
    let end = start + head[start..].find('"')?;
    Some(decode_entities(&head[start..end]))
}

/// Unwrap CDATA, drop inline markup, decode entities, collapse whitespace.
fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let unwrapped = trimmed
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .unwrap_or(trimmed);

    let decoded = decode_entities(unwrapped);
    let mut text = String::with_capacity(decoded.len());
    let mut in_tag = false;
    let mut chars = decoded.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if chars.peek().is_some_and(|n| n.is_ascii_alphabetic() || *n == '/') => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Brownfield Ag News</title>
  <item>
    <title><![CDATA[Corn &amp; soybean planting ahead of average]]></title>
    <link>https://brownfieldagnews.com/news/corn-planting</link>
    <pubDate>Mon, 02 Mar 2026 11:00:00 +0000</pubDate>
  </item>
  <item>
    <title>Cattle on feed report: placements &#8216;sharply&#8217; lower</title>
    <link>https://brownfieldagnews.com/news/cattle</link>
  </item>
  <item><title></title><link>https://example.com/empty</link></item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>USDA Releases</title>
  <entry>
    <title type="html">USDA announces &lt;b&gt;WASDE&lt;/b&gt; schedule</title>
    <link rel="alternate" href="https://www.usda.gov/media/wasde"/>
    <updated>2026-03-02T09:00:00Z</updated>
  </entry>
</feed>"#;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new("test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_rss() {
        let items = parse_feed_items(RSS, 10);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Corn & soybean planting ahead of average");
        assert_eq!(items[0].link, "https://brownfieldagnews.com/news/corn-planting");
        assert_eq!(items[0].published.as_deref(), Some("Mon, 02 Mar 2026 11:00:00 +0000"));
        assert_eq!(items[1].title, "Cattle on feed report: placements \u{2018}sharply\u{2019} lower");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn test_parse_atom() {
        let items = parse_feed_items(ATOM, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "USDA announces WASDE schedule");
        assert_eq!(items[0].link, "https://www.usda.gov/media/wasde");
        assert_eq!(items[0].published.as_deref(), Some("2026-03-02T09:00:00Z"));
    }

    #[test]
    fn test_item_limit() {
        assert_eq!(parse_feed_items(RSS, 1).len(), 1);
    }

    #[test]
    fn test_open_tag_requires_boundary() {
        assert_eq!(find_open_tag("<linkage>x</linkage><link>y</link>", "link"), Some(20));
        assert_eq!(extract_xml_tag("<link>y</link>", "link").as_deref(), Some("y"));
    }

    #[test]
    fn test_clean_text_keeps_comparisons() {
        assert_eq!(clean_text("Corn &lt; $5 as <em>basis</em> firms"), "Corn < $5 as basis firms");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("A &amp; B &#x2014; C &#39;d&#39; &bogus; &"), "A & B \u{2014} C 'd' &bogus; &");
    }

    #[test]
    fn test_headline_is_classified() {
        let h = Headline::new("USDA WASDE report shows corn stocks tightening", "", "USDA", None);
        assert_eq!(h.category, Category::Commodities);
        assert_eq!(h.relevance, 100);
    }

    #[tokio::test]
    async fn test_feed_source_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
            .mount(&server)
            .await;

        let source = FeedSource::new(fetcher(), "Brownfield", &format!("{}/feed", server.uri()), 10);
        let points = source.fetch().await.unwrap();
        assert_eq!(points.len(), 2);
        let DataPoint::Headline(first) = &points[0] else {
            panic!("expected headline");
        };
        assert_eq!(first.source, "Brownfield");
    }

    #[tokio::test]
    async fn test_off_topic_items_dropped() {
        let server = MockServer::start().await;
        let body = r#"<rss version="2.0"><channel>
  <item><title>Lakers win NBA championship</title><link>https://example.com/nba</link></item>
  <item><title>Wheat exports climb on Black Sea delays</title><link>https://example.com/wheat</link></item>
</channel></rss>"#;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let source = FeedSource::new(fetcher(), "Wire", &format!("{}/feed", server.uri()), 10);
        let points = source.fetch().await.unwrap();
        assert_eq!(points.len(), 1);
        let DataPoint::Headline(h) = &points[0] else {
            panic!("expected headline");
        };
        assert_eq!(h.title, "Wheat exports climb on Black Sea delays");
        assert!(h.relevance >= MIN_RELEVANCE);
    }

    #[tokio::test]
    async fn test_search_source_and_non_feed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .and(query_param("q", "corn futures"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let source = FeedSource::search(
            fetcher(),
            &format!("{}/rss/search", server.uri()),
            "corn futures",
            10,
        );
        assert_eq!(source.name(), "Google News: corn futures");
        assert!(source.fetch().await.is_err());
    }
}
