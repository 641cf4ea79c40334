//! Composite ranking of scored markets.

use crate::market::models::MarketRecord;

/// Sort key combining relevance with log-dampened volume, so a busy but
/// loosely related market cannot outrank a directly agricultural one.
pub fn composite_score(relevance: u8, volume_24h: f64) -> f64 {
    f64::from(relevance) * 1.5 + volume_24h.max(1.0).log10() * 10.0
}

/// Sort descending by composite score. `sort_by` is stable, so ties keep
/// their fetch/merge order.
pub fn rank(markets: &mut [MarketRecord]) {
    markets.sort_by(|a, b| {
        let sa = composite_score(a.relevance, a.volume_24h);
        let sb = composite_score(b.relevance, b.volume_24h);
        sb.total_cmp(&sa)
    });
}

/// Stable descending sort on relevance alone, for items with no volume.
pub fn rank_by_relevance<T>(items: &mut [T], relevance: impl Fn(&T) -> u8) {
    items.sort_by_key(|item| std::cmp::Reverse(relevance(item)));
}
