//! Tiered keyword relevance scoring.
//!
//! Tier 1 holds direct agricultural terms, tier 2 trade, energy and farm
//! policy terms, tier 3 macro, weather and geopolitical terms. The best
//! matching tier sets the base score (100 / 70 / 40); keyword density and
//! a direct-plus-context mix add small bonuses.
//!
//! Matching is plain substring containment on the lower-cased text, so a
//! keyword can fire inside an unrelated word ("oats" in "boats"). Keywords
//! that collide with very common words ("rice" in "price", "urea" in
//! "bureau", "import" in "important") are kept out of the tables.

use crate::market::models::Tier;

struct KeywordTier {
    tier: Tier,
    base: u8,
    keywords: &'static [&'static str],
}

const TIERS: [KeywordTier; 3] = [
    KeywordTier {
        tier: Tier::Direct,
        base: 100,
        keywords: &[
            "corn", "soybean", "soy oil", "soymeal", "wheat", "grain", "crop",
            "usda", "wasde", "cattle", "hog", "livestock", "ethanol", "harvest",
            "planting", "acreage", "fertilizer", "anhydrous", "potash", "canola",
            "sorghum", "cotton", "oats", "barley", "rough rice", "pork", "beef",
            "dairy", "feedlot", "farm", "agricultur",
        ],
    },
    KeywordTier {
        tier: Tier::TradePolicy,
        base: 70,
        keywords: &[
            "tariff", "trade war", "trade deal", "export", "imports", "china",
            "mexico", "canada", "usmca", "wto", "sanction", "embargo", "crude",
            "brent", "oil price", "natural gas", "diesel", "gasoline", "opec",
            "biofuel", "renewable fuel", "subsidy", "subsidies",
        ],
    },
    KeywordTier {
        tier: Tier::MacroWeather,
        base: 40,
        keywords: &[
            "drought", "flood", "hurricane", "rainfall", "precipitation",
            "heat wave", "heatwave", "la nina", "la niña", "el nino", "el niño",
            "frost", "freeze", "weather", "temperature", "wildfire", "tornado",
            "blizzard", "federal reserve", "fomc", "interest rate", "rate cut",
            "rate hike", "inflation", "cpi", "recession", "gdp", "dollar index",
            "u.s. dollar", "ukraine", "russia", "black sea", "shipping",
            "panama canal", "mississippi river",
        ],
    },
];

/// Total keyword hits at or above which the density bonus applies.
const DENSITY_HITS: usize = 3;
const DENSITY_BONUS: u16 = 10;
/// Direct term plus at least one trade/macro term.
const CONTEXT_BONUS: u16 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relevance {
    pub score: u8,
    pub tier: Tier,
}

/// Score free text (title plus identifier) for agricultural relevance.
pub fn score(text: &str) -> Relevance {
    let t = text.to_lowercase();

    let mut base = 0u8;
    let mut tier = Tier::None;
    let mut hits = [0usize; 3];

    for (i, kt) in TIERS.iter().enumerate() {
        hits[i] = kt.keywords.iter().filter(|kw| t.contains(*kw)).count();
        if hits[i] > 0 && kt.base > base {
            base = kt.base;
            tier = kt.tier;
        }
    }

    if tier == Tier::None {
        return Relevance { score: 0, tier };
    }

    let mut total = u16::from(base);
    if hits.iter().sum::<usize>() >= DENSITY_HITS {
        total += DENSITY_BONUS;
    }
    if hits[0] > 0 && hits[1] + hits[2] > 0 {
        total += CONTEXT_BONUS;
    }

    Relevance {
        score: total.min(100) as u8,
        tier,
    }
}
