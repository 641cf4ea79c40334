//! Keyword-based category and "why it matters" lookup.
//!
//! Both tables are scanned top to bottom and the first entry with any
//! keyword present in the lower-cased text wins, so entry order is
//! precedence: specific explanations sit above general catch-alls.

use crate::market::models::Category;

const CATEGORY_RULES: &[(&[&str], Category)] = &[
    (
        &[
            "drought", "flood", "hurricane", "rainfall", "precipitation", "heat wave",
            "heatwave", "la nina", "la niña", "el nino", "el niño", "frost", "freeze",
            "weather", "temperature", "wildfire", "tornado", "blizzard",
        ],
        Category::Weather,
    ),
    (
        &[
            "corn", "soybean", "soy oil", "soymeal", "wheat", "grain", "crop", "usda",
            "wasde", "harvest", "planting", "acreage", "cotton", "sorghum", "canola",
            "oats", "barley", "rough rice",
        ],
        Category::Commodities,
    ),
    (
        &[
            "cattle", "hog", "pork", "beef", "livestock", "dairy", "milk", "feedlot",
            "poultry", "bird flu", "avian",
        ],
        Category::Livestock,
    ),
    (
        &[
            "ethanol", "biofuel", "renewable fuel", "crude", "brent", "oil price",
            "natural gas", "diesel", "gasoline", "opec",
        ],
        Category::Energy,
    ),
    (
        &["fertilizer", "anhydrous", "potash", "phosphate", "nitrogen"],
        Category::Inputs,
    ),
    (
        &[
            "tariff", "trade war", "trade deal", "export", "imports", "china", "mexico",
            "canada", "usmca", "wto", "sanction", "embargo",
        ],
        Category::Trade,
    ),
    (
        &["farm bill", "subsidy", "subsidies", "bailout", "congress", "senate", "farm"],
        Category::Policy,
    ),
    (
        &[
            "federal reserve", "fomc", "interest rate", "rate cut", "rate hike",
            "inflation", "cpi", "recession", "gdp", "dollar index", "u.s. dollar",
            "ukraine", "russia", "black sea", "shipping", "panama canal",
            "mississippi river",
        ],
        Category::Macro,
    ),
];

const RATIONALE_RULES: &[(&[&str], &str)] = &[
    (
        &["usda", "wasde"],
        "USDA's WASDE report resets the U.S. and world supply and demand balance sheets; \
         a surprise in ending stocks moves corn, soybean and wheat futures and local basis the same morning.",
    ),
    (
        &["acreage", "planting", "plantings"],
        "Planted acreage sets the supply side of the new-crop balance sheet and drives \
         December corn and November soybean pricing.",
    ),
    (
        &["corn"],
        "Corn sets cash bids, feed costs and ethanol margins across the Corn Belt, \
         so this outcome flows straight into marketing decisions for the largest U.S. crop.",
    ),
    (
        &["soybean", "soy oil", "soymeal"],
        "Soybean prices drive crush margins and new-crop bean bids, with export demand as the swing factor.",
    ),
    (
        &["wheat"],
        "Wheat trades on world supply, so this outcome shifts Plains bids and \
         spills over into corn as a competing feed grain.",
    ),
    (
        &["cattle", "beef", "feedlot"],
        "Cattle prices set feeder margins and cow-calf income, and heavier placements \
         mean more corn and hay demand.",
    ),
    (
        &["hog", "pork"],
        "Hog prices drive packer margins and feed demand; pork exports are sensitive to trade retaliation.",
    ),
    (
        &["dairy", "milk"],
        "Milk prices set dairy cash flow and feed purchasing across the upper Midwest.",
    ),
    (
        &["ethanol", "biofuel", "renewable fuel"],
        "Ethanol and biofuel policy absorbs roughly a third of U.S. corn, so this \
         moves corn demand and local ethanol plant bids.",
    ),
    (
        &["fertilizer", "anhydrous", "potash", "phosphate", "nitrogen"],
        "Fertilizer is the largest variable cost in corn production, so this hits next season's input budget.",
    ),
    (
        &["drought", "rainfall", "precipitation", "flood"],
        "Moisture drives yield expectations; markets price weather risk well before harvest confirms it.",
    ),
    (
        &["la nina", "la niña", "el nino", "el niño"],
        "ENSO patterns tilt odds for Corn Belt and South American growing seasons, \
         shifting both U.S. yields and export competition.",
    ),
    (
        &["heat wave", "heatwave", "frost", "freeze", "temperature", "weather"],
        "Temperature extremes during pollination or fill can cut yields quickly, and futures react to forecasts.",
    ),
    (
        &["china"],
        "China is the largest buyer of U.S. soybeans and a swing buyer of corn and sorghum, \
         so its purchases and retaliation set export demand.",
    ),
    (
        &["tariff", "trade war", "trade deal", "usmca", "wto", "sanction", "embargo"],
        "Trade barriers change who buys U.S. grain and meat, and retaliation usually lands on farm exports first.",
    ),
    (
        &["export", "imports", "mexico", "canada"],
        "Export demand is a large share of U.S. grain usage; shifts in buyers move basis at river and Gulf terminals.",
    ),
    (
        &["crude", "brent", "oil price", "diesel", "gasoline", "natural gas", "opec"],
        "Energy prices feed into diesel, drying and nitrogen costs and drag ethanol and soyoil values with them.",
    ),
    (
        &["farm bill", "subsidy", "subsidies", "bailout"],
        "Farm policy sets the safety net: crop insurance, reference prices and direct payments.",
    ),
    (
        &["federal reserve", "fomc", "interest rate", "rate cut", "rate hike"],
        "Interest rates set operating-loan and land costs and move the dollar, which affects export competitiveness.",
    ),
    (
        &["inflation", "cpi"],
        "Inflation pushes up input costs and shapes Fed policy, which flows back into farm credit.",
    ),
    (
        &["dollar index", "u.s. dollar"],
        "A stronger dollar makes U.S. grain more expensive abroad and weighs on futures.",
    ),
    (
        &["ukraine", "russia", "black sea"],
        "The Black Sea region is a top wheat and corn exporter, so conflict there reprices global grain supply.",
    ),
    (
        &["shipping", "panama canal", "mississippi river"],
        "Freight bottlenecks widen basis by raising the cost of moving grain to export terminals.",
    ),
    (
        &["recession", "gdp"],
        "Economic growth drives meat and fuel demand, which feeds back into feed grain usage.",
    ),
    (
        &["grain", "crop", "harvest", "cotton", "sorghum", "canola", "oats", "barley", "livestock", "farm"],
        "This outcome bears directly on farm revenue through commodity prices or production.",
    ),
];

const FALLBACK_RATIONALE: &str =
    "This market tracks an event with indirect links to farm income, input costs or commodity demand.";

/// Display category for a market title or headline. Falls back to `Other`.
pub fn categorize(text: &str) -> Category {
    let t = text.to_lowercase();
    CATEGORY_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&t, keywords))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

/// Farmer-facing explanation of why an outcome matters.
pub fn rationale(text: &str) -> &'static str {
    let t = text.to_lowercase();
    RATIONALE_RULES
        .iter()
        .find(|(keywords, _)| contains_any(&t, keywords))
        .map(|(_, why)| *why)
        .unwrap_or(FALLBACK_RATIONALE)
}

/// Check if text contains any of the given keywords.
fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usda_scenario() {
        let text = "USDA WASDE report shows corn stocks tightening";
        assert_eq!(categorize(text), Category::Commodities);
        assert!(rationale(text).contains("WASDE"));
    }

    #[test]
    fn test_weather_takes_precedence_over_crop() {
        assert_eq!(categorize("Will drought cut corn yields?"), Category::Weather);
    }

    #[test]
    fn test_corn_explanation_before_china() {
        let why = rationale("Will China buy more U.S. corn this year?");
        assert!(why.contains("Corn Belt"));
        assert_eq!(categorize("Will China buy more U.S. corn this year?"), Category::Commodities);
    }

    #[test]
    fn test_china_without_crop() {
        assert_eq!(categorize("Will China raise tariffs in May?"), Category::Trade);
        assert!(rationale("Will China raise tariffs in May?").contains("soybeans"));
    }

    #[test]
    fn test_livestock_energy_policy_macro() {
        assert_eq!(categorize("Live cattle above 200?"), Category::Livestock);
        assert_eq!(categorize("Will OPEC cut output?"), Category::Energy);
        assert_eq!(categorize("Will the farm bill pass by September?"), Category::Policy);
        assert_eq!(categorize("Fed rate cut in June? FOMC decision"), Category::Macro);
    }

    #[test]
    fn test_fallbacks() {
        let text = "Will aliens be discovered by 2030?";
        assert_eq!(categorize(text), Category::Other);
        assert_eq!(rationale(text), FALLBACK_RATIONALE);
    }
}
