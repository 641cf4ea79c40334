//! Static symbol table for the futures and index quotes the site shows.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Grain,
    Soft,
    Livestock,
    Energy,
    Metal,
    Macro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolSpec {
    /// Key the site's price map uses.
    pub key: &'static str,
    /// Yahoo Finance ticker.
    pub symbol: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub asset: AssetType,
    /// Barchart OnDemand symbol, for contracts the briefing covers.
    pub barchart: Option<&'static str>,
}

impl SymbolSpec {
    /// Grain contracts quoted in cents per bushel, shown as dollars with
    /// quarter-cent fractions.
    pub fn is_bushel_grain(&self) -> bool {
        self.asset == AssetType::Grain && self.unit == "¢/bu"
    }
}

const fn spec(
    key: &'static str,
    symbol: &'static str,
    label: &'static str,
    unit: &'static str,
    asset: AssetType,
    barchart: Option<&'static str>,
) -> SymbolSpec {
    SymbolSpec {
        key,
        symbol,
        label,
        unit,
        asset,
        barchart,
    }
}

pub const SYMBOLS: [SymbolSpec; 19] = [
    // Grains
    spec("corn", "ZC=F", "Corn (front)", "¢/bu", AssetType::Grain, Some("@C*0")),
    spec("corn-dec", "ZCZ26.CBT", "Corn Dec '26", "¢/bu", AssetType::Grain, Some("ZCZ26")),
    spec("beans", "ZS=F", "Beans (front)", "¢/bu", AssetType::Grain, Some("@S*0")),
    spec("beans-nov", "ZSX26.CBT", "Beans Nov '26", "¢/bu", AssetType::Grain, Some("ZSX26")),
    spec("wheat", "ZW=F", "Wheat (front)", "¢/bu", AssetType::Grain, Some("@W*0")),
    spec("oats", "ZO=F", "Oats", "¢/bu", AssetType::Grain, None),
    spec("meal", "ZM=F", "Soy Meal", "$/ton", AssetType::Grain, None),
    spec("soyoil", "ZL=F", "Soy Oil", "¢/lb", AssetType::Grain, None),
    spec("cotton", "CT=F", "Cotton", "¢/lb", AssetType::Soft, None),
    // Livestock
    spec("cattle", "LE=F", "Live Cattle", "¢/lb", AssetType::Livestock, Some("@LC*0")),
    spec("feeders", "GF=F", "Feeder Cattle", "¢/lb", AssetType::Livestock, None),
    spec("hogs", "HE=F", "Lean Hogs", "¢/lb", AssetType::Livestock, Some("@LH*0")),
    // Energy
    spec("crude", "CL=F", "Crude WTI", "$/bbl", AssetType::Energy, Some("@CL*0")),
    spec("natgas", "NG=F", "Natural Gas", "$/MMBtu", AssetType::Energy, Some("@NG*0")),
    // Metals / macro
    spec("gold", "GC=F", "Gold", "$/oz", AssetType::Metal, None),
    spec("silver", "SI=F", "Silver", "$/oz", AssetType::Metal, None),
    spec("dollar", "DX-Y.NYB", "Dollar Index", "pts", AssetType::Macro, None),
    spec("treasury10", "^TNX", "10-Yr Treasury", "%", AssetType::Macro, None),
    spec("sp500", "^GSPC", "S&P 500", "pts", AssetType::Macro, None),
];

/// Contracts with a Barchart mapping, in table order.
pub fn briefing_symbols() -> Vec<SymbolSpec> {
    SYMBOLS.iter().filter(|s| s.barchart.is_some()).copied().collect()
}

pub fn by_key(key: &str) -> Option<&'static SymbolSpec> {
    SYMBOLS.iter().find(|s| s.key == key)
}
