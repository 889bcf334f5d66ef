//! Symbol sources: the built-in list, user-supplied text, and TOML universes.
//!
//! A universe file maps list names to tickers:
//!
//! ```toml
//! [lists]
//! ftse_mib = ["A2A.MI", "ENI.MI"]
//! watchlist = ["AAPL", "MSFT"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// FTSE MIB constituents scanned when no list is supplied.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "A2A.MI", "AMP.MI", "BAMI.MI", "BC.MI", "BGN.MI", "BMPS.MI", "BPE.MI", "BMED.MI", "BST.MI",
    "CE.MI", "CPR.MI", "DIA.MI", "ENEL.MI", "ENI.MI", "ERG.MI", "FBK.MI", "GEO.MI", "IG.MI",
    "INRG.MI", "ISP.MI", "IVG.MI", "LDO.MI", "MB.MI", "MONC.MI", "NEXI.MI", "PRY.MI", "PST.MI",
    "RACE.MI", "REC.MI", "SFER.MI", "SPM.MI", "STLAM.MI", "STMMI.MI", "TES.MI", "TEN.MI",
    "TGYM.MI", "TIT.MI", "TRN.MI", "UCG.MI", "UNI.MI",
];

/// Name of the built-in list inside [`Universe::builtin`].
pub const DEFAULT_LIST: &str = "ftse_mib";

/// De-duplicated, upper-cased instrument identifiers in first-seen order.
///
/// The order only matters for listing; the screener ranks its own output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SymbolSet {
    symbols: Vec<String>,
}

impl SymbolSet {
    /// Parse user text: one symbol per line and/or comma-separated.
    pub fn parse(text: &str) -> Self {
        Self::from_symbols(text.split(['\n', ',']))
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read symbols file: {e}"))?;
        Ok(Self::parse(&content))
    }

    /// Normalize any iterator of raw symbols (trim, upper-case, drop empties, dedupe).
    pub fn from_symbols<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let symbols = raw
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    pub fn default_set() -> Self {
        Self::from_symbols(DEFAULT_SYMBOLS.iter().copied())
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

/// Named symbol lists loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub lists: BTreeMap<String, Vec<String>>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    /// The built-in universe: just the default FTSE MIB list.
    pub fn builtin() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert(
            DEFAULT_LIST.to_string(),
            DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        );
        Self { lists }
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.lists.keys().map(|s| s.as_str()).collect()
    }

    /// A named list, normalized into a [`SymbolSet`].
    pub fn symbol_set(&self, name: &str) -> Option<SymbolSet> {
        self.lists.get(name).map(SymbolSet::from_symbols)
    }

    /// Every list merged, deduplicated across lists.
    pub fn all_symbols(&self) -> SymbolSet {
        SymbolSet::from_symbols(self.lists.values().flatten())
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lines_and_commas() {
        let set = SymbolSet::parse("eni.mi\n  isp.mi , UCG.MI\n\n,ENEL.MI\r\n");
        assert_eq!(set.symbols(), ["ENI.MI", "ISP.MI", "UCG.MI", "ENEL.MI"]);
    }

    #[test]
    fn parse_dedupes_keeping_first_appearance() {
        let set = SymbolSet::parse("b, a, B, c, a");
        assert_eq!(set.symbols(), ["B", "A", "C"]);
    }

    #[test]
    fn parse_blank_text_is_empty() {
        assert!(SymbolSet::parse(" \n , \n").is_empty());
    }

    #[test]
    fn default_set_has_forty_symbols() {
        let set = SymbolSet::default_set();
        assert_eq!(set.len(), 40);
        assert!(set.contains("ENI.MI"));
        assert_eq!(set.symbols()[0], "A2A.MI");
    }

    #[test]
    fn builtin_universe_matches_default_set() {
        let u = Universe::builtin();
        assert_eq!(u.list_names(), vec![DEFAULT_LIST]);
        assert_eq!(u.symbol_set(DEFAULT_LIST), Some(SymbolSet::default_set()));
        assert!(u.symbol_set("missing").is_none());
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::builtin();
        let toml_str = u.to_toml().unwrap();
        let parsed = Universe::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.all_symbols().len(), 40);
    }

    #[test]
    fn all_symbols_dedupes_across_lists() {
        let u = Universe::from_toml(
            r#"
            [lists]
            banks = ["isp.mi", "UCG.MI"]
            watch = ["UCG.MI", "ENI.MI"]
            "#,
        )
        .unwrap();
        assert_eq!(u.all_symbols().symbols(), ["ISP.MI", "UCG.MI", "ENI.MI"]);
    }
}
