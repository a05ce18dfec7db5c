use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Seed/leech value for sources that never report the field.
pub const UNKNOWN_COUNT: &str = "?";

/// Results keyed by normalized name. Inserting an existing name replaces the
/// earlier value, so the last item discovered wins.
pub type ResultSet = IndexMap<String, ResultItem>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// decimal digits, or `?` when the source omits the field
    pub seeds: String,
    /// decimal digits, or `?` when the source omits the field
    pub leeches: String,
    /// magnet URI or a direct resource URL
    pub link: String,
}

impl ResultItem {
    pub fn new(seeds: impl Into<String>, leeches: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            seeds: seeds.into(),
            leeches: leeches.into(),
            link: link.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Search(String),
    List,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search(query) => write!(f, "search '{}'", query),
            Action::List => write!(f, "list"),
        }
    }
}
