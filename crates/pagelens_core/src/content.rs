use serde::{Deserialize, Serialize};

/// Structured snapshot of what a page shows.
///
/// Produced once per extraction and passed by value across the page
/// boundary; it has no identity of its own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,
    pub tables: Vec<ExtractedTable>,
    pub links: Vec<ExtractedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedTable {
    pub headers: Vec<String>,
    /// Data rows in source order. Rows without data cells are not listed.
    pub rows: Vec<Vec<String>>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedLink {
    pub text: String,
    pub href: String,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.tables.is_empty() && self.links.is_empty()
    }
}
