use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for a tariff code that could not be found.
pub const NO_CODE: &str = "N/A";
/// Placeholder for an item description that could not be found.
pub const NO_NAME: &str = "Unknown";

/// Shown by the live preview while nothing has been extracted yet.
pub const PREVIEW_PLACEHOLDER: &str = "Point the camera at the declaration...\nHS: ...\nItem: ...";

/// One declared line-item. Missing fields hold the sentinels, never empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub hs_code: String,
    pub item_name: String,
}

impl ParsedItem {
    pub fn new(hs_code: impl Into<String>, item_name: impl Into<String>) -> Self {
        Self { hs_code: hs_code.into(), item_name: item_name.into() }
    }

    /// Substitutes the sentinels for absent fields.
    pub fn from_parts(hs_code: Option<String>, item_name: Option<String>) -> Self {
        Self {
            hs_code: hs_code.unwrap_or_else(|| NO_CODE.to_string()),
            item_name: item_name.unwrap_or_else(|| NO_NAME.to_string()),
        }
    }

    pub fn has_code(&self) -> bool {
        self.hs_code != NO_CODE
    }

    pub fn has_name(&self) -> bool {
        self.item_name != NO_NAME
    }

    /// Both fields are sentinels.
    pub fn is_empty(&self) -> bool {
        !self.has_code() && !self.has_name()
    }

    /// Both fields resolved.
    pub fn is_complete(&self) -> bool {
        self.has_code() && self.has_name()
    }
}

impl fmt::Display for ParsedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hs_code, self.item_name)
    }
}

/// Content key used to detect repeated extractions. Order- and case-sensitive.
pub fn fingerprint(items: &[ParsedItem]) -> String {
    items.iter().map(ParsedItem::to_string).collect::<Vec<_>>().join("|")
}

/// What a single processed frame yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub raw_text: String,
    pub items: Vec<ParsedItem>,
}

impl ExtractionResult {
    pub fn new(raw_text: impl Into<String>, items: Vec<ParsedItem>) -> Self {
        Self { raw_text: raw_text.into(), items }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.items)
    }

    /// At least one item carries a real code or name.
    pub fn has_signal(&self) -> bool {
        self.items.iter().any(|i| !i.is_empty())
    }

    /// Numbered rows for the live preview.
    pub fn display_text(&self) -> String {
        if self.items.is_empty() {
            return PREVIEW_PLACEHOLDER.to_string();
        }
        self.items
            .iter()
            .enumerate()
            .map(|(idx, item)| format!("{}) HS: {}\n   Item: {}", idx + 1, item.hs_code, item.item_name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
