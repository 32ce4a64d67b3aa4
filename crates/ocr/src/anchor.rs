use regex::Regex;
use std::sync::OnceLock;
use tariffscan_core::Line;

use crate::config::AnchorConfig;

re!(re_horizontal_space, r"[^\S\r\n]+");
re!(re_leading_index, r"^([0-9]{1,2})(?:$|[\s:.،\-)])");

/// Lowercases, turns non-breaking spaces into spaces, collapses horizontal
/// whitespace runs to one space and trims both ends. Idempotent.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// [`normalize`] without the case folding; used for values handed back to callers.
pub fn collapse_whitespace(text: &str) -> String {
    re_horizontal_space().replace_all(text, " ").trim().to_string()
}

/// The field number a normalized line starts with, if any.
fn leading_field_index(normalized: &str) -> Option<u32> {
    re_leading_index().captures(normalized)?.get(1)?.as_str().parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    /// The goods description box number, alone or followed by a separator.
    ItemNameField,
    /// The "tariff heading" label, in any of its known spellings.
    TariffCodeLabel,
    /// Any later box number; only ever used to end a region.
    NextFieldHeader,
}

/// Classifies OCR lines as the form's field labels.
///
/// All matching runs on [`normalize`]d text; the stored line text is never altered.
#[derive(Debug, Clone)]
pub struct AnchorMatcher {
    item_field_index: u32,
    last_field_index: u32,
    tariff_stem: String,
    tariff_variants: Vec<String>,
}

impl AnchorMatcher {
    pub fn new(config: &AnchorConfig) -> Self {
        Self {
            item_field_index: config.item_field_index,
            last_field_index: config.last_field_index,
            tariff_stem: normalize(&config.tariff_label_stem),
            tariff_variants: config
                .tariff_label_variants
                .iter()
                .map(|v| normalize(v))
                .filter(|v| !v.is_empty())
                .collect(),
        }
    }

    pub fn is_anchor(&self, line: &Line, kind: AnchorKind) -> bool {
        self.matches_text(&line.text, kind)
    }

    pub fn matches_text(&self, text: &str, kind: AnchorKind) -> bool {
        let normalized = normalize(text);
        match kind {
            AnchorKind::ItemNameField => {
                leading_field_index(&normalized) == Some(self.item_field_index)
            }
            AnchorKind::NextFieldHeader => leading_field_index(&normalized)
                .is_some_and(|idx| idx > self.item_field_index && idx <= self.last_field_index),
            AnchorKind::TariffCodeLabel => {
                normalized.contains(&self.tariff_stem)
                    && (self.tariff_variants.is_empty()
                        || self.tariff_variants.iter().any(|v| normalized.contains(v)))
            }
        }
    }
}
