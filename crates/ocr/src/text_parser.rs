use tariffscan_core::ParsedItem;

use crate::anchor::{collapse_whitespace, normalize};
use crate::config::ScanConfig;
use crate::extract::{longest, pick_tariff_code, tariff_codes};
use crate::names::NameFilter;

const INLINE_SEPARATORS: &[char] = &[':', '：', '-', '،', '='];

/// Fields recovered from plain text. `None` means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    pub hs_code: Option<String>,
    pub item_name: Option<String>,
}

/// Geometry-free extraction of at most one item from raw OCR text.
#[derive(Debug, Clone)]
pub struct TextParser {
    names: NameFilter,
    labels: Vec<String>,
    fallback_min_chars: usize,
    window_lines: usize,
}

impl TextParser {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            names: NameFilter::new(&config.names),
            labels: config
                .anchors
                .item_designation_labels
                .iter()
                .map(|l| normalize(l))
                .filter(|l| !l.is_empty())
                .collect(),
            fallback_min_chars: config.names.fallback_min_chars,
            window_lines: config.names.fallback_window_lines,
        }
    }

    /// Like [`parse_fields`](Self::parse_fields), with sentinels for missing fields.
    pub fn parse(&self, raw_text: &str) -> ParsedItem {
        let fields = self.parse_fields(raw_text);
        ParsedItem::from_parts(fields.hs_code, fields.item_name)
    }

    pub fn parse_fields(&self, raw_text: &str) -> ParsedFields {
        let hs_code = pick_tariff_code(tariff_codes(&normalize(raw_text)));

        let lines: Vec<&str> = raw_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let item_name = self
            .name_after_label(&lines)
            .or_else(|| hs_code.as_deref().and_then(|code| self.name_near_code(&lines, code)))
            .or_else(|| self.first_long_name(&lines));

        ParsedFields { hs_code, item_name }
    }

    /// Text after the label's inline separator, else the next non-blank line.
    fn name_after_label(&self, lines: &[&str]) -> Option<String> {
        for (i, line) in lines.iter().enumerate() {
            let normalized = normalize(line);
            if !self.labels.iter().any(|label| normalized.contains(label.as_str())) {
                continue;
            }

            if let Some((head, tail)) = line.split_once(INLINE_SEPARATORS) {
                let head = normalize(head);
                if self.labels.iter().any(|label| head.contains(label.as_str())) && !tail.trim().is_empty() {
                    return Some(collapse_whitespace(tail));
                }
            }
            if let Some(next) = lines.get(i + 1) {
                return Some(collapse_whitespace(next));
            }
        }
        None
    }

    /// Longest meaningful line shortly after the first line holding `code`.
    fn name_near_code(&self, lines: &[&str], code: &str) -> Option<String> {
        let at = lines.iter().position(|l| l.contains(code))?;
        longest(
            lines
                .iter()
                .skip(at + 1)
                .take(self.window_lines)
                .copied()
                .filter(|l| self.names.is_meaningful(l)),
        )
        .map(collapse_whitespace)
    }

    fn first_long_name(&self, lines: &[&str]) -> Option<String> {
        lines
            .iter()
            .find(|l| l.chars().count() >= self.fallback_min_chars && self.names.is_meaningful(l))
            .map(|l| collapse_whitespace(l))
    }
}
