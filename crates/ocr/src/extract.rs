use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tariffscan_core::{ExtractionResult, Line, Page, ParsedItem, Rect};

use crate::anchor::{collapse_whitespace, AnchorKind, AnchorMatcher};
use crate::config::{LayoutConfig, ScanConfig};
use crate::names::NameFilter;
use crate::text_parser::TextParser;

// ── Tariff codes ─────────────────────────────────────────────────────────────

re!(re_tariff_code, r"\b([0-9]{8}|[0-9]{10})\b");

/// Every 8- or 10-digit run in `text`, left to right.
pub(crate) fn tariff_codes(text: &str) -> impl Iterator<Item = &str> + '_ {
    re_tariff_code().find_iter(text).map(|m| m.as_str())
}

/// An 8-digit code beats a 10-digit one; ties go to the first candidate.
pub(crate) fn pick_tariff_code<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut first = None;
    for code in candidates {
        if code.len() == 8 {
            return Some(code.to_string());
        }
        first.get_or_insert(code);
    }
    first.map(str::to_string)
}

/// Longest candidate by character count; the earliest wins a tie.
pub(crate) fn longest<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates.into_iter().fold(None, |best, c| match best {
        Some(b) if b.chars().count() >= c.chars().count() => Some(b),
        _ => Some(c),
    })
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// A line that carries geometry, paired with its box.
type Placed<'a> = (&'a Line, Rect);

/// Finds the repeated goods sections of a declaration page and reads a tariff
/// code and a description out of each.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    anchors: AnchorMatcher,
    names: NameFilter,
    layout: LayoutConfig,
    text_parser: TextParser,
}

impl FieldExtractor {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            anchors: AnchorMatcher::new(&config.anchors),
            names: NameFilter::new(&config.names),
            layout: config.layout.clone(),
            text_parser: TextParser::new(config),
        }
    }

    pub fn extract(&self, page: &Page) -> ExtractionResult {
        ExtractionResult::new(page.raw_text.clone(), self.extract_items(page))
    }

    /// Candidate items in top-to-bottom order. Never contains an item whose
    /// fields are both sentinels, nor two identical items.
    pub fn extract_items(&self, page: &Page) -> Vec<ParsedItem> {
        if !page.has_geometry() {
            let item = self.text_parser.parse(&page.raw_text);
            return if item.is_empty() { vec![] } else { vec![item] };
        }

        // OCR order, for label lookup.
        let placed: Vec<Placed> = page
            .lines()
            .filter_map(|l| Some((l, l.bounding_box?)))
            .collect();
        // Reading order, for region scans.
        let mut by_top = placed.clone();
        by_top.sort_by_key(|(_, b)| b.top);

        let segment_anchors: Vec<Rect> = by_top
            .iter()
            .filter(|(l, _)| self.anchors.is_anchor(l, AnchorKind::ItemNameField))
            .map(|(_, b)| *b)
            .collect();

        if segment_anchors.is_empty() {
            return self.extract_whole_page(page, &by_top).into_iter().collect();
        }

        let items = segment_anchors.iter().enumerate().map(|(i, anchor)| {
            let segment = self.segment(anchor, segment_anchors.get(i + 1));
            let name = self.name_in_segment(&by_top, anchor, &segment);
            let code = self.code_in_segment(&placed, &by_top, &segment);
            ParsedItem::from_parts(code, name)
        });

        let items = dedup(items.filter(|item| !item.is_empty()));
        tracing::trace!(segments = segment_anchors.len(), items = items.len(), "extracted page");
        items
    }

    // ── Segments ──────────────────────────────────────────────────────────────

    fn segment(&self, anchor: &Rect, next: Option<&Rect>) -> Rect {
        let l = &self.layout;
        let bottom = match next {
            // Anchors detected almost on top of each other still get a usable segment.
            Some(next) => next
                .top
                .saturating_sub(l.next_anchor_margin)
                .max(anchor.bottom.saturating_add(l.min_segment_height)),
            None => anchor.bottom.saturating_add(l.trailing_window),
        };
        Rect::new(
            anchor.left.saturating_sub(l.segment_left_margin).max(0),
            anchor.top.saturating_sub(l.segment_top_margin).max(0),
            anchor.right.saturating_add(l.segment_right_margin),
            bottom,
        )
    }

    fn extract_whole_page(&self, page: &Page, by_top: &[Placed]) -> Option<ParsedItem> {
        let code = pick_tariff_code(by_top.iter().flat_map(|&(l, _)| tariff_codes(&l.text)))
            .or_else(|| pick_tariff_code(tariff_codes(&page.raw_text)));
        let name = longest(
            page.lines()
                .map(|l| l.text.trim())
                .filter(|t| !t.is_empty() && self.names.is_meaningful(t)),
        )
        .map(collapse_whitespace);

        let item = ParsedItem::from_parts(code, name);
        (!item.is_empty()).then_some(item)
    }

    // ── Item name ─────────────────────────────────────────────────────────────

    /// The form puts the actual description at the bottom of the field, so the
    /// last meaningful line below the anchor wins.
    fn name_in_segment(&self, by_top: &[Placed], anchor: &Rect, segment: &Rect) -> Option<String> {
        let l = &self.layout;
        let top = anchor.bottom.saturating_add(l.name_gap);
        let bottom = self
            .next_field_below(by_top, anchor, top, segment)
            .map_or(segment.bottom, |t| t.min(segment.bottom));
        let region = Rect::new(
            anchor.left.saturating_sub(l.name_left_margin).max(0),
            top,
            anchor.right.saturating_add(l.segment_right_margin),
            bottom.max(top),
        );

        by_top
            .iter()
            .filter(|(_, b)| b.intersects(&region) && b.top >= region.top && b.top <= region.bottom)
            .map(|(line, _)| line.text.trim())
            .filter(|t| !t.is_empty() && self.names.is_meaningful(t))
            .last()
            .map(collapse_whitespace)
    }

    /// Top of the nearest later field header in the anchor's own column.
    fn next_field_below(&self, by_top: &[Placed], anchor: &Rect, from: i32, segment: &Rect) -> Option<i32> {
        let slack = self.layout.column_slack;
        let column = Rect::new(
            anchor.left.saturating_sub(slack),
            anchor.top,
            anchor.right.saturating_add(slack),
            anchor.bottom,
        );
        by_top
            .iter()
            .filter(|(_, b)| b.top >= from && b.top < segment.bottom && b.overlaps_horizontally(&column))
            // A description that opens with a package count is content, not a header.
            .filter(|(line, _)| {
                self.anchors.is_anchor(line, AnchorKind::NextFieldHeader)
                    && !self.anchors.is_anchor(line, AnchorKind::TariffCodeLabel)
                    && !self.names.is_meaningful(line.text.trim())
            })
            .map(|(_, b)| b.top)
            .min()
    }

    // ── Tariff code ───────────────────────────────────────────────────────────

    fn code_in_segment(&self, placed: &[Placed], by_top: &[Placed], segment: &Rect) -> Option<String> {
        let label = placed
            .iter()
            .find(|(line, b)| b.intersects(segment) && self.anchors.is_anchor(line, AnchorKind::TariffCodeLabel));

        let Some(&(_, label)) = label else {
            return codes_in(by_top, segment);
        };

        let window_top = label.bottom.saturating_add(self.layout.name_gap);
        if window_top >= segment.bottom {
            return codes_in(by_top, segment);
        }
        let window = Rect::new(
            segment.left,
            window_top,
            segment.right,
            label.bottom.saturating_add(self.layout.code_window).min(segment.bottom),
        );
        codes_in(by_top, &window).or_else(|| codes_in(by_top, segment))
    }
}

fn codes_in(by_top: &[Placed], region: &Rect) -> Option<String> {
    pick_tariff_code(
        by_top
            .iter()
            .filter(|(_, b)| b.intersects(region))
            .flat_map(|&(l, _)| tariff_codes(&l.text)),
    )
}

/// OCR sometimes reports one physical line twice; keep the first of each pair.
fn dedup(items: impl Iterator<Item = ParsedItem>) -> Vec<ParsedItem> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
