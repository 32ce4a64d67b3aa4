use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Inverted rectangle: {0}")]
    Inverted(Rect),
}

/// Axis-aligned rectangle in frame pixel space.
///
/// Always satisfies `left <= right` and `top <= bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRect")]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Deserialize)]
struct RawRect {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl TryFrom<RawRect> for Rect {
    type Error = GeometryError;

    fn try_from(raw: RawRect) -> Result<Self, Self::Error> {
        let rect = Rect { left: raw.left, top: raw.top, right: raw.right, bottom: raw.bottom };
        if rect.left > rect.right || rect.top > rect.bottom {
            return Err(GeometryError::Inverted(rect));
        }
        Ok(rect)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.left, self.top, self.right, self.bottom)
    }
}

impl Rect {
    /// Builds a rectangle from two corners in any order.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Rect {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Strict overlap on both axes; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Whether the horizontal projections of the two rectangles overlap.
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.left < other.right && other.left < self.right
    }

    /// Grows the rectangle by the given margins, clamping left and top at zero
    /// and saturating at the far edges.
    pub fn expand(&self, left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Rect::new(
            self.left.saturating_sub(left).max(0),
            self.top.saturating_sub(top).max(0),
            self.right.saturating_add(right),
            self.bottom.saturating_add(bottom),
        )
    }
}

/// One OCR text line. Lines without a box can only be used by text-based parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<Rect>,
}

impl Line {
    pub fn new(text: impl Into<String>, bounding_box: Rect) -> Self {
        Self { text: text.into(), bounding_box: Some(bounding_box) }
    }

    pub fn without_box(text: impl Into<String>) -> Self {
        Self { text: text.into(), bounding_box: None }
    }

    pub fn top(&self) -> Option<i32> {
        self.bounding_box.map(|b| b.top)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub lines: Vec<Line>,
}

/// A recognized frame: lines grouped into blocks in OCR order, plus the raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPage")]
pub struct Page {
    pub blocks: Vec<Block>,
    pub raw_text: String,
}

#[derive(Deserialize)]
struct RawPage {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    raw_text: Option<String>,
}

impl From<RawPage> for Page {
    fn from(raw: RawPage) -> Self {
        match raw.raw_text {
            Some(text) => Page::with_raw_text(raw.blocks, text),
            None => Page::from_blocks(raw.blocks),
        }
    }
}

impl Page {
    /// Raw text is every line joined by `\n` in OCR order.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let raw_text = blocks
            .iter()
            .flat_map(|b| b.lines.iter())
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { blocks, raw_text }
    }

    pub fn from_lines(lines: Vec<Line>) -> Self {
        Self::from_blocks(vec![Block { lines }])
    }

    /// A page without geometry, e.g. text pasted from elsewhere.
    pub fn from_text(text: &str) -> Self {
        let lines = text.lines().map(Line::without_box).collect();
        Self { blocks: vec![Block { lines }], raw_text: text.to_string() }
    }

    /// Keeps the raw text exactly as the engine reported it.
    pub fn with_raw_text(blocks: Vec<Block>, raw_text: impl Into<String>) -> Self {
        Self { blocks, raw_text: raw_text.into() }
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.blocks.iter().flat_map(|b| b.lines.iter())
    }

    pub fn has_geometry(&self) -> bool {
        self.lines().any(|l| l.bounding_box.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.lines().all(|l| l.text.trim().is_empty()) && self.raw_text.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_new_orders_corners() {
        let r = Rect::new(100, 50, 10, 5);
        assert_eq!(r, Rect { left: 10, top: 5, right: 100, bottom: 50 });
        assert_eq!(r.width(), 90);
        assert_eq!(r.height(), 45);
    }

    #[test]
    fn intersects_requires_overlap_on_both_axes() {
        let a = Rect::new(0, 0, 100, 100);
        assert!(a.intersects(&Rect::new(50, 50, 150, 150)));
        assert!(!a.intersects(&Rect::new(150, 0, 200, 100)));
        assert!(!a.intersects(&Rect::new(0, 150, 100, 200)));
        // Shared edge only.
        assert!(!a.intersects(&Rect::new(100, 0, 200, 100)));
    }

    #[test]
    fn expand_clamps_at_zero() {
        let r = Rect::new(10, 20, 30, 40).expand(50, 50, 5, 5);
        assert_eq!(r, Rect::new(0, 0, 35, 45));
    }

    #[test]
    fn arithmetic_saturates_at_limits() {
        let r = Rect::new(i32::MIN, 0, i32::MAX, 10).expand(5, 5, 5, 5);
        assert_eq!(r, Rect::new(0, 0, i32::MAX, 15));
        assert_eq!(Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX).width(), i32::MAX);
    }

    #[test]
    fn deserialize_rejects_inverted_rect() {
        let err = serde_json::from_str::<Rect>(r#"{"left":10,"top":0,"right":5,"bottom":3}"#);
        assert!(err.is_err());
        let ok: Rect = serde_json::from_str(r#"{"left":0,"top":0,"right":5,"bottom":3}"#).unwrap();
        assert_eq!(ok.right, 5);
    }

    #[test]
    fn page_raw_text_joins_lines_in_ocr_order() {
        let page = Page::from_blocks(vec![
            Block { lines: vec![Line::without_box("a"), Line::without_box("b")] },
            Block { lines: vec![Line::new("c", Rect::new(0, 0, 1, 1))] },
        ]);
        assert_eq!(page.raw_text, "a\nb\nc");
        assert_eq!(page.lines().count(), 3);
        assert!(page.has_geometry());
    }

    #[test]
    fn page_from_json_without_raw_text() {
        let json = r#"{"blocks":[{"lines":[{"text":"31","box":{"left":0,"top":10,"right":40,"bottom":30}},{"text":"x"}]}]}"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.raw_text, "31\nx");
        assert_eq!(page.lines().next().unwrap().top(), Some(10));
        assert!(page.lines().nth(1).unwrap().bounding_box.is_none());
    }

    #[test]
    fn page_from_text_has_no_geometry() {
        let page = Page::from_text("one\ntwo");
        assert!(!page.has_geometry());
        assert_eq!(page.raw_text, "one\ntwo");
        assert!(Page::from_text("  \n").is_empty());
    }
}
