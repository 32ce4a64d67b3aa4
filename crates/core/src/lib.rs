pub mod geometry;
pub mod item;

pub use geometry::{Block, GeometryError, Line, Page, Rect};
pub use item::{fingerprint, ExtractionResult, ParsedItem, NO_CODE, NO_NAME, PREVIEW_PLACEHOLDER};
