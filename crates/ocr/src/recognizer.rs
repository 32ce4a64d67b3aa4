use tariffscan_core::Page;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Frame carried no image")]
    NoFrame,
    #[error("No more recorded frames")]
    Exhausted,
}

/// A captured camera frame. The pipeline never looks inside `data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub sequence: u64,
    pub data: Vec<u8>,
    pub rotation_degrees: u16,
}

impl Frame {
    pub fn new(sequence: u64, data: Vec<u8>) -> Self {
        Self { sequence, data, rotation_degrees: 0 }
    }
}

/// Abstraction over an OCR engine.
/// Implementations may block; the driver runs them off the async executor.
pub trait RecognitionBackend: Send + Sync + 'static {
    fn recognize(&self, frame: &Frame) -> Result<Page, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set page (or error) for every frame. Exercises
/// the extraction pipeline without a real engine.
pub struct MockRecognizer {
    pub outcome: Result<Page, OcrError>,
}

impl MockRecognizer {
    pub fn new(page: Page) -> Self {
        Self { outcome: Ok(page) }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(Page::from_text(text))
    }

    pub fn failing(error: OcrError) -> Self {
        Self { outcome: Err(error) }
    }
}

impl RecognitionBackend for MockRecognizer {
    fn recognize(&self, _frame: &Frame) -> Result<Page, OcrError> {
        self.outcome.clone()
    }
}
