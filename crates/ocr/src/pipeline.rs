use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tariffscan_core::{ExtractionResult, Page};
use tokio::sync::mpsc;

use crate::config::ScanConfig;
use crate::extract::FieldExtractor;
use crate::recognizer::{Frame, OcrError, RecognitionBackend};
use crate::stabilizer::{Stabilizer, StabilizedEvent};

/// The outcome of one recognition, delivered in completion order.
pub type Recognition = Result<Page, OcrError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// A recognition was already in flight; the frame is gone.
    Dropped,
}

// ── Driver ────────────────────────────────────────────────────────────────────

/// Feeds frames to the OCR engine one at a time. Frames arriving while a
/// recognition is in flight are dropped, never queued.
pub struct RecognitionDriver<R: RecognitionBackend> {
    backend: Arc<R>,
    busy: Arc<AtomicBool>,
    completions: mpsc::Sender<Recognition>,
}

impl<R: RecognitionBackend> RecognitionDriver<R> {
    /// Returns the driver and the receiving end of its completions. The
    /// channel closes once the driver is dropped and in-flight work is done.
    pub fn new(backend: R, capacity: usize) -> (Self, mpsc::Receiver<Recognition>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let driver = Self {
            backend: Arc::new(backend),
            busy: Arc::new(AtomicBool::new(false)),
            completions: tx,
        };
        (driver, rx)
    }

    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, frame: Frame) -> Submission {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(sequence = frame.sequence, "recognition in flight, frame dropped");
            return Submission::Dropped;
        }

        let backend = Arc::clone(&self.backend);
        let busy = Arc::clone(&self.busy);
        let tx = self.completions.clone();
        let sequence = frame.sequence;

        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || backend.recognize(&frame))
                .await
                .unwrap_or_else(|e| Err(OcrError::Engine(format!("recognition task failed: {e}"))));

            // Release before anything else so an error path can't starve the next frame.
            busy.store(false, Ordering::Release);

            if tx.send(outcome).await.is_err() {
                tracing::debug!(sequence, "session ended, recognition discarded");
            }
        });

        Submission::Accepted
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Extraction plus stabilization for one capture source.
pub struct ScanSession {
    extractor: FieldExtractor,
    stabilizer: Stabilizer,
}

impl ScanSession {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extractor: FieldExtractor::new(config),
            stabilizer: Stabilizer::new(&config.stabilizer),
        }
    }

    /// One-shot extraction, e.g. for an imported still image.
    pub fn extract(&self, page: &Page) -> ExtractionResult {
        self.extractor.extract(page)
    }

    /// A failed recognition yields nothing and leaves the stabilizer untouched.
    pub fn process(&mut self, recognition: Recognition, now: Instant) -> Option<StabilizedEvent> {
        match recognition {
            Ok(page) => self.process_page(&page, now),
            Err(e) => {
                tracing::warn!("Recognition failed: {e}");
                None
            }
        }
    }

    pub fn process_page(&mut self, page: &Page, now: Instant) -> Option<StabilizedEvent> {
        let result = self.extractor.extract(page);
        self.stabilizer.observe(result, now)
    }

    pub fn restart(&mut self) {
        self.stabilizer.reset();
    }

    pub fn stabilizer(&self) -> &Stabilizer {
        &self.stabilizer
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
