use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use tariffscan_core::{ExtractionResult, Page};
use tariffscan_ocr::{Frame, OcrError, RecognitionBackend, RecognitionDriver, ScanConfig, ScanSession, Submission};
use tokio::time::MissedTickBehavior;

use crate::commit::{CommitOutcome, CommitTrigger, Committer};

/// Serves recorded pages in a loop, one per frame sequence number.
pub struct ReplayRecognizer {
    pages: Vec<Page>,
}

impl ReplayRecognizer {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    /// One JSON page per non-blank line.
    pub fn from_json_lines(text: &str) -> Result<Self, serde_json::Error> {
        let pages = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str::<Page>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(pages))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_lines(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl RecognitionBackend for ReplayRecognizer {
    fn recognize(&self, frame: &Frame) -> Result<Page, OcrError> {
        if self.pages.is_empty() {
            return Err(OcrError::Exhausted);
        }
        let index = (frame.sequence % self.pages.len() as u64) as usize;
        Ok(self.pages[index].clone())
    }
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub fps: u32,
    pub frames: u64,
    pub save_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub submitted: u64,
    pub dropped: u64,
    pub failed: u64,
    pub emitted: u64,
    pub saved: usize,
}

/// Replays recorded recognition output as if it came from a live camera.
///
/// A capture task ticks at the requested frame rate and pushes frames through
/// the drop-on-busy driver; this side runs extraction, stabilization and
/// auto-commit on whatever completes. Without a committer nothing is saved.
pub async fn run_replay(
    recognizer: ReplayRecognizer,
    config: &ScanConfig,
    options: &ReplayOptions,
    mut committer: Option<&mut Committer>,
) -> anyhow::Result<ReplaySummary> {
    let (driver, mut completions) =
        RecognitionDriver::new(recognizer, config.pipeline.completion_capacity);
    let mut session = ScanSession::new(config);

    let period = Duration::from_secs_f64(1.0 / f64::from(options.fps.max(1)));
    let frames = options.frames;

    // The driver lives in the capture task; dropping it there ends the session.
    let capture = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let (mut submitted, mut dropped) = (0u64, 0u64);
        for sequence in 0..frames {
            ticker.tick().await;
            match driver.submit(Frame::new(sequence, Vec::new())) {
                Submission::Accepted => submitted += 1,
                Submission::Dropped => dropped += 1,
            }
        }
        (submitted, dropped)
    });

    let mut summary = ReplaySummary::default();
    let mut last_result: Option<ExtractionResult> = None;

    while let Some(recognition) = completions.recv().await {
        if recognition.is_err() {
            summary.failed += 1;
        }
        let Some(event) = session.process(recognition, Instant::now()) else {
            continue;
        };
        summary.emitted += 1;
        println!("{}\n", event.display_text());

        if event.should_auto_commit {
            if let Some(c) = committer.as_deref_mut() {
                if let CommitOutcome::Saved(n) = c.commit(&event.result, CommitTrigger::Auto).await? {
                    summary.saved += n;
                }
            }
        }
        last_result = Some(event.result);
    }

    let (submitted, dropped) = capture.await.context("capture task failed")?;
    summary.submitted = submitted;
    summary.dropped = dropped;

    if options.save_last {
        match (committer, last_result) {
            (Some(c), Some(result)) => {
                if let CommitOutcome::Saved(n) = c.commit(&result, CommitTrigger::Manual).await? {
                    summary.saved += n;
                }
            }
            (None, _) => tracing::warn!("--save-last ignored: committing is disabled"),
            (_, None) => tracing::info!("HS code / item name not detected yet"),
        }
    }

    tracing::info!(
        submitted = summary.submitted,
        dropped = summary.dropped,
        failed = summary.failed,
        emitted = summary.emitted,
        saved = summary.saved,
        "replay finished"
    );
    Ok(summary)
}
