use std::time::{Duration, Instant};

use serde::Serialize;
use tariffscan_core::ExtractionResult;

use crate::config::StabilizerConfig;

/// What the caller receives for an emitted frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilizedEvent {
    pub result: ExtractionResult,
    pub should_auto_commit: bool,
}

impl StabilizedEvent {
    pub fn display_text(&self) -> String {
        self.result.display_text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizerPhase {
    /// Nothing observed since the session (re)started.
    Cold,
    /// The current fingerprint has been seen, but not often enough yet.
    Tracking,
    Stable,
}

#[derive(Debug, Clone, Default)]
struct StabilizerState {
    last_key: Option<String>,
    stable_count: u32,
    last_emit_at: Option<Instant>,
    last_auto_save_key: Option<String>,
}

/// Turns a jittery per-frame extraction stream into throttled events, flagging
/// exactly one auto-commit per distinct stable result.
///
/// Stability counting advances on every observation; the emission throttle
/// only decides whether the caller hears about it. Owned by exactly one
/// session; never shared.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    required_stable_frames: u32,
    min_emit_interval: Duration,
    state: StabilizerState,
}

impl Stabilizer {
    pub fn new(config: &StabilizerConfig) -> Self {
        Self {
            required_stable_frames: config.required_stable_frames.max(1),
            min_emit_interval: config.min_emit_interval(),
            state: StabilizerState::default(),
        }
    }

    pub fn observe(&mut self, result: ExtractionResult, now: Instant) -> Option<StabilizedEvent> {
        let key = result.fingerprint();

        if self.state.last_key.as_deref() == Some(key.as_str()) {
            self.state.stable_count = self.state.stable_count.saturating_add(1);
        } else {
            self.state.last_key = Some(key.clone());
            self.state.stable_count = 1;
        }

        if let Some(last) = self.state.last_emit_at {
            if now.saturating_duration_since(last) < self.min_emit_interval {
                tracing::debug!(stable_count = self.state.stable_count, "emission throttled");
                return None;
            }
        }
        self.state.last_emit_at = Some(now);

        let should_auto_commit = self.is_stable()
            && result.has_signal()
            && !key.is_empty()
            && self.state.last_auto_save_key.as_deref() != Some(key.as_str());

        if should_auto_commit {
            tracing::info!(key = %key, frames = self.state.stable_count, "stable result ready to commit");
            self.state.last_auto_save_key = Some(key);
        }

        Some(StabilizedEvent { result, should_auto_commit })
    }

    pub fn phase(&self) -> StabilizerPhase {
        match self.state.last_key {
            None => StabilizerPhase::Cold,
            Some(_) if self.is_stable() => StabilizerPhase::Stable,
            Some(_) => StabilizerPhase::Tracking,
        }
    }

    pub fn stable_count(&self) -> u32 {
        self.state.stable_count
    }

    /// Forget everything; the next observation starts from cold.
    pub fn reset(&mut self) {
        self.state = StabilizerState::default();
    }

    fn is_stable(&self) -> bool {
        self.state.stable_count >= self.required_stable_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tariffscan_core::ParsedItem;

    const STEP: Duration = Duration::from_millis(150);

    fn stabilizer() -> Stabilizer {
        Stabilizer::new(&StabilizerConfig::default())
    }

    fn result(code: &str, name: &str) -> ExtractionResult {
        ExtractionResult::new("raw", vec![ParsedItem::new(code, name)])
    }

    /// Feeds `n` copies spaced `step` apart; returns the emitted events.
    fn feed(s: &mut Stabilizer, r: &ExtractionResult, n: u32, start: Instant, step: Duration) -> Vec<StabilizedEvent> {
        (0..n).filter_map(|i| s.observe(r.clone(), start + step * i)).collect()
    }

    #[test]
    fn commits_once_on_eighth_frame() {
        let mut s = stabilizer();
        let events = feed(&mut s, &result("64039900", "حذاء"), 8, Instant::now(), STEP);
        assert_eq!(events.len(), 8);
        let commits: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.should_auto_commit)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(commits, vec![7]);
    }

    #[test]
    fn never_commits_again_for_same_result() {
        let mut s = stabilizer();
        let events = feed(&mut s, &result("64039900", "حذاء"), 30, Instant::now(), STEP);
        assert_eq!(events.iter().filter(|e| e.should_auto_commit).count(), 1);
    }

    #[test]
    fn never_commits_below_required_frames() {
        let mut s = stabilizer();
        let events = feed(&mut s, &result("64039900", "حذاء"), 7, Instant::now(), STEP);
        assert!(events.iter().all(|e| !e.should_auto_commit));
        assert_eq!(s.phase(), StabilizerPhase::Tracking);
    }

    #[test]
    fn throttled_calls_still_count_toward_stability() {
        let mut s = stabilizer();
        let r = result("64039900", "حذاء");
        let start = Instant::now();
        // Seven frames inside one throttle window: only the first is emitted.
        let early = feed(&mut s, &r, 7, start, Duration::from_millis(10));
        assert_eq!(early.len(), 1);
        assert_eq!(s.stable_count(), 7);

        let event = s.observe(r, start + Duration::from_millis(500)).unwrap();
        assert!(event.should_auto_commit);
    }

    #[test]
    fn calls_inside_interval_never_both_emit() {
        let mut s = stabilizer();
        let start = Instant::now();
        assert!(s.observe(result("1", "a"), start).is_some());
        assert!(s.observe(result("2", "b"), start + Duration::from_millis(149)).is_none());
        assert!(s.observe(result("3", "c"), start + Duration::from_millis(150)).is_some());
    }

    #[test]
    fn a_different_result_restarts_the_count() {
        let mut s = stabilizer();
        let start = Instant::now();
        feed(&mut s, &result("64039900", "حذاء"), 5, start, STEP);
        s.observe(result("39269090", "أدوات"), start + STEP * 5);
        assert_eq!(s.stable_count(), 1);

        let events = feed(&mut s, &result("64039900", "حذاء"), 7, start + STEP * 6, STEP);
        assert!(events.iter().all(|e| !e.should_auto_commit));
    }

    #[test]
    fn returning_to_committed_result_does_not_recommit() {
        let mut s = stabilizer();
        let a = result("64039900", "حذاء");
        let b = result("39269090", "أدوات");
        let start = Instant::now();
        let first = feed(&mut s, &a, 8, start, STEP);
        assert!(first.last().unwrap().should_auto_commit);

        // A brief glitch, then the same page again.
        s.observe(b, start + STEP * 8);
        let again = feed(&mut s, &a, 10, start + STEP * 9, STEP);
        assert!(again.iter().all(|e| !e.should_auto_commit));
    }

    #[test]
    fn empty_results_never_commit() {
        let mut s = stabilizer();
        let empty = ExtractionResult::new("", vec![]);
        let events = feed(&mut s, &empty, 20, Instant::now(), STEP);
        assert!(events.iter().all(|e| !e.should_auto_commit));
        assert_eq!(s.phase(), StabilizerPhase::Stable);
    }

    #[test]
    fn all_sentinel_items_have_no_signal() {
        let mut s = stabilizer();
        let r = ExtractionResult::new("", vec![ParsedItem::from_parts(None, None)]);
        let events = feed(&mut s, &r, 20, Instant::now(), STEP);
        assert!(events.iter().all(|e| !e.should_auto_commit));
    }

    #[test]
    fn partial_item_is_a_signal() {
        let mut s = stabilizer();
        let r = ExtractionResult::new("", vec![ParsedItem::from_parts(Some("64039900".into()), None)]);
        let events = feed(&mut s, &r, 8, Instant::now(), STEP);
        assert!(events.last().unwrap().should_auto_commit);
    }

    #[test]
    fn reset_returns_to_cold_and_allows_recommit() {
        let mut s = stabilizer();
        let r = result("64039900", "حذاء");
        let start = Instant::now();
        feed(&mut s, &r, 8, start, STEP);
        s.reset();
        assert_eq!(s.phase(), StabilizerPhase::Cold);
        assert_eq!(s.stable_count(), 0);

        let events = feed(&mut s, &r, 8, start + STEP * 8, STEP);
        assert_eq!(events.iter().filter(|e| e.should_auto_commit).count(), 1);
    }

    #[test]
    fn event_carries_display_text() {
        let mut s = stabilizer();
        let event = s.observe(result("64039900", "حذاء"), Instant::now()).unwrap();
        assert_eq!(event.display_text(), "1) HS: 64039900\n   Item: حذاء");
    }
}
