// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod anchor;
pub mod config;
pub mod extract;
pub mod names;
pub mod pipeline;
pub mod recognizer;
pub mod stabilizer;
pub mod text_parser;

pub use anchor::{normalize, AnchorKind, AnchorMatcher};
pub use config::{ConfigError, ScanConfig};
pub use extract::FieldExtractor;
pub use names::NameFilter;
pub use pipeline::{Recognition, RecognitionDriver, ScanSession, Submission};
pub use recognizer::{Frame, MockRecognizer, OcrError, RecognitionBackend};
pub use stabilizer::{StabilizedEvent, Stabilizer, StabilizerPhase};
pub use text_parser::{ParsedFields, TextParser};
