use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Every tunable of the scanning pipeline. Any subset may be overridden from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub stabilizer: StabilizerConfig,
    pub anchors: AnchorConfig,
    pub names: NameConfig,
    pub layout: LayoutConfig,
    pub pipeline: PipelineConfig,
}

impl ScanConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ScanConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stabilizer.required_stable_frames == 0 {
            return Err(ConfigError::Invalid("required_stable_frames must be at least 1".into()));
        }
        if self.anchors.item_field_index >= self.anchors.last_field_index {
            return Err(ConfigError::Invalid(format!(
                "item_field_index ({}) must be below last_field_index ({})",
                self.anchors.item_field_index, self.anchors.last_field_index
            )));
        }
        if self.anchors.tariff_label_stem.trim().is_empty() {
            return Err(ConfigError::Invalid("tariff_label_stem must not be empty".into()));
        }
        if self.names.script_first > self.names.script_last {
            return Err(ConfigError::Invalid(format!(
                "script range '{}'..'{}' is inverted",
                self.names.script_first, self.names.script_last
            )));
        }
        if self.pipeline.completion_capacity == 0 {
            return Err(ConfigError::Invalid("completion_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Consecutive identical extractions before a result counts as stable.
    pub required_stable_frames: u32,
    /// Minimum spacing between two emitted events.
    pub min_emit_interval_ms: u64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { required_stable_frames: 8, min_emit_interval_ms: 150 }
    }
}

impl StabilizerConfig {
    pub fn min_emit_interval(&self) -> Duration {
        Duration::from_millis(self.min_emit_interval_ms)
    }
}

/// Field labels printed on the declaration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// Box number of the goods description field.
    pub item_field_index: u32,
    /// Highest box number on the form.
    pub last_field_index: u32,
    pub tariff_label_stem: String,
    pub tariff_label_variants: Vec<String>,
    pub item_designation_labels: Vec<String>,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            item_field_index: 31,
            last_field_index: 54,
            tariff_label_stem: "البند".into(),
            tariff_label_variants: vec!["التعريفي".into(), "التعريف".into(), "التعريفة".into()],
            item_designation_labels: vec!["تسمية السلعة".into(), "التسمية".into()],
        }
    }
}

/// Rules for telling an item description apart from noise and leaked labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameConfig {
    pub min_chars: usize,
    pub min_script_letters: usize,
    pub script_first: char,
    pub script_last: char,
    pub blacklist: Vec<String>,
    /// Minimum length for the last-resort name in text-only parsing.
    pub fallback_min_chars: usize,
    /// Lines searched after the tariff code in text-only parsing.
    pub fallback_window_lines: usize,
}

impl Default for NameConfig {
    fn default() -> Self {
        Self {
            min_chars: 4,
            min_script_letters: 3,
            script_first: 'ء',
            script_last: 'ي',
            blacklist: [
                "البند", "الرقم", "قيمة", "وزن", "عدد", "مستند", "النقل", "الوضع", "منشأ", "وحدات",
                "إضافية",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fallback_min_chars: 10,
            fallback_window_lines: 5,
        }
    }
}

/// Pixel margins used to carve a page into per-item regions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub segment_top_margin: i32,
    pub next_anchor_margin: i32,
    pub min_segment_height: i32,
    pub trailing_window: i32,
    pub segment_left_margin: i32,
    pub segment_right_margin: i32,
    pub name_left_margin: i32,
    pub name_gap: i32,
    pub code_window: i32,
    pub column_slack: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            segment_top_margin: 80,
            next_anchor_margin: 40,
            min_segment_height: 300,
            trailing_window: 1600,
            segment_left_margin: 500,
            segment_right_margin: 2500,
            name_left_margin: 150,
            name_gap: 5,
            code_window: 450,
            column_slack: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub completion_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { completion_capacity: 4 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ScanConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stabilizer.required_stable_frames, 8);
        assert_eq!(config.stabilizer.min_emit_interval(), Duration::from_millis(150));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = ScanConfig::from_toml(
            r#"
            [stabilizer]
            required_stable_frames = 3

            [layout]
            code_window = 600
            "#,
        )
        .unwrap();
        assert_eq!(config.stabilizer.required_stable_frames, 3);
        assert_eq!(config.stabilizer.min_emit_interval_ms, 150);
        assert_eq!(config.layout.code_window, 600);
        assert_eq!(config.layout.trailing_window, 1600);
        assert_eq!(config.anchors.item_field_index, 31);
    }

    #[test]
    fn script_range_parses_from_strings() {
        let config = ScanConfig::from_toml(
            r#"
            [names]
            script_first = "a"
            script_last = "z"
            blacklist = ["weight"]
            "#,
        )
        .unwrap();
        assert_eq!(config.names.script_first, 'a');
        assert_eq!(config.names.blacklist, vec!["weight".to_string()]);
    }

    #[test]
    fn rejects_zero_stable_frames() {
        let err = ScanConfig::from_toml("[stabilizer]\nrequired_stable_frames = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_item_index_above_last() {
        let err = ScanConfig::from_toml("[anchors]\nitem_field_index = 60").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ScanConfig::from_toml("[stabilizer\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ncompletion_capacity = 2").unwrap();
        let config = ScanConfig::load(file.path()).unwrap();
        assert_eq!(config.pipeline.completion_capacity, 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScanConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
