use crate::anchor::normalize;
use crate::config::NameConfig;

/// Decides whether a line can be an item description rather than OCR noise
/// or a field label leaking into the region.
#[derive(Debug, Clone)]
pub struct NameFilter {
    min_chars: usize,
    min_script_letters: usize,
    script_first: char,
    script_last: char,
    blacklist: Vec<String>,
}

impl NameFilter {
    pub fn new(config: &NameConfig) -> Self {
        Self {
            min_chars: config.min_chars,
            min_script_letters: config.min_script_letters,
            script_first: config.script_first,
            script_last: config.script_last,
            blacklist: config
                .blacklist
                .iter()
                .map(|t| normalize(t))
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn is_meaningful(&self, text: &str) -> bool {
        let t = normalize(text);
        let len = t.chars().count();
        if len < self.min_chars {
            return false;
        }

        let letters = t
            .chars()
            .filter(|c| (self.script_first..=self.script_last).contains(c))
            .count();
        if letters < self.min_script_letters {
            return false;
        }

        let digits = t.chars().filter(|c| c.is_numeric()).count();
        if digits > len / 2 {
            return false;
        }

        !self.blacklist.iter().any(|term| t.contains(term.as_str()))
    }
}
