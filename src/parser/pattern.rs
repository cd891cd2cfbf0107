use regex::Regex;

use crate::error::InvalidPatternError;

/// Compiled, immutable text filter. Built once per run and shared by reference.
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, InvalidPatternError> {
        let re = Regex::new(pattern).map_err(|source| InvalidPatternError {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { re })
    }

    /// True when the pattern occurs anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}
