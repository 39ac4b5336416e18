//! Detection and masking of personally identifying text.
//!
//! Detection runs over the ordered item texts of one page because name
//! detection depends on the neighbouring items.

pub mod name;
pub mod national_id;

use serde::Serialize;

/// Which detector flagged an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiKind {
    NationalId,
    Name,
}

/// Per-item verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sensitivity {
    Clear,
    Sensitive { kind: PiiKind, masked: String },
}

impl Sensitivity {
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Sensitivity::Sensitive { .. })
    }

    pub fn masked_text(&self) -> Option<&str> {
        match self {
            Sensitivity::Sensitive { masked, .. } => Some(masked),
            Sensitivity::Clear => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PiiDetector {
    enabled: bool,
    keywords: Vec<String>,
}

impl Default for PiiDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PiiDetector {
    /// Detector with the built-in keyword vocabulary.
    pub fn new() -> Self {
        Self {
            enabled: true,
            keywords: name::DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// A detector that reports every item as clear.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            keywords: Vec::new(),
        }
    }

    /// Adds keywords to the vocabulary. Matching is case-insensitive.
    pub fn with_extra_keywords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for keyword in extra {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !self.keywords.contains(&keyword) {
                self.keywords.push(keyword);
            }
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Classifies every item of a page; the result is parallel to `texts`.
    ///
    /// A resident number match wins over a name match. Names are only
    /// accepted when a keyword sits close by, and a keyword is never taken
    /// for a name itself.
    pub fn detect(&self, texts: &[&str]) -> Vec<Sensitivity> {
        if !self.enabled {
            return vec![Sensitivity::Clear; texts.len()];
        }

        texts
            .iter()
            .enumerate()
            .map(|(index, text)| self.classify(texts, index, text))
            .collect()
    }

    fn classify(&self, texts: &[&str], index: usize, text: &str) -> Sensitivity {
        if national_id::contains(text) {
            return Sensitivity::Sensitive {
                kind: PiiKind::NationalId,
                masked: national_id::mask(text),
            };
        }

        let trimmed = text.trim();
        if let Some(found) = name::candidate(trimmed) {
            let is_keyword = self.keywords.iter().any(|k| k == found);
            if !is_keyword && name::has_keyword_nearby(texts, index, &self.keywords) {
                let rest = &trimmed[found.len()..];
                return Sensitivity::Sensitive {
                    kind: PiiKind::Name,
                    masked: format!("{}{}", name::mask_name(found), rest),
                };
            }
        }

        Sensitivity::Clear
    }
}
