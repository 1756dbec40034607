use regex::Regex;

use crate::errors::DomainError;

pub const DEFAULT_ADDRESSED_HEADER: &str = "Addressed Questions";
pub const DEFAULT_UNADDRESSED_HEADER: &str = "Unaddressed Questions";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuidanceSections {
    pub addressed: String,
    pub unaddressed: String,
    /// `false` when the headers were missing and the raw text fills both sections.
    pub matched: bool,
}

pub trait ResponseExtractor: Send + Sync {
    fn template_name(&self) -> &str;
    fn extract(&self, raw: &str) -> GuidanceSections;
}

/// Extractor for answers shaped as `<addressed header> … <unaddressed header> …`.
#[derive(Clone, Debug)]
pub struct TwoSectionExtractor {
    pattern: Regex,
}

impl TwoSectionExtractor {
    pub fn new(addressed_header: &str, unaddressed_header: &str) -> Result<Self, DomainError> {
        let addressed = addressed_header.trim();
        let unaddressed = unaddressed_header.trim();
        if addressed.is_empty() || unaddressed.is_empty() || addressed == unaddressed {
            return Err(DomainError::InvalidGuidanceHeaders);
        }

        let pattern = format!(
            r"(?s){}(.*?){}(.*)",
            regex::escape(addressed),
            regex::escape(unaddressed)
        );
        let pattern = Regex::new(&pattern)
            .map_err(|error| DomainError::InvariantViolation(error.to_string()))?;
        Ok(Self { pattern })
    }
}

impl Default for TwoSectionExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESSED_HEADER, DEFAULT_UNADDRESSED_HEADER)
            .expect("default guidance headers form a valid pattern")
    }
}

impl ResponseExtractor for TwoSectionExtractor {
    fn template_name(&self) -> &str {
        "two_section"
    }

    fn extract(&self, raw: &str) -> GuidanceSections {
        match self.pattern.captures(raw) {
            Some(captures) => GuidanceSections {
                addressed: captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                unaddressed: captures.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                matched: true,
            },
            None => GuidanceSections {
                addressed: raw.to_string(),
                unaddressed: raw.to_string(),
                matched: false,
            },
        }
    }
}
