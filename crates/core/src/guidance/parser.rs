use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::domain::guidance::{GuidanceTask, ParsedGuidance, TaskStatus};
use crate::errors::DomainError;
use crate::guidance::extractor::{ResponseExtractor, TwoSectionExtractor};

struct LineRules {
    ordinal: Regex,
    answer: Regex,
}

fn line_rules() -> &'static LineRules {
    static RULES: OnceLock<LineRules> = OnceLock::new();
    RULES.get_or_init(|| LineRules {
        ordinal: Regex::new(r"^\d+\.\s+").expect("valid ordinal pattern"),
        // First hyphen between two non-hyphen characters separates question from answer,
        // spaced or not. Rules like "---" never split. A question that itself contains a
        // hyphen ("long-term") is mis-split; that limitation is kept.
        answer: Regex::new(r"^(.*?[^\s-])\s*-\s*([^\s-].*)$").expect("valid answer pattern"),
    })
}

#[derive(Clone)]
pub struct GuidanceParser {
    extractor: Arc<dyn ResponseExtractor>,
}

impl Default for GuidanceParser {
    fn default() -> Self {
        Self::new(Arc::new(TwoSectionExtractor::default()))
    }
}

impl std::fmt::Debug for GuidanceParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuidanceParser")
            .field("extractor", &self.extractor.template_name())
            .finish()
    }
}

impl GuidanceParser {
    pub fn new(extractor: Arc<dyn ResponseExtractor>) -> Self {
        Self { extractor }
    }

    pub fn with_headers(
        addressed_header: &str,
        unaddressed_header: &str,
    ) -> Result<Self, DomainError> {
        let extractor = TwoSectionExtractor::new(addressed_header, unaddressed_header)?;
        Ok(Self::new(Arc::new(extractor)))
    }

    pub fn template_name(&self) -> &str {
        self.extractor.template_name()
    }

    /// Addressed questions become completed tasks, unaddressed ones pending.
    ///
    /// Without recognizable headers the whole text feeds both buckets.
    pub fn parse(&self, raw: &str) -> ParsedGuidance {
        let sections = self.extractor.extract(raw);
        ParsedGuidance {
            completed: split_tasks(&sections.addressed, TaskStatus::Completed),
            pending: split_tasks(&sections.unaddressed, TaskStatus::Pending),
        }
    }
}

pub fn split_tasks(section: &str, status: TaskStatus) -> Vec<GuidanceTask> {
    let rules = line_rules();

    section
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| rules.ordinal.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| {
            let (question_text, answer_text) = match rules.answer.captures(&line) {
                Some(captures) => (
                    captures[1].trim().to_string(),
                    Some(captures[2].trim().to_string()),
                ),
                None => (line.clone(), None),
            };

            GuidanceTask {
                id: format!("{}-{}", status.as_str(), index + 1),
                question_text,
                status,
                answer_text,
            }
        })
        .collect()
}
