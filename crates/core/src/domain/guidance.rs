use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

/// A discovery question derived from one line of a guidance response.
///
/// Identity is positional: ids are regenerated on every guidance refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceTask {
    pub id: String,
    pub question_text: String,
    pub status: TaskStatus,
    pub answer_text: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedGuidance {
    pub completed: Vec<GuidanceTask>,
    pub pending: Vec<GuidanceTask>,
}

/// The live guidance slot shown to the advisor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidanceBoard {
    pub completed: Vec<GuidanceTask>,
    pub pending: Vec<GuidanceTask>,
    pub notice: Option<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl GuidanceBoard {
    pub fn replace(&mut self, parsed: ParsedGuidance, generated_at: DateTime<Utc>) {
        self.completed = parsed.completed;
        self.pending = parsed.pending;
        self.notice = None;
        self.generated_at = Some(generated_at);
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}
