use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recognized speech segment, numbered by arrival order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub sequence_number: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationCounters {
    pub transcript_event_count: u64,
}

impl ConversationCounters {
    /// Increments the event count and returns the new value.
    pub fn record_event(&mut self) -> u64 {
        self.transcript_event_count = self.transcript_event_count.saturating_add(1);
        self.transcript_event_count
    }
}

/// Newline-joined accumulation of every utterance in the session.
///
/// Unbounded unless a character cap is configured, in which case whole lines are
/// evicted from the front until the text fits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    text: String,
    max_chars: Option<usize>,
}

impl Transcript {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { text: String::new(), max_chars }
    }

    pub fn append(&mut self, utterance: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(utterance);
        self.enforce_cap();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn enforce_cap(&mut self) {
        let Some(max_chars) = self.max_chars else {
            return;
        };

        while self.char_len() > max_chars {
            match self.text.find('\n') {
                Some(index) => {
                    self.text.drain(..=index);
                }
                None => {
                    // A single line longer than the cap keeps its most recent characters.
                    let overflow = self.char_len() - max_chars;
                    let cut = self
                        .text
                        .char_indices()
                        .nth(overflow)
                        .map(|(index, _)| index)
                        .unwrap_or(self.text.len());
                    self.text.drain(..cut);
                }
            }
        }
    }
}
