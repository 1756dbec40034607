use chrono::Utc;

use crate::domain::alert::{AlertId, AlertPriority, RecommendationAlert};

const HIGH_PRIORITY_KEYWORDS: [&str; 3] = ["urgent", "immediate", "critical"];
const LOW_PRIORITY_KEYWORDS: [&str; 2] = ["consider", "potential"];

/// Case-insensitive keyword scan; high-priority words win over low-priority ones.
pub fn classify(content: &str) -> AlertPriority {
    let normalized = content.to_lowercase();
    if HIGH_PRIORITY_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        AlertPriority::High
    } else if LOW_PRIORITY_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        AlertPriority::Low
    } else {
        AlertPriority::Medium
    }
}

/// Most-recent-first alert history with read tracking and a transient banner flag.
#[derive(Clone, Debug, Default)]
pub struct RecommendationAlertManager {
    history: Vec<RecommendationAlert>,
    unread_count: usize,
    show_alert: bool,
    history_limit: Option<usize>,
}

impl RecommendationAlertManager {
    pub fn new(history_limit: Option<usize>) -> Self {
        Self { history_limit, ..Self::default() }
    }

    pub fn record(
        &mut self,
        content: impl Into<String>,
        priority: AlertPriority,
    ) -> RecommendationAlert {
        let alert = RecommendationAlert {
            id: AlertId::generate(),
            content: content.into(),
            timestamp: Utc::now(),
            is_read: false,
            priority,
        };

        self.history.insert(0, alert.clone());
        self.unread_count += 1;
        self.show_alert = true;

        if let Some(limit) = self.history_limit {
            if self.history.len() > limit {
                self.history.truncate(limit);
                self.unread_count = self.count_unread();
            }
        }

        alert
    }

    /// Returns whether an unread alert with this id was flipped to read.
    pub fn mark_read(&mut self, id: &AlertId) -> bool {
        let Some(alert) = self.history.iter_mut().find(|alert| &alert.id == id) else {
            return false;
        };
        if alert.is_read {
            return false;
        }

        alert.is_read = true;
        self.unread_count = self.unread_count.saturating_sub(1);
        true
    }

    pub fn mark_all_read(&mut self) {
        for alert in &mut self.history {
            alert.is_read = true;
        }
        self.unread_count = 0;
    }

    pub fn hide_alert(&mut self) {
        self.show_alert = false;
    }

    pub fn is_alert_visible(&self) -> bool {
        self.show_alert
    }

    pub fn unread_count(&self) -> usize {
        self.unread_count
    }

    pub fn history(&self) -> &[RecommendationAlert] {
        &self.history
    }

    pub fn latest(&self) -> Option<&RecommendationAlert> {
        self.history.first()
    }

    fn count_unread(&self) -> usize {
        self.history.iter().filter(|alert| !alert.is_read).count()
    }
}
