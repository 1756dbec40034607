use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Decides, per utterance count, which re-evaluation paths fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceController {
    guidance_every: u64,
    recommendation_every: u64,
    min_transcript_chars: usize,
}

impl Default for CadenceController {
    fn default() -> Self {
        Self { guidance_every: 2, recommendation_every: 4, min_transcript_chars: 150 }
    }
}

impl CadenceController {
    pub fn new(
        guidance_every: u64,
        recommendation_every: u64,
        min_transcript_chars: usize,
    ) -> Result<Self, DomainError> {
        if guidance_every == 0 || recommendation_every == 0 {
            return Err(DomainError::InvalidCadence {
                guidance_every,
                recommendation_every,
            });
        }
        Ok(Self { guidance_every, recommendation_every, min_transcript_chars })
    }

    pub fn should_trigger_guidance(&self, count: u64) -> bool {
        count % self.guidance_every == 0
    }

    /// The transcript must be strictly longer than the configured minimum.
    pub fn should_trigger_recommendation(
        &self,
        count: u64,
        transcript_len: usize,
        enabled: bool,
    ) -> bool {
        enabled
            && count % self.recommendation_every == 0
            && transcript_len > self.min_transcript_chars
    }
}

/// Single-slot lock around recommendation generation.
#[derive(Clone, Debug, Default)]
pub struct RecommendationGate {
    generating: Arc<AtomicBool>,
}

impl RecommendationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` while another generation holds the gate.
    pub fn try_acquire(&self) -> Option<RecommendationPermit> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RecommendationPermit { generating: Arc::clone(&self.generating) })
    }

    pub fn is_held(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped, on every exit path.
#[derive(Debug)]
pub struct RecommendationPermit {
    generating: Arc<AtomicBool>,
}

impl Drop for RecommendationPermit {
    fn drop(&mut self) {
        self.generating.store(false, Ordering::Release);
    }
}
