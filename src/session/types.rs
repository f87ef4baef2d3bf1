//! Session-level types: phases, outcomes, progress reporting.

use crate::personnel::PersonRecord;
use crate::policy::AccessDecision;
use crate::verifier::VerificationOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Phases of one detection cycle.
///
/// Terminal phases loop back to `Idle`; there is no error state - failures
/// resolve to a completed rejected outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Detecting,
    Collecting,
    Analyzing,
    Identifying,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Detecting => write!(f, "detecting"),
            SessionPhase::Collecting => write!(f, "collecting"),
            SessionPhase::Analyzing => write!(f, "analyzing"),
            SessionPhase::Identifying => write!(f, "identifying"),
        }
    }
}

/// Final result of one verification session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Identity verified and enrolled; carries the time-policy decision
    Verified {
        person: PersonRecord,
        verification: VerificationOutcome,
        decision: AccessDecision,
    },
    /// The batch did not agree on one identity (or no usable classification)
    Rejected {
        verification: VerificationOutcome,
        reason: String,
    },
    /// Identity verified, but no person record is enrolled for it
    UnknownPerson {
        label: String,
        verification: VerificationOutcome,
    },
}

impl SessionOutcome {
    /// The verification detail carried by every variant
    pub fn verification(&self) -> &VerificationOutcome {
        match self {
            SessionOutcome::Verified { verification, .. } => verification,
            SessionOutcome::Rejected { verification, .. } => verification,
            SessionOutcome::UnknownPerson { verification, .. } => verification,
        }
    }
}

/// Progress update for UI feedback. Purely observational - observers never
/// affect control flow.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub phase: SessionPhase,
    pub percent: f32,
    pub message: String,
}

/// Observer of session progress
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: ProgressUpdate);
}

/// Phase timing for one controller.
///
/// Durations are plain configuration so the state machine's transitions
/// stay deterministic (zero in tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long the Detecting phase waits for a subject
    #[serde(with = "crate::config::duration_millis")]
    pub detect_duration: Duration,
    /// Pause between image acquisitions in the Collecting phase
    #[serde(with = "crate::config::duration_millis")]
    pub collect_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            detect_duration: Duration::from_secs(2),
            collect_interval: Duration::from_millis(300),
        }
    }
}
