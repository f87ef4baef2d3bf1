//! Time-of-Day Access Policy
//!
//! Stateless gate evaluated after a successful identity verification. Staff
//! pass at any hour; residents pass only inside the permitted daytime
//! window. Unrecognized roles fail closed.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Start of the resident access window, minutes since midnight (06:30)
pub const RESIDENT_ACCESS_START_MIN: u32 = 6 * 60 + 30;
/// End of the resident access window, minutes since midnight (20:30).
/// Both endpoints are inclusive.
pub const RESIDENT_ACCESS_END_MIN: u32 = 20 * 60 + 30;

/// Enrolled person category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Resident,
    Staff,
    /// Anything the personnel data carries that this policy does not know.
    /// Always denied.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Resident => write!(f, "resident"),
            Role::Staff => write!(f, "staff"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// Pass/deny result for one evaluation instant.
///
/// Recomputed on every call - never cached, since time advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: String,
}

/// Evaluate the access policy for a role at the given time of day.
pub fn evaluate(role: Role, time: NaiveTime) -> AccessDecision {
    let minutes = time.hour() * 60 + time.minute();
    match role {
        Role::Staff => AccessDecision {
            allowed: true,
            reason: "staff access is not time restricted".to_string(),
        },
        Role::Resident => {
            if (RESIDENT_ACCESS_START_MIN..=RESIDENT_ACCESS_END_MIN).contains(&minutes) {
                AccessDecision {
                    allowed: true,
                    reason: "within permitted hours".to_string(),
                }
            } else {
                AccessDecision {
                    allowed: false,
                    reason: "outside permitted hours".to_string(),
                }
            }
        }
        Role::Unknown => AccessDecision {
            allowed: false,
            reason: "unrecognized role".to_string(),
        },
    }
}
