//! Call value objects

use crate::domain::shared::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallDirection {
    /// Call received from an external party
    Inbound,
    /// Call placed to an external party
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "INBOUND",
            CallDirection::Outbound => "OUTBOUND",
        }
    }
}

impl FromStr for CallDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INBOUND" => Ok(CallDirection::Inbound),
            "OUTBOUND" => Ok(CallDirection::Outbound),
            other => Err(DomainError::InvalidRequest(format!(
                "The call direction must be INBOUND or OUTBOUND not {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallStatus {
    /// Call is in progress; both numbers are busy
    Active,
    /// Call has completed (terminal)
    Ended,
}

impl CallStatus {
    /// Check if state transition is valid
    pub fn can_transition_to(&self, new_status: &CallStatus) -> bool {
        matches!((self, new_status), (CallStatus::Active, CallStatus::Ended))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Active => "ACTIVE",
            CallStatus::Ended => "ENDED",
        }
    }
}

impl FromStr for CallStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(CallStatus::Active),
            "ENDED" => Ok(CallStatus::Ended),
            other => Err(DomainError::InvalidRequest(format!(
                "The call status must be ACTIVE or ENDED not {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
