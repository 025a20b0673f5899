//! Chip work-queue status values and the transitions allowed between them.
//!
//! ```text
//!   pending --activate--> active --label--> labeled
//!      ^                    |                  |
//!      +------release-------+                  |
//!                           ^------reopen------+
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_LABELED: &str = "labeled";

/// All valid status strings, in lifecycle order.
const VALID_STATUS_STRINGS: &[&str] = &[STATUS_PENDING, STATUS_ACTIVE, STATUS_LABELED];

/// Work-queue status of a single chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipStatus {
    Pending,
    Active,
    Labeled,
}

impl ChipStatus {
    /// Return the status as stored in the tracker's `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => STATUS_PENDING,
            Self::Active => STATUS_ACTIVE,
            Self::Labeled => STATUS_LABELED,
        }
    }
}

impl FromStr for ChipStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            STATUS_PENDING => Ok(Self::Pending),
            STATUS_ACTIVE => Ok(Self::Active),
            STATUS_LABELED => Ok(Self::Labeled),
            _ => Err(CoreError::Validation(format!(
                "Invalid chip status '{s}'. Must be one of: {}",
                VALID_STATUS_STRINGS.join(", ")
            ))),
        }
    }
}

impl fmt::Display for ChipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named edge of the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipTransition {
    /// Selected as the next chip to work on.
    Activate,
    /// Labels were submitted.
    Label,
    /// Returned to the pool without labels (go back, exit, stale recovery).
    Release,
    /// A labeled chip is brought back for redoing.
    Reopen,
}

impl ChipTransition {
    /// The status a chip must currently have for this transition to apply.
    pub fn source(self) -> &'static [ChipStatus] {
        match self {
            Self::Activate => &[ChipStatus::Pending],
            Self::Label | Self::Release => &[ChipStatus::Active],
            // Reopen also accepts a chip that was released but never labeled.
            Self::Reopen => &[ChipStatus::Labeled, ChipStatus::Pending],
        }
    }

    pub fn target(self) -> ChipStatus {
        match self {
            Self::Activate | Self::Reopen => ChipStatus::Active,
            Self::Label => ChipStatus::Labeled,
            Self::Release => ChipStatus::Pending,
        }
    }

    /// Apply the transition to `current`, returning the new status.
    pub fn apply(self, current: ChipStatus) -> Result<ChipStatus, CoreError> {
        if self.source().contains(&current) {
            Ok(self.target())
        } else {
            Err(CoreError::Conflict(format!(
                "Cannot {self:?} a chip whose status is '{current}'"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn status_round_trip_through_strings() {
        for status in [ChipStatus::Pending, ChipStatus::Active, ChipStatus::Labeled] {
            assert_eq!(status.as_str().parse::<ChipStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        let err = "done".parse::<ChipStatus>().unwrap_err();
        assert!(err.to_string().contains("Invalid chip status 'done'"));
    }

    #[test]
    fn status_parse_is_case_sensitive() {
        assert!("Pending".parse::<ChipStatus>().is_err());
        assert!("".parse::<ChipStatus>().is_err());
    }

    #[test]
    fn activate_requires_pending() {
        assert_eq!(
            ChipTransition::Activate.apply(ChipStatus::Pending).unwrap(),
            ChipStatus::Active
        );
        assert_matches!(
            ChipTransition::Activate.apply(ChipStatus::Labeled),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn label_and_release_require_active() {
        assert_eq!(
            ChipTransition::Label.apply(ChipStatus::Active).unwrap(),
            ChipStatus::Labeled
        );
        assert_eq!(
            ChipTransition::Release.apply(ChipStatus::Active).unwrap(),
            ChipStatus::Pending
        );
        assert!(ChipTransition::Label.apply(ChipStatus::Pending).is_err());
        assert!(ChipTransition::Release.apply(ChipStatus::Labeled).is_err());
    }

    #[test]
    fn reopen_brings_labeled_back_to_active() {
        assert_eq!(
            ChipTransition::Reopen.apply(ChipStatus::Labeled).unwrap(),
            ChipStatus::Active
        );
        assert!(ChipTransition::Reopen.apply(ChipStatus::Active).is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(ChipStatus::Labeled).unwrap(),
            serde_json::json!("labeled")
        );
    }
}
