//! Compliance status and trajectory enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Compliance status of a covenant measurement, covenant or loan.
///
/// Statuses are ordered by precedence: `Breach > Warning > Compliant > Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplianceStatus {
    /// Threshold satisfied with margin.
    Compliant,
    /// Threshold satisfied but inside the warning band.
    Warning,
    /// Threshold violated.
    Breach,
    /// No threshold defined, or no measurement yet.
    Unknown,
}

impl ComplianceStatus {
    /// Every status, in display order.
    pub const ALL: [ComplianceStatus; 4] = [
        ComplianceStatus::Compliant,
        ComplianceStatus::Warning,
        ComplianceStatus::Breach,
        ComplianceStatus::Unknown,
    ];

    /// Precedence rank used to find the worst status.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            ComplianceStatus::Unknown => 0,
            ComplianceStatus::Compliant => 1,
            ComplianceStatus::Warning => 2,
            ComplianceStatus::Breach => 3,
        }
    }

    /// Returns the worse of two statuses.
    #[must_use]
    pub fn worst(self, other: ComplianceStatus) -> ComplianceStatus {
        if other.precedence() > self.precedence() {
            other
        } else {
            self
        }
    }

    /// Worst status over an iterator; `Unknown` when empty.
    pub fn worst_of<I>(statuses: I) -> ComplianceStatus
    where
        I: IntoIterator<Item = ComplianceStatus>,
    {
        statuses
            .into_iter()
            .fold(ComplianceStatus::Unknown, ComplianceStatus::worst)
    }

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::Warning => "warning",
            ComplianceStatus::Breach => "breach",
            ComplianceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compliant" => Ok(ComplianceStatus::Compliant),
            "warning" => Ok(ComplianceStatus::Warning),
            "breach" => Ok(ComplianceStatus::Breach),
            "unknown" => Ok(ComplianceStatus::Unknown),
            _ => Err(CoreError::invalid_enum("compliance status", s)),
        }
    }
}

/// Direction of a covenant's measured value relative to its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trajectory {
    /// Moving away from the breach side.
    Improving,
    /// Change within the noise floor.
    Stable,
    /// Moving toward the breach side.
    Deteriorating,
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trajectory::Improving => "improving",
            Trajectory::Stable => "stable",
            Trajectory::Deteriorating => "deteriorating",
        })
    }
}
