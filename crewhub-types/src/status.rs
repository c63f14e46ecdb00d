//! Status enums for the entitlement ledger.
//!
//! Review status and payment status are deliberately separate axes: an
//! application can be approved while payment is still pending, and marking
//! it paid never touches the review decision.
//!
//! Parsing is strict. A status value the engine does not recognize is a
//! corrupt ledger row, never something to default around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A persisted status value was not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid status value: {0}")]
pub struct InvalidStatus(pub String);

/// Review state of a license application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// Submitted, awaiting an administrator decision.
    Pending,
    /// Approved; a license key has been issued.
    Approved,
    /// Rejected by an administrator.
    Rejected,
}

/// Payment state of a license application. Independent of review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No payment has been initiated.
    Unpaid,
    /// Payment initiated but not yet confirmed by the processor.
    Pending,
    /// Payment confirmed.
    Paid,
}

/// State of a machine-migration request. Terminal once processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    Pending,
    Approved,
    Rejected,
}

/// How a license application came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationOrigin {
    /// Submitted by an applicant through the purchase flow.
    Purchase,
    /// Created by the one-time trial activation.
    Trial,
    /// Created by an approved machine migration.
    Migration,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ApplicationStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unpaid => "unpaid",
            Self::Pending => "pending",
            Self::Paid => "paid",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PaymentStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl FromStr for MigrationStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ApplicationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Purchase => "purchase",
            Self::Trial => "trial",
            Self::Migration => "migration",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ApplicationOrigin {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(Self::Purchase),
            "trial" => Ok(Self::Trial),
            "migration" => Ok(Self::Migration),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}
