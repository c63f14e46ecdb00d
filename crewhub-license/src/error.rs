//! Error types for licensing operations.

use crewhub_ledger::LedgerError;
use crewhub_types::{ApplicationId, MigrationId};
use thiserror::Error;

/// Result type for licensing operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Errors that can occur during license operations.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The key text does not match the canonical format.
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The key is well-formed but has no active license behind it.
    #[error("license key is not valid")]
    InvalidKey,

    /// A caller-supplied field failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No application exists with this id.
    #[error("application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    /// The key does not resolve to an activatable license.
    #[error("no license found for this key")]
    LicenseNotFound,

    /// No migration request exists with this id.
    #[error("migration request not found: {0}")]
    MigrationNotFound(MigrationId),

    /// A pending application for the same machine and tier already exists.
    #[error("an application for this machine and tier is already pending")]
    DuplicateApplication,

    /// The license is bound to a different machine.
    #[error("license is bound to a different machine")]
    MachineMismatch,

    /// The machine has already consumed its one trial.
    #[error("trial has already been used on this machine")]
    TrialAlreadyUsed,

    /// The trial validity window has elapsed.
    #[error("trial period has expired")]
    TrialExpired,

    /// The request was already decided; decisions are terminal.
    #[error("request has already been processed")]
    AlreadyProcessed,

    /// The entitlement ledger failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
