//! Licensing for CrewHub.
//!
//! This crate owns the paid-tier entitlement flows:
//! - License applications and their admin review
//! - Key generation and parsing
//! - Activation binding keys to machine identities
//! - Trial issuance (one per machine, time-bounded)
//! - Machine migration with full history
//!
//! # Design Principles
//!
//! - **Ledger is truth**: every decision reads from and writes through
//!   the [`EntitlementStore`](crewhub_ledger::EntitlementStore); services
//!   hold no state of their own
//! - **Keys never expire**: purchased licenses live until migrated;
//!   only trials carry a validity window
//! - **History over mutation**: migration issues a new key and retires
//!   the old record instead of rebinding it
//! - **Offline-first**: no network calls anywhere in this crate; payment
//!   and notification are seams the host wires up
//!
//! # License Key Format
//!
//! Keys are formatted as `CCC-XXXX-XXXX-XXXX-XXXX`: a three-letter tier
//! code followed by four groups of four uppercase hex characters drawn
//! from a salted SHA-256 digest. The ledger stores only the SHA-256 hash
//! of the canonical text.

mod activation;
mod application;
mod config;
mod error;
mod key;
mod machine;
mod migration;
mod notify;

pub use activation::{Activation, ActivationService, TrialActivation, ValidatedLicense};
pub use application::{
    ApplicationEdit, ApplicationWorkflow, ApprovedApplication, PaymentStatusSource,
    SubmitApplication,
};
pub use config::LicenseConfig;
pub use error::{LicenseError, LicenseResult};
pub use key::{is_valid_format, LicenseKey, GROUP_LEN, KEY_GROUPS};
pub use machine::{LocalMachine, MachineIdentityProvider, MachineInfo};
pub use migration::{MigrationDecision, MigrationOutcome, MigrationService};
pub use notify::{NoopNotifier, NotificationSender};
