//! Core type definitions for the CrewHub entitlement engine.
//!
//! This crate defines the types shared by the ledger and the licensing
//! services:
//! - Application and migration identifiers (UUID v7), machine identities
//! - The tier catalog (five fixed tiers with static capability limits)
//! - Application / payment / migration status enums
//! - The three persisted record types (applications, active licenses,
//!   migration requests)
//!
//! Presentation concerns (forms, dialogs, email bodies) do not belong here.

mod ids;
mod records;
mod status;
mod tier;

pub use ids::{ApplicationId, MachineId, MigrationId};
pub use records::{ActiveLicense, LicenseApplication, MigrationRequest};
pub use status::{
    ApplicationOrigin, ApplicationStatus, InvalidStatus, MigrationStatus, PaymentStatus,
};
pub use tier::{Tier, TierLimits, UnknownTier, UNLIMITED};
