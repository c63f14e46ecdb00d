//! The three persisted record types of the entitlement ledger.
//!
//! The ledger exclusively owns these records once persisted; services
//! operate on copies and route every mutation back through the store.

use crate::ids::{ApplicationId, MachineId, MigrationId};
use crate::status::{ApplicationOrigin, ApplicationStatus, MigrationStatus, PaymentStatus};
use crate::tier::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A license application: submitted by an applicant and reviewed by an
/// administrator. Records are never physically deleted, only
/// status-transitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseApplication {
    pub id: ApplicationId,
    pub machine_id: MachineId,
    pub name: String,
    pub company: String,
    pub email: String,
    pub tier: Tier,
    pub status: ApplicationStatus,
    pub payment: PaymentStatus,
    pub origin: ApplicationOrigin,
    pub created_at: DateTime<Utc>,
    /// Set when an administrator processes the application.
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    /// Issued license key; None until approved.
    pub license_key: Option<String>,
    /// Content hash of the issued key.
    pub key_hash: Option<String>,
    pub notes: String,
    /// Set when the license issued for this application was migrated to a
    /// new machine; points at the replacement application.
    pub migrated_to: Option<ApplicationId>,
    pub migration_reason: Option<String>,
}

impl LicenseApplication {
    /// Creates a fresh purchase application: pending review, unpaid.
    pub fn new(
        machine_id: MachineId,
        name: impl Into<String>,
        company: impl Into<String>,
        email: impl Into<String>,
        tier: Tier,
    ) -> Self {
        Self {
            id: ApplicationId::new(),
            machine_id,
            name: name.into(),
            company: company.into(),
            email: email.into(),
            tier,
            status: ApplicationStatus::Pending,
            payment: PaymentStatus::Unpaid,
            origin: ApplicationOrigin::Purchase,
            created_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            license_key: None,
            key_hash: None,
            notes: String::new(),
            migrated_to: None,
            migration_reason: None,
        }
    }

    /// Creates a trial-origin application: auto-approved and auto-paid,
    /// with no applicant identity attached.
    pub fn trial(machine_id: MachineId, tier: Tier) -> Self {
        Self {
            status: ApplicationStatus::Approved,
            payment: PaymentStatus::Paid,
            origin: ApplicationOrigin::Trial,
            ..Self::new(machine_id, "Trial", "", "", tier)
        }
    }

    /// True once the license issued here was transferred to another machine.
    #[must_use]
    pub fn is_migrated(&self) -> bool {
        self.migrated_to.is_some()
    }

    /// True if the issued key may currently be activated: approved, paid,
    /// and not migrated away.
    #[must_use]
    pub fn is_activatable(&self) -> bool {
        self.status == ApplicationStatus::Approved
            && self.payment == PaymentStatus::Paid
            && !self.is_migrated()
    }
}

/// The record asserting that a key is currently bound to a machine.
///
/// Content-addressed by the key hash: at most one record per hash, and the
/// hash maps to exactly one machine identity while `active` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLicense {
    /// Plaintext key, kept for display; never the lookup identity.
    pub key: String,
    /// Content hash of the key; the storage identity.
    pub key_hash: String,
    pub machine_id: MachineId,
    pub email: String,
    pub company: String,
    pub tier: Tier,
    pub activated_at: DateTime<Utc>,
    pub last_validated_at: DateTime<Utc>,
    /// Number of successful runtime validations.
    pub validations: i64,
    /// Flipped to false when the license is retired by a migration.
    pub active: bool,
    /// The application this license was issued for.
    pub application_id: ApplicationId,
}

impl ActiveLicense {
    /// Creates a freshly bound license record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        key_hash: impl Into<String>,
        machine_id: MachineId,
        email: impl Into<String>,
        company: impl Into<String>,
        tier: Tier,
        application_id: ApplicationId,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            key_hash: key_hash.into(),
            machine_id,
            email: email.into(),
            company: company.into(),
            tier,
            activated_at: now,
            last_validated_at: now,
            validations: 0,
            active: true,
            application_id,
        }
    }
}

/// A request to transfer an active license to a new machine identity.
/// Terminal once processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub id: MigrationId,
    pub old_key: String,
    pub old_machine_id: MachineId,
    pub new_machine_id: MachineId,
    pub email: String,
    pub company: String,
    pub reason: String,
    pub status: MigrationStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    /// Key minted for the new machine; None until approved.
    pub new_key: Option<String>,
    /// Application created for the new machine; None until approved.
    pub new_application_id: Option<ApplicationId>,
    pub notes: Option<String>,
}

impl MigrationRequest {
    /// Creates a pending migration request.
    pub fn new(
        old_key: impl Into<String>,
        old_machine_id: MachineId,
        new_machine_id: MachineId,
        email: impl Into<String>,
        company: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: MigrationId::new(),
            old_key: old_key.into(),
            old_machine_id,
            new_machine_id,
            email: email.into(),
            company: company.into(),
            reason: reason.into(),
            status: MigrationStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            new_key: None,
            new_application_id: None,
            notes: None,
        }
    }

    /// True while the request still awaits an administrator decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == MigrationStatus::Pending
    }
}
