//! Machine migration workflow.
//!
//! Moves an active license from one machine identity to another through
//! an admin-reviewed request. Approval never edits the old binding in
//! place: it issues a brand-new key bound to the new machine, retires the
//! old one, and leaves the full history in the ledger. All five record
//! changes commit in a single transaction.

use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;
use crate::notify::{NoopNotifier, NotificationSender};
use chrono::Utc;
use crewhub_ledger::EntitlementStore;
use crewhub_types::{
    ActiveLicense, ApplicationOrigin, ApplicationStatus, LicenseApplication, MachineId,
    MigrationId, MigrationRequest, MigrationStatus, PaymentStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Administrator decision on a migration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDecision {
    Approve,
    Reject,
}

/// Outcome of processing a migration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationOutcome {
    /// The license moved: a new key now binds the new machine and the old
    /// key is retired.
    Approved {
        request: MigrationRequest,
        new_key: LicenseKey,
        new_application: LicenseApplication,
        new_license: ActiveLicense,
    },
    /// The request was declined; the old binding is untouched.
    Rejected { request: MigrationRequest },
}

impl MigrationOutcome {
    /// Returns the processed request record.
    #[must_use]
    pub fn request(&self) -> &MigrationRequest {
        match self {
            Self::Approved { request, .. } | Self::Rejected { request } => request,
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved { new_license, .. } => write!(
                f,
                "migration approved; new key issued for machine {}",
                new_license.machine_id
            ),
            Self::Rejected { .. } => f.write_str("migration rejected"),
        }
    }
}

/// Service coordinating license moves between machines.
pub struct MigrationService {
    store: Arc<EntitlementStore>,
    notifier: Arc<dyn NotificationSender>,
}

impl MigrationService {
    /// Creates a migration service with no notification delivery.
    pub fn new(store: Arc<EntitlementStore>) -> Self {
        Self::with_notifier(store, Arc::new(NoopNotifier))
    }

    /// Creates a migration service that reports decisions to `notifier`.
    pub fn with_notifier(store: Arc<EntitlementStore>, notifier: Arc<dyn NotificationSender>) -> Self {
        Self { store, notifier }
    }

    /// Files a request to move an active license to a new machine.
    ///
    /// The old key must have a live binding on `old_machine`; the new
    /// machine id must be non-empty and differ from the current binding.
    pub fn request(
        &self,
        old_key: &str,
        old_machine: &MachineId,
        new_machine: &MachineId,
        email: &str,
        company: &str,
        reason: &str,
    ) -> LicenseResult<MigrationRequest> {
        let key = LicenseKey::parse(old_key)?;
        let hash = key.hash();

        let license = match self.store.find_active_license(&hash)? {
            Some(license) if license.active => license,
            _ => return Err(LicenseError::LicenseNotFound),
        };
        if license.machine_id != *old_machine {
            warn!(
                "Migration request for key bound to machine {} claimed machine {}",
                license.machine_id, old_machine
            );
            return Err(LicenseError::MachineMismatch);
        }
        if new_machine.is_empty() {
            return Err(LicenseError::Validation(
                "new machine id must not be empty".to_string(),
            ));
        }
        if new_machine == old_machine {
            return Err(LicenseError::Validation(
                "license is already bound to this machine".to_string(),
            ));
        }

        let request = MigrationRequest::new(
            key.as_str(),
            old_machine.clone(),
            new_machine.clone(),
            email,
            company,
            reason,
        );
        self.store.create_migration_request(&request)?;
        info!(
            "Migration {} requested from machine {} to machine {}",
            request.id, old_machine, new_machine
        );
        Ok(request)
    }

    /// Applies an administrator decision to a pending request.
    ///
    /// Decisions are terminal; processing an already-decided request
    /// fails with [`LicenseError::AlreadyProcessed`].
    pub fn process(
        &self,
        id: MigrationId,
        decision: MigrationDecision,
        admin: &str,
        notes: Option<&str>,
    ) -> LicenseResult<MigrationOutcome> {
        let request = self
            .store
            .migration_request(id)?
            .ok_or(LicenseError::MigrationNotFound(id))?;
        if !request.is_pending() {
            return Err(LicenseError::AlreadyProcessed);
        }

        match decision {
            MigrationDecision::Reject => {
                self.store.update_migration_review(
                    id,
                    MigrationStatus::Rejected,
                    admin,
                    notes,
                    None,
                    None,
                )?;
                let request = self.reload(id)?;
                info!("Migration {} rejected by {}", id, admin);
                self.notifier
                    .rejection(&request.email, notes.unwrap_or("migration request rejected"));
                Ok(MigrationOutcome::Rejected { request })
            }
            MigrationDecision::Approve => self.approve(request, admin, notes),
        }
    }

    /// Lists migration requests, newest first, optionally filtered.
    pub fn requests(
        &self,
        filter: Option<MigrationStatus>,
    ) -> LicenseResult<Vec<MigrationRequest>> {
        Ok(self.store.migration_requests(filter)?)
    }

    /// Looks up one migration request.
    pub fn request_by_id(&self, id: MigrationId) -> LicenseResult<Option<MigrationRequest>> {
        Ok(self.store.migration_request(id)?)
    }

    fn approve(
        &self,
        request: MigrationRequest,
        admin: &str,
        notes: Option<&str>,
    ) -> LicenseResult<MigrationOutcome> {
        let old_key = LicenseKey::parse(&request.old_key)?;
        let old_hash = old_key.hash();

        let old_license = match self.store.find_active_license(&old_hash)? {
            Some(license) if license.active => license,
            _ => return Err(LicenseError::LicenseNotFound),
        };
        let old_application = self
            .store
            .find_application_by_key_hash(&old_hash)?
            .ok_or(LicenseError::LicenseNotFound)?;

        let new_key = LicenseKey::generate(old_license.tier, &request.email);
        let new_hash = new_key.hash();

        let mut new_application = LicenseApplication::new(
            request.new_machine_id.clone(),
            old_application.name.clone(),
            request.company.clone(),
            request.email.clone(),
            old_license.tier,
        );
        new_application.status = ApplicationStatus::Approved;
        new_application.payment = PaymentStatus::Paid;
        new_application.origin = ApplicationOrigin::Migration;
        new_application.license_key = Some(new_key.as_str().to_string());
        new_application.key_hash = Some(new_hash.clone());
        new_application.processed_at = Some(Utc::now());
        new_application.processed_by = Some(admin.to_string());
        new_application.notes = format!("Migrated from {}: {}", request.old_key, request.reason);

        let new_license = ActiveLicense::new(
            new_key.as_str(),
            &new_hash,
            request.new_machine_id.clone(),
            request.email.as_str(),
            request.company.as_str(),
            old_license.tier,
            new_application.id,
        );

        if let Err(e) = self.store.commit_migration(
            request.id,
            &new_application,
            &new_license,
            &old_hash,
            old_application.id,
            &request.reason,
            admin,
            notes,
        ) {
            error!("Migration {} aborted: {}", request.id, e);
            return Err(e.into());
        }

        let request = self.reload(request.id)?;
        info!(
            "Migration {} approved by {}; license moved from machine {} to machine {}",
            request.id, admin, request.old_machine_id, request.new_machine_id
        );

        self.notifier
            .approval(&request.email, new_key.as_str(), old_license.tier);

        Ok(MigrationOutcome::Approved {
            request,
            new_key,
            new_application,
            new_license,
        })
    }

    fn reload(&self, id: MigrationId) -> LicenseResult<MigrationRequest> {
        self.store
            .migration_request(id)?
            .ok_or(LicenseError::MigrationNotFound(id))
    }
}
