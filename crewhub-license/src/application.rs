//! License application workflow.
//!
//! Applications move `pending → approved | rejected`; the payment status
//! (`unpaid → pending → paid`) is an independent axis driven by an
//! external processor. Review decisions are recorded through the ledger
//! and applicant notifications go out only after the write commits.

use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;
use crate::notify::{NoopNotifier, NotificationSender};
use crewhub_ledger::EntitlementStore;
use crewhub_types::{
    ApplicationId, ApplicationStatus, LicenseApplication, MachineId, PaymentStatus, Tier,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Applicant-supplied fields for a new license application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitApplication {
    /// Machine the eventual license will bind to.
    pub machine_id: MachineId,
    /// Applicant name.
    pub name: String,
    /// Applicant company.
    pub company: String,
    /// Applicant email; receives the key on approval.
    pub email: String,
    /// Requested tier.
    pub tier: Tier,
}

/// Admin-side field updates for an existing application. `None` fields
/// are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationEdit {
    pub tier: Option<Tier>,
    pub status: Option<ApplicationStatus>,
    pub payment: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// Result of approving an application: the updated record plus the key
/// that was issued for it.
#[derive(Debug, Clone)]
pub struct ApprovedApplication {
    pub application: LicenseApplication,
    pub key: LicenseKey,
}

impl fmt::Display for ApprovedApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "application approved at tier {}; key issued",
            self.application.tier
        )
    }
}

/// Read-only view of an external payment processor.
///
/// The engine never drives payment logic; it polls this seam and records
/// whatever the processor reports.
pub trait PaymentStatusSource: Send + Sync {
    /// Reports the processor's status for an application, or `None` when
    /// the processor knows nothing about it.
    fn payment_status(&self, id: &ApplicationId) -> Option<PaymentStatus>;
}

/// Service coordinating the application review lifecycle.
pub struct ApplicationWorkflow {
    store: Arc<EntitlementStore>,
    config: LicenseConfig,
    notifier: Arc<dyn NotificationSender>,
}

impl ApplicationWorkflow {
    /// Creates a workflow with no notification delivery.
    pub fn new(store: Arc<EntitlementStore>, config: LicenseConfig) -> Self {
        Self::with_notifier(store, config, Arc::new(NoopNotifier))
    }

    /// Creates a workflow that reports lifecycle events to `notifier`.
    pub fn with_notifier(
        store: Arc<EntitlementStore>,
        config: LicenseConfig,
        notifier: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            config,
            notifier,
        }
    }

    /// Submits a new application for review.
    ///
    /// Duplicates are allowed by default; with
    /// `require_unique_application` set, a second pending application for
    /// the same machine and tier fails with
    /// [`LicenseError::DuplicateApplication`].
    pub fn submit(&self, submission: SubmitApplication) -> LicenseResult<LicenseApplication> {
        validate_submission(&submission)?;

        if self.config.require_unique_application
            && self
                .store
                .has_pending_application(&submission.machine_id, submission.tier)?
        {
            return Err(LicenseError::DuplicateApplication);
        }

        let app = LicenseApplication::new(
            submission.machine_id,
            submission.name,
            submission.company,
            submission.email,
            submission.tier,
        );
        self.store.create_application(&app)?;
        info!("Application {} submitted for tier {}", app.id, app.tier);

        self.notifier.application_submitted(&app.email, app.tier);
        Ok(app)
    }

    /// Approves an application, issuing a key for its requested tier.
    ///
    /// Approving an already-approved application is an administrative
    /// correction, not an error: a fresh key is generated and replaces
    /// the earlier one. Payment status is never touched here.
    pub fn approve(
        &self,
        id: ApplicationId,
        admin: &str,
        notes: Option<&str>,
    ) -> LicenseResult<ApprovedApplication> {
        let app = self.load(id)?;

        let key = LicenseKey::generate(app.tier, &app.email);
        let hash = key.hash();
        self.store.update_review(
            id,
            ApplicationStatus::Approved,
            app.payment,
            Some((key.as_str(), &hash)),
            notes,
            admin,
        )?;

        let updated = self.load(id)?;
        info!("Application {} approved by {} at tier {}", id, admin, updated.tier);

        self.notifier.approval(&updated.email, key.as_str(), updated.tier);
        Ok(ApprovedApplication {
            application: updated,
            key,
        })
    }

    /// Rejects an application. No key is issued; any previously issued
    /// key stays on the record as history.
    pub fn reject(&self, id: ApplicationId, admin: &str, reason: &str) -> LicenseResult<()> {
        let app = self.load(id)?;

        self.store.update_review(
            id,
            ApplicationStatus::Rejected,
            app.payment,
            None,
            Some(reason),
            admin,
        )?;
        info!("Application {} rejected by {}", id, admin);

        self.notifier.rejection(&app.email, reason);
        Ok(())
    }

    /// Records a completed payment for an application.
    pub fn mark_paid(&self, id: ApplicationId) -> LicenseResult<()> {
        let app = self.load(id)?;
        self.store.set_payment_status(app.id, PaymentStatus::Paid)?;
        debug!("Application {} marked paid", id);
        Ok(())
    }

    /// Polls the external payment source and persists whatever it
    /// reports. Returns the payment status after the refresh.
    pub fn refresh_payment(
        &self,
        id: ApplicationId,
        source: &dyn PaymentStatusSource,
    ) -> LicenseResult<PaymentStatus> {
        let app = self.load(id)?;
        match source.payment_status(&id) {
            Some(status) if status != app.payment => {
                self.store.set_payment_status(id, status)?;
                debug!("Application {} payment refreshed to {}", id, status);
                Ok(status)
            }
            Some(status) => Ok(status),
            None => Ok(app.payment),
        }
    }

    /// Applies raw admin field edits and persists the updated record.
    pub fn edit(
        &self,
        id: ApplicationId,
        edit: ApplicationEdit,
        admin: &str,
    ) -> LicenseResult<LicenseApplication> {
        let mut app = self.load(id)?;

        if let Some(tier) = edit.tier {
            app.tier = tier;
        }
        if let Some(status) = edit.status {
            app.status = status;
        }
        if let Some(payment) = edit.payment {
            app.payment = payment;
        }
        if let Some(notes) = edit.notes {
            app.notes = notes;
        }

        self.store.save_application(&app)?;
        info!("Application {} edited by {}", id, admin);
        Ok(app)
    }

    /// Lists applications, newest first, optionally filtered by status.
    pub fn applications(
        &self,
        filter: Option<ApplicationStatus>,
    ) -> LicenseResult<Vec<LicenseApplication>> {
        Ok(self.store.applications(filter)?)
    }

    fn load(&self, id: ApplicationId) -> LicenseResult<LicenseApplication> {
        self.store
            .application(id)?
            .ok_or(LicenseError::ApplicationNotFound(id))
    }
}

fn validate_submission(submission: &SubmitApplication) -> LicenseResult<()> {
    if submission.machine_id.is_empty() {
        return Err(LicenseError::Validation(
            "machine id must not be empty".to_string(),
        ));
    }
    if submission.name.trim().is_empty() {
        return Err(LicenseError::Validation(
            "applicant name must not be empty".to_string(),
        ));
    }
    if !plausible_email(&submission.email) {
        return Err(LicenseError::Validation(format!(
            "email address looks invalid: {}",
            submission.email
        )));
    }
    Ok(())
}

fn plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
