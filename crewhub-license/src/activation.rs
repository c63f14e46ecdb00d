//! License activation and validation.
//!
//! Activation binds a key to a machine identity in the ledger; validation
//! is the cheap startup check the app runs against that binding. Both are
//! local operations against the entitlement ledger. Trials go through a
//! dedicated path that issues the key and binds it in one step.

use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;
use chrono::{DateTime, Duration, Utc};
use crewhub_ledger::EntitlementStore;
use crewhub_types::{ActiveLicense, ApplicationOrigin, LicenseApplication, MachineId, Tier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a trial activation: the auto-approved application, the
/// bound license, and when the trial runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialActivation {
    pub application: LicenseApplication,
    pub license: ActiveLicense,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Display for TrialActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trial activated at tier {} until {}",
            self.license.tier, self.expires_at
        )
    }
}

/// Outcome of a successful key activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// The key was bound to this machine just now.
    Activated(ActiveLicense),
    /// The key was already bound to this machine; nothing changed.
    AlreadyActive(ActiveLicense),
}

impl Activation {
    /// Returns the license record behind this activation.
    #[must_use]
    pub fn license(&self) -> &ActiveLicense {
        match self {
            Self::Activated(license) | Self::AlreadyActive(license) => license,
        }
    }

    /// True if this call created the binding.
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Activated(_))
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated(license) => {
                write!(f, "license activated at tier {}", license.tier)
            }
            Self::AlreadyActive(_) => f.write_str("license already active on this machine"),
        }
    }
}

/// Outcome of a successful validation: the bound license with its
/// entitlement tier, ready for limit checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedLicense {
    pub tier: Tier,
    pub license: ActiveLicense,
}

impl fmt::Display for ValidatedLicense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "license valid at tier {}", self.tier)
    }
}

/// Service binding keys to machines and validating those bindings.
pub struct ActivationService {
    store: Arc<EntitlementStore>,
    config: LicenseConfig,
}

impl ActivationService {
    pub fn new(store: Arc<EntitlementStore>, config: LicenseConfig) -> Self {
        Self { store, config }
    }

    /// Starts a trial on this machine.
    ///
    /// One trial per machine, ever: any earlier trial-origin application
    /// for the machine fails the request with
    /// [`LicenseError::TrialAlreadyUsed`], no matter how long ago it was
    /// created. On success the application and its active license land in
    /// one transaction.
    pub fn activate_trial(&self, machine_id: &MachineId) -> LicenseResult<TrialActivation> {
        if machine_id.is_empty() {
            return Err(LicenseError::Validation(
                "machine id must not be empty".to_string(),
            ));
        }
        if self.store.has_trial_application(machine_id)? {
            warn!("Trial reuse attempt on machine {}", machine_id);
            return Err(LicenseError::TrialAlreadyUsed);
        }

        let key = LicenseKey::generate(self.config.trial_tier, machine_id.as_str());
        let hash = key.hash();

        let mut application =
            LicenseApplication::trial(machine_id.clone(), self.config.trial_tier);
        application.license_key = Some(key.as_str().to_string());
        application.key_hash = Some(hash.clone());

        let license = ActiveLicense::new(
            key.as_str(),
            &hash,
            machine_id.clone(),
            "",
            "",
            self.config.trial_tier,
            application.id,
        );

        self.store.create_trial_entitlement(&application, &license)?;
        let expires_at = application.created_at + Duration::days(self.config.trial_days);
        info!(
            "Trial activated on machine {} at tier {} until {}",
            machine_id, self.config.trial_tier, expires_at
        );

        Ok(TrialActivation {
            application,
            license,
            expires_at,
        })
    }

    /// Activates a purchased key on this machine.
    ///
    /// The key must resolve to an approved, paid application that has not
    /// been migrated away. Re-activating on the machine the key is
    /// already bound to is idempotent; a binding on any other machine
    /// fails with [`LicenseError::MachineMismatch`], and a retired
    /// binding behaves as if the key had never been issued.
    pub fn activate(&self, key: &str, machine_id: &MachineId) -> LicenseResult<Activation> {
        if machine_id.is_empty() {
            return Err(LicenseError::Validation(
                "machine id must not be empty".to_string(),
            ));
        }
        let key = LicenseKey::parse(key)?;
        let hash = key.hash();

        let application = self
            .store
            .find_application_by_key_hash(&hash)?
            .ok_or(LicenseError::LicenseNotFound)?;
        if !application.is_activatable() {
            warn!(
                "Activation refused for application {} (status {}, payment {})",
                application.id, application.status, application.payment
            );
            return Err(LicenseError::LicenseNotFound);
        }

        match self.store.find_active_license(&hash)? {
            Some(existing) if !existing.active => {
                warn!("Activation attempt with retired key on machine {}", machine_id);
                Err(LicenseError::LicenseNotFound)
            }
            Some(existing) if existing.machine_id != *machine_id => {
                warn!(
                    "Key bound to machine {} refused on machine {}",
                    existing.machine_id, machine_id
                );
                Err(LicenseError::MachineMismatch)
            }
            Some(existing) => Ok(Activation::AlreadyActive(existing)),
            None => {
                let license = ActiveLicense::new(
                    key.as_str(),
                    &hash,
                    machine_id.clone(),
                    application.email.as_str(),
                    application.company.as_str(),
                    application.tier,
                    application.id,
                );
                self.store.create_active_license(&license)?;
                info!(
                    "License activated on machine {} at tier {}",
                    machine_id, license.tier
                );
                Ok(Activation::Activated(license))
            }
        }
    }

    /// Validates a key against this machine's binding.
    ///
    /// Returns the entitlement tier on success so the caller can enforce
    /// tier limits, bumping the validation counter as a side effect.
    /// Trial licenses past their validity window fail with
    /// [`LicenseError::TrialExpired`].
    pub fn validate(&self, key: &str, machine_id: &MachineId) -> LicenseResult<ValidatedLicense> {
        let key = LicenseKey::parse(key)?;
        let hash = key.hash();

        let license = match self.store.find_active_license(&hash)? {
            Some(license) if license.active => license,
            _ => return Err(LicenseError::InvalidKey),
        };
        if license.machine_id != *machine_id {
            warn!(
                "Validation with key bound to machine {} on machine {}",
                license.machine_id, machine_id
            );
            return Err(LicenseError::MachineMismatch);
        }

        // Trials carry a validity window; purchased licenses do not expire.
        if let Some(application) = self.store.find_application_by_key_hash(&hash)? {
            if application.origin == ApplicationOrigin::Trial {
                let expires_at = license.activated_at + Duration::days(self.config.trial_days);
                if Utc::now() > expires_at {
                    return Err(LicenseError::TrialExpired);
                }
            }
        }

        self.store.touch_validation(&hash)?;
        let license = self
            .store
            .find_active_license(&hash)?
            .ok_or(LicenseError::InvalidKey)?;

        Ok(ValidatedLicense {
            tier: license.tier,
            license,
        })
    }
}
