//! Licensing configuration.

use crewhub_types::Tier;
use serde::{Deserialize, Serialize};

/// Tunable licensing behavior, threaded into the services that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseConfig {
    /// Tier granted to trial activations.
    pub trial_tier: Tier,
    /// Length of the trial validity window, in days.
    pub trial_days: i64,
    /// When set, a machine may hold at most one pending application per
    /// tier; further submissions are rejected as duplicates.
    pub require_unique_application: bool,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            trial_tier: Tier::Professional,
            trial_days: 30,
            require_unique_application: false,
        }
    }
}
