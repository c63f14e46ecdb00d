//! Notification seam for applicant-facing messages.
//!
//! The engine reports lifecycle events through this trait strictly after
//! the corresponding ledger write has committed. Delivery is best-effort:
//! the trait returns nothing and implementations own their failure
//! handling, so a broken mail pipeline can never roll back an
//! entitlement change.

use crewhub_types::Tier;

/// Receives applicant-facing lifecycle events.
pub trait NotificationSender: Send + Sync {
    /// A new application was submitted for review.
    fn application_submitted(&self, email: &str, tier: Tier);

    /// An application was approved and a key issued.
    fn approval(&self, email: &str, key: &str, tier: Tier);

    /// An application or migration was rejected.
    fn rejection(&self, email: &str, reason: &str);
}

/// Notifier that drops every event. The default when the host wires no
/// delivery channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotificationSender for NoopNotifier {
    fn application_submitted(&self, _email: &str, _tier: Tier) {}

    fn approval(&self, _email: &str, _key: &str, _tier: Tier) {}

    fn rejection(&self, _email: &str, _reason: &str) {}
}
