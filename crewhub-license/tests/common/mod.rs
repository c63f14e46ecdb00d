//! Shared test helpers for licensing tests.

#![allow(dead_code)]

use crewhub_ledger::EntitlementStore;
use crewhub_license::{ApplicationWorkflow, LicenseConfig, NotificationSender, SubmitApplication};
use crewhub_types::{MachineId, Tier};
use std::sync::{Arc, Mutex};

/// Opens a fresh in-memory ledger.
pub fn memory_store() -> Arc<EntitlementStore> {
    Arc::new(EntitlementStore::open_in_memory().unwrap())
}

/// One observed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Submitted {
        email: String,
        tier: Tier,
    },
    Approved {
        email: String,
        key: String,
        tier: Tier,
    },
    Rejected {
        email: String,
        reason: String,
    },
}

/// Notifier that records every event for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl NotificationSender for RecordingNotifier {
    fn application_submitted(&self, email: &str, tier: Tier) {
        self.notices.lock().unwrap().push(Notice::Submitted {
            email: email.to_string(),
            tier,
        });
    }

    fn approval(&self, email: &str, key: &str, tier: Tier) {
        self.notices.lock().unwrap().push(Notice::Approved {
            email: email.to_string(),
            key: key.to_string(),
            tier,
        });
    }

    fn rejection(&self, email: &str, reason: &str) {
        self.notices.lock().unwrap().push(Notice::Rejected {
            email: email.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Standard applicant used across tests.
pub fn ada(machine: &str, tier: Tier) -> SubmitApplication {
    SubmitApplication {
        machine_id: MachineId::new(machine),
        name: "Ada Lovelace".to_string(),
        company: "Acme".to_string(),
        email: "ada@acme.com".to_string(),
        tier,
    }
}

/// Submits, approves, and pays an application; returns the issued key text.
pub fn issued_key(store: &Arc<EntitlementStore>, machine: &str, tier: Tier) -> String {
    let workflow = ApplicationWorkflow::new(Arc::clone(store), LicenseConfig::default());
    let app = workflow.submit(ada(machine, tier)).unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    approved.key.as_str().to_string()
}
