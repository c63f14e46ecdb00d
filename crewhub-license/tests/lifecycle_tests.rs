//! Full journeys across the application, activation, and migration services.

mod common;

use common::{ada, memory_store, Notice, RecordingNotifier};
use crewhub_license::{
    ActivationService, ApplicationWorkflow, LicenseConfig, LicenseError, LicenseKey,
    MigrationDecision, MigrationOutcome, MigrationService,
};
use crewhub_types::{ApplicationOrigin, ApplicationStatus, MachineId, MigrationStatus, Tier};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn purchase_activation_and_migration_journey() {
    let store = memory_store();
    let notifier = Arc::new(RecordingNotifier::default());
    let workflow =
        ApplicationWorkflow::with_notifier(Arc::clone(&store), LicenseConfig::default(), notifier.clone());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let migration = MigrationService::with_notifier(Arc::clone(&store), notifier.clone());
    let m1 = MachineId::new("M-1");
    let m2 = MachineId::new("M-2");

    // Ada applies for a standard license
    let app = workflow.submit(ada("M-1", Tier::Standard)).unwrap();
    assert_eq!(app.status, ApplicationStatus::Pending);

    // Admin approves and payment lands
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    let old_key = approved.key.as_str().to_string();
    assert!(crewhub_license::is_valid_format(&old_key));
    assert!(old_key.starts_with("STD-"));

    // First activation binds M-1; a retry is harmless
    let first = activation.activate(&old_key, &m1).unwrap();
    assert!(first.is_new());
    let retry = activation.activate(&old_key, &m1).unwrap();
    assert!(!retry.is_new());

    // Another machine cannot steal the key
    let err = activation.activate(&old_key, &m2).unwrap_err();
    assert!(matches!(err, LicenseError::MachineMismatch));

    // Day-to-day validation from M-1
    let validated = activation.validate(&old_key, &m1).unwrap();
    assert_eq!(validated.tier, Tier::Standard);

    // Ada replaces her laptop and asks to move the license
    let request = migration
        .request(&old_key, &m1, &m2, "ada@acme.com", "Acme", "laptop replaced")
        .unwrap();
    let outcome = migration
        .process(request.id, MigrationDecision::Approve, "carol", None)
        .unwrap();
    let MigrationOutcome::Approved { new_key, .. } = outcome else {
        panic!("expected approval");
    };
    assert_ne!(new_key.as_str(), old_key);

    // Old key is dead everywhere
    let err = activation.validate(&old_key, &m1).unwrap_err();
    assert!(matches!(err, LicenseError::InvalidKey));
    let err = activation.activate(&old_key, &m1).unwrap_err();
    assert!(matches!(err, LicenseError::LicenseNotFound));

    // New key works on the new machine only
    let validated = activation.validate(new_key.as_str(), &m2).unwrap();
    assert_eq!(validated.tier, Tier::Standard);
    let err = activation.validate(new_key.as_str(), &m1).unwrap_err();
    assert!(matches!(err, LicenseError::MachineMismatch));

    // The ledger kept the whole story
    let applications = store.applications(None).unwrap();
    assert_eq!(applications.len(), 2);
    let old_app = applications
        .iter()
        .find(|a| a.id == app.id)
        .unwrap();
    assert!(old_app.is_migrated());
    let new_app = applications
        .iter()
        .find(|a| a.origin == ApplicationOrigin::Migration)
        .unwrap();
    assert_eq!(old_app.migrated_to, Some(new_app.id));
    let requests = store
        .migration_requests(Some(MigrationStatus::Approved))
        .unwrap();
    assert_eq!(requests.len(), 1);

    // Every lifecycle event reached the notifier in order
    assert_eq!(
        notifier.notices(),
        vec![
            Notice::Submitted {
                email: "ada@acme.com".to_string(),
                tier: Tier::Standard,
            },
            Notice::Approved {
                email: "ada@acme.com".to_string(),
                key: old_key.clone(),
                tier: Tier::Standard,
            },
            Notice::Approved {
                email: "ada@acme.com".to_string(),
                key: new_key.as_str().to_string(),
                tier: Tier::Standard,
            },
        ]
    );
}

#[test]
fn trial_then_purchase_on_the_same_machine() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let machine = MachineId::new("M-1");

    // Start with the built-in trial
    let trial = activation.activate_trial(&machine).unwrap();
    let validated = activation.validate(&trial.license.key, &machine).unwrap();
    assert_eq!(validated.tier, Tier::Professional);

    // Outgrow it and buy ultimate
    let app = workflow.submit(ada("M-1", Tier::Ultimate)).unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    let purchased = activation.activate(approved.key.as_str(), &machine).unwrap();
    assert!(purchased.is_new());

    // Both keys are live, each under its own hash
    assert_eq!(
        activation
            .validate(approved.key.as_str(), &machine)
            .unwrap()
            .tier,
        Tier::Ultimate
    );
    assert_eq!(
        activation.validate(&trial.license.key, &machine).unwrap().tier,
        Tier::Professional
    );

    // The trial stays spent even with a purchase on file
    let err = activation.activate_trial(&machine).unwrap_err();
    assert!(matches!(err, LicenseError::TrialAlreadyUsed));
}

#[test]
fn validated_tier_carries_its_limits() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let machine = MachineId::new("M-1");

    let app = workflow.submit(ada("M-1", Tier::Standard)).unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    activation.activate(approved.key.as_str(), &machine).unwrap();

    let validated = activation.validate(approved.key.as_str(), &machine).unwrap();
    let limits = validated.tier.limits();
    assert!(limits.allows_teams(2));
    assert!(!limits.allows_teams(3));
    assert!(limits.allows_modules(9));
    assert!(!limits.allows_modules(10));
    assert!(!limits.team_groups);
}

#[test]
fn edited_application_approves_at_the_new_tier() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let machine = MachineId::new("M-1");

    // Ada applies for basic, sales upgrades the request before approval
    let app = workflow.submit(ada("M-1", Tier::Basic)).unwrap();
    workflow
        .edit(
            app.id,
            crewhub_license::ApplicationEdit {
                tier: Some(Tier::Enterprise),
                ..crewhub_license::ApplicationEdit::default()
            },
            "carol",
        )
        .unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();

    assert_eq!(approved.key.tier(), Tier::Enterprise);
    activation.activate(approved.key.as_str(), &machine).unwrap();
    let validated = activation.validate(approved.key.as_str(), &machine).unwrap();
    assert_eq!(validated.tier, Tier::Enterprise);
    assert!(validated.tier.limits().team_groups);
}

#[test]
fn reissued_key_replaces_the_first_on_file() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let machine = MachineId::new("M-1");

    let app = workflow.submit(ada("M-1", Tier::Standard)).unwrap();
    let first = workflow.approve(app.id, "carol", None).unwrap();
    let second = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    assert_ne!(first.key, second.key);

    // Only the latest issued key is on the application
    activation.activate(second.key.as_str(), &machine).unwrap();
    let validated = activation.validate(second.key.as_str(), &machine).unwrap();
    assert_eq!(validated.tier, Tier::Standard);

    // The superseded key was never bound, so it cannot activate
    let err = activation.activate(first.key.as_str(), &machine).unwrap_err();
    assert!(matches!(err, LicenseError::LicenseNotFound));
}

#[test]
fn migration_chain_across_three_machines() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());
    let activation = ActivationService::new(Arc::clone(&store), LicenseConfig::default());
    let migration = MigrationService::new(Arc::clone(&store));

    let app = workflow.submit(ada("M-1", Tier::Professional)).unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();
    workflow.mark_paid(app.id).unwrap();
    let key_1 = approved.key.as_str().to_string();
    activation.activate(&key_1, &MachineId::new("M-1")).unwrap();

    // M-1 to M-2
    let req = migration
        .request(
            &key_1,
            &MachineId::new("M-1"),
            &MachineId::new("M-2"),
            "ada@acme.com",
            "Acme",
            "laptop replaced",
        )
        .unwrap();
    let MigrationOutcome::Approved { new_key: key_2, .. } = migration
        .process(req.id, MigrationDecision::Approve, "carol", None)
        .unwrap()
    else {
        panic!("expected approval");
    };

    // M-2 to M-3
    let req = migration
        .request(
            key_2.as_str(),
            &MachineId::new("M-2"),
            &MachineId::new("M-3"),
            "ada@acme.com",
            "Acme",
            "laptop stolen",
        )
        .unwrap();
    let MigrationOutcome::Approved { new_key: key_3, .. } = migration
        .process(req.id, MigrationDecision::Approve, "carol", None)
        .unwrap()
    else {
        panic!("expected approval");
    };

    // Only the newest key is alive, on the newest machine
    assert_eq!(
        activation
            .validate(key_3.as_str(), &MachineId::new("M-3"))
            .unwrap()
            .tier,
        Tier::Professional
    );
    for (key, machine) in [(key_1.as_str(), "M-1"), (key_2.as_str(), "M-2")] {
        let err = activation
            .validate(key, &MachineId::new(machine))
            .unwrap_err();
        assert!(matches!(err, LicenseError::InvalidKey), "{key} on {machine}");
    }

    // Three applications on file, the first two migrated
    let applications = store.applications(None).unwrap();
    assert_eq!(applications.len(), 3);
    assert_eq!(
        applications.iter().filter(|a| a.is_migrated()).count(),
        2
    );
}

#[test]
fn keys_parse_back_to_their_stored_identity() {
    let store = memory_store();
    let workflow = ApplicationWorkflow::new(Arc::clone(&store), LicenseConfig::default());

    let app = workflow.submit(ada("M-1", Tier::Standard)).unwrap();
    let approved = workflow.approve(app.id, "carol", None).unwrap();

    let reparsed = LicenseKey::parse(approved.key.as_str()).unwrap();
    let stored = store.application(app.id).unwrap().unwrap();
    assert_eq!(stored.license_key.as_deref(), Some(reparsed.as_str()));
    assert_eq!(stored.key_hash.as_deref(), Some(reparsed.hash().as_str()));
}
