use crewhub_types::{
    ApplicationOrigin, ApplicationStatus, InvalidStatus, MigrationStatus, PaymentStatus,
};
use std::str::FromStr;

// ── Display / FromStr ────────────────────────────────────────────

#[test]
fn application_status_round_trip() {
    for status in [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ] {
        assert_eq!(
            ApplicationStatus::from_str(&status.to_string()).unwrap(),
            status
        );
    }
}

#[test]
fn payment_status_round_trip() {
    for status in [
        PaymentStatus::Unpaid,
        PaymentStatus::Pending,
        PaymentStatus::Paid,
    ] {
        assert_eq!(PaymentStatus::from_str(&status.to_string()).unwrap(), status);
    }
}

#[test]
fn migration_status_round_trip() {
    for status in [
        MigrationStatus::Pending,
        MigrationStatus::Approved,
        MigrationStatus::Rejected,
    ] {
        assert_eq!(
            MigrationStatus::from_str(&status.to_string()).unwrap(),
            status
        );
    }
}

#[test]
fn origin_round_trip() {
    for origin in [
        ApplicationOrigin::Purchase,
        ApplicationOrigin::Trial,
        ApplicationOrigin::Migration,
    ] {
        assert_eq!(
            ApplicationOrigin::from_str(&origin.to_string()).unwrap(),
            origin
        );
    }
}

// ── Strictness ───────────────────────────────────────────────────

#[test]
fn unknown_status_rejected_not_defaulted() {
    let err = ApplicationStatus::from_str("cancelled").unwrap_err();
    assert_eq!(err, InvalidStatus("cancelled".to_string()));
}

#[test]
fn empty_status_rejected() {
    assert!(PaymentStatus::from_str("").is_err());
    assert!(MigrationStatus::from_str("").is_err());
}

#[test]
fn case_is_significant_in_storage_form() {
    // Stored values are always lowercase; anything else is corrupt data.
    assert!(ApplicationStatus::from_str("Approved").is_err());
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn statuses_serialize_lowercase() {
    assert_eq!(
        serde_json::to_string(&ApplicationStatus::Pending).unwrap(),
        "\"pending\""
    );
    assert_eq!(
        serde_json::to_string(&PaymentStatus::Unpaid).unwrap(),
        "\"unpaid\""
    );
    assert_eq!(
        serde_json::to_string(&ApplicationOrigin::Trial).unwrap(),
        "\"trial\""
    );
}
