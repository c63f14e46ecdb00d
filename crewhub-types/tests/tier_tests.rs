use crewhub_types::{Tier, UnknownTier, UNLIMITED};
use std::str::FromStr;

// ── Catalog values ───────────────────────────────────────────────

#[test]
fn basic_limits() {
    let limits = Tier::Basic.limits();
    assert_eq!(limits.max_modules, 3);
    assert_eq!(limits.max_teams, 1);
    assert_eq!(limits.max_members_per_team, 5);
    assert!(!limits.team_groups);
    assert_eq!(limits.price, "$19");
}

#[test]
fn standard_limits() {
    let limits = Tier::Standard.limits();
    assert_eq!(limits.max_modules, 10);
    assert_eq!(limits.max_teams, 3);
    assert_eq!(limits.max_members_per_team, 15);
    assert!(!limits.team_groups);
    assert_eq!(limits.price, "$49");
}

#[test]
fn professional_limits() {
    let limits = Tier::Professional.limits();
    assert_eq!(limits.max_modules, 25);
    assert_eq!(limits.max_teams, 10);
    assert_eq!(limits.max_members_per_team, 50);
    assert!(limits.team_groups);
    assert_eq!(limits.price, "$99");
}

#[test]
fn enterprise_limits() {
    let limits = Tier::Enterprise.limits();
    assert_eq!(limits.max_modules, UNLIMITED);
    assert_eq!(limits.max_teams, 50);
    assert_eq!(limits.max_members_per_team, 200);
    assert!(limits.team_groups);
    assert_eq!(limits.price, "$249");
}

#[test]
fn ultimate_limits() {
    let limits = Tier::Ultimate.limits();
    assert_eq!(limits.max_modules, UNLIMITED);
    assert_eq!(limits.max_teams, UNLIMITED);
    assert_eq!(limits.max_members_per_team, UNLIMITED);
    assert!(limits.team_groups);
    assert_eq!(limits.price, "$499");
}

#[test]
fn all_lists_every_tier_in_order() {
    assert_eq!(
        Tier::ALL,
        [
            Tier::Basic,
            Tier::Standard,
            Tier::Professional,
            Tier::Enterprise,
            Tier::Ultimate,
        ]
    );
}

// ── Limit checks ─────────────────────────────────────────────────

#[test]
fn allows_modules_below_limit() {
    let limits = Tier::Basic.limits();
    assert!(limits.allows_modules(0));
    assert!(limits.allows_modules(2));
}

#[test]
fn allows_modules_at_limit_refused() {
    let limits = Tier::Basic.limits();
    assert!(!limits.allows_modules(3));
    assert!(!limits.allows_modules(100));
}

#[test]
fn unlimited_allows_any_count() {
    let limits = Tier::Ultimate.limits();
    assert!(limits.allows_modules(i32::MAX));
    assert!(limits.allows_teams(i32::MAX));
    assert!(limits.allows_team_members(i32::MAX));
}

#[test]
fn unlimited_modules_with_bounded_teams() {
    let limits = Tier::Enterprise.limits();
    assert!(limits.allows_modules(10_000));
    assert!(limits.allows_teams(49));
    assert!(!limits.allows_teams(50));
}

#[test]
fn member_limit_boundary() {
    let limits = Tier::Standard.limits();
    assert!(limits.allows_team_members(14));
    assert!(!limits.allows_team_members(15));
}

// ── Codes ────────────────────────────────────────────────────────

#[test]
fn codes_round_trip() {
    for tier in Tier::ALL {
        assert_eq!(Tier::from_code(tier.code()).unwrap(), tier);
    }
}

#[test]
fn unknown_code_rejected() {
    let err = Tier::from_code("XXX").unwrap_err();
    assert_eq!(err, UnknownTier("XXX".to_string()));
}

#[test]
fn lowercase_code_rejected() {
    assert!(Tier::from_code("pro").is_err());
}

// ── Parsing and display ──────────────────────────────────────────

#[test]
fn display_is_lowercase() {
    assert_eq!(Tier::Professional.to_string(), "professional");
    assert_eq!(Tier::Basic.to_string(), "basic");
}

#[test]
fn parse_round_trips_display() {
    for tier in Tier::ALL {
        assert_eq!(Tier::from_str(&tier.to_string()).unwrap(), tier);
    }
}

#[test]
fn parse_accepts_mixed_case_and_whitespace() {
    assert_eq!(Tier::from_str(" Enterprise ").unwrap(), Tier::Enterprise);
    assert_eq!(Tier::from_str("ULTIMATE").unwrap(), Tier::Ultimate);
}

#[test]
fn parse_unknown_tier_keeps_input() {
    let err = Tier::from_str("platinum").unwrap_err();
    assert_eq!(err, UnknownTier("platinum".to_string()));
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn tier_serializes_lowercase() {
    let json = serde_json::to_string(&Tier::Enterprise).unwrap();
    assert_eq!(json, "\"enterprise\"");
}

#[test]
fn tier_serde_round_trip() {
    for tier in Tier::ALL {
        let json = serde_json::to_string(&tier).unwrap();
        let parsed: Tier = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tier);
    }
}

#[test]
fn unknown_tier_json_rejected() {
    let result: Result<Tier, _> = serde_json::from_str("\"platinum\"");
    assert!(result.is_err());
}
