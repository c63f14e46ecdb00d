//! The tier catalog: five fixed tiers and their capability limits.
//!
//! Tiers are a closed enum so an unknown tier is rejected when it is parsed,
//! not when its limits are looked up. Limits live in a static table; `-1`
//! is the sentinel for "unlimited" and the `allows_*` helpers check it
//! before any arithmetic comparison.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sentinel meaning "no limit" in any numeric tier limit.
pub const UNLIMITED: i32 = -1;

/// The identifier was not one of the five fixed tiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown tier: {0}")]
pub struct UnknownTier(pub String);

/// A named capability bundle bounding modules, teams, and members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Standard,
    Professional,
    Enterprise,
    Ultimate,
}

/// Capability limits for one tier. Immutable, defined at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierLimits {
    /// Display name shown in the application surface.
    pub name: &'static str,
    /// Maximum number of feature modules, or [`UNLIMITED`].
    pub max_modules: i32,
    /// Maximum number of teams, or [`UNLIMITED`].
    pub max_teams: i32,
    /// Maximum members per team, or [`UNLIMITED`].
    pub max_members_per_team: i32,
    /// Whether teams may be organized into team groups.
    pub team_groups: bool,
    /// Price label shown alongside the tier.
    pub price: &'static str,
}

const BASIC: TierLimits = TierLimits {
    name: "Basic",
    max_modules: 3,
    max_teams: 1,
    max_members_per_team: 5,
    team_groups: false,
    price: "$19",
};

const STANDARD: TierLimits = TierLimits {
    name: "Standard",
    max_modules: 10,
    max_teams: 3,
    max_members_per_team: 15,
    team_groups: false,
    price: "$49",
};

const PROFESSIONAL: TierLimits = TierLimits {
    name: "Professional",
    max_modules: 25,
    max_teams: 10,
    max_members_per_team: 50,
    team_groups: true,
    price: "$99",
};

const ENTERPRISE: TierLimits = TierLimits {
    name: "Enterprise",
    max_modules: UNLIMITED,
    max_teams: 50,
    max_members_per_team: 200,
    team_groups: true,
    price: "$249",
};

const ULTIMATE: TierLimits = TierLimits {
    name: "Ultimate",
    max_modules: UNLIMITED,
    max_teams: UNLIMITED,
    max_members_per_team: UNLIMITED,
    team_groups: true,
    price: "$499",
};

impl Tier {
    /// All five tiers in ascending capability order.
    pub const ALL: [Tier; 5] = [
        Tier::Basic,
        Tier::Standard,
        Tier::Professional,
        Tier::Enterprise,
        Tier::Ultimate,
    ];

    /// Returns the static capability limits for this tier.
    #[must_use]
    pub const fn limits(self) -> &'static TierLimits {
        match self {
            Tier::Basic => &BASIC,
            Tier::Standard => &STANDARD,
            Tier::Professional => &PROFESSIONAL,
            Tier::Enterprise => &ENTERPRISE,
            Tier::Ultimate => &ULTIMATE,
        }
    }

    /// Returns the three-letter code used as the license key prefix.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Tier::Basic => "BAS",
            Tier::Standard => "STD",
            Tier::Professional => "PRO",
            Tier::Enterprise => "ENT",
            Tier::Ultimate => "ULT",
        }
    }

    /// Resolves a three-letter key prefix back to its tier.
    pub fn from_code(code: &str) -> Result<Self, UnknownTier> {
        match code {
            "BAS" => Ok(Tier::Basic),
            "STD" => Ok(Tier::Standard),
            "PRO" => Ok(Tier::Professional),
            "ENT" => Ok(Tier::Enterprise),
            "ULT" => Ok(Tier::Ultimate),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

impl TierLimits {
    /// True if a user at `current` modules may enable one more.
    #[must_use]
    pub fn allows_modules(&self, current: i32) -> bool {
        self.max_modules == UNLIMITED || current < self.max_modules
    }

    /// True if a user at `current` teams may create one more.
    #[must_use]
    pub fn allows_teams(&self, current: i32) -> bool {
        self.max_teams == UNLIMITED || current < self.max_teams
    }

    /// True if a team at `current` members may add one more.
    #[must_use]
    pub fn allows_team_members(&self, current: i32) -> bool {
        self.max_members_per_team == UNLIMITED || current < self.max_members_per_team
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Basic => "basic",
            Tier::Standard => "standard",
            Tier::Professional => "professional",
            Tier::Enterprise => "enterprise",
            Tier::Ultimate => "ultimate",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Tier::Basic),
            "standard" => Ok(Tier::Standard),
            "professional" => Ok(Tier::Professional),
            "enterprise" => Ok(Tier::Enterprise),
            "ultimate" => Ok(Tier::Ultimate),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}
