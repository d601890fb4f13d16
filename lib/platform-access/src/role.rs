//! Role types for league access control.
//!
//! Access is decided on two tiers:
//! - `GlobalRole` is carried in session claims. A global admin bypasses every
//!   team check.
//! - `TeamRole` is carried by a team membership and compared by rank against
//!   the minimum a route requires.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a role string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.value)
    }
}

impl std::error::Error for ParseRoleError {}

/// Role held within a single team.
///
/// Variants are declared in rank order, so the derived `Ord` is the role
/// hierarchy: `Player < Captain < Admin`. The legacy name `manager` parses
/// to `Captain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Regular rostered player.
    Player = 1,
    /// Team captain (also known as manager).
    #[serde(alias = "manager")]
    Captain = 2,
    /// Team administrator.
    Admin = 3,
}

impl TeamRole {
    /// All team roles in ascending rank.
    pub const ALL: [TeamRole; 3] = [TeamRole::Player, TeamRole::Captain, TeamRole::Admin];

    /// Returns the numeric rank of this role.
    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Returns true if this role is at least `minimum`.
    #[must_use]
    pub const fn satisfies(self, minimum: TeamRole) -> bool {
        self.rank() >= minimum.rank()
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Captain => "captain",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Ok(Self::Player),
            "captain" | "manager" => Ok(Self::Captain),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                value: s.to_string(),
            }),
        }
    }
}

/// Platform-wide role carried in session claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GlobalRole {
    /// Ordinary signed-in member.
    #[default]
    Member,
    /// Global administrator; bypasses team checks.
    Admin,
}

impl GlobalRole {
    /// Returns true if this role has admin privileges.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Maps the provider's trusted metadata role to a global role.
    ///
    /// Missing or unrecognised values become `Member`. An unknown value
    /// never grants elevated access.
    #[must_use]
    pub fn from_metadata(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for GlobalRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobalRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseRoleError {
                value: s.to_string(),
            }),
        }
    }
}

/// An operation a team member may perform, used to guide clients after a
/// denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamAction {
    /// View the team page and roster. Players and up.
    ViewTeam,
    /// View fixtures and results. Players and up.
    ViewMatches,
    /// Submit or correct match scores. Captains and up.
    RecordScores,
    /// Set the lineup for a match. Captains and up.
    ManageLineup,
    /// Change who is on the team and their roles. Admins only.
    ManageMembers,
    /// Edit team settings. Admins only.
    ManageTeam,
}

impl TeamAction {
    const ALL: [TeamAction; 6] = [
        TeamAction::ViewTeam,
        TeamAction::ViewMatches,
        TeamAction::RecordScores,
        TeamAction::ManageLineup,
        TeamAction::ManageMembers,
        TeamAction::ManageTeam,
    ];

    /// Returns the lowest role allowed to perform this action.
    #[must_use]
    pub const fn minimum_role(self) -> TeamRole {
        match self {
            Self::ViewTeam | Self::ViewMatches => TeamRole::Player,
            Self::RecordScores | Self::ManageLineup => TeamRole::Captain,
            Self::ManageMembers | Self::ManageTeam => TeamRole::Admin,
        }
    }

    /// Returns every action available to `role`.
    #[must_use]
    pub fn available_to(role: TeamRole) -> Vec<TeamAction> {
        Self::ALL
            .into_iter()
            .filter(|action| role.satisfies(action.minimum_role()))
            .collect()
    }

    /// Returns every action whose minimum role ranks strictly below `role`.
    #[must_use]
    pub fn available_below(role: TeamRole) -> Vec<TeamAction> {
        Self::ALL
            .into_iter()
            .filter(|action| action.minimum_role() < role)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_roles_form_a_total_order() {
        assert!(TeamRole::Player < TeamRole::Captain);
        assert!(TeamRole::Captain < TeamRole::Admin);
        assert_eq!(TeamRole::Player.rank(), 1);
        assert_eq!(TeamRole::Admin.rank(), 3);
    }

    #[test]
    fn higher_roles_satisfy_lower_minimums() {
        for held in TeamRole::ALL {
            for required in TeamRole::ALL {
                assert_eq!(held.satisfies(required), held >= required);
            }
        }
    }

    #[test]
    fn manager_is_an_alias_for_captain() {
        assert_eq!("manager".parse::<TeamRole>(), Ok(TeamRole::Captain));
        assert_eq!("Captain".parse::<TeamRole>(), Ok(TeamRole::Captain));
        let parsed: TeamRole = serde_json::from_str("\"manager\"").expect("deserialize");
        assert_eq!(parsed, TeamRole::Captain);
    }

    #[test]
    fn unknown_team_role_is_rejected() {
        let err = "coach".parse::<TeamRole>().expect_err("should fail");
        assert_eq!(err.to_string(), "unknown role 'coach'");
    }

    #[test]
    fn global_role_defaults_to_member() {
        assert_eq!(GlobalRole::from_metadata(None), GlobalRole::Member);
        assert_eq!(GlobalRole::from_metadata(Some("superuser")), GlobalRole::Member);
        assert_eq!(GlobalRole::from_metadata(Some("admin")), GlobalRole::Admin);
    }

    #[test]
    fn role_serialization_format() {
        let json = serde_json::to_string(&GlobalRole::Admin).expect("serialize");
        assert_eq!(json, "\"admin\"");

        let json = serde_json::to_string(&TeamRole::Captain).expect("serialize");
        assert_eq!(json, "\"captain\"");
    }

    #[test]
    fn actions_below_admin_exclude_admin_only_actions() {
        let actions = TeamAction::available_below(TeamRole::Admin);
        assert!(actions.contains(&TeamAction::RecordScores));
        assert!(!actions.contains(&TeamAction::ManageMembers));
        assert!(!actions.contains(&TeamAction::ManageTeam));
    }

    #[test]
    fn actions_below_player_are_empty() {
        assert!(TeamAction::available_below(TeamRole::Player).is_empty());
        assert_eq!(
            TeamAction::available_to(TeamRole::Player),
            vec![TeamAction::ViewTeam, TeamAction::ViewMatches]
        );
    }
}
