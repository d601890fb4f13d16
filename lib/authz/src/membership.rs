//! Team membership records and the store they are read from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use league_gate_core::{MembershipId, PlayerId, TeamId};
use league_gate_platform_access::TeamRole;
use serde::{Deserialize, Serialize};

use crate::error::MembershipError;

/// A player's role within one team, bounded by join and leave timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    id: MembershipId,
    team_id: TeamId,
    player_id: PlayerId,
    role: TeamRole,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

impl Membership {
    /// Creates an active membership.
    #[must_use]
    pub fn new(
        id: MembershipId,
        team_id: TeamId,
        player_id: PlayerId,
        role: TeamRole,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            team_id,
            player_id,
            role,
            joined_at,
            left_at: None,
        }
    }

    /// Marks the membership as ended at `left_at`.
    #[must_use]
    pub fn with_left_at(mut self, left_at: DateTime<Utc>) -> Self {
        self.left_at = Some(left_at);
        self
    }

    /// Returns the membership id.
    #[must_use]
    pub fn id(&self) -> &MembershipId {
        &self.id
    }

    /// Returns the team.
    #[must_use]
    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    /// Returns the player.
    #[must_use]
    pub fn player_id(&self) -> &PlayerId {
        &self.player_id
    }

    /// Returns the role held within the team.
    #[must_use]
    pub fn role(&self) -> TeamRole {
        self.role
    }

    /// Returns when the player joined.
    #[must_use]
    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    /// Returns when the player left, if they have.
    #[must_use]
    pub fn left_at(&self) -> Option<DateTime<Utc>> {
        self.left_at
    }

    /// Returns true if the membership has not ended.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Read access to stored memberships.
///
/// Implementations may return inactive or duplicate rows; the resolver
/// filters and orders them.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Returns the memberships recorded for `player` on `team`.
    async fn memberships_for(
        &self,
        player: &PlayerId,
        team: &TeamId,
    ) -> Result<Vec<Membership>, MembershipError>;

    /// Returns every membership recorded for `player`.
    async fn memberships_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<Membership>, MembershipError>;
}

/// Picks the active membership to honour from a set of rows for one pair.
///
/// Ended rows are discarded. If more than one active row remains, the most
/// recently joined wins.
#[must_use]
pub fn select_active(rows: Vec<Membership>) -> Option<Membership> {
    rows.into_iter()
        .filter(Membership::is_active)
        .max_by_key(Membership::joined_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(id: &str, role: TeamRole, joined_days_ago: i64) -> Membership {
        Membership::new(
            MembershipId::new(id),
            TeamId::new("T1"),
            PlayerId::new("p-1"),
            role,
            Utc::now() - Duration::days(joined_days_ago),
        )
    }

    #[test]
    fn ended_membership_is_inactive() {
        let ended = row("m-1", TeamRole::Player, 10).with_left_at(Utc::now());
        assert!(!ended.is_active());
        assert!(ended.left_at().is_some());
    }

    #[test]
    fn select_skips_ended_rows_even_when_newer() {
        let older_active = row("m-1", TeamRole::Player, 30);
        let newer_ended = row("m-2", TeamRole::Admin, 1).with_left_at(Utc::now());

        let selected = select_active(vec![newer_ended, older_active.clone()]);
        assert_eq!(selected, Some(older_active));
    }

    #[test]
    fn select_returns_none_when_all_rows_ended() {
        let ended = row("m-1", TeamRole::Captain, 5).with_left_at(Utc::now());
        assert_eq!(select_active(vec![ended]), None);
        assert_eq!(select_active(Vec::new()), None);
    }

    #[test]
    fn select_prefers_most_recently_joined() {
        let older = row("m-1", TeamRole::Admin, 20);
        let newer = row("m-2", TeamRole::Player, 2);

        let selected = select_active(vec![older, newer.clone()]).expect("active row");
        assert_eq!(selected.id(), newer.id());
        assert_eq!(selected.role(), TeamRole::Player);
    }

    #[test]
    fn membership_serialization_format() {
        let json = serde_json::to_value(row("m-1", TeamRole::Captain, 1)).expect("serialize");
        assert_eq!(json["teamId"], "T1");
        assert_eq!(json["role"], "captain");
        assert!(json["leftAt"].is_null());
    }
}
