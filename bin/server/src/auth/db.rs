//! Database repositories for players and team memberships.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use league_gate_authz::{Membership, MembershipError, MembershipStore};
use league_gate_core::{MembershipId, PlayerId, SubjectId, TeamId};
use league_gate_platform_access::{DirectoryError, Player, PlayerDirectory, TeamRole};
use rootcause::prelude::Report;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tracing::instrument;

use crate::error::{StoreError, directory_error, membership_error};

fn decode<T, E: std::fmt::Display>(
    column: &'static str,
    value: &str,
    parsed: Result<T, E>,
) -> Result<T, StoreError> {
    parsed.map_err(|e| StoreError::Decode {
        column,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Row type for player queries.
#[derive(FromRow)]
struct PlayerRow {
    id: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    auth_subject: Option<String>,
    created_at: DateTime<Utc>,
}

impl PlayerRow {
    fn try_into_player(self) -> Result<Player, StoreError> {
        let id = decode("player id", &self.id, PlayerId::from_str(&self.id))?;
        let subject = self
            .auth_subject
            .as_deref()
            .map(|s| decode("auth subject", s, SubjectId::from_str(s)))
            .transpose()?;

        Ok(Player::with_all_fields(
            id,
            subject,
            self.first_name,
            self.last_name,
            self.phone_number,
            self.created_at,
        ))
    }
}

/// Row type for membership queries.
#[derive(FromRow)]
struct MembershipRow {
    id: String,
    team_id: String,
    player_id: String,
    role: String,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, StoreError> {
        let membership = Membership::new(
            decode("membership id", &self.id, MembershipId::from_str(&self.id))?,
            decode("team id", &self.team_id, TeamId::from_str(&self.team_id))?,
            decode("player id", &self.player_id, PlayerId::from_str(&self.player_id))?,
            decode("role", &self.role, TeamRole::from_str(&self.role))?,
            self.joined_at,
        );
        Ok(match self.left_at {
            Some(left_at) => membership.with_left_at(left_at),
            None => membership,
        })
    }
}

fn players_matching_phone(
    rows: Vec<PlayerRow>,
    normalized_phone: &str,
) -> Result<Vec<Player>, StoreError> {
    let mut players = Vec::with_capacity(rows.len());
    for row in rows {
        let player = row.try_into_player()?;
        if player.matches_phone(normalized_phone) {
            players.push(player);
        }
    }
    Ok(players)
}

/// Repository for player records.
#[derive(Clone)]
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    /// Creates a new player repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a player by id.
    #[instrument(skip(self), fields(player_id = %player))]
    pub async fn find_by_id(&self, player: &PlayerId) -> Result<Option<Player>, Report<StoreError>> {
        let row: Option<PlayerRow> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, phone_number, auth_subject, created_at
            FROM players
            WHERE id = $1
            "#,
        )
        .bind(player.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(PlayerRow::try_into_player).transpose()?)
    }

    /// Finds the player linked to a provider subject.
    #[instrument(skip(self), fields(subject = %subject))]
    pub async fn find_by_subject(
        &self,
        subject: &SubjectId,
    ) -> Result<Option<Player>, Report<StoreError>> {
        let row: Option<PlayerRow> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, phone_number, auth_subject, created_at
            FROM players
            WHERE auth_subject = $1
            "#,
        )
        .bind(subject.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(row.map(PlayerRow::try_into_player).transpose()?)
    }

    /// Finds every player whose normalized phone number matches.
    ///
    /// `normalized_phone` is a generated column, so rows written by any
    /// client are matched. Rows are re-checked with [`Player::matches_phone`]
    /// in case the column and [`normalize_phone`] ever disagree.
    ///
    /// [`normalize_phone`]: league_gate_platform_access::normalize_phone
    #[instrument(skip(self, normalized_phone))]
    pub async fn find_by_phone(
        &self,
        normalized_phone: &str,
    ) -> Result<Vec<Player>, Report<StoreError>> {
        let rows: Vec<PlayerRow> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, phone_number, auth_subject, created_at
            FROM players
            WHERE normalized_phone = $1
            "#,
        )
        .bind(normalized_phone)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(players_matching_phone(rows, normalized_phone)?)
    }

    /// Links `player` to `subject` unless it is linked to someone else.
    ///
    /// Returns `Ok(false)` if nothing was updated; the caller decides whether
    /// the player is missing or already linked.
    #[instrument(skip(self), fields(player_id = %player, subject = %subject))]
    pub async fn link_subject(
        &self,
        player: &PlayerId,
        subject: &SubjectId,
    ) -> Result<bool, Report<StoreError>> {
        let result = sqlx::query(
            r#"
            UPDATE players
            SET auth_subject = $2
            WHERE id = $1 AND (auth_subject IS NULL OR auth_subject = $2)
            "#,
        )
        .bind(player.as_str())
        .bind(subject.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(result.rows_affected() > 0)
    }

    /// Clears the subject of `player`.
    ///
    /// Returns None if the player does not exist, otherwise the subject it
    /// was linked to before the update.
    #[instrument(skip(self), fields(player_id = %player))]
    pub async fn unlink_subject(
        &self,
        player: &PlayerId,
    ) -> Result<Option<Option<String>>, Report<StoreError>> {
        let previous: Option<Option<String>> = sqlx::query_scalar(
            r#"
            UPDATE players AS p
            SET auth_subject = NULL
            FROM (SELECT id, auth_subject FROM players WHERE id = $1 FOR UPDATE) AS old
            WHERE p.id = old.id
            RETURNING old.auth_subject
            "#,
        )
        .bind(player.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(previous)
    }

    /// Lists players without a linked subject, by last then first name.
    #[instrument(skip(self))]
    pub async fn list_unlinked(&self) -> Result<Vec<Player>, Report<StoreError>> {
        let rows: Vec<PlayerRow> = sqlx::query_as(
            r#"
            SELECT id, first_name, last_name, phone_number, auth_subject, created_at
            FROM players
            WHERE auth_subject IS NULL
            ORDER BY last_name, first_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(PlayerRow::try_into_player)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Returns true if a player with `id` exists.
    pub async fn exists(&self, player: &PlayerId) -> Result<bool, Report<StoreError>> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM players WHERE id = $1)")
                .bind(player.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from)?;
        Ok(exists)
    }
}

/// [`PlayerDirectory`] backed by Postgres.
#[derive(Clone)]
pub struct PgPlayerDirectory {
    players: PlayerRepository,
}

impl PgPlayerDirectory {
    /// Creates a directory over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            players: PlayerRepository::new(pool),
        }
    }
}

#[async_trait]
impl PlayerDirectory for PgPlayerDirectory {
    async fn find_by_id(&self, player: &PlayerId) -> Result<Option<Player>, DirectoryError> {
        self.players.find_by_id(player).await.map_err(directory_error)
    }

    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Option<Player>, DirectoryError> {
        self.players
            .find_by_subject(subject)
            .await
            .map_err(directory_error)
    }

    async fn find_by_phone(&self, normalized_phone: &str) -> Result<Vec<Player>, DirectoryError> {
        self.players
            .find_by_phone(normalized_phone)
            .await
            .map_err(directory_error)
    }

    async fn link_subject(
        &self,
        player: &PlayerId,
        subject: &SubjectId,
    ) -> Result<(), DirectoryError> {
        let holder = self
            .players
            .find_by_subject(subject)
            .await
            .map_err(directory_error)?;
        if holder.is_some_and(|holder| holder.id() != player) {
            return Err(DirectoryError::AlreadyLinked {
                player_id: player.to_string(),
            });
        }

        if self
            .players
            .link_subject(player, subject)
            .await
            .map_err(directory_error)?
        {
            return Ok(());
        }

        let exists = self.players.exists(player).await.map_err(directory_error)?;
        Err(if exists {
            DirectoryError::AlreadyLinked {
                player_id: player.to_string(),
            }
        } else {
            DirectoryError::PlayerNotFound {
                player_id: player.to_string(),
            }
        })
    }

    async fn unlink_subject(&self, player: &PlayerId) -> Result<Option<SubjectId>, DirectoryError> {
        let previous = self
            .players
            .unlink_subject(player)
            .await
            .map_err(directory_error)?
            .ok_or_else(|| DirectoryError::PlayerNotFound {
                player_id: player.to_string(),
            })?;

        previous
            .as_deref()
            .map(|s| decode("auth subject", s, SubjectId::from_str(s)))
            .transpose()
            .map_err(|e| DirectoryError::Storage {
                details: e.to_string(),
            })
    }

    async fn list_unlinked(&self) -> Result<Vec<Player>, DirectoryError> {
        self.players.list_unlinked().await.map_err(directory_error)
    }
}

/// Repository for team memberships.
#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    /// Creates a new membership repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists every membership row for the pair, ended ones included.
    #[instrument(skip(self), fields(player_id = %player, team_id = %team))]
    pub async fn list_for_pair(
        &self,
        player: &PlayerId,
        team: &TeamId,
    ) -> Result<Vec<Membership>, Report<StoreError>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, player_id, role, joined_at, left_at
            FROM team_memberships
            WHERE player_id = $1 AND team_id = $2
            "#,
        )
        .bind(player.as_str())
        .bind(team.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(MembershipRow::try_into_membership)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Lists every membership row for `player`, ended ones included.
    #[instrument(skip(self), fields(player_id = %player))]
    pub async fn list_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<Membership>, Report<StoreError>> {
        let rows: Vec<MembershipRow> = sqlx::query_as(
            r#"
            SELECT id, team_id, player_id, role, joined_at, left_at
            FROM team_memberships
            WHERE player_id = $1
            ORDER BY team_id, joined_at
            "#,
        )
        .bind(player.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)?;

        Ok(rows
            .into_iter()
            .map(MembershipRow::try_into_membership)
            .collect::<Result<Vec<_>, _>>()?)
    }
}

/// [`MembershipStore`] backed by Postgres.
#[derive(Clone)]
pub struct PgMembershipStore {
    memberships: MembershipRepository,
}

impl PgMembershipStore {
    /// Creates a store over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            memberships: MembershipRepository::new(pool),
        }
    }
}

#[async_trait]
impl MembershipStore for PgMembershipStore {
    async fn memberships_for(
        &self,
        player: &PlayerId,
        team: &TeamId,
    ) -> Result<Vec<Membership>, MembershipError> {
        self.memberships
            .list_for_pair(player, team)
            .await
            .map_err(membership_error)
    }

    async fn memberships_for_player(
        &self,
        player: &PlayerId,
    ) -> Result<Vec<Membership>, MembershipError> {
        self.memberships
            .list_for_player(player)
            .await
            .map_err(membership_error)
    }
}
