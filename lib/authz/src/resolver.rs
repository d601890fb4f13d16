//! Resolution of a player's active role within a team.

use league_gate_core::{PlayerId, TeamId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::cache::MembershipCache;
use crate::error::MembershipError;
use crate::membership::{Membership, MembershipStore, select_active};

/// Maps (player, team) to the active membership, if any.
///
/// Every store call is bounded by the resolver timeout. An attached cache
/// only remembers misses, so grants always reflect the store. A membership
/// created without calling [`MembershipResolver::invalidate`] may stay
/// denied for up to the cache TTL.
#[derive(Clone)]
pub struct MembershipResolver {
    store: Arc<dyn MembershipStore>,
    cache: Option<Arc<MembershipCache>>,
    timeout: Duration,
}

impl MembershipResolver {
    /// Creates an uncached resolver.
    #[must_use]
    pub fn new(store: Arc<dyn MembershipStore>, timeout: Duration) -> Self {
        Self {
            store,
            cache: None,
            timeout,
        }
    }

    /// Attaches an advisory cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<MembershipCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Returns the store timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves the active membership of `player` on `team`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails and `Timeout` if it does not
    /// answer in time.
    #[instrument(skip(self), fields(player_id = %player, team_id = %team))]
    pub async fn resolve(
        &self,
        player: &PlayerId,
        team: &TeamId,
    ) -> Result<Option<Membership>, MembershipError> {
        let observed = match self.cache.as_ref() {
            Some(cache) if cache.is_denied(player, team) => {
                debug!("membership cache miss served");
                return Ok(None);
            }
            Some(cache) => Some(cache.generation()),
            None => None,
        };

        let rows = self.bounded(self.store.memberships_for(player, team)).await?;
        // Stores may hand back rows for other pairs; only this pair counts.
        let selected = select_active(
            rows.into_iter()
                .filter(|m| m.player_id() == player && m.team_id() == team)
                .collect(),
        );

        if let (Some(cache), Some(observed), None) = (self.cache.as_ref(), observed, selected.as_ref()) {
            cache.record_miss(player, team, observed);
        }
        debug!(found = selected.is_some(), "membership resolved");
        Ok(selected)
    }

    /// Lists every active membership of `player`, one per team.
    ///
    /// The cache is never consulted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails and `Timeout` if it does not
    /// answer in time.
    #[instrument(skip(self), fields(player_id = %player))]
    pub async fn resolve_all(&self, player: &PlayerId) -> Result<Vec<Membership>, MembershipError> {
        let rows = self.bounded(self.store.memberships_for_player(player)).await?;

        let mut by_team: Vec<(TeamId, Vec<Membership>)> = Vec::new();
        for row in rows.into_iter().filter(|m| m.player_id() == player) {
            match by_team.iter_mut().find(|(team, _)| team == row.team_id()) {
                Some((_, group)) => group.push(row),
                None => by_team.push((row.team_id().clone(), vec![row])),
            }
        }

        let memberships: Vec<Membership> = by_team
            .into_iter()
            .filter_map(|(_, group)| select_active(group))
            .collect();
        debug!(count = memberships.len(), "memberships listed");
        Ok(memberships)
    }

    /// Drops any cached miss for the pair. Call after every write.
    pub fn invalidate(&self, player: &PlayerId, team: &TeamId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(player, team);
        }
    }

    /// Drops every cached miss for `player`.
    pub fn invalidate_player(&self, player: &PlayerId) {
        if let Some(cache) = &self.cache {
            cache.invalidate_player(player);
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, MembershipError>>,
    ) -> Result<T, MembershipError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| MembershipError::Timeout {
                millis: self.timeout.as_millis(),
            })?
    }
}
