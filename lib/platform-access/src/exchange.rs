//! Exchange of an external session assertion for internal session claims.
//!
//! The exchange talks to two collaborators:
//! - an [`IdentityProvider`], which validates the assertion and reports the
//!   subject's profile and trusted metadata
//! - a [`PlayerDirectory`], which maps the subject to an internal player
//!
//! Every collaborator call runs under a timeout. Elapsed timeouts and
//! unreachable providers fail closed.

use async_trait::async_trait;
use chrono::Duration;
use league_gate_core::{PlayerId, SubjectId};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::claims::{Claims, DEFAULT_TOKEN_VALIDITY_DAYS};
use crate::error::{DirectoryError, ExchangeError, ProviderError};
use crate::identity::{ContactChannel, Player, ProviderProfile, normalize_phone};

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates a provider session assertion and returns its subject.
    async fn authenticate_session(&self, assertion: &str) -> Result<SubjectId, ProviderError>;

    /// Fetches the subject's profile and trusted metadata.
    async fn fetch_profile(&self, subject: &SubjectId) -> Result<ProviderProfile, ProviderError>;
}

/// Lookup and linking of internal player records.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Finds a player by id.
    async fn find_by_id(&self, player: &PlayerId) -> Result<Option<Player>, DirectoryError>;

    /// Finds the player linked to `subject`.
    async fn find_by_subject(&self, subject: &SubjectId) -> Result<Option<Player>, DirectoryError>;

    /// Finds every player whose stored phone number matches `normalized_phone`.
    async fn find_by_phone(&self, normalized_phone: &str) -> Result<Vec<Player>, DirectoryError>;

    /// Links `player` to `subject`.
    ///
    /// Fails with `AlreadyLinked` if the player is linked to another subject
    /// or the subject is linked to another player.
    async fn link_subject(&self, player: &PlayerId, subject: &SubjectId)
    -> Result<(), DirectoryError>;

    /// Clears the link of `player` and returns the subject it had, if any.
    ///
    /// Fails with `PlayerNotFound` if no such player exists.
    async fn unlink_subject(&self, player: &PlayerId) -> Result<Option<SubjectId>, DirectoryError>;

    /// Lists players not linked to any identity, by last then first name.
    async fn list_unlinked(&self) -> Result<Vec<Player>, DirectoryError>;
}

/// Tunables for [`IdentityExchange`].
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    timeout: std::time::Duration,
    token_validity: Duration,
    link_by_phone: bool,
}

impl ExchangeSettings {
    /// Creates settings with the given collaborator timeout.
    #[must_use]
    pub fn new(timeout: std::time::Duration) -> Self {
        Self {
            timeout,
            token_validity: Duration::days(DEFAULT_TOKEN_VALIDITY_DAYS),
            link_by_phone: false,
        }
    }

    /// Sets the validity window of issued claims.
    #[must_use]
    pub fn with_token_validity(mut self, validity: Duration) -> Self {
        self.token_validity = validity;
        self
    }

    /// Enables linking unlinked players by verified phone number.
    #[must_use]
    pub fn with_link_by_phone(mut self, enabled: bool) -> Self {
        self.link_by_phone = enabled;
        self
    }

    /// Returns the collaborator timeout.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        self.timeout
    }
}

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeOutcome {
    claims: Claims,
    contact: Option<ContactChannel>,
    linked_by_phone: bool,
}

impl ExchangeOutcome {
    /// Returns the freshly issued claims.
    #[must_use]
    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Returns the verified contact channel, if the provider reported one.
    #[must_use]
    pub fn contact(&self) -> Option<&ContactChannel> {
        self.contact.as_ref()
    }

    /// Returns true if a player was linked during this exchange.
    #[must_use]
    pub fn linked_by_phone(&self) -> bool {
        self.linked_by_phone
    }

    /// Consumes the outcome, returning the claims.
    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.claims
    }
}

/// Exchanges provider assertions for internal claims.
#[derive(Clone)]
pub struct IdentityExchange {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn PlayerDirectory>,
    settings: ExchangeSettings,
}

impl IdentityExchange {
    /// Creates an exchange over the given collaborators.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn PlayerDirectory>,
        settings: ExchangeSettings,
    ) -> Self {
        Self {
            provider,
            directory,
            settings,
        }
    }

    /// Returns the exchange settings.
    #[must_use]
    pub fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }

    /// Exchanges `assertion` using the configured timeout.
    ///
    /// # Errors
    ///
    /// See [`IdentityExchange::exchange_within`].
    pub async fn exchange(&self, assertion: &str) -> Result<ExchangeOutcome, ExchangeError> {
        self.exchange_within(assertion, self.settings.timeout).await
    }

    /// Exchanges `assertion`, bounding each collaborator call by `timeout`.
    ///
    /// A subject with no linked player is not an error; the claims simply
    /// carry no player id.
    ///
    /// # Errors
    ///
    /// - `InvalidSession` if the assertion is empty or the provider rejects it
    /// - `UpstreamUnavailable` if the provider is unreachable or any call
    ///   times out
    /// - `ProfileUnavailable` if the profile or player lookup fails
    #[instrument(skip(self, assertion))]
    pub async fn exchange_within(
        &self,
        assertion: &str,
        timeout: std::time::Duration,
    ) -> Result<ExchangeOutcome, ExchangeError> {
        if assertion.trim().is_empty() {
            return Err(ExchangeError::InvalidSession);
        }

        let subject = bounded(timeout, self.provider.authenticate_session(assertion))
            .await?
            .map_err(|e| match e {
                ProviderError::Unavailable { details } => {
                    ExchangeError::UpstreamUnavailable { details }
                }
                ProviderError::Rejected { .. } | ProviderError::InvalidResponse { .. } => {
                    warn!(error = %e, "identity provider rejected session");
                    ExchangeError::InvalidSession
                }
            })?;

        let profile = bounded(timeout, self.provider.fetch_profile(&subject))
            .await?
            .map_err(|e| ExchangeError::ProfileUnavailable {
                details: e.to_string(),
            })?;

        let player = bounded(timeout, self.directory.find_by_subject(&subject))
            .await?
            .map_err(|e| ExchangeError::ProfileUnavailable {
                details: e.to_string(),
            })?;

        let contact = profile.contact_channel();
        let mut linked_by_phone = false;
        let player_id = match player {
            Some(player) => Some(player.id().clone()),
            None if self.settings.link_by_phone => {
                let linked = match contact.as_ref().and_then(ContactChannel::phone) {
                    Some(phone) => self.link_by_phone(&subject, phone, timeout).await,
                    None => None,
                };
                linked_by_phone = linked.is_some();
                linked
            }
            None => None,
        };

        let claims = Claims::issue(
            subject,
            player_id,
            profile.global_role(),
            self.settings.token_validity,
        );

        info!(
            subject = %claims.subject(),
            player_linked = claims.player_id().is_some(),
            linked_by_phone,
            role = %claims.global_role(),
            "identity exchanged"
        );

        Ok(ExchangeOutcome {
            claims,
            contact,
            linked_by_phone,
        })
    }

    /// Re-issues `claims` with a player id once the subject has been linked.
    ///
    /// Returns `None` if the claims already carry a player or the subject is
    /// still unlinked.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamUnavailable` on timeout and `ProfileUnavailable` if
    /// the lookup fails.
    #[instrument(skip(self, claims), fields(subject = %claims.subject()))]
    pub async fn refresh_link(&self, claims: &Claims) -> Result<Option<Claims>, ExchangeError> {
        if claims.player_id().is_some() {
            return Ok(None);
        }

        let player = bounded(
            self.settings.timeout,
            self.directory.find_by_subject(claims.subject()),
        )
        .await?
        .map_err(|e| ExchangeError::ProfileUnavailable {
            details: e.to_string(),
        })?;

        Ok(player.map(|p| claims.reissue_for_player(p.id().clone())))
    }

    /// Links the single unlinked player that owns `phone`, if there is one.
    ///
    /// Linking is best effort: every failure is logged and yields `None`.
    async fn link_by_phone(
        &self,
        subject: &SubjectId,
        phone: &str,
        timeout: std::time::Duration,
    ) -> Option<PlayerId> {
        let normalized = normalize_phone(phone);
        let candidates = match bounded(timeout, self.directory.find_by_phone(&normalized)).await {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(e)) => {
                warn!(subject = %subject, error = %e, "phone lookup failed");
                return None;
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "phone lookup timed out");
                return None;
            }
        };

        let [candidate] = candidates.as_slice() else {
            if candidates.len() > 1 {
                warn!(subject = %subject, matches = candidates.len(), "ambiguous phone match; not linking");
            }
            return None;
        };
        if candidate.is_linked() {
            return None;
        }

        match bounded(timeout, self.directory.link_subject(candidate.id(), subject)).await {
            Ok(Ok(())) => {
                info!(subject = %subject, player_id = %candidate.id(), "linked player by phone");
                Some(candidate.id().clone())
            }
            Ok(Err(e)) => {
                warn!(subject = %subject, player_id = %candidate.id(), error = %e, "failed to link player");
                None
            }
            Err(e) => {
                warn!(subject = %subject, error = %e, "player link timed out");
                None
            }
        }
    }
}

async fn bounded<T>(
    timeout: std::time::Duration,
    call: impl Future<Output = T>,
) -> Result<T, ExchangeError> {
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| ExchangeError::UpstreamUnavailable {
            details: format!("no response within {}ms", timeout.as_millis()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::GlobalRole;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        sessions: HashMap<String, Result<SubjectId, ProviderError>>,
        profiles: HashMap<SubjectId, ProviderProfile>,
        stall: bool,
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn authenticate_session(&self, assertion: &str) -> Result<SubjectId, ProviderError> {
            if self.stall {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            }
            self.sessions
                .get(assertion)
                .cloned()
                .unwrap_or(Err(ProviderError::Rejected { status: 401 }))
        }

        async fn fetch_profile(&self, subject: &SubjectId) -> Result<ProviderProfile, ProviderError> {
            self.profiles
                .get(subject)
                .cloned()
                .ok_or(ProviderError::Rejected { status: 404 })
        }
    }

    #[derive(Default)]
    struct FakeDirectory {
        players: Mutex<Vec<Player>>,
    }

    impl FakeDirectory {
        fn with(players: Vec<Player>) -> Self {
            Self {
                players: Mutex::new(players),
            }
        }

        fn subject_of(&self, id: &str) -> Option<SubjectId> {
            let players = self.players.lock().expect("lock");
            players
                .iter()
                .find(|p| p.id().as_str() == id)
                .and_then(|p| p.subject().cloned())
        }
    }

    #[async_trait]
    impl PlayerDirectory for FakeDirectory {
        async fn find_by_id(&self, player: &PlayerId) -> Result<Option<Player>, DirectoryError> {
            let players = self.players.lock().expect("lock");
            Ok(players.iter().find(|p| p.id() == player).cloned())
        }

        async fn find_by_subject(&self, subject: &SubjectId) -> Result<Option<Player>, DirectoryError> {
            let players = self.players.lock().expect("lock");
            Ok(players.iter().find(|p| p.subject() == Some(subject)).cloned())
        }

        async fn find_by_phone(&self, normalized_phone: &str) -> Result<Vec<Player>, DirectoryError> {
            let players = self.players.lock().expect("lock");
            Ok(players
                .iter()
                .filter(|p| p.matches_phone(normalized_phone))
                .cloned()
                .collect())
        }

        async fn link_subject(
            &self,
            player: &PlayerId,
            subject: &SubjectId,
        ) -> Result<(), DirectoryError> {
            let mut players = self.players.lock().expect("lock");
            let slot = players
                .iter_mut()
                .find(|p| p.id() == player)
                .ok_or_else(|| DirectoryError::PlayerNotFound {
                    player_id: player.to_string(),
                })?;
            *slot = slot.clone().with_subject(subject.clone());
            Ok(())
        }

        async fn unlink_subject(&self, player: &PlayerId) -> Result<Option<SubjectId>, DirectoryError> {
            let mut players = self.players.lock().expect("lock");
            let slot = players
                .iter_mut()
                .find(|p| p.id() == player)
                .ok_or_else(|| DirectoryError::PlayerNotFound {
                    player_id: player.to_string(),
                })?;
            let previous = slot.subject().cloned();
            *slot = slot.clone().without_subject();
            Ok(previous)
        }

        async fn list_unlinked(&self) -> Result<Vec<Player>, DirectoryError> {
            let players = self.players.lock().expect("lock");
            Ok(players.iter().filter(|p| !p.is_linked()).cloned().collect())
        }
    }

    fn provider_for(subject: &str, profile: ProviderProfile) -> FakeProvider {
        let mut provider = FakeProvider::default();
        provider
            .sessions
            .insert("assertion".to_string(), Ok(SubjectId::new(subject)));
        provider.profiles.insert(SubjectId::new(subject), profile);
        provider
    }

    fn exchange(provider: FakeProvider, directory: Arc<FakeDirectory>, link: bool) -> IdentityExchange {
        IdentityExchange::new(
            Arc::new(provider),
            directory,
            ExchangeSettings::new(std::time::Duration::from_millis(200)).with_link_by_phone(link),
        )
    }

    #[tokio::test]
    async fn linked_player_and_role_flow_into_claims() {
        let profile = ProviderProfile::new(SubjectId::new("s-1"))
            .with_role_metadata(Some("admin".to_string()))
            .with_verified_email(Some("a@example.com".to_string()));
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-1"), "Ada".into(), "L".into()).with_subject(SubjectId::new("s-1")),
        ]));

        let outcome = exchange(provider_for("s-1", profile), directory, false)
            .exchange("assertion")
            .await
            .expect("exchange");

        let claims = outcome.claims();
        assert_eq!(claims.subject(), &SubjectId::new("s-1"));
        assert_eq!(claims.player_id(), Some(&PlayerId::new("p-1")));
        assert_eq!(claims.role(), Some(GlobalRole::Admin));
        assert_eq!(claims.exp() - claims.iat(), 30 * 24 * 60 * 60);
        assert_eq!(
            outcome.contact(),
            Some(&ContactChannel::Email("a@example.com".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_player_is_not_an_error() {
        let profile = ProviderProfile::new(SubjectId::new("s-2"));
        let outcome = exchange(provider_for("s-2", profile), Arc::default(), false)
            .exchange("assertion")
            .await
            .expect("exchange");

        assert!(outcome.claims().player_id().is_none());
        assert_eq!(outcome.claims().role(), Some(GlobalRole::Member));
    }

    #[tokio::test]
    async fn each_exchange_mints_a_distinct_token_id() {
        let profile = ProviderProfile::new(SubjectId::new("s-2"));
        let exchange = exchange(provider_for("s-2", profile), Arc::default(), false);

        let first = exchange.exchange("assertion").await.expect("exchange");
        let second = exchange.exchange("assertion").await.expect("exchange");
        assert_ne!(first.claims().token_id(), second.claims().token_id());
    }

    #[tokio::test]
    async fn rejected_assertion_is_invalid_session() {
        let exchange = exchange(FakeProvider::default(), Arc::default(), false);

        assert_eq!(
            exchange.exchange("unknown").await,
            Err(ExchangeError::InvalidSession)
        );
        assert_eq!(exchange.exchange("  ").await, Err(ExchangeError::InvalidSession));
    }

    #[tokio::test]
    async fn unreachable_provider_fails_closed() {
        let mut provider = FakeProvider::default();
        provider.sessions.insert(
            "assertion".to_string(),
            Err(ProviderError::Unavailable {
                details: "connection refused".to_string(),
            }),
        );

        let err = exchange(provider, Arc::default(), false)
            .exchange("assertion")
            .await
            .expect_err("should fail");
        assert!(matches!(err, ExchangeError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let provider = FakeProvider {
            stall: true,
            ..FakeProvider::default()
        };

        let err = exchange(provider, Arc::default(), false)
            .exchange_within("assertion", std::time::Duration::from_millis(10))
            .await
            .expect_err("should time out");
        assert!(matches!(err, ExchangeError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn missing_profile_is_profile_unavailable() {
        let mut provider = FakeProvider::default();
        provider
            .sessions
            .insert("assertion".to_string(), Ok(SubjectId::new("s-3")));

        let err = exchange(provider, Arc::default(), false)
            .exchange("assertion")
            .await
            .expect_err("should fail");
        assert!(matches!(err, ExchangeError::ProfileUnavailable { .. }));
    }

    #[tokio::test]
    async fn unique_unlinked_phone_match_is_linked() {
        let profile = ProviderProfile::new(SubjectId::new("s-4"))
            .with_verified_phone(Some("+1 (555) 010-2000".to_string()));
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-4"), "Grace".into(), "H".into()).with_phone_number("5550102000"),
        ]));

        let outcome = exchange(provider_for("s-4", profile), directory.clone(), true)
            .exchange("assertion")
            .await
            .expect("exchange");

        assert!(outcome.linked_by_phone());
        assert_eq!(outcome.claims().player_id(), Some(&PlayerId::new("p-4")));
        assert_eq!(directory.subject_of("p-4"), Some(SubjectId::new("s-4")));
    }

    #[tokio::test]
    async fn ambiguous_phone_match_is_not_linked() {
        let profile = ProviderProfile::new(SubjectId::new("s-5"))
            .with_verified_phone(Some("5550102000".to_string()));
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-a"), "A".into(), "A".into()).with_phone_number("5550102000"),
            Player::new(PlayerId::new("p-b"), "B".into(), "B".into()).with_phone_number("15550102000"),
        ]));

        let outcome = exchange(provider_for("s-5", profile), directory.clone(), true)
            .exchange("assertion")
            .await
            .expect("exchange");

        assert!(!outcome.linked_by_phone());
        assert!(outcome.claims().player_id().is_none());
        assert_eq!(directory.subject_of("p-a"), None);
    }

    #[tokio::test]
    async fn phone_match_linked_elsewhere_is_left_alone() {
        let profile = ProviderProfile::new(SubjectId::new("s-6"))
            .with_verified_phone(Some("5550102000".to_string()));
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-6"), "C".into(), "C".into())
                .with_phone_number("5550102000")
                .with_subject(SubjectId::new("someone-else")),
        ]));

        let outcome = exchange(provider_for("s-6", profile), directory.clone(), true)
            .exchange("assertion")
            .await
            .expect("exchange");

        assert!(outcome.claims().player_id().is_none());
        assert_eq!(directory.subject_of("p-6"), Some(SubjectId::new("someone-else")));
    }

    #[tokio::test]
    async fn phone_linking_is_off_unless_enabled() {
        let profile = ProviderProfile::new(SubjectId::new("s-7"))
            .with_verified_phone(Some("5550102000".to_string()));
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-7"), "D".into(), "D".into()).with_phone_number("5550102000"),
        ]));

        let outcome = exchange(provider_for("s-7", profile), directory.clone(), false)
            .exchange("assertion")
            .await
            .expect("exchange");

        assert!(outcome.claims().player_id().is_none());
        assert_eq!(directory.subject_of("p-7"), None);
    }

    #[tokio::test]
    async fn refresh_link_picks_up_a_later_link() {
        let directory = Arc::new(FakeDirectory::with(vec![
            Player::new(PlayerId::new("p-8"), "E".into(), "E".into()).with_subject(SubjectId::new("s-8")),
        ]));
        let exchange = exchange(FakeProvider::default(), directory, false);
        let unlinked = Claims::issue(SubjectId::new("s-8"), None, GlobalRole::Member, Duration::days(30));

        let refreshed = exchange
            .refresh_link(&unlinked)
            .await
            .expect("refresh")
            .expect("now linked");
        assert_eq!(refreshed.player_id(), Some(&PlayerId::new("p-8")));

        assert_eq!(exchange.refresh_link(&refreshed).await, Ok(None));
    }
}
