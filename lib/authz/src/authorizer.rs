//! The per-request authorization pipeline.
//!
//! Stages run in a fixed order and stop at the first denial:
//!
//! 1. choose the credential (shared secret or session token)
//! 2. verify it and build the [`Principal`]
//! 3. for team routes, find the team id, then resolve the caller's active
//!    membership and compare its role against the route minimum
//!
//! Any failure to decide, including a panic inside the pipeline, denies the
//! request. Every denial is written to the audit log with the stage it
//! happened in.

use futures::FutureExt;
use league_gate_core::{PlayerId, SecretString, SubjectId, TeamId};
use league_gate_platform_access::ClaimsCodec;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, instrument, warn};

use crate::context::{AuthorizationContext, AuthorizationDecision, Principal};
use crate::credential::{Credential, CredentialSources};
use crate::denial::{Denial, DenialReason};
use crate::resolver::MembershipResolver;
use crate::route::{Access, RouteRequirement, scan_team_id};

/// Process-wide switches that shape the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    shared_secret: Option<SecretString>,
    secret_mutations_enabled: bool,
}

impl AccessPolicy {
    /// Creates a policy with the shared secret disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the shared administrative secret. Empty secrets are ignored.
    #[must_use]
    pub fn with_shared_secret(mut self, secret: Option<SecretString>) -> Self {
        self.shared_secret = secret.filter(|s| !s.is_empty());
        self
    }

    /// Enables or disables shared-secret access to mutating routes.
    #[must_use]
    pub fn with_secret_mutations(mut self, enabled: bool) -> Self {
        self.secret_mutations_enabled = enabled;
        self
    }

    /// Returns true if the secret header is honored on a route with
    /// `requirement`.
    #[must_use]
    pub fn secret_gate_open(&self, requirement: &RouteRequirement) -> bool {
        requirement.allows_shared_secret()
            && self.secret_mutations_enabled
            && self.shared_secret.is_some()
    }
}

/// One request as seen by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    route: String,
    path: String,
    route_values: Vec<(String, String)>,
    sources: CredentialSources,
}

impl AccessRequest {
    /// Creates a request for the concrete `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Sets the matched route template.
    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    /// Adds a named route value.
    #[must_use]
    pub fn with_route_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_values.push((name.into(), value.into()));
        self
    }

    /// Sets the credential sources.
    #[must_use]
    pub fn with_sources(mut self, sources: CredentialSources) -> Self {
        self.sources = sources;
        self
    }

    /// Returns the matched route template.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Returns the concrete request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the route value bound to `name`.
    #[must_use]
    pub fn route_value(&self, name: &str) -> Option<&str> {
        self.route_values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the credential sources.
    #[must_use]
    pub fn sources(&self) -> &CredentialSources {
        &self.sources
    }
}

/// Pipeline stage, recorded on every denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStage {
    /// Choosing and verifying the credential.
    #[default]
    Authenticate,
    /// Determining the team id.
    TeamScope,
    /// Looking up the membership.
    Membership,
    /// Comparing roles.
    RoleCheck,
    /// Checking global administrator status.
    GlobalAdmin,
}

impl PipelineStage {
    /// Stable name written to audit logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::TeamScope => "team_scope",
            Self::Membership => "membership",
            Self::RoleCheck => "role_check",
            Self::GlobalAdmin => "global_admin",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline has learned so far, for the audit record.
#[derive(Debug, Default)]
struct Trail {
    stage: PipelineStage,
    subject: Option<SubjectId>,
    player_id: Option<PlayerId>,
    team_id: Option<TeamId>,
}

/// Runs the authorization pipeline.
#[derive(Clone)]
pub struct Authorizer {
    codec: ClaimsCodec,
    resolver: MembershipResolver,
    policy: AccessPolicy,
}

impl Authorizer {
    /// Creates an authorizer.
    #[must_use]
    pub fn new(codec: ClaimsCodec, resolver: MembershipResolver, policy: AccessPolicy) -> Self {
        Self {
            codec,
            resolver,
            policy,
        }
    }

    /// Returns the claims codec.
    #[must_use]
    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }

    /// Returns the membership resolver.
    #[must_use]
    pub fn resolver(&self) -> &MembershipResolver {
        &self.resolver
    }

    /// Returns the access policy.
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Decides whether `request` may reach a route with `requirement`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` if the caller cannot be identified or the
    /// decision cannot be made, and `Unauthorized` if the caller is known but
    /// lacks the required access.
    #[instrument(skip_all, fields(route = %request.route()))]
    pub async fn authorize(
        &self,
        request: &AccessRequest,
        requirement: &RouteRequirement,
    ) -> Result<AuthorizationContext, Denial> {
        let mut trail = Trail::default();
        let outcome = AssertUnwindSafe(self.evaluate(request, requirement, &mut trail))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                error!(stage = %trail.stage, "authorization pipeline panicked");
                Err(Denial::unauthenticated(DenialReason::InternalFailure))
            }
        };

        match &result {
            Ok(context) => debug!(
                subject = ?trail.subject,
                player_id = ?trail.player_id,
                team_id = ?trail.team_id,
                bypass = context.decision().is_some_and(AuthorizationDecision::bypass),
                "request authorized"
            ),
            Err(denial) => warn!(
                subject = ?trail.subject,
                player_id = ?trail.player_id,
                route = %request.route(),
                path = %request.path(),
                team_id = ?trail.team_id,
                reason = denial.reason().code(),
                stage = %trail.stage,
                status = denial.status_code(),
                "request denied"
            ),
        }
        result
    }

    /// Identifies the caller behind the session token in `sources`.
    ///
    /// The shared secret is never considered. Returns `None` if no valid
    /// token is present.
    #[must_use]
    pub fn authenticate(&self, sources: &CredentialSources) -> Option<Principal> {
        self.identify(&Credential::select(sources, false)).ok()
    }

    /// Verifies a single credential.
    ///
    /// # Errors
    ///
    /// Returns the reason the credential was rejected.
    pub fn identify(&self, credential: &Credential) -> Result<Principal, DenialReason> {
        match credential {
            Credential::None => Err(DenialReason::MissingCredential),
            Credential::SharedSecret(candidate) => match &self.policy.shared_secret {
                Some(secret) if secret.matches(candidate) => Ok(Principal::shared_secret()),
                _ => Err(DenialReason::SecretMismatch),
            },
            Credential::BearerToken(token) => self
                .codec
                .verify(token)
                .map(Principal::from_claims)
                .map_err(|err| DenialReason::from(&err)),
        }
    }

    async fn evaluate(
        &self,
        request: &AccessRequest,
        requirement: &RouteRequirement,
        trail: &mut Trail,
    ) -> Result<AuthorizationContext, Denial> {
        let credential = Credential::select(
            request.sources(),
            self.policy.secret_gate_open(requirement),
        );
        let principal = self
            .identify(&credential)
            .map_err(Denial::unauthenticated)?;
        trail.subject = principal.subject().cloned();
        trail.player_id = principal.player_id().cloned();

        match requirement.access() {
            Access::Authenticated => Ok(AuthorizationContext::new(principal, None)),
            Access::GlobalAdmin => {
                trail.stage = PipelineStage::GlobalAdmin;
                if principal.is_global_admin() {
                    Ok(AuthorizationContext::new(principal, None))
                } else {
                    Err(Denial::unauthorized(DenialReason::GlobalAdminRequired, None))
                }
            }
            Access::TeamRole {
                minimum,
                team_param,
            } => {
                let deny = |reason| Denial::unauthorized(reason, Some(minimum));

                trail.stage = PipelineStage::TeamScope;
                let team = match request.route_value(team_param) {
                    Some(value) => value.parse::<TeamId>().ok(),
                    None => scan_team_id(request.path()),
                }
                .ok_or_else(|| deny(DenialReason::MissingTeamId))?;
                trail.team_id = Some(team.clone());

                if principal.is_global_admin() {
                    let decision = AuthorizationDecision::global_admin(team);
                    return Ok(AuthorizationContext::new(principal, Some(decision)));
                }

                let player = principal
                    .player_id()
                    .cloned()
                    .ok_or_else(|| deny(DenialReason::NoLinkedPlayer))?;

                trail.stage = PipelineStage::Membership;
                let membership = self
                    .resolver
                    .resolve(&player, &team)
                    .await
                    .map_err(|err| {
                        warn!(error = %err, "membership resolution failed");
                        Denial::unauthenticated(DenialReason::MembershipUnavailable)
                    })?
                    .ok_or_else(|| deny(DenialReason::NoMembership))?;

                trail.stage = PipelineStage::RoleCheck;
                if !membership.role().satisfies(minimum) {
                    return Err(deny(DenialReason::InsufficientRole));
                }

                let decision = AuthorizationDecision::member(team, membership.role());
                Ok(AuthorizationContext::new(principal, Some(decision)))
            }
        }
    }
}

impl fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AuthMethod;
    use crate::denial::UNAUTHORIZED_MESSAGE;
    use crate::error::MembershipError;
    use crate::membership::{Membership, MembershipStore};
    use crate::resolver::tests::{MemoryStore, membership};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use league_gate_platform_access::{Claims, GlobalRole, TeamAction, TeamRole};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const KEY: &[u8] = b"test-signing-key-that-is-long-enough";
    const SECRET: &str = "admin-shared-secret";

    struct PanickingStore;

    #[async_trait]
    impl MembershipStore for PanickingStore {
        async fn memberships_for(
            &self,
            _player: &PlayerId,
            _team: &TeamId,
        ) -> Result<Vec<Membership>, MembershipError> {
            panic!("store exploded");
        }

        async fn memberships_for_player(
            &self,
            _player: &PlayerId,
        ) -> Result<Vec<Membership>, MembershipError> {
            panic!("store exploded");
        }
    }

    fn codec() -> ClaimsCodec {
        ClaimsCodec::new(KEY).expect("codec")
    }

    fn authorizer_with(store: Arc<dyn MembershipStore>, policy: AccessPolicy) -> Authorizer {
        Authorizer::new(
            codec(),
            MembershipResolver::new(store, Duration::from_millis(100)),
            policy,
        )
    }

    fn authorizer(store: Arc<MemoryStore>) -> Authorizer {
        authorizer_with(store, AccessPolicy::new())
    }

    fn secret_policy(mutations: bool) -> AccessPolicy {
        AccessPolicy::new()
            .with_shared_secret(Some(SecretString::new(SECRET)))
            .with_secret_mutations(mutations)
    }

    fn token(player: Option<&str>, role: GlobalRole) -> String {
        let claims = Claims::issue(
            SubjectId::new("subject-1"),
            player.map(PlayerId::new),
            role,
            ChronoDuration::days(30),
        );
        codec().sign(&claims).expect("sign")
    }

    fn team_request(team: &str, bearer: Option<String>) -> AccessRequest {
        AccessRequest::new(format!("/teams/{team}/lineup"))
            .with_route("/teams/{team_id}/lineup")
            .with_route_value("team_id", team)
            .with_sources(
                CredentialSources::new().with_authorization(bearer.map(|t| format!("Bearer {t}"))),
            )
    }

    fn team_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with(vec![
            membership("m-1", "p-player", "T1", TeamRole::Player, 10),
            membership("m-2", "p-captain", "T1", TeamRole::Captain, 10),
            membership("m-3", "p-admin", "T1", TeamRole::Admin, 10),
            membership("m-4", "p-former", "T1", TeamRole::Admin, 90).with_left_at(Utc::now()),
        ]))
    }

    #[tokio::test]
    async fn missing_credential_is_unauthenticated() {
        let denial = authorizer(team_store())
            .authorize(&AccessRequest::new("/me"), &RouteRequirement::authenticated())
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthenticated(DenialReason::MissingCredential));
    }

    #[tokio::test]
    async fn valid_session_passes_authenticated_route() {
        let request = AccessRequest::new("/me").with_sources(
            CredentialSources::new().with_session_cookie(Some(token(Some("p-player"), GlobalRole::Member))),
        );
        let context = authorizer(team_store())
            .authorize(&request, &RouteRequirement::authenticated())
            .await
            .expect("authorized");

        assert_eq!(context.principal().method(), AuthMethod::SessionToken);
        assert_eq!(context.principal().player_id(), Some(&PlayerId::new("p-player")));
        assert!(context.decision().is_none());
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        let claims = Claims::issue_at(
            SubjectId::new("subject-1"),
            Some(PlayerId::new("p-admin")),
            GlobalRole::Member,
            ChronoDuration::days(1),
            Utc::now() - ChronoDuration::days(2),
        );
        let expired = codec().sign(&claims).expect("sign");

        let denial = authorizer(team_store())
            .authorize(&team_request("T1", Some(expired)), &RouteRequirement::team_role(TeamRole::Player))
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthenticated(DenialReason::TokenExpired));
    }

    #[tokio::test]
    async fn foreign_signature_is_unauthenticated() {
        let foreign = ClaimsCodec::new(b"another-signing-key-entirely-0123456")
            .expect("codec")
            .sign(&Claims::issue(
                SubjectId::new("subject-1"),
                None,
                GlobalRole::Admin,
                ChronoDuration::days(1),
            ))
            .expect("sign");

        let denial = authorizer(team_store())
            .authorize(&team_request("T1", Some(foreign)), &RouteRequirement::team_role(TeamRole::Player))
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthenticated(DenialReason::TokenBadSignature));
    }

    #[tokio::test]
    async fn captain_route_admits_captain_and_admin() {
        let authorizer = authorizer(team_store());
        let requirement = RouteRequirement::team_role(TeamRole::Captain);

        for (player, role) in [("p-captain", TeamRole::Captain), ("p-admin", TeamRole::Admin)] {
            let context = authorizer
                .authorize(&team_request("T1", Some(token(Some(player), GlobalRole::Member))), &requirement)
                .await
                .expect("authorized");
            let decision = context.decision().expect("decision");
            assert_eq!(decision.team_id(), &TeamId::new("T1"));
            assert_eq!(decision.effective_role(), role);
            assert!(!decision.bypass());
        }
    }

    #[tokio::test]
    async fn player_below_captain_route_is_unauthorized() {
        let denial = authorizer(team_store())
            .authorize(
                &team_request("T1", Some(token(Some("p-player"), GlobalRole::Member))),
                &RouteRequirement::team_role(TeamRole::Captain),
            )
            .await
            .expect_err("should deny");

        assert_eq!(
            denial,
            Denial::unauthorized(DenialReason::InsufficientRole, Some(TeamRole::Captain))
        );
        let body = denial.body();
        assert_eq!(body.message, UNAUTHORIZED_MESSAGE);
        assert_eq!(body.available_actions, vec![TeamAction::ViewTeam, TeamAction::ViewMatches]);
    }

    #[tokio::test]
    async fn non_member_and_former_member_are_unauthorized() {
        let authorizer = authorizer(team_store());
        let requirement = RouteRequirement::team_role(TeamRole::Player);

        for player in ["p-stranger", "p-former"] {
            let denial = authorizer
                .authorize(&team_request("T1", Some(token(Some(player), GlobalRole::Member))), &requirement)
                .await
                .expect_err("should deny");
            assert_eq!(
                denial,
                Denial::unauthorized(DenialReason::NoMembership, Some(TeamRole::Player))
            );
        }
    }

    #[tokio::test]
    async fn membership_in_other_team_does_not_carry_over() {
        let denial = authorizer(team_store())
            .authorize(
                &team_request("T2", Some(token(Some("p-admin"), GlobalRole::Member))),
                &RouteRequirement::team_role(TeamRole::Player),
            )
            .await
            .expect_err("should deny");
        assert_eq!(denial.reason(), DenialReason::NoMembership);
    }

    #[tokio::test]
    async fn global_admin_bypasses_membership_lookup() {
        let store = team_store();
        let context = authorizer(store.clone())
            .authorize(
                &team_request("T42", Some(token(None, GlobalRole::Admin))),
                &RouteRequirement::team_role(TeamRole::Admin),
            )
            .await
            .expect("authorized");

        assert_eq!(
            context.decision(),
            Some(&AuthorizationDecision::global_admin(TeamId::new("T42")))
        );
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn global_admin_route_requires_admin_role() {
        let authorizer = authorizer(team_store());
        let request = |role| {
            AccessRequest::new("/admin/players/p-1/link").with_sources(
                CredentialSources::new().with_session_cookie(Some(token(Some("p-admin"), role))),
            )
        };

        let denial = authorizer
            .authorize(&request(GlobalRole::Member), &RouteRequirement::global_admin())
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthorized(DenialReason::GlobalAdminRequired, None));
        assert!(denial.body().available_actions.is_empty());

        authorizer
            .authorize(&request(GlobalRole::Admin), &RouteRequirement::global_admin())
            .await
            .expect("admin authorized");
    }

    #[tokio::test]
    async fn unlinked_caller_is_unauthorized_on_team_route() {
        let denial = authorizer(team_store())
            .authorize(
                &team_request("T1", Some(token(None, GlobalRole::Member))),
                &RouteRequirement::team_role(TeamRole::Player),
            )
            .await
            .expect_err("should deny");
        assert_eq!(denial.reason(), DenialReason::NoLinkedPlayer);
        assert_eq!(denial.status_code(), 403);
    }

    #[tokio::test]
    async fn team_id_falls_back_to_path_scan() {
        let request = AccessRequest::new("/api/teams/T1/matches/M7")
            .with_route("/api/teams/{id}/matches/{match_id}")
            .with_sources(
                CredentialSources::new()
                    .with_session_cookie(Some(token(Some("p-player"), GlobalRole::Member))),
            );

        let context = authorizer(team_store())
            .authorize(&request, &RouteRequirement::team_role(TeamRole::Player))
            .await
            .expect("authorized");
        assert_eq!(
            context.decision().map(AuthorizationDecision::team_id),
            Some(&TeamId::new("T1"))
        );
    }

    #[tokio::test]
    async fn undeterminable_team_is_unauthorized() {
        let request = AccessRequest::new("/teams/T1/swap/teams/T2").with_sources(
            CredentialSources::new().with_session_cookie(Some(token(Some("p-admin"), GlobalRole::Member))),
        );
        let denial = authorizer(team_store())
            .authorize(&request, &RouteRequirement::team_role(TeamRole::Player))
            .await
            .expect_err("should deny");
        assert_eq!(
            denial,
            Denial::unauthorized(DenialReason::MissingTeamId, Some(TeamRole::Player))
        );
    }

    #[tokio::test]
    async fn store_failure_and_timeout_fail_closed() {
        let failing = Arc::new(MemoryStore {
            fail: true,
            ..MemoryStore::default()
        });
        let stalled = Arc::new(MemoryStore {
            stall: true,
            ..MemoryStore::default()
        });

        for store in [failing, stalled] {
            let denial = authorizer(store)
                .authorize(
                    &team_request("T1", Some(token(Some("p-admin"), GlobalRole::Member))),
                    &RouteRequirement::team_role(TeamRole::Player),
                )
                .await
                .expect_err("should deny");
            assert_eq!(denial, Denial::unauthenticated(DenialReason::MembershipUnavailable));
        }
    }

    #[tokio::test]
    async fn panic_in_pipeline_fails_closed() {
        let denial = authorizer_with(Arc::new(PanickingStore), AccessPolicy::new())
            .authorize(
                &team_request("T1", Some(token(Some("p-admin"), GlobalRole::Member))),
                &RouteRequirement::team_role(TeamRole::Player),
            )
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthenticated(DenialReason::InternalFailure));
    }

    fn secret_request(secret: &str) -> AccessRequest {
        AccessRequest::new("/admin/players/p-1/link")
            .with_sources(CredentialSources::new().with_api_secret(Some(secret)))
    }

    #[tokio::test]
    async fn shared_secret_admits_when_enabled() {
        let context = authorizer_with(team_store(), secret_policy(true))
            .authorize(
                &secret_request(SECRET),
                &RouteRequirement::global_admin().with_shared_secret(),
            )
            .await
            .expect("authorized");
        assert_eq!(context.principal().method(), AuthMethod::SharedSecret);
        assert!(context.principal().is_global_admin());
    }

    #[tokio::test]
    async fn wrong_shared_secret_is_unauthenticated() {
        let denial = authorizer_with(team_store(), secret_policy(true))
            .authorize(
                &secret_request("guess"),
                &RouteRequirement::global_admin().with_shared_secret(),
            )
            .await
            .expect_err("should deny");
        assert_eq!(denial, Denial::unauthenticated(DenialReason::SecretMismatch));
    }

    #[tokio::test]
    async fn shared_secret_ignored_when_disabled_or_not_allowed() {
        let disabled = authorizer_with(team_store(), secret_policy(false))
            .authorize(
                &secret_request(SECRET),
                &RouteRequirement::global_admin().with_shared_secret(),
            )
            .await
            .expect_err("should deny");
        assert_eq!(disabled, Denial::unauthenticated(DenialReason::MissingCredential));

        let not_allowed = authorizer_with(team_store(), secret_policy(true))
            .authorize(&secret_request(SECRET), &RouteRequirement::global_admin())
            .await
            .expect_err("should deny");
        assert_eq!(not_allowed, Denial::unauthenticated(DenialReason::MissingCredential));
    }

    #[tokio::test]
    async fn shared_secret_reaches_team_routes_with_bypass() {
        let request = team_request("T1", None)
            .with_sources(CredentialSources::new().with_api_secret(Some(SECRET)));
        let context = authorizer_with(team_store(), secret_policy(true))
            .authorize(
                &request,
                &RouteRequirement::team_role(TeamRole::Admin).with_shared_secret(),
            )
            .await
            .expect("authorized");
        assert!(context.decision().is_some_and(AuthorizationDecision::bypass));
    }

    #[test]
    fn empty_configured_secret_keeps_gate_closed() {
        let policy = AccessPolicy::new()
            .with_shared_secret(Some(SecretString::new("")))
            .with_secret_mutations(true);
        assert!(!policy.secret_gate_open(&RouteRequirement::global_admin().with_shared_secret()));
    }

    #[test]
    fn authenticate_reads_cookie_but_never_secret() {
        let authorizer = authorizer_with(team_store(), secret_policy(true));

        let from_cookie = CredentialSources::new()
            .with_session_cookie(Some(token(Some("p-player"), GlobalRole::Member)));
        let principal = authorizer.authenticate(&from_cookie).expect("principal");
        assert_eq!(principal.player_id(), Some(&PlayerId::new("p-player")));

        let secret_only = CredentialSources::new().with_api_secret(Some(SECRET));
        assert!(authorizer.authenticate(&secret_only).is_none());

        let garbage = CredentialSources::new().with_legacy_cookie(Some("not-a-token"));
        assert!(authorizer.authenticate(&garbage).is_none());
    }
}
