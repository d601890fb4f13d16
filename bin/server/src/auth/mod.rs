//! Authentication and authorization for the league-gate server.
//!
//! This module provides:
//! - Exchange of an external provider session for an internal session token
//! - The route table and the authorization middleware that enforces it
//! - Extractors handing the typed authorization context to handlers
//! - Postgres-backed player directory and membership store
//!
//! # Authorization Model
//!
//! The session token carries who the caller is and their global role. Team
//! roles are never embedded in the token; they are resolved from the
//! membership store on every team-scoped request, optionally through a
//! short-lived cache of misses. A downgrade therefore takes effect on the
//! next request. A new membership may stay denied for up to the cache TTL
//! when the writer did not invalidate.

pub mod db;
pub mod middleware;
pub mod provider;
pub mod routes;

use chrono::Duration;
use league_gate_authz::{
    AccessPolicy, Authorizer, MembershipCache, MembershipResolver, MembershipStore, RouteRequirement,
    RouteTable,
};
use league_gate_platform_access::{
    ClaimsCodec, ExchangeSettings, IdentityExchange, IdentityProvider, PlayerDirectory, TeamRole,
    TokenError,
};
use rootcause::prelude::Report;
use std::sync::Arc;

use crate::config::{FeatureFlags, ServerConfig, SessionConfig};

pub use middleware::{AccessDenied, Authorized, OptionalPrincipal, require_access};
pub use provider::StytchProvider;

/// Shared application state.
pub struct AppState {
    /// Provider session to internal token exchange.
    pub exchange: IdentityExchange,
    /// Per-request authorization pipeline.
    pub authorizer: Authorizer,
    /// Access requirement of every gated route.
    pub routes: RouteTable,
    /// Player lookup and linking.
    pub directory: Arc<dyn PlayerDirectory>,
    /// Session configuration.
    pub session_config: SessionConfig,
    /// Feature flags.
    pub features: FeatureFlags,
}

impl AppState {
    /// Wires the application state from configuration and collaborators.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyTooShort` if the signing key is too short.
    pub fn new(
        config: &ServerConfig,
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn PlayerDirectory>,
        store: Arc<dyn MembershipStore>,
    ) -> Result<Self, Report<TokenError>> {
        let codec = ClaimsCodec::new(config.session.signing_key.expose_secret().as_bytes())?;

        let mut resolver = MembershipResolver::new(store, config.access.resolver_timeout());
        let cache = &config.access.membership_cache;
        if cache.enabled {
            tracing::info!(
                ttl_seconds = cache.ttl_seconds,
                capacity = cache.capacity,
                "membership miss cache enabled; new memberships may be denied for up to the TTL"
            );
            resolver = resolver.with_cache(Arc::new(MembershipCache::new(cache.ttl(), cache.capacity)));
        }

        let policy = AccessPolicy::new()
            .with_shared_secret(config.access.shared_secret.clone())
            .with_secret_mutations(config.features.secret_mutations);

        let settings = ExchangeSettings::new(config.provider.timeout())
            .with_token_validity(Duration::days(config.session.token_validity_days))
            .with_link_by_phone(config.access.link_players_by_phone);

        Ok(Self {
            exchange: IdentityExchange::new(provider, directory.clone(), settings),
            authorizer: Authorizer::new(codec, resolver, policy),
            routes: route_table(),
            directory,
            session_config: config.session.clone(),
            features: config.features.clone(),
        })
    }
}

/// Access requirements of the server's gated routes.
pub fn route_table() -> RouteTable {
    RouteTable::builder()
        .route("/auth/refresh", RouteRequirement::authenticated())
        .route("/me/memberships", RouteRequirement::authenticated())
        .route("/me/profile", RouteRequirement::authenticated())
        .route(
            "/teams/{team_id}/access",
            RouteRequirement::team_role(TeamRole::Player),
        )
        .route(
            "/admin/players/{player_id}/link",
            RouteRequirement::global_admin().with_shared_secret(),
        )
        .route("/admin/players/unlinked", RouteRequirement::global_admin())
        .build()
}
