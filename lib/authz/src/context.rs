//! Typed authorization context attached to an authorized request.

use league_gate_core::{PlayerId, SubjectId, TeamId};
use league_gate_platform_access::{Claims, GlobalRole, TeamRole};
use serde::Serialize;

/// How the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// A verified session token.
    SessionToken,
    /// The shared administrative secret.
    SharedSecret,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    claims: Option<Claims>,
    method: AuthMethod,
}

impl Principal {
    /// A caller identified by verified session claims.
    #[must_use]
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            claims: Some(claims),
            method: AuthMethod::SessionToken,
        }
    }

    /// A caller holding the shared administrative secret.
    #[must_use]
    pub fn shared_secret() -> Self {
        Self {
            claims: None,
            method: AuthMethod::SharedSecret,
        }
    }

    /// Returns how the caller authenticated.
    #[must_use]
    pub fn method(&self) -> AuthMethod {
        self.method
    }

    /// Returns the verified claims, absent for the shared secret.
    #[must_use]
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Returns the provider subject, if known.
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectId> {
        self.claims.as_ref().map(Claims::subject)
    }

    /// Returns the linked player, if known.
    #[must_use]
    pub fn player_id(&self) -> Option<&PlayerId> {
        self.claims.as_ref().and_then(Claims::player_id)
    }

    /// Returns the caller's global role.
    #[must_use]
    pub fn global_role(&self) -> GlobalRole {
        match (&self.claims, self.method) {
            (_, AuthMethod::SharedSecret) => GlobalRole::Admin,
            (Some(claims), AuthMethod::SessionToken) => claims.global_role(),
            (None, AuthMethod::SessionToken) => GlobalRole::Member,
        }
    }

    /// Returns true if the caller bypasses team checks.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.global_role().is_admin()
    }
}

/// Resolved team access for one request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    team_id: TeamId,
    effective_role: TeamRole,
    bypass: bool,
}

impl AuthorizationDecision {
    /// A decision backed by an active membership.
    #[must_use]
    pub fn member(team_id: TeamId, role: TeamRole) -> Self {
        Self {
            team_id,
            effective_role: role,
            bypass: false,
        }
    }

    /// Full access granted to a global admin without a membership lookup.
    #[must_use]
    pub fn global_admin(team_id: TeamId) -> Self {
        Self {
            team_id,
            effective_role: TeamRole::Admin,
            bypass: true,
        }
    }

    /// Returns the team the decision applies to.
    #[must_use]
    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    /// Returns the role the caller acts with.
    #[must_use]
    pub fn effective_role(&self) -> TeamRole {
        self.effective_role
    }

    /// Returns true if team checks were bypassed.
    #[must_use]
    pub fn bypass(&self) -> bool {
        self.bypass
    }
}

/// Everything a handler learns from a successful authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationContext {
    principal: Principal,
    decision: Option<AuthorizationDecision>,
}

impl AuthorizationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(principal: Principal, decision: Option<AuthorizationDecision>) -> Self {
        Self {
            principal,
            decision,
        }
    }

    /// Returns the caller.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Returns the team decision, for team-scoped routes.
    #[must_use]
    pub fn decision(&self) -> Option<&AuthorizationDecision> {
        self.decision.as_ref()
    }
}
