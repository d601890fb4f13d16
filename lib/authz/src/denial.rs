//! Denial taxonomy of the authorization pipeline.
//!
//! Two outcomes are visible to callers:
//! - `Unauthenticated` (401) with a generic message
//! - `Unauthorized` (403) with guidance that is derived from the route's
//!   requirement only, so it reads the same whatever the actual reason
//!
//! The reason is kept for audit logs and never sent to the caller.

use league_gate_platform_access::{TeamAction, TeamRole, TokenError};
use serde::Serialize;
use std::fmt;

/// Generic message sent with every 401.
pub const UNAUTHENTICATED_MESSAGE: &str = "Valid authentication is required.";

/// Message sent with every 403.
pub const UNAUTHORIZED_MESSAGE: &str =
    "You don't have permission to perform this action on this team.";

/// Suggested next step sent with every 403.
pub const UNAUTHORIZED_SUGGESTION: &str = "Ask a team admin to grant you access.";

/// Why a request was denied, for audit only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// No credential was presented.
    MissingCredential,
    /// The shared secret did not match.
    SecretMismatch,
    /// The session token has expired.
    TokenExpired,
    /// The session token failed its integrity check.
    TokenBadSignature,
    /// The session token could not be parsed.
    TokenMalformed,
    /// Memberships could not be resolved in time.
    MembershipUnavailable,
    /// The pipeline failed unexpectedly.
    InternalFailure,
    /// The route's team id could not be determined.
    MissingTeamId,
    /// The caller has no player record to hold memberships.
    NoLinkedPlayer,
    /// The caller has no active membership in the team.
    NoMembership,
    /// The caller's team role ranks below the route's minimum.
    InsufficientRole,
    /// The route requires a global administrator.
    GlobalAdminRequired,
}

impl DenialReason {
    /// Stable code written to audit logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::SecretMismatch => "secret_mismatch",
            Self::TokenExpired => "token_expired",
            Self::TokenBadSignature => "token_bad_signature",
            Self::TokenMalformed => "token_malformed",
            Self::MembershipUnavailable => "membership_unavailable",
            Self::InternalFailure => "internal_failure",
            Self::MissingTeamId => "missing_team_id",
            Self::NoLinkedPlayer => "no_linked_player",
            Self::NoMembership => "no_membership",
            Self::InsufficientRole => "insufficient_role",
            Self::GlobalAdminRequired => "global_admin_required",
        }
    }
}

impl From<&TokenError> for DenialReason {
    fn from(err: &TokenError) -> Self {
        match err {
            TokenError::Expired => Self::TokenExpired,
            TokenError::BadSignature => Self::TokenBadSignature,
            TokenError::Malformed { .. }
            | TokenError::InvalidWindow
            | TokenError::KeyTooShort { .. }
            | TokenError::Signing { .. } => Self::TokenMalformed,
        }
    }
}

/// A failed authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// The caller could not be identified (401).
    Unauthenticated { reason: DenialReason },
    /// The caller is known but may not proceed (403).
    Unauthorized {
        reason: DenialReason,
        /// Minimum team role of the denied route, if team scoped.
        required: Option<TeamRole>,
    },
}

impl Denial {
    /// Creates a 401 denial.
    #[must_use]
    pub const fn unauthenticated(reason: DenialReason) -> Self {
        Self::Unauthenticated { reason }
    }

    /// Creates a 403 denial.
    #[must_use]
    pub const fn unauthorized(reason: DenialReason, required: Option<TeamRole>) -> Self {
        Self::Unauthorized { reason, required }
    }

    /// Returns the audit reason.
    #[must_use]
    pub const fn reason(&self) -> DenialReason {
        match self {
            Self::Unauthenticated { reason } | Self::Unauthorized { reason, .. } => *reason,
        }
    }

    /// Returns the HTTP status code for this denial.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated { .. } => 401,
            Self::Unauthorized { .. } => 403,
        }
    }

    /// Builds the body sent to the caller.
    #[must_use]
    pub fn body(&self) -> DenialBody {
        match self {
            Self::Unauthenticated { .. } => DenialBody {
                message: UNAUTHENTICATED_MESSAGE.to_string(),
                suggested_action: None,
                available_actions: Vec::new(),
            },
            Self::Unauthorized { required, .. } => DenialBody {
                message: UNAUTHORIZED_MESSAGE.to_string(),
                suggested_action: Some(UNAUTHORIZED_SUGGESTION.to_string()),
                available_actions: required
                    .map(TeamAction::available_below)
                    .unwrap_or_default(),
            },
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated { reason } => write!(f, "unauthenticated: {}", reason.code()),
            Self::Unauthorized { reason, .. } => write!(f, "unauthorized: {}", reason.code()),
        }
    }
}

impl std::error::Error for Denial {}

/// JSON body of a denial response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialBody {
    /// Human-readable message.
    pub message: String,
    /// What the caller could do next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Team actions that remain open below the denied requirement.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_actions: Vec<TeamAction>,
}
