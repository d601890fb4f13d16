//! Error types for the platform-access crate.
//!
//! - `TokenError`: session token signing and verification failures
//! - `ExchangeError`: external identity exchange failures
//! - `ProviderError`: failures reported by an `IdentityProvider`
//! - `DirectoryError`: failures reported by a `PlayerDirectory`

use std::fmt;

/// Errors from signing or verifying a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The token's expiry is in the past.
    Expired,
    /// The integrity check failed, or the token names an unexpected algorithm.
    BadSignature,
    /// The token is not well formed or lacks required claims.
    Malformed { reason: String },
    /// The claims' expiry does not exceed their issue time.
    InvalidWindow,
    /// The signing key is shorter than the minimum length.
    KeyTooShort { length: usize, minimum: usize },
    /// The token could not be encoded.
    Signing { details: String },
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "token has expired"),
            Self::BadSignature => write!(f, "token signature is invalid"),
            Self::Malformed { reason } => write!(f, "malformed token: {reason}"),
            Self::InvalidWindow => write!(f, "token expiry must be after its issue time"),
            Self::KeyTooShort { length, minimum } => {
                write!(
                    f,
                    "signing key is {length} bytes; at least {minimum} are required"
                )
            }
            Self::Signing { details } => write!(f, "failed to sign token: {details}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Errors from exchanging an external session assertion for internal claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The provider rejected the assertion.
    InvalidSession,
    /// The provider could not be reached or did not answer in time.
    UpstreamUnavailable { details: String },
    /// The subject's profile could not be loaded.
    ProfileUnavailable { details: String },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSession => write!(f, "identity provider rejected the session"),
            Self::UpstreamUnavailable { details } => {
                write!(f, "identity provider unavailable: {details}")
            }
            Self::ProfileUnavailable { details } => {
                write!(f, "profile unavailable: {details}")
            }
        }
    }
}

impl std::error::Error for ExchangeError {}

/// Errors reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the request (4xx).
    Rejected { status: u16 },
    /// The provider could not be reached or failed internally.
    Unavailable { details: String },
    /// The provider answered with a body that could not be understood.
    InvalidResponse { details: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { status } => write!(f, "provider rejected request with status {status}"),
            Self::Unavailable { details } => write!(f, "provider unavailable: {details}"),
            Self::InvalidResponse { details } => {
                write!(f, "provider returned an invalid response: {details}")
            }
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors reported by a player directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The backing store failed.
    Storage { details: String },
    /// The player is already linked to a different subject.
    AlreadyLinked { player_id: String },
    /// No player exists with the given id.
    PlayerNotFound { player_id: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { details } => write!(f, "player directory error: {details}"),
            Self::AlreadyLinked { player_id } => {
                write!(f, "player '{player_id}' is already linked to another identity")
            }
            Self::PlayerNotFound { player_id } => write!(f, "player '{player_id}' not found"),
        }
    }
}

impl std::error::Error for DirectoryError {}
