//! Strongly-typed identifiers for league-gate entities.
//!
//! Two families exist:
//! - Keys issued by the league document store and the identity provider
//!   (`PlayerId`, `TeamId`, `MembershipId`, `SubjectId`). These are opaque
//!   strings such as `T1` and are displayed verbatim.
//! - Identifiers minted here (`TokenId`). These wrap a ULID, so they sort by
//!   creation time and never repeat.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate a strongly-typed ID wrapper around ULID.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a freshly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid_str = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }
    };
}

/// Macro to generate a strongly-typed wrapper around an externally issued key.
macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a key that is already known to be valid.
            #[must_use]
            pub fn new(key: impl Into<String>) -> Self {
                Self(key.into())
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "key is empty".to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_key!(
    /// Internal player profile key.
    PlayerId
);

define_key!(
    /// Team key, as it appears in `teams/{teamId}` routes.
    TeamId
);

define_key!(
    /// Membership row key.
    MembershipId
);

define_key!(
    /// Subject identifier assigned by the external identity provider.
    SubjectId
);

define_id!(
    /// Unique identifier of an issued session token (the `jti` claim).
    TokenId,
    "tok"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_display_format() {
        let id = TokenId::new();
        assert!(id.to_string().starts_with("tok_"));
    }

    #[test]
    fn token_id_parse_with_and_without_prefix() {
        let id = TokenId::new();
        let parsed: TokenId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);

        let raw: TokenId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, raw);
    }

    #[test]
    fn token_id_parse_invalid() {
        let err = "tok_nope".parse::<TokenId>().expect_err("should fail");
        assert_eq!(err.id_type, "TokenId");
    }

    #[test]
    fn token_ids_are_distinct() {
        use std::collections::HashSet;

        let ids: HashSet<TokenId> = (0..64).map(|_| TokenId::new()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn key_displays_verbatim() {
        let team = TeamId::new("T1");
        assert_eq!(team.to_string(), "T1");
        assert_eq!(team.as_str(), "T1");
    }

    #[test]
    fn key_parse_trims_and_rejects_empty() {
        let player: PlayerId = "  p-42 ".parse().expect("should parse");
        assert_eq!(player.as_str(), "p-42");

        let err = "   ".parse::<TeamId>().expect_err("empty key");
        assert_eq!(err.id_type, "TeamId");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn key_serializes_transparently() {
        let subject = SubjectId::new("user-test-123");
        let json = serde_json::to_string(&subject).expect("serialize");
        assert_eq!(json, "\"user-test-123\"");
    }
}
