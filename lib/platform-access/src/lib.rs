//! Identity and session layer for league-gate.
//!
//! This crate provides:
//! - Team and global roles (`TeamRole`, `GlobalRole`)
//! - Session claims and the HS256 claims codec (`Claims`, `ClaimsCodec`)
//! - Identity and player records (`ProviderProfile`, `Player`)
//! - Exchange of an external session assertion for internal claims
//!   (`IdentityExchange`)
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use league_gate_core::SubjectId;
//! use league_gate_platform_access::{Claims, ClaimsCodec, GlobalRole};
//!
//! let codec = ClaimsCodec::new(b"an-example-signing-key-of-32-bytes!").expect("key");
//! let claims = Claims::issue(
//!     SubjectId::new("user-test-123"),
//!     None,
//!     GlobalRole::Member,
//!     Duration::days(30),
//! );
//!
//! let token = codec.sign(&claims).expect("sign");
//! assert_eq!(codec.verify(&token).expect("verify"), claims);
//! ```

pub mod claims;
pub mod codec;
pub mod error;
pub mod exchange;
pub mod identity;
pub mod role;

// Re-export main types at crate root
pub use claims::{CLAIMS_VERSION, Claims, DEFAULT_TOKEN_VALIDITY_DAYS};
pub use codec::{ClaimsCodec, MIN_KEY_LENGTH};
pub use error::{DirectoryError, ExchangeError, ProviderError, TokenError};
pub use exchange::{
    ExchangeOutcome, ExchangeSettings, IdentityExchange, IdentityProvider, PlayerDirectory,
};
pub use identity::{ContactChannel, Player, ProviderProfile, normalize_phone};
pub use role::{GlobalRole, ParseRoleError, TeamAction, TeamRole};
