//! Core domain types and utilities for league-gate.
//!
//! This crate provides the identifiers, the secret wrapper and the error
//! handling foundation shared by the access-control crates and the server.

pub mod error;
pub mod id;
pub mod secret;

pub use error::Result;
pub use id::{MembershipId, ParseIdError, PlayerId, SubjectId, TeamId, TokenId};
pub use secret::SecretString;
