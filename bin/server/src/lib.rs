//! league-gate HTTP server.
//!
//! This crate exchanges identity provider sessions for internal session
//! tokens and gates the team-scoped API behind the authorization pipeline.

pub mod auth;
pub mod config;
pub mod error;
pub mod router;
