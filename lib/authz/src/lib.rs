//! Team-scoped role authorization for league-gate.
//!
//! Access is decided per request from the session claims and the caller's
//! active team membership. Nothing here is persisted: every decision is
//! derived from the claims, the route table and the membership store.
//!
//! Global administrators bypass team checks. The shared administrative
//! secret is honored only on routes that opt in and only while secret
//! mutations are enabled.

pub mod authorizer;
pub mod cache;
pub mod context;
pub mod credential;
pub mod denial;
pub mod error;
pub mod membership;
pub mod resolver;
pub mod route;

pub use authorizer::{AccessPolicy, AccessRequest, Authorizer, PipelineStage};
pub use cache::MembershipCache;
pub use context::{AuthMethod, AuthorizationContext, AuthorizationDecision, Principal};
pub use credential::{API_SECRET_HEADER, Credential, CredentialSources};
pub use denial::{Denial, DenialBody, DenialReason};
pub use error::MembershipError;
pub use membership::{Membership, MembershipStore, select_active};
pub use resolver::MembershipResolver;
pub use route::{Access, DEFAULT_TEAM_PARAM, RouteRequirement, RouteTable, RouteTableBuilder, scan_team_id};
