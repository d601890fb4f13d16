//! Storage error type for the server's repositories.

use league_gate_authz::MembershipError;
use league_gate_platform_access::DirectoryError;
use rootcause::prelude::Report;
use std::fmt;

/// Errors from the Postgres repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A query failed to execute.
    Query { details: String },
    /// A stored value could not be turned into a domain type.
    Decode {
        column: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query { details } => write!(f, "database query failed: {}", details),
            Self::Decode {
                column,
                value,
                reason,
            } => write!(f, "invalid {} '{}': {}", column, value, reason),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Query {
            details: err.to_string(),
        }
    }
}

/// Flattens a repository report into the directory's error type.
pub fn directory_error(report: Report<StoreError>) -> DirectoryError {
    DirectoryError::Storage {
        details: report.to_string(),
    }
}

/// Flattens a repository report into the membership store's error type.
pub fn membership_error(report: Report<StoreError>) -> MembershipError {
    MembershipError::Storage {
        details: report.to_string(),
    }
}
