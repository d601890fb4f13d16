//! Authorization error types.

use std::fmt;

/// Errors from resolving team memberships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// The membership store failed.
    Storage {
        /// Error details.
        details: String,
    },
    /// The store did not answer within the resolver timeout.
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        millis: u128,
    },
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage { details } => {
                write!(f, "membership lookup failed: {}", details)
            }
            Self::Timeout { millis } => {
                write!(f, "membership lookup timed out after {}ms", millis)
            }
        }
    }
}

impl std::error::Error for MembershipError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_error_display() {
        let err = MembershipError::Storage {
            details: "pool closed".to_string(),
        };
        assert!(err.to_string().contains("pool closed"));

        let err = MembershipError::Timeout { millis: 250 };
        assert!(err.to_string().contains("250ms"));
    }
}
