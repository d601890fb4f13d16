//! Session claims carried inside the internal session token.
//!
//! Claims are minted once per session and never change afterwards. A role
//! change only reaches a caller when a new token is issued.

use chrono::{DateTime, Duration, TimeZone, Utc};
use league_gate_core::{PlayerId, SubjectId, TokenId};
use serde::{Deserialize, Serialize};

use crate::role::GlobalRole;

/// Schema version written to the `ver` claim.
pub const CLAIMS_VERSION: u32 = 1;

/// Validity window of a freshly exchanged session token.
pub const DEFAULT_TOKEN_VALIDITY_DAYS: i64 = 30;

/// Verified payload of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// External identity provider subject.
    sub: SubjectId,
    /// Linked internal player, once profile completion has happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player_id: Option<PlayerId>,
    /// Global role from the provider's trusted metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<GlobalRole>,
    /// Issued-at, seconds since the Unix epoch.
    iat: i64,
    /// Expiry, seconds since the Unix epoch.
    exp: i64,
    /// Claims schema version.
    ver: u32,
    /// Token id.
    jti: TokenId,
}

impl Claims {
    /// Issues claims valid from now for `validity`.
    #[must_use]
    pub fn issue(
        subject: SubjectId,
        player_id: Option<PlayerId>,
        role: GlobalRole,
        validity: Duration,
    ) -> Self {
        Self::issue_at(subject, player_id, role, validity, Utc::now())
    }

    /// Issues claims valid from `now` for `validity`.
    #[must_use]
    pub fn issue_at(
        subject: SubjectId,
        player_id: Option<PlayerId>,
        role: GlobalRole,
        validity: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp();
        Self {
            sub: subject,
            player_id,
            role: Some(role),
            iat,
            exp: iat + validity.num_seconds(),
            ver: CLAIMS_VERSION,
            jti: TokenId::new(),
        }
    }

    /// Issues replacement claims that carry `player_id`.
    ///
    /// The replacement has a fresh token id and a fresh validity window of
    /// the same length as the original.
    #[must_use]
    pub fn reissue_for_player(&self, player_id: PlayerId) -> Self {
        let validity = Duration::seconds(self.exp - self.iat);
        let mut claims = Self::issue(self.sub.clone(), Some(player_id), self.global_role(), validity);
        claims.role = self.role;
        claims
    }

    /// Returns the provider subject.
    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        &self.sub
    }

    /// Returns the linked player, if any.
    #[must_use]
    pub fn player_id(&self) -> Option<&PlayerId> {
        self.player_id.as_ref()
    }

    /// Returns the global role as written into the token.
    #[must_use]
    pub fn role(&self) -> Option<GlobalRole> {
        self.role
    }

    /// Returns the effective global role, defaulting to member.
    #[must_use]
    pub fn global_role(&self) -> GlobalRole {
        self.role.unwrap_or_default()
    }

    /// Returns true if these claims carry the global admin role.
    #[must_use]
    pub fn is_global_admin(&self) -> bool {
        self.global_role().is_admin()
    }

    /// Returns the raw issued-at timestamp.
    #[must_use]
    pub fn iat(&self) -> i64 {
        self.iat
    }

    /// Returns the raw expiry timestamp.
    #[must_use]
    pub fn exp(&self) -> i64 {
        self.exp
    }

    /// Returns the claims schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.ver
    }

    /// Returns the token id.
    #[must_use]
    pub fn token_id(&self) -> TokenId {
        self.jti
    }

    /// Returns when the token expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// Returns true if expiry is strictly after issue time.
    #[must_use]
    pub fn has_valid_window(&self) -> bool {
        self.exp > self.iat
    }

    /// Returns true if the token is expired at `now`.
    ///
    /// No leeway is granted: a token is expired as soon as `now` passes
    /// `exp`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectId {
        SubjectId::new("user-test-123")
    }

    #[test]
    fn issue_sets_window_and_version() {
        let now = Utc::now();
        let claims = Claims::issue_at(subject(), None, GlobalRole::Member, Duration::days(30), now);

        assert_eq!(claims.iat(), now.timestamp());
        assert_eq!(claims.exp() - claims.iat(), 30 * 24 * 60 * 60);
        assert_eq!(claims.version(), CLAIMS_VERSION);
        assert!(claims.has_valid_window());
        assert!(claims.player_id().is_none());
    }

    #[test]
    fn zero_validity_is_not_a_valid_window() {
        let claims = Claims::issue(subject(), None, GlobalRole::Member, Duration::zero());
        assert!(!claims.has_valid_window());
    }

    #[test]
    fn expiry_has_no_leeway() {
        let now = Utc::now();
        let claims = Claims::issue_at(subject(), None, GlobalRole::Member, Duration::seconds(60), now);

        assert!(!claims.is_expired_at(now + Duration::seconds(60)));
        assert!(claims.is_expired_at(now + Duration::seconds(61)));
    }

    #[test]
    fn reissue_keeps_subject_and_role_but_mints_new_token_id() {
        let original = Claims::issue(subject(), None, GlobalRole::Admin, Duration::days(30));
        let reissued = original.reissue_for_player(PlayerId::new("p-7"));

        assert_eq!(reissued.subject(), original.subject());
        assert_eq!(reissued.role(), Some(GlobalRole::Admin));
        assert_eq!(reissued.player_id(), Some(&PlayerId::new("p-7")));
        assert_ne!(reissued.token_id(), original.token_id());
        assert_eq!(reissued.exp() - reissued.iat(), original.exp() - original.iat());
    }

    #[test]
    fn optional_claims_are_omitted_from_payload() {
        let claims = Claims::issue(subject(), None, GlobalRole::Member, Duration::days(1));
        let json = serde_json::to_value(&claims).expect("serialize");

        assert!(json.get("player_id").is_none());
        assert_eq!(json["role"], "member");
        assert_eq!(json["sub"], "user-test-123");
        assert_eq!(json["ver"], 1);
    }

    #[test]
    fn missing_role_defaults_to_member() {
        let json = serde_json::json!({
            "sub": "user-1",
            "iat": 1,
            "exp": 2,
            "ver": 1,
            "jti": TokenId::new().as_ulid().to_string(),
        });
        let claims: Claims = serde_json::from_value(json).expect("deserialize");
        assert_eq!(claims.role(), None);
        assert_eq!(claims.global_role(), GlobalRole::Member);
        assert!(!claims.is_global_admin());
    }
}
