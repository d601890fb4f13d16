//! Identity and player records.
//!
//! An `Identity` is who the external provider says the caller is. A `Player`
//! is the league's own profile record, linked to at most one identity
//! through the provider subject id. Identities hold no roles; players may
//! carry a global role.

use chrono::{DateTime, Utc};
use league_gate_core::{PlayerId, SubjectId};
use serde::{Deserialize, Serialize};

use crate::role::GlobalRole;

/// A contact channel the provider has verified for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ContactChannel {
    /// Verified phone number, as reported by the provider.
    Phone(String),
    /// Verified email address.
    Email(String),
}

impl ContactChannel {
    /// Returns the phone number if this is a phone channel.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::Phone(number) => Some(number),
            Self::Email(_) => None,
        }
    }
}

/// Subject profile as reported by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    subject: SubjectId,
    role_metadata: Option<String>,
    verified_phone: Option<String>,
    verified_email: Option<String>,
}

impl ProviderProfile {
    /// Creates a profile with no metadata or contact channels.
    #[must_use]
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            role_metadata: None,
            verified_phone: None,
            verified_email: None,
        }
    }

    /// Sets the role string found in the provider's trusted metadata.
    #[must_use]
    pub fn with_role_metadata(mut self, role: Option<String>) -> Self {
        self.role_metadata = role;
        self
    }

    /// Sets the verified phone number.
    #[must_use]
    pub fn with_verified_phone(mut self, phone: Option<String>) -> Self {
        self.verified_phone = phone;
        self
    }

    /// Sets the verified email address.
    #[must_use]
    pub fn with_verified_email(mut self, email: Option<String>) -> Self {
        self.verified_email = email;
        self
    }

    /// Returns the provider subject.
    #[must_use]
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Returns the global role named by trusted metadata, defaulting to member.
    #[must_use]
    pub fn global_role(&self) -> GlobalRole {
        GlobalRole::from_metadata(self.role_metadata.as_deref())
    }

    /// Returns the preferred verified contact channel, phone first.
    #[must_use]
    pub fn contact_channel(&self) -> Option<ContactChannel> {
        self.verified_phone
            .clone()
            .map(ContactChannel::Phone)
            .or_else(|| self.verified_email.clone().map(ContactChannel::Email))
    }
}

/// Internal player profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    subject: Option<SubjectId>,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl Player {
    /// Creates an unlinked player.
    #[must_use]
    pub fn new(id: PlayerId, first_name: String, last_name: String) -> Self {
        Self {
            id,
            subject: None,
            first_name,
            last_name,
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a player with all fields specified.
    ///
    /// Use this when reconstituting a player from storage.
    #[must_use]
    pub fn with_all_fields(
        id: PlayerId,
        subject: Option<SubjectId>,
        first_name: String,
        last_name: String,
        phone_number: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject,
            first_name,
            last_name,
            phone_number,
            created_at,
        }
    }

    /// Sets the phone number.
    #[must_use]
    pub fn with_phone_number(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// Links the player to a provider subject.
    #[must_use]
    pub fn with_subject(mut self, subject: SubjectId) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Clears the provider subject.
    #[must_use]
    pub fn without_subject(mut self) -> Self {
        self.subject = None;
        self
    }

    /// Returns the player id.
    #[must_use]
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Returns the linked provider subject, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&SubjectId> {
        self.subject.as_ref()
    }

    /// Returns true if the player is linked to an identity.
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.subject.is_some()
    }

    /// Returns the first name.
    #[must_use]
    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    /// Returns the last name.
    #[must_use]
    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Returns the stored phone number.
    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Returns true if the stored phone number normalizes to
    /// `normalized_phone`.
    #[must_use]
    pub fn matches_phone(&self, normalized_phone: &str) -> bool {
        !normalized_phone.is_empty()
            && self.phone_number().map(normalize_phone).as_deref() == Some(normalized_phone)
    }

    /// Returns when the player record was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Reduces a phone number to its digits for matching.
///
/// Ten-digit numbers are assumed to be North American and gain the `1`
/// country code, so `(555) 010-2000` and `+1 555 010 2000` compare equal.
#[must_use]
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 10 {
        format!("1{digits}")
    } else {
        digits
    }
}
