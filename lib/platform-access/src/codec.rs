//! Signing and verification of internal session tokens.
//!
//! Tokens are compact HS256 JWTs: a header, the JSON [`Claims`] payload and
//! an HMAC-SHA256 signature over both, each base64url encoded. The codec is
//! immutable after construction and is shared freely across requests.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rootcause::prelude::Report;
use std::fmt;

use crate::claims::{CLAIMS_VERSION, Claims};
use crate::error::TokenError;

/// Minimum signing key length, in bytes.
pub const MIN_KEY_LENGTH: usize = 32;

/// Signs and verifies session tokens with a server-held symmetric key.
#[derive(Clone)]
pub struct ClaimsCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    /// Creates a codec for `secret`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::KeyTooShort` if the key is shorter than
    /// [`MIN_KEY_LENGTH`] bytes.
    pub fn new(secret: &[u8]) -> Result<Self, Report<TokenError>> {
        if secret.len() < MIN_KEY_LENGTH {
            return Err(TokenError::KeyTooShort {
                length: secret.len(),
                minimum: MIN_KEY_LENGTH,
            }
            .into());
        }

        // Expiry is checked against an explicit clock in `verify_at`, with no
        // leeway. Missing fields surface as deserialization failures.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Signs `claims` into a compact token.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidWindow` if the claims expire at or before
    /// their issue time.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if !claims.has_valid_window() {
            return Err(TokenError::InvalidWindow);
        }

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(|e| {
            TokenError::Signing {
                details: e.to_string(),
            }
        })
    }

    /// Verifies `token` against the current time.
    ///
    /// # Errors
    ///
    /// Returns `Expired`, `BadSignature` or `Malformed`.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies `token` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `Expired`, `BadSignature` or `Malformed`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| classify(e.kind()))?;
        let claims = data.claims;

        if claims.version() != CLAIMS_VERSION {
            return Err(TokenError::Malformed {
                reason: format!("unsupported claims version {}", claims.version()),
            });
        }
        if !claims.has_valid_window() {
            return Err(TokenError::Malformed {
                reason: "expiry does not exceed issue time".to_string(),
            });
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for ClaimsCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimsCodec")
            .field("algorithm", &Algorithm::HS256)
            .finish_non_exhaustive()
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::BadSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::Json(e) => TokenError::Malformed {
            reason: e.to_string(),
        },
        ErrorKind::Base64(_) => TokenError::Malformed {
            reason: "invalid base64 segment".to_string(),
        },
        ErrorKind::MissingRequiredClaim(claim) => TokenError::Malformed {
            reason: format!("missing claim '{claim}'"),
        },
        other => TokenError::Malformed {
            reason: format!("{other:?}"),
        },
    }
}
