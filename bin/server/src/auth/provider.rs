//! HTTP client for the external identity provider.
//!
//! Speaks the Stytch REST API: session assertions are validated with
//! `POST sessions/authenticate` and profiles are read with `GET users/{id}`.
//! Upstream error bodies are logged at debug level and never forwarded.

use async_trait::async_trait;
use league_gate_core::{ParseIdError, SecretString, SubjectId};
use league_gate_platform_access::{IdentityProvider, ProviderError, ProviderProfile};
use reqwest::StatusCode;
use rootcause::prelude::Report;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ProviderConfig;

/// Trusted-metadata key holding the global role.
const ROLE_METADATA_KEY: &str = "sidespins_role";

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    session: SessionBody,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    user_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserResponse {
    #[serde(default)]
    trusted_metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default)]
    phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    emails: Vec<Email>,
}

#[derive(Debug, Deserialize)]
struct PhoneNumber {
    phone_number: String,
    #[serde(default)]
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct Email {
    email: String,
    #[serde(default)]
    verified: bool,
}

impl UserResponse {
    fn into_profile(self, subject: SubjectId) -> ProviderProfile {
        let role = self
            .trusted_metadata
            .as_ref()
            .and_then(|metadata| metadata.get(ROLE_METADATA_KEY))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        let phone = self
            .phone_numbers
            .into_iter()
            .find(|p| p.verified)
            .map(|p| p.phone_number);
        let email = self
            .emails
            .into_iter()
            .find(|e| e.verified)
            .map(|e| e.email);

        ProviderProfile::new(subject)
            .with_role_metadata(role)
            .with_verified_phone(phone)
            .with_verified_email(email)
    }
}

/// Maps a non-success status to a provider error.
fn status_error(status: StatusCode) -> ProviderError {
    if status.is_client_error() {
        ProviderError::Rejected {
            status: status.as_u16(),
        }
    } else {
        ProviderError::Unavailable {
            details: format!("provider answered {}", status),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse {
        details: e.to_string(),
    })
}

/// [`IdentityProvider`] backed by the Stytch REST API.
pub struct StytchProvider {
    http: reqwest::Client,
    base_url: String,
    project_id: String,
    secret: SecretString,
}

impl StytchProvider {
    /// Creates a provider client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, Report<ProviderError>> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Unavailable {
                details: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
            secret: config.secret.clone(),
        })
    }

    async fn read(&self, request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
        let response = request
            .basic_auth(&self.project_id, Some(self.secret.expose_secret()))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable {
                details: e.to_string(),
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable {
                details: e.to_string(),
            })?;

        if !status.is_success() {
            debug!(status = status.as_u16(), body = %body, "provider returned an error");
            return Err(status_error(status));
        }
        Ok(body)
    }
}

#[async_trait]
impl IdentityProvider for StytchProvider {
    #[instrument(skip_all)]
    async fn authenticate_session(&self, assertion: &str) -> Result<SubjectId, ProviderError> {
        let request = self
            .http
            .post(format!("{}/sessions/authenticate", self.base_url))
            .json(&serde_json::json!({ "session_jwt": assertion }));
        let body = self.read(request).await?;
        let parsed: AuthenticateResponse = parse_body(&body)?;

        parsed
            .session
            .user_id
            .parse()
            .map_err(|e: ParseIdError| ProviderError::InvalidResponse {
                details: e.to_string(),
            })
    }

    #[instrument(skip(self), fields(subject = %subject))]
    async fn fetch_profile(&self, subject: &SubjectId) -> Result<ProviderProfile, ProviderError> {
        let request = self
            .http
            .get(format!("{}/users/{}", self.base_url, subject.as_str()));
        let body = self.read(request).await?;
        let user: UserResponse = parse_body(&body)?;
        Ok(user.into_profile(subject.clone()))
    }
}
