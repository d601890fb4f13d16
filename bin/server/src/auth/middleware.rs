//! Authorization middleware and extractors for Axum.

use axum::{
    Json,
    extract::{
        FromRef, FromRequestParts, MatchedPath, RawPathParams, Request, State,
        rejection::RawPathParamsRejection,
    },
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use league_gate_authz::{
    API_SECRET_HEADER, AccessRequest, AuthorizationContext, CredentialSources, Denial, DenialReason,
    Principal,
};
use std::sync::Arc;

use super::AppState;
use crate::config::SessionConfig;

/// Collects every credential the request carries.
pub fn credential_sources(
    headers: &HeaderMap,
    jar: &CookieJar,
    config: &SessionConfig,
) -> CredentialSources {
    let value_of = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    CredentialSources::new()
        .with_api_secret(value_of(API_SECRET_HEADER))
        .with_authorization(value_of(header::AUTHORIZATION.as_str()))
        .with_session_cookie(jar.get(&config.cookie_name).map(|c| c.value().to_string()))
        .with_legacy_cookie(
            jar.get(&config.legacy_cookie_name)
                .map(|c| c.value().to_string()),
        )
}

/// Percent-decoded values of the matched route's `{name}` segments.
///
/// Undecodable values bind nothing, leaving the authorizer to fall back to
/// scanning the literal path.
fn route_values(params: Result<RawPathParams, RawPathParamsRejection>) -> Vec<(String, String)> {
    match params {
        Ok(params) => params
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "route values not decodable");
            Vec::new()
        }
    }
}

/// Enforces the route table.
///
/// Must be installed with `Router::route_layer` so the matched path is
/// known. Routes without a registered requirement pass through untouched.
/// The authorization context is attached only once the pipeline has
/// finished.
pub async fn require_access(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    params: Result<RawPathParams, RawPathParamsRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(route) = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
    else {
        return next.run(request).await;
    };
    let Some(requirement) = state.routes.requirement(&route).copied() else {
        return next.run(request).await;
    };

    let path = request.uri().path().to_string();
    let sources = credential_sources(request.headers(), &jar, &state.session_config);
    let access = route_values(params).into_iter().fold(
        AccessRequest::new(path)
            .with_route(route)
            .with_sources(sources),
        |access, (name, value)| access.with_route_value(name, value),
    );

    match state.authorizer.authorize(&access, &requirement).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(denial) => AccessDenied(denial).into_response(),
    }
}

/// Extractor for the authorization context of a gated route.
///
/// On a route the middleware did not gate, extraction fails closed with a
/// 401.
pub struct Authorized(pub AuthorizationContext);

impl<S> FromRequestParts<S> for Authorized
where
    S: Send + Sync,
{
    type Rejection = AccessDenied;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizationContext>()
            .cloned()
            .map(Authorized)
            .ok_or(AccessDenied(Denial::unauthenticated(
                DenialReason::InternalFailure,
            )))
    }
}

/// Extractor for optionally identifying the caller from a session token.
///
/// Returns None if no valid token is present. The shared secret is never
/// considered.
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let sources = credential_sources(&parts.headers, &jar, &app_state.session_config);
        Ok(OptionalPrincipal(app_state.authorizer.authenticate(&sources)))
    }
}

/// Rejection carrying an authorization denial.
#[derive(Debug)]
pub struct AccessDenied(pub Denial);

impl IntoResponse for AccessDenied {
    fn into_response(self) -> Response {
        let body = Json(self.0.body());
        match self.0 {
            Denial::Unauthenticated { .. } => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                body,
            )
                .into_response(),
            Denial::Unauthorized { .. } => (StatusCode::FORBIDDEN, body).into_response(),
        }
    }
}
