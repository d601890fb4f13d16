//! Session, identity and team access routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use league_gate_authz::{AuthorizationDecision, Membership};
use league_gate_core::{PlayerId, SubjectId, TeamId};
use league_gate_platform_access::{
    Claims, DirectoryError, ExchangeError, Player, TeamAction, TeamRole,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{info, warn};

use super::{AppState, Authorized, OptionalPrincipal};
use crate::config::SessionConfig;

/// Body of the session exchange.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    session_jwt: Option<String>,
    #[serde(default)]
    remember: bool,
}

/// Result of the session exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    ok: bool,
    user_id: SubjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    team_id: Option<TeamId>,
}

/// Query parameters for the current-user route.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserQuery {
    team_id: Option<String>,
}

/// The caller as seen by the current-user route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    user_id: Option<SubjectId>,
    player_id: Option<PlayerId>,
    role: Option<&'static str>,
    team_role: Option<TeamRole>,
    authenticated: bool,
}

/// Result of a session refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    refreshed: bool,
    player_id: Option<PlayerId>,
}

/// Team access probe response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAccess {
    #[serde(flatten)]
    decision: AuthorizationDecision,
    available_actions: Vec<TeamAction>,
}

/// Body of the player link route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPlayerRequest {
    subject_id: SubjectId,
}

/// Result of unlinking a player.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkResponse {
    player_id: PlayerId,
    previous_subject_id: Option<SubjectId>,
}

/// Player fields shown to administrators and on the caller's profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    id: PlayerId,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id().clone(),
            first_name: player.first_name().to_string(),
            last_name: player.last_name().to_string(),
            phone_number: player.phone_number().map(str::to_string),
            created_at: player.created_at(),
        }
    }
}

/// Players with no linked identity.
#[derive(Debug, Serialize)]
pub struct UnlinkedPlayers {
    count: usize,
    players: Vec<PlayerSummary>,
}

/// The caller's identity, player record and active memberships.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    user_id: SubjectId,
    player_id: Option<PlayerId>,
    role: &'static str,
    memberships: Vec<Membership>,
    player: Option<PlayerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

/// Builds the session cookie carrying `token`.
fn session_cookie(config: &SessionConfig, token: String, remember: bool) -> Cookie<'static> {
    let max_age = if remember {
        TimeDuration::days(config.long_cookie_days)
    } else {
        TimeDuration::hours(config.short_cookie_hours)
    };
    Cookie::build((config.cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Exchanges a provider session for an internal session cookie.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let assertion = body
        .session_jwt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::MissingAssertion)?;

    let outcome = state
        .exchange
        .exchange(assertion)
        .await
        .map_err(ApiError::Exchange)?;
    let claims = outcome.into_claims();
    let token = state
        .authorizer
        .codec()
        .sign(&claims)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let team_id = sole_team(&state, &claims).await;
    info!(
        subject = %claims.subject(),
        player_id = ?claims.player_id(),
        remember = body.remember,
        "session issued"
    );

    let jar = jar.add(session_cookie(&state.session_config, token, body.remember));
    Ok((
        jar,
        Json(SessionResponse {
            ok: true,
            user_id: claims.subject().clone(),
            team_id,
        }),
    ))
}

/// Returns the caller's team if they hold exactly one active membership.
async fn sole_team(state: &AppState, claims: &Claims) -> Option<TeamId> {
    let player = claims.player_id()?;
    match state.authorizer.resolver().resolve_all(player).await {
        Ok(memberships) => match memberships.as_slice() {
            [only] => Some(only.team_id().clone()),
            _ => None,
        },
        Err(e) => {
            warn!(player_id = %player, error = %e, "could not list memberships for session");
            None
        }
    }
}

/// Re-issues the session once the caller's identity has been linked to a
/// player.
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Authorized(context): Authorized,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let claims = context
        .principal()
        .claims()
        .ok_or(ApiError::NotAuthenticated)?;

    let Some(refreshed) = state
        .exchange
        .refresh_link(claims)
        .await
        .map_err(ApiError::Exchange)?
    else {
        return Ok(Json(RefreshResponse {
            refreshed: false,
            player_id: claims.player_id().cloned(),
        })
        .into_response());
    };

    let token = state
        .authorizer
        .codec()
        .sign(&refreshed)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let jar = jar.add(session_cookie(&state.session_config, token, false));
    Ok((
        jar,
        Json(RefreshResponse {
            refreshed: true,
            player_id: refreshed.player_id().cloned(),
        }),
    )
        .into_response())
}

/// Describes the caller, or reports that nobody is signed in.
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(query): Query<CurrentUserQuery>,
) -> Json<CurrentUser> {
    let Some(principal) = principal else {
        return Json(CurrentUser {
            user_id: None,
            player_id: None,
            role: None,
            team_role: None,
            authenticated: false,
        });
    };

    let team = query
        .team_id
        .as_deref()
        .and_then(|t| t.parse::<TeamId>().ok());
    let team_role = match (team, principal.player_id()) {
        (None, _) => None,
        (Some(_), _) if principal.is_global_admin() => Some(TeamRole::Admin),
        (Some(team), Some(player)) => {
            match state.authorizer.resolver().resolve(player, &team).await {
                Ok(membership) => membership.as_ref().map(Membership::role),
                Err(e) => {
                    warn!(player_id = %player, team_id = %team, error = %e, "team role lookup failed");
                    None
                }
            }
        }
        (Some(_), None) => None,
    };

    Json(CurrentUser {
        user_id: principal.subject().cloned(),
        player_id: principal.player_id().cloned(),
        role: Some(principal.global_role().as_str()),
        team_role,
        authenticated: true,
    })
}

/// Clears both session cookies.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let config = &state.session_config;
    let jar = jar
        .add(removal_cookie(&config.cookie_name))
        .add(removal_cookie(&config.legacy_cookie_name));
    (jar, Json(serde_json::json!({ "ok": true })))
}

/// Lists the caller's active memberships.
pub async fn my_memberships(
    State(state): State<Arc<AppState>>,
    Authorized(context): Authorized,
) -> Result<Json<Vec<Membership>>, ApiError> {
    let Some(player) = context.principal().player_id() else {
        return Ok(Json(Vec::new()));
    };
    let memberships = state
        .authorizer
        .resolver()
        .resolve_all(player)
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(memberships))
}

/// Reports the caller's access to a team.
pub async fn team_access(Authorized(context): Authorized) -> Result<Json<TeamAccess>, ApiError> {
    let decision = context
        .decision()
        .cloned()
        .ok_or(ApiError::NotAuthenticated)?;
    let available_actions = TeamAction::available_to(decision.effective_role());
    Ok(Json(TeamAccess {
        decision,
        available_actions,
    }))
}

/// Links a player to a provider subject.
pub async fn link_player(
    State(state): State<Arc<AppState>>,
    Authorized(context): Authorized,
    Path(player_id): Path<PlayerId>,
    Json(body): Json<LinkPlayerRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .directory
        .link_subject(&player_id, &body.subject_id)
        .await
        .map_err(ApiError::Directory)?;
    info!(
        player_id = %player_id,
        subject = %body.subject_id,
        via = ?context.principal().method(),
        "player linked"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Removes the identity link of a player.
pub async fn unlink_player(
    State(state): State<Arc<AppState>>,
    Authorized(context): Authorized,
    Path(player_id): Path<PlayerId>,
) -> Result<Json<UnlinkResponse>, ApiError> {
    let previous = state
        .directory
        .unlink_subject(&player_id)
        .await
        .map_err(ApiError::Directory)?;
    info!(
        player_id = %player_id,
        previous_subject = ?previous,
        via = ?context.principal().method(),
        "player unlinked"
    );
    Ok(Json(UnlinkResponse {
        player_id,
        previous_subject_id: previous,
    }))
}

/// Lists players that no identity is linked to.
pub async fn unlinked_players(
    State(state): State<Arc<AppState>>,
    Authorized(_): Authorized,
) -> Result<Json<UnlinkedPlayers>, ApiError> {
    let players: Vec<PlayerSummary> = state
        .directory
        .list_unlinked()
        .await
        .map_err(ApiError::Directory)?
        .iter()
        .map(PlayerSummary::from)
        .collect();
    Ok(Json(UnlinkedPlayers {
        count: players.len(),
        players,
    }))
}

/// Describes the signed-in caller and the player record linked to them.
///
/// The player is looked up by the caller's subject, so a link made after
/// the session was issued shows up without a refresh.
pub async fn my_profile(
    State(state): State<Arc<AppState>>,
    Authorized(context): Authorized,
) -> Result<Json<Profile>, ApiError> {
    let principal = context.principal();
    let subject = principal.subject().cloned().ok_or(ApiError::NotAuthenticated)?;
    let role = principal.global_role().as_str();

    let Some(player) = state
        .directory
        .find_by_subject(&subject)
        .await
        .map_err(ApiError::Directory)?
    else {
        warn!(subject = %subject, "no player linked to caller");
        return Ok(Json(Profile {
            user_id: subject,
            player_id: None,
            role,
            memberships: Vec::new(),
            player: None,
            message: Some("No player profile found for this user"),
        }));
    };

    let memberships = state
        .authorizer
        .resolver()
        .resolve_all(player.id())
        .await
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(Json(Profile {
        user_id: subject,
        player_id: Some(player.id().clone()),
        role,
        memberships,
        player: Some(PlayerSummary::from(&player)),
        message: None,
    }))
}

/// Route errors.
#[derive(Debug)]
pub enum ApiError {
    /// The session assertion was missing or blank.
    MissingAssertion,
    /// The identity exchange failed.
    Exchange(ExchangeError),
    /// The caller is not signed in.
    NotAuthenticated,
    /// Player lookup or linking failed.
    Directory(DirectoryError),
    /// A backing service is unavailable.
    Unavailable(String),
    /// Unexpected failure.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingAssertion => (StatusCode::BAD_REQUEST, "Missing session token"),
            Self::Exchange(e) => {
                warn!(error = %e, "session exchange failed");
                (StatusCode::UNAUTHORIZED, "Authentication failed")
            }
            Self::NotAuthenticated => (StatusCode::UNAUTHORIZED, "Valid authentication is required."),
            Self::Directory(DirectoryError::PlayerNotFound { .. }) => {
                (StatusCode::NOT_FOUND, "Player not found")
            }
            Self::Directory(DirectoryError::AlreadyLinked { .. }) => {
                (StatusCode::CONFLICT, "Player is already linked")
            }
            Self::Directory(e) => {
                tracing::error!("Player directory error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
            }
            Self::Unavailable(msg) => {
                tracing::error!("Backing service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        (status, Json(serde_json::json!({ "message": message }))).into_response()
    }
}
