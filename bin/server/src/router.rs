//! HTTP router.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState, routes};

/// Builds the application router.
///
/// The access middleware is installed as a route layer so that it sees the
/// matched route template.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/session", post(routes::create_session))
        .route("/auth/refresh", post(routes::refresh_session))
        .route("/auth/user", get(routes::current_user))
        .route("/auth/logout", post(routes::logout))
        .route("/me/memberships", get(routes::my_memberships))
        .route("/me/profile", get(routes::my_profile))
        .route("/teams/{team_id}/access", get(routes::team_access))
        .route(
            "/admin/players/{player_id}/link",
            post(routes::link_player).delete(routes::unlink_player),
        )
        .route("/admin/players/unlinked", get(routes::unlinked_players))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_access,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
