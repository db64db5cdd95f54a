use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sahyog_gateway::connection;

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{analytics, donations, messages, ngos};

/// The full HTTP + WebSocket surface. `/ws` authenticates in-band, so it
/// sits outside the bearer middleware.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/ngos", get(ngos::list_verified))
        .route("/api/analytics/stats", get(analytics::stats))
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/ngos", post(ngos::create_ngo))
        .route("/api/ngos/pending", get(ngos::list_pending))
        .route("/api/ngos/profile", get(ngos::profile))
        .route("/api/ngos/{id}/verify", patch(ngos::verify_ngo))
        .route(
            "/api/donations",
            get(donations::list_donations).post(donations::create_donation),
        )
        .route("/api/donations/nearby", get(donations::nearby_donations))
        .route(
            "/api/donations/{id}",
            get(donations::get_donation).patch(donations::update_donation),
        )
        .route("/api/donations/{id}/accept", post(donations::accept_donation))
        .route("/api/donations/{id}/updates", get(donations::donation_updates))
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/conversations", get(messages::conversations))
        .route("/api/messages/{id}", get(messages::conversation))
        .route("/api/messages/{id}/read", patch(messages::mark_read))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher, jwt_secret))
}
