use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use sahyog_gateway::dispatcher::Delivery;
use sahyog_types::api::SendMessageRequest;
use sahyog_types::events::GatewayEvent;
use sahyog_types::models::Message;
use sahyog_types::token::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::policy::Caller;

/// Latest message per correspondent, newest conversation first.
pub async fn conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.db.get_conversation_summaries(claims.sub)?))
}

/// Full thread with one user, oldest first. Unknown users have an empty thread.
pub async fn conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(other_id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Vec<Message>>> {
    Ok(Json(state.db.get_conversation(claims.sub, other_id)?))
}

/// Persist first, then push. The push is best-effort; an offline receiver
/// reads the message from the conversation endpoints later.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(|e| ApiError::invalid("Invalid message data", e))?;
    if req.receiver_id == claims.sub {
        return Err(ApiError::BadRequest("Cannot message yourself"));
    }
    if state.db.get_user(req.receiver_id)?.is_none() {
        return Err(ApiError::NotFound("Receiver not found"));
    }
    if let Some(donation_id) = req.donation_id {
        if state.db.get_donation(donation_id)?.is_none() {
            return Err(ApiError::NotFound("Donation not found"));
        }
    }

    let message = state.db.insert_message(claims.sub, &req)?;

    let delivery = state
        .dispatcher
        .deliver(message.receiver_id, GatewayEvent::NewMessage { message: message.clone() })
        .await;
    match delivery {
        Delivery::Sent => debug!("message {} pushed to user {}", message.id, message.receiver_id),
        Delivery::Dropped => debug!("user {} offline, message {} stored only", message.receiver_id, message.id),
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Message>> {
    let caller = Caller::load(&state.db, &claims)?;
    let message = state
        .db
        .get_message(id)?
        .ok_or(ApiError::NotFound("Message not found"))?;
    if !caller.can_mark_read(&message) {
        return Err(ApiError::Forbidden("Only the receiver can mark a message read"));
    }

    let message = state
        .db
        .mark_message_read(id)?
        .ok_or(ApiError::NotFound("Message not found"))?;
    Ok(Json(message))
}
