use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;

use sahyog_types::api::{CreateNgoRequest, VerifyNgoRequest};
use sahyog_types::models::Ngo;
use sahyog_types::token::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::policy::Caller;

/// Public directory: verified NGOs only.
pub async fn list_verified(State(state): State<AppState>) -> ApiResult<Json<Vec<Ngo>>> {
    Ok(Json(state.db.list_ngos(true)?))
}

pub async fn list_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Ngo>>> {
    let caller = Caller::load(&state.db, &claims)?;
    if !caller.can_verify_ngos() {
        return Err(ApiError::Forbidden("Admin access required"));
    }
    Ok(Json(state.db.list_ngos(false)?))
}

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Ngo>> {
    let caller = Caller::load(&state.db, &claims)?;
    if !caller.can_create_ngo() {
        return Err(ApiError::Forbidden("NGO access required"));
    }
    let ngo = state
        .db
        .get_ngo_by_user(caller.id)?
        .ok_or(ApiError::NotFound("NGO profile not found"))?;
    Ok(Json(ngo))
}

pub async fn create_ngo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateNgoRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let caller = Caller::load(&state.db, &claims)?;
    if !caller.can_create_ngo() {
        return Err(ApiError::Forbidden("NGO access required"));
    }
    req.validate().map_err(|e| ApiError::invalid("Invalid NGO data", e))?;

    let ngo = state
        .db
        .create_ngo(caller.id, &req)?
        .ok_or(ApiError::BadRequest("NGO profile already exists"))?;
    info!("ngo {} registered by user {}, awaiting verification", ngo.id, caller.id);

    Ok((StatusCode::CREATED, Json(ngo)))
}

pub async fn verify_ngo(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<VerifyNgoRequest>, ApiError>,
) -> ApiResult<Json<Ngo>> {
    let caller = Caller::load(&state.db, &claims)?;
    if !caller.can_verify_ngos() {
        return Err(ApiError::Forbidden("Admin access required"));
    }

    let ngo = state
        .db
        .set_ngo_verified(id, req.verified)?
        .ok_or(ApiError::NotFound("NGO not found"))?;
    info!("ngo {} verified={} by admin {}", ngo.id, ngo.verified, caller.id);

    Ok(Json(ngo))
}
