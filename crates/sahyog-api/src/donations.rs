use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{debug, info};

use sahyog_db::Transition;
use sahyog_types::api::{CreateDonationRequest, UpdateDonationRequest};
use sahyog_types::models::{Donation, DonationStatus, DonationUpdate, Role};
use sahyog_types::token::Claims;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::policy::{Caller, DonationScope};

/// Donor: own donations. NGO: donations assigned to it. Admin: the pending pool.
pub async fn list_donations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Donation>>> {
    let caller = Caller::load(&state.db, &claims)?;
    let donations = match caller.donation_scope() {
        DonationScope::OwnedBy(donor_id) => state.db.list_donations_by_donor(donor_id)?,
        DonationScope::AssignedTo(ngo_id) => state.db.list_donations_by_ngo(ngo_id)?,
        DonationScope::Pending => state.db.list_donations_by_status(DonationStatus::Pending)?,
        DonationScope::Nothing => Vec::new(),
    };
    Ok(Json(donations))
}

/// No geolocation yet: every pending donation is "nearby".
pub async fn nearby_donations(State(state): State<AppState>) -> ApiResult<Json<Vec<Donation>>> {
    let donations = state.db.list_donations_by_status(DonationStatus::Pending)?;
    Ok(Json(donations))
}

pub async fn create_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateDonationRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    let caller = Caller::load(&state.db, &claims)?;
    if !caller.can_create_donation() {
        return Err(ApiError::Forbidden("Only donors can create donations"));
    }
    req.validate().map_err(|e| ApiError::invalid("Invalid donation data", e))?;

    let donation = state.db.create_donation(caller.id, &req)?;
    info!("donation {} created by donor {}", donation.id, caller.id);

    Ok((StatusCode::CREATED, Json(donation)))
}

pub async fn get_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Donation>> {
    let caller = Caller::load(&state.db, &claims)?;
    let donation = visible_donation(&state, &caller, id)?;
    Ok(Json(donation))
}

pub async fn donation_updates(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Vec<DonationUpdate>>> {
    let caller = Caller::load(&state.db, &claims)?;
    visible_donation(&state, &caller, id)?;
    Ok(Json(state.db.get_donation_updates(id)?))
}

pub async fn update_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateDonationRequest>, ApiError>,
) -> ApiResult<Json<Donation>> {
    req.validate().map_err(|e| ApiError::invalid("Invalid update data", e))?;
    let caller = Caller::load(&state.db, &claims)?;

    let donation = apply_transition(&state, &caller, id, req.status, req.message.as_deref(), req.actual_impact)?;
    Ok(Json(donation))
}

pub async fn accept_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ApiError>,
) -> ApiResult<Json<Donation>> {
    let caller = Caller::load(&state.db, &claims)?;
    let donation = apply_transition(&state, &caller, id, DonationStatus::Accepted, None, None)?;
    Ok(Json(donation))
}

fn visible_donation(state: &AppState, caller: &Caller, id: i64) -> ApiResult<Donation> {
    let donation = state
        .db
        .get_donation(id)?
        .ok_or(ApiError::NotFound("Donation not found"))?;
    if !caller.can_view(&donation) {
        return Err(ApiError::Forbidden("Not allowed to view this donation"));
    }
    Ok(donation)
}

/// Authorize against the current row, then check-and-set against the status
/// that was authorized. A concurrent writer in between turns into a 409.
fn apply_transition(
    state: &AppState,
    caller: &Caller,
    id: i64,
    to: DonationStatus,
    note: Option<&str>,
    actual_impact: Option<i64>,
) -> ApiResult<Donation> {
    let current = state
        .db
        .get_donation(id)?
        .ok_or(ApiError::NotFound("Donation not found"))?;
    // An NGO arriving after another one already took it lost the same race.
    if to == DonationStatus::Accepted && caller.role == Role::Ngo && current.ngo_id.is_some() {
        return Err(ApiError::Conflict("Donation already accepted"));
    }
    caller.check_transition(&current, to)?;

    let default_note = format!("Status changed to {}", to);
    let transition = Transition {
        donation_id: id,
        from: current.status,
        to,
        ngo_id: if to == DonationStatus::Accepted { caller.ngo_id } else { None },
        actual_impact: if to == DonationStatus::Delivered { actual_impact } else { None },
        updated_by: caller.id,
        note: Some(note.filter(|n| !n.trim().is_empty()).unwrap_or(default_note.as_str())),
    };

    match state.db.transition_donation(&transition)? {
        Some(updated) => {
            info!("donation {} moved {} -> {} by user {}", id, current.status, to, caller.id);
            Ok(updated)
        }
        None => {
            debug!("donation {} left {} before user {} could move it", id, current.status, caller.id);
            if state.db.get_donation(id)?.is_none() {
                return Err(ApiError::NotFound("Donation not found"));
            }
            Err(ApiError::Conflict("Donation was updated by someone else"))
        }
    }
}
