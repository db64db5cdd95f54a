use axum::{Json, extract::State};

use sahyog_types::api::PlatformStats;

use crate::auth::AppState;
use crate::error::ApiResult;

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<PlatformStats>> {
    Ok(Json(state.db.platform_stats()?))
}
