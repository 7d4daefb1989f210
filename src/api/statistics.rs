use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use lemmasearch_backend::error::ServiceError;
use lemmasearch_backend::statistics::{self, Statistics};

use super::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub result: bool,
    pub statistics: Statistics,
}

/// GET /api/statistics
pub async fn get_statistics(State(state): State<Arc<AppState>>) -> ApiResult<StatisticsResponse> {
    let statistics = statistics::collect(&state.store, &state.config.sites)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(StatisticsResponse {
        result: true,
        statistics,
    }))
}
