use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use lemmasearch_backend::search::{Pagination, SearchItem};

use super::ApiResult;
use crate::state::AppState;

/// Raw query string; offset/limit stay strings so bad values fall back / 原始查询参数
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub site: Option<String>,
    pub offset: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    pub count: usize,
    pub data: Vec<SearchItem>,
}

/// GET /api/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let pagination = Pagination::parse(params.offset.as_deref(), params.limit.as_deref());
    let outcome = state
        .search
        .search(&params.query, params.site.as_deref(), pagination)
        .await?;

    Ok(Json(SearchResponse {
        result: true,
        count: outcome.total,
        data: outcome.items,
    }))
}
