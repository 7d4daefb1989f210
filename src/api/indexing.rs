use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct IndexPageQuery {
    pub url: Option<String>,
}

/// GET /api/startIndexing
pub async fn start_indexing(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    state.orchestrator.start_indexing().await?;
    Ok(Json(ApiResponse::ok()))
}

/// GET /api/stopIndexing
pub async fn stop_indexing(State(state): State<Arc<AppState>>) -> ApiResult<ApiResponse> {
    state.orchestrator.stop_indexing().await?;
    Ok(Json(ApiResponse::ok()))
}

/// POST /api/indexPage - address from `?url=` or a `url=...` body / 地址来自查询参数或请求体
pub async fn index_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IndexPageQuery>,
    body: String,
) -> ApiResult<ApiResponse> {
    let address = match query.url {
        Some(url) if !url.trim().is_empty() => url,
        _ => address_from_body(&body),
    };
    state.orchestrator.index_page(&address).await?;
    Ok(Json(ApiResponse::ok()))
}

/// `url=https%3A%2F%2Fsite%2Fpage` -> `https://site/page` / 解析表单请求体
fn address_from_body(body: &str) -> String {
    let body = body.trim();
    let raw = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("url="))
        .unwrap_or(body);
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}
