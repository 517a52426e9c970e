use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::{ApiError, ApiResult, AppState};
use crate::types::{MarketplaceStats, SellerStats};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStatsParams {
    pub seller_id: Option<String>,
}

pub async fn seller_stats(
    State(state): State<AppState>,
    Query(params): Query<SellerStatsParams>,
) -> ApiResult<Json<SellerStats>> {
    let seller_id = params
        .seller_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Seller ID is required"))?;
    Ok(Json(state.ledger.seller_stats(&seller_id).await))
}

pub async fn marketplace_stats(State(state): State<AppState>) -> Json<MarketplaceStats> {
    Json(state.ledger.marketplace_stats().await)
}
