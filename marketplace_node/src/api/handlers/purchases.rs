use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ApiResult, AppState};
use crate::types::{Purchase, PurchaseWithDocument};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseRequest {
    pub document_id: Option<u64>,
    pub buyer_id: Option<String>,
    #[serde(default)]
    pub purchased_by_agent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseResponse {
    pub purchase: Purchase,
    pub message: &'static str,
    /// Location of the encrypted payload, released on successful settlement.
    pub ipfs_hash: String,
    pub encryption_iv: String,
}

/// Settles a purchase over the simulated x402 payment rail and releases the
/// decryption parameters to the buyer.
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(req): Json<CreatePurchaseRequest>,
) -> ApiResult<(StatusCode, Json<CreatePurchaseResponse>)> {
    let (document_id, buyer_id) = match (req.document_id, req.buyer_id) {
        (Some(doc), Some(buyer)) if !buyer.is_empty() => (doc, buyer),
        _ => {
            return Err(ApiError::bad_request(
                "Document ID and buyer ID are required",
            ))
        }
    };

    let receipt = state
        .ledger
        .purchase(document_id, &buyer_id, req.purchased_by_agent)
        .await
        .map_err(|e| {
            error!("purchase failed: document={document_id} buyer={buyer_id}: {e}");
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePurchaseResponse {
            purchase: receipt.purchase,
            message: "Payment successful via x402 protocol",
            ipfs_hash: receipt.ipfs_hash,
            encryption_iv: receipt.encryption_iv,
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryParams {
    pub user_id: Option<String>,
}

/// Merged buyer-side and seller-side history for the dashboard, newest
/// first.
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<PurchaseWithDocument>>> {
    let user_id = params
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("User ID is required"))?;
    Ok(Json(state.ledger.history_for_user(&user_id).await))
}

pub async fn list_buyer_purchases(
    State(state): State<AppState>,
    Path(buyer_id): Path<String>,
) -> Json<Vec<PurchaseWithDocument>> {
    Json(state.ledger.purchases_by_buyer(&buyer_id).await)
}
