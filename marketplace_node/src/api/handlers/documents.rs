use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::{ApiError, ApiResult, AppState};
use crate::types::{Document, DocumentCategory, DocumentPatch, DocumentWithSeller, NewDocument};

/// Active listings with seller info, newest first.
pub async fn list_documents(State(state): State<AppState>) -> Json<Vec<DocumentWithSeller>> {
    Json(state.store.list_active_documents().await)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

pub async fn search_documents(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<DocumentWithSeller>> {
    let results = state
        .store
        .search_documents(
            params.q.as_deref().unwrap_or(""),
            params.category,
            params.max_price,
        )
        .await;
    Json(results)
}

/// Every document owned by the seller, inactive listings included.
pub async fn list_my_documents(
    State(state): State<AppState>,
    Path(seller_id): Path<String>,
) -> Json<Vec<Document>> {
    Json(state.store.list_documents_by_seller(&seller_id).await)
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<DocumentWithSeller>> {
    state
        .store
        .get_document_with_seller(id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::document_not_found(id))
}

pub async fn create_document(
    State(state): State<AppState>,
    Json(req): Json<NewDocument>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    if req.title.is_empty() || req.ipfs_hash.is_empty() || req.encryption_iv.is_empty() {
        return Err(ApiError::bad_request(
            "Title, IPFS hash, and encryption IV are required",
        ));
    }
    if req.price_usdc < 0.0 {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }
    if state.store.get_user(&req.seller_id).await.is_none() {
        return Err(ApiError::bad_request("Unknown seller"));
    }

    let document = state.store.create_document(req).await;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Shallow patch; provided fields are merged without further validation.
pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<DocumentPatch>,
) -> ApiResult<Json<Document>> {
    state
        .store
        .update_document(id, patch)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::document_not_found(id))
}

/// Idempotent delete: already-absent documents still yield 204.
pub async fn delete_document(State(state): State<AppState>, Path(id): Path<u64>) -> StatusCode {
    state.store.delete_document(id).await;
    StatusCode::NO_CONTENT
}
