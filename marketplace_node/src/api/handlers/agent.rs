use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentQueryResult, UnlockedDocument};
use crate::api::{ApiError, ApiResult, AppState};
use crate::types::{AgentSession, DocumentCategory, NewAgentSession, Purchase};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentQueryRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub max_price_per_doc: Option<f64>,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
}

/// Natural-language search with narrative analysis. Ranking failures
/// degrade inside the orchestrator, so this endpoint only fails on missing
/// input.
pub async fn agent_query(
    State(state): State<AppState>,
    Json(req): Json<AgentQueryRequest>,
) -> ApiResult<Json<AgentQueryResult>> {
    let query = req
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Query is required"))?;

    let result = state
        .agent
        .query(&query, req.budget, req.max_price_per_doc, req.category)
        .await;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPurchaseRequest {
    pub document_id: Option<u64>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPurchaseResponse {
    pub purchase: Purchase,
    pub document: UnlockedDocument,
    pub message: &'static str,
}

pub async fn agent_purchase(
    State(state): State<AppState>,
    Json(req): Json<AgentPurchaseRequest>,
) -> ApiResult<(StatusCode, Json<AgentPurchaseResponse>)> {
    let (document_id, user_id) = match (req.document_id, req.user_id) {
        (Some(doc), Some(user)) if !user.is_empty() => (doc, user),
        _ => {
            return Err(ApiError::bad_request(
                "Document ID and user ID are required",
            ))
        }
    };

    let result = state
        .agent
        .autonomous_purchase(document_id, &user_id, req.session_id)
        .await
        .map_err(|e| {
            error!("agent purchase failed: document={document_id} user={user_id}: {e}");
            ApiError::from(e)
        })?;

    Ok((
        StatusCode::CREATED,
        Json(AgentPurchaseResponse {
            purchase: result.purchase.purchase,
            document: result.document,
            message: "AI Agent purchase successful via x402 protocol",
        }),
    ))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<NewAgentSession>,
) -> ApiResult<(StatusCode, Json<AgentSession>)> {
    if req.user_id.is_empty() || req.search_query.is_empty() {
        return Err(ApiError::bad_request("User ID and search query are required"));
    }
    if req.budget_usdc < 0.0 {
        return Err(ApiError::bad_request("Budget cannot be negative"));
    }
    let session = state.store.create_agent_session(req).await;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<Vec<AgentSession>> {
    Json(state.store.agent_sessions_by_user(&user_id).await)
}
