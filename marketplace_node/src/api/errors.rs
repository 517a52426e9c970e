//! API error handling for the marketplace node.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::agent::AgentError;
use crate::ledger::LedgerError;

/// Wire-level API error: HTTP status code plus a sanitized message and
/// optional structured details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: u64,
}

impl ApiError {
    pub fn new(code: u16, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }

    pub fn with_details(code: u16, message: String, details: serde_json::Value) -> Self {
        Self {
            code,
            message,
            details: Some(details),
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }

    // Common error constructors
    pub fn bad_request(message: &str) -> Self {
        Self::new(400, message.to_string())
    }

    pub fn not_found(message: &str) -> Self {
        Self::new(404, message.to_string())
    }

    pub fn internal_server_error(message: &str) -> Self {
        Self::new(500, message.to_string())
    }

    // Marketplace-specific errors
    pub fn document_not_found(document_id: u64) -> Self {
        Self::with_details(
            404,
            "Document not found".to_string(),
            serde_json::json!({ "documentId": document_id }),
        )
    }

    pub fn already_purchased(document_id: u64) -> Self {
        Self::with_details(
            400,
            "Document already purchased".to_string(),
            serde_json::json!({ "documentId": document_id }),
        )
    }

    pub fn budget_exceeded(budget: f64, spent: f64, price: f64) -> Self {
        Self::with_details(
            400,
            "Agent budget exceeded".to_string(),
            serde_json::json!({
                "budgetUsdc": budget,
                "spentUsdc": spent,
                "documentPriceUsdc": price,
            }),
        )
    }

    pub fn session_not_found(session_id: u64) -> Self {
        Self::with_details(
            404,
            "Agent session not found".to_string(),
            serde_json::json!({ "sessionId": session_id }),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DocumentNotFound(id) => Self::document_not_found(id),
            LedgerError::AlreadyPurchased { document_id, .. } => {
                Self::already_purchased(document_id)
            }
            LedgerError::InvalidInput(message) => Self::bad_request(&message),
        }
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Ledger(inner) => inner.into(),
            AgentError::SessionNotFound(id) => Self::session_not_found(id),
            AgentError::BudgetExceeded {
                budget,
                spent,
                price,
            } => Self::budget_exceeded(budget, spent, price),
        }
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
