use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::{ApiError, ApiResult, AppState};
use crate::types::User;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectWalletRequest {
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Get-or-create a user from a wallet connection. Lookup is
/// case-insensitive on the address.
pub async fn connect_wallet(
    State(state): State<AppState>,
    Json(req): Json<ConnectWalletRequest>,
) -> ApiResult<Json<User>> {
    let wallet_address = req
        .wallet_address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("Wallet address is required"))?;

    let user = state
        .store
        .get_or_create_user_by_wallet(&wallet_address, req.display_name)
        .await;
    Ok(Json(user))
}
