//! Core domain model for the document marketplace.
//!
//! All monetary values are USDC amounts kept as two-decimal floats; the
//! ledger is responsible for rounding at the fee-split boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rounds a USDC amount to whole cents.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rounds a rating to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fixed category set for listed documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    Research,
    Legal,
    Educational,
    Business,
    Technical,
    Creative,
    Data,
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Research => "Research",
            DocumentCategory::Legal => "Legal",
            DocumentCategory::Educational => "Educational",
            DocumentCategory::Business => "Business",
            DocumentCategory::Technical => "Technical",
            DocumentCategory::Creative => "Creative",
            DocumentCategory::Data => "Data",
            DocumentCategory::Other => "Other",
        }
    }
}

impl std::fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wallet-keyed identity. Created on first wallet connection, immutable
/// afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub wallet_address: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public subset of a user embedded in marketplace listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerInfo {
    pub id: String,
    pub wallet_address: String,
    pub display_name: Option<String>,
}

impl From<&User> for SellerInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            wallet_address: user.wallet_address.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

/// A listed, encrypted artifact. The plaintext never touches the server;
/// `ipfs_hash` locates the ciphertext and `encryption_iv` is handed to the
/// buyer after a successful purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub category: DocumentCategory,
    pub price_usdc: f64,
    /// File size in bytes.
    pub file_size: u64,
    pub file_type: String,
    /// Content-addressed locator of the encrypted payload.
    pub ipfs_hash: String,
    /// AES-GCM initialization vector, client-generated.
    pub encryption_iv: String,
    pub thumbnail_url: Option<String>,
    pub downloads: u64,
    /// Average rating in [0, 5].
    pub rating: f64,
    pub rating_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when listing a new document. Counters and rating always
/// start at zero regardless of input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub seller_id: String,
    pub title: String,
    pub description: String,
    pub category: DocumentCategory,
    pub price_usdc: f64,
    pub file_size: u64,
    pub file_type: String,
    pub ipfs_hash: String,
    pub encryption_iv: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Shallow patch for a document. Absent fields are left untouched; no
/// field-level validation is applied beyond what the caller supplies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<DocumentCategory>,
    pub price_usdc: Option<f64>,
    pub thumbnail_url: Option<String>,
    pub downloads: Option<u64>,
    pub rating: Option<f64>,
    pub rating_count: Option<u32>,
    pub is_active: Option<bool>,
}

/// Document joined with its seller's public fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWithSeller {
    #[serde(flatten)]
    pub document: Document,
    pub seller: SellerInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

/// Immutable record of a settled transaction. The fee split is fixed at
/// 5% platform / 95% seller and computed at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: u64,
    pub document_id: u64,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount_usdc: f64,
    pub platform_fee_usdc: f64,
    pub seller_revenue_usdc: f64,
    /// Synthesized settlement transaction hash.
    pub tx_hash: String,
    /// Simulated x402 micropayment protocol identifier.
    pub x402_payment_id: String,
    pub status: PurchaseStatus,
    pub purchased_by_agent: bool,
    pub created_at: DateTime<Utc>,
}

/// Purchase enriched with the referenced document, when it still exists.
/// Deleted documents are silently omitted rather than failing the join.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseWithDocument {
    #[serde(flatten)]
    pub purchase: Purchase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// Budget and bookkeeping for one autonomous shopping session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub id: u64,
    pub user_id: String,
    pub budget_usdc: f64,
    pub spent_usdc: f64,
    pub search_query: String,
    pub max_price_per_doc: Option<f64>,
    pub category: Option<DocumentCategory>,
    pub status: SessionStatus,
    pub documents_found: u32,
    pub documents_purchased: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgentSession {
    pub user_id: String,
    pub budget_usdc: f64,
    pub search_query: String,
    #[serde(default)]
    pub max_price_per_doc: Option<f64>,
    #[serde(default)]
    pub category: Option<DocumentCategory>,
}

/// Shallow patch for an agent session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSessionPatch {
    pub spent_usdc: Option<f64>,
    pub status: Option<SessionStatus>,
    pub documents_found: Option<u32>,
    pub documents_purchased: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Search,
    Evaluate,
    Purchase,
    Complete,
}

/// Append-only audit entry in a session's activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentActivity {
    pub id: u64,
    pub session_id: u64,
    pub action: ActivityAction,
    pub details: String,
    pub document_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Aggregates over a seller's completed purchases and active listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    pub total_revenue: f64,
    pub total_sales: u64,
    pub documents_listed: u64,
    pub avg_rating: f64,
}

/// Global aggregates over active documents and completed purchases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceStats {
    pub total_documents: u64,
    pub total_sales: u64,
    pub total_volume: f64,
    pub avg_price: f64,
}
