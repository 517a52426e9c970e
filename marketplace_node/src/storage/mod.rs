//! Storage abstraction for the marketplace.
//!
//! The trait boundary is exactly the catalog/ledger operation list: a real
//! transactional backend can replace [`MemoryStore`] without touching the
//! purchase workflow.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    AgentActivity, AgentSession, AgentSessionPatch, Document, DocumentCategory, DocumentPatch,
    DocumentWithSeller, MarketplaceStats, NewAgentSession, NewDocument, Purchase,
    PurchaseWithDocument, SellerStats, User,
};

pub mod memory;
pub mod seed;

pub use memory::MemoryStore;

/// Storage-specific result type.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    /// Unique-constraint violation on (buyer, document, completed).
    #[error("duplicate purchase for buyer {buyer_id} and document {document_id}")]
    DuplicatePurchase { buyer_id: String, document_id: u64 },
    /// A funds reservation would push a session past its budget.
    #[error("budget exceeded: spent {spent_usdc:.2} of {budget_usdc:.2} USDC, reservation {amount_usdc:.2}")]
    BudgetExceeded {
        budget_usdc: f64,
        spent_usdc: f64,
        amount_usdc: f64,
    },
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Fields of a purchase the ledger supplies; the store assigns the id,
/// timestamp, and download-counter side effect.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub document_id: u64,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount_usdc: f64,
    pub platform_fee_usdc: f64,
    pub seller_revenue_usdc: f64,
    pub tx_hash: String,
    pub x402_payment_id: String,
    pub purchased_by_agent: bool,
}

/// Activity entry to append to a session's audit log.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub session_id: u64,
    pub action: crate::types::ActivityAction,
    pub details: String,
    pub document_id: Option<u64>,
}

/// Catalog, ledger, and agent-session storage operations.
///
/// Implementations must make `record_purchase` atomic: the completed-purchase
/// uniqueness check, the insert, and the download-counter bump happen in one
/// critical section so two concurrent purchases of the same (buyer, document)
/// pair can never both succeed.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // Users
    async fn get_user(&self, id: &str) -> Option<User>;
    async fn get_user_by_wallet(&self, wallet_address: &str) -> Option<User>;
    async fn create_user(&self, wallet_address: &str, display_name: Option<String>) -> User;
    /// Case-insensitive lookup by wallet address, creating on first contact.
    async fn get_or_create_user_by_wallet(
        &self,
        wallet_address: &str,
        display_name: Option<String>,
    ) -> User;

    // Documents
    async fn get_document(&self, id: u64) -> Option<Document>;
    /// Joined lookup; `None` when either the document or its seller is gone.
    async fn get_document_with_seller(&self, id: u64) -> Option<DocumentWithSeller>;
    /// Active listings with seller info, newest first.
    async fn list_active_documents(&self) -> Vec<DocumentWithSeller>;
    /// Every document owned by the seller, inactive ones included.
    async fn list_documents_by_seller(&self, seller_id: &str) -> Vec<Document>;
    async fn create_document(&self, doc: NewDocument) -> Document;
    async fn update_document(&self, id: u64, patch: DocumentPatch) -> Option<Document>;
    /// Unconditional removal; no error when already absent.
    async fn delete_document(&self, id: u64);
    /// Counter bump; no-op when the document is absent.
    async fn increment_downloads(&self, id: u64);
    /// Case-insensitive substring match over title/description/category,
    /// AND'ed with the optional category and price-ceiling filters. An empty
    /// query matches every active document.
    async fn search_documents(
        &self,
        query: &str,
        category: Option<DocumentCategory>,
        max_price: Option<f64>,
    ) -> Vec<DocumentWithSeller>;

    // Purchases
    async fn get_purchase(&self, id: u64) -> Option<Purchase>;
    /// Atomic insert-if-absent of a completed purchase. Fails with
    /// [`StoreError::DuplicatePurchase`] when the buyer already holds a
    /// completed purchase of the document; bumps the document's download
    /// counter on success.
    async fn record_purchase(&self, purchase: NewPurchase) -> Result<Purchase>;
    async fn purchases_by_buyer(&self, buyer_id: &str) -> Vec<PurchaseWithDocument>;
    async fn purchases_by_seller(&self, seller_id: &str) -> Vec<PurchaseWithDocument>;
    /// Considers only completed purchases.
    async fn has_purchased(&self, buyer_id: &str, document_id: u64) -> bool;

    // Agent sessions and activity log
    async fn create_agent_session(&self, session: NewAgentSession) -> AgentSession;
    async fn get_agent_session(&self, id: u64) -> Option<AgentSession>;
    async fn agent_sessions_by_user(&self, user_id: &str) -> Vec<AgentSession>;
    async fn update_agent_session(&self, id: u64, patch: AgentSessionPatch)
        -> Option<AgentSession>;
    /// Atomic budget reservation: the remaining-budget check and the
    /// `spent_usdc`/`documents_purchased` bump happen in one critical
    /// section, so concurrent purchases against one session cannot jointly
    /// exceed its budget. Fails with [`StoreError::BudgetExceeded`] when the
    /// reservation does not fit.
    async fn reserve_session_funds(&self, id: u64, amount: f64) -> Result<AgentSession>;
    /// Returns previously reserved funds after a failed settlement.
    async fn release_session_funds(&self, id: u64, amount: f64) -> Option<AgentSession>;
    async fn create_agent_activity(&self, activity: NewActivity) -> AgentActivity;
    /// Session audit log, oldest first.
    async fn activities_by_session(&self, session_id: u64) -> Vec<AgentActivity>;

    // Aggregates
    async fn seller_stats(&self, seller_id: &str) -> SellerStats;
    async fn marketplace_stats(&self) -> MarketplaceStats;
}
