//! Purchase ledger: fee accounting, settlement-id synthesis, and purchase
//! history over the injected store.
//!
//! Settlement is simulated end to end. The transaction hash and x402 payment
//! id are synthesized locally; in a real deployment both would come from an
//! external payment rail.

use std::sync::Arc;

use log::info;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::storage::{MarketStore, NewPurchase, StoreError};
use crate::types::{
    round2, MarketplaceStats, Purchase, PurchaseWithDocument, SellerStats,
};

/// Platform keeps 5% of every purchase.
pub const PLATFORM_FEE_RATE: f64 = 0.05;
/// Seller receives the remaining 95%.
pub const SELLER_REVENUE_RATE: f64 = 0.95;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("document {0} not found")]
    DocumentNotFound(u64),
    #[error("document {document_id} already purchased by {buyer_id}")]
    AlreadyPurchased { buyer_id: String, document_id: u64 },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Gross amount with its fixed 5%/95% split. Fee and revenue are rounded to
/// cents independently, so their sum may drift from the gross by up to one
/// cent. The drift is accepted, not corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSplit {
    pub amount_usdc: f64,
    pub platform_fee_usdc: f64,
    pub seller_revenue_usdc: f64,
}

pub fn split_fees(amount: f64) -> FeeSplit {
    FeeSplit {
        amount_usdc: round2(amount),
        platform_fee_usdc: round2(amount * PLATFORM_FEE_RATE),
        seller_revenue_usdc: round2(amount * SELLER_REVENUE_RATE),
    }
}

/// Synthesized stand-in for a blockchain transaction hash.
pub fn synth_tx_hash() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!("0x{}", hex::encode(bytes))
}

/// Synthesized x402 micropayment identifier.
pub fn synth_payment_id(by_agent: bool) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    if by_agent {
        format!("x402_agent_{millis}")
    } else {
        format!("x402_{millis}")
    }
}

/// A completed purchase plus the parameters the buyer needs to decrypt the
/// file. Produced only on success; this is the access-control gate for
/// unlocking a document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub ipfs_hash: String,
    pub encryption_iv: String,
}

pub struct PurchaseLedger {
    store: Arc<dyn MarketStore>,
}

impl PurchaseLedger {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// Settles a purchase: resolves the document, computes the fee split,
    /// synthesizes settlement identifiers, and records the completed
    /// purchase. The store's unique-constraint insert guarantees at most one
    /// completed purchase per (buyer, document) pair even under concurrent
    /// requests, and bumps the download counter exactly once.
    pub async fn purchase(
        &self,
        document_id: u64,
        buyer_id: &str,
        purchased_by_agent: bool,
    ) -> Result<PurchaseReceipt, LedgerError> {
        if buyer_id.is_empty() {
            return Err(LedgerError::InvalidInput("buyer id is required".to_string()));
        }

        let document = self
            .store
            .get_document(document_id)
            .await
            .ok_or(LedgerError::DocumentNotFound(document_id))?;

        let split = split_fees(document.price_usdc);
        let purchase = self
            .store
            .record_purchase(NewPurchase {
                document_id,
                buyer_id: buyer_id.to_string(),
                seller_id: document.seller_id.clone(),
                amount_usdc: split.amount_usdc,
                platform_fee_usdc: split.platform_fee_usdc,
                seller_revenue_usdc: split.seller_revenue_usdc,
                tx_hash: synth_tx_hash(),
                x402_payment_id: synth_payment_id(purchased_by_agent),
                purchased_by_agent,
            })
            .await
            .map_err(|e| match e {
                StoreError::DuplicatePurchase {
                    buyer_id,
                    document_id,
                } => LedgerError::AlreadyPurchased {
                    buyer_id,
                    document_id,
                },
                other => LedgerError::InvalidInput(other.to_string()),
            })?;

        info!(
            "purchase settled: id={} document={} buyer={} amount={:.2} fee={:.2} tx={}",
            purchase.id,
            document_id,
            buyer_id,
            purchase.amount_usdc,
            purchase.platform_fee_usdc,
            purchase.tx_hash
        );

        Ok(PurchaseReceipt {
            purchase,
            ipfs_hash: document.ipfs_hash,
            encryption_iv: document.encryption_iv,
        })
    }

    pub async fn has_purchased(&self, buyer_id: &str, document_id: u64) -> bool {
        self.store.has_purchased(buyer_id, document_id).await
    }

    pub async fn purchases_by_buyer(&self, buyer_id: &str) -> Vec<PurchaseWithDocument> {
        self.store.purchases_by_buyer(buyer_id).await
    }

    /// Merged buyer-side and seller-side history for one user, newest first.
    pub async fn history_for_user(&self, user_id: &str) -> Vec<PurchaseWithDocument> {
        let mut history = self.store.purchases_by_buyer(user_id).await;
        history.extend(self.store.purchases_by_seller(user_id).await);
        history.sort_by_key(|p| std::cmp::Reverse((p.purchase.created_at, p.purchase.id)));
        history
    }

    pub async fn seller_stats(&self, seller_id: &str) -> SellerStats {
        self.store.seller_stats(seller_id).await
    }

    pub async fn marketplace_stats(&self) -> MarketplaceStats {
        self.store.marketplace_stats().await
    }
}
