//! In-memory [`MarketStore`] implementation.
//!
//! One `RwLock` guards all entity maps and id counters. Taking the write
//! lock for `record_purchase` serializes the uniqueness check, the insert,
//! and the download bump, which closes the double-purchase race a naive
//! check-then-act sequence would allow.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MarketStore, NewActivity, NewPurchase, Result, StoreError};
use crate::types::{
    round1, round2, AgentActivity, AgentSession, AgentSessionPatch, Document, DocumentCategory,
    DocumentPatch, DocumentWithSeller, MarketplaceStats, NewAgentSession, NewDocument, Purchase,
    PurchaseStatus, PurchaseWithDocument, SellerStats, SessionStatus, User,
};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    documents: HashMap<u64, Document>,
    purchases: HashMap<u64, Purchase>,
    agent_sessions: HashMap<u64, AgentSession>,
    agent_activities: HashMap<u64, AgentActivity>,
    next_doc_id: u64,
    next_purchase_id: u64,
    next_session_id: u64,
    next_activity_id: u64,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_doc_id: 1,
                next_purchase_id: 1,
                next_session_id: 1,
                next_activity_id: 1,
                ..Inner::default()
            }),
        }
    }
}

impl Inner {
    fn document_with_seller(&self, doc: &Document) -> Option<DocumentWithSeller> {
        let seller = self.users.get(&doc.seller_id)?;
        Some(DocumentWithSeller {
            document: doc.clone(),
            seller: seller.into(),
        })
    }

    /// Active listings joined with their sellers, newest first. Documents
    /// whose seller record has vanished are skipped.
    fn active_documents(&self) -> Vec<DocumentWithSeller> {
        let mut docs: Vec<DocumentWithSeller> = self
            .documents
            .values()
            .filter(|d| d.is_active)
            .filter_map(|d| self.document_with_seller(d))
            .collect();
        docs.sort_by_key(|d| Reverse((d.document.created_at, d.document.id)));
        docs
    }

    fn join_purchases(&self, mut purchases: Vec<Purchase>) -> Vec<PurchaseWithDocument> {
        purchases.sort_by_key(|p| Reverse((p.created_at, p.id)));
        purchases
            .into_iter()
            .map(|p| {
                let document = self.documents.get(&p.document_id).cloned();
                PurchaseWithDocument {
                    purchase: p,
                    document,
                }
            })
            .collect()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Option<User> {
        self.inner.read().await.users.get(id).cloned()
    }

    async fn get_user_by_wallet(&self, wallet_address: &str) -> Option<User> {
        let inner = self.inner.read().await;
        inner
            .users
            .values()
            .find(|u| u.wallet_address.eq_ignore_ascii_case(wallet_address))
            .cloned()
    }

    async fn create_user(&self, wallet_address: &str, display_name: Option<String>) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            wallet_address: wallet_address.to_string(),
            display_name,
            created_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.users.insert(user.id.clone(), user.clone());
        user
    }

    async fn get_or_create_user_by_wallet(
        &self,
        wallet_address: &str,
        display_name: Option<String>,
    ) -> User {
        // Lookup and insert under one write lock so two concurrent first
        // connections of the same wallet yield a single user record.
        let mut inner = self.inner.write().await;
        if let Some(user) = inner
            .users
            .values()
            .find(|u| u.wallet_address.eq_ignore_ascii_case(wallet_address))
        {
            return user.clone();
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            wallet_address: wallet_address.to_string(),
            display_name,
            created_at: Utc::now(),
        };
        inner.users.insert(user.id.clone(), user.clone());
        user
    }

    async fn get_document(&self, id: u64) -> Option<Document> {
        self.inner.read().await.documents.get(&id).cloned()
    }

    async fn get_document_with_seller(&self, id: u64) -> Option<DocumentWithSeller> {
        let inner = self.inner.read().await;
        let doc = inner.documents.get(&id)?;
        inner.document_with_seller(doc)
    }

    async fn list_active_documents(&self) -> Vec<DocumentWithSeller> {
        self.inner.read().await.active_documents()
    }

    async fn list_documents_by_seller(&self, seller_id: &str) -> Vec<Document> {
        let inner = self.inner.read().await;
        inner
            .documents
            .values()
            .filter(|d| d.seller_id == seller_id)
            .cloned()
            .collect()
    }

    async fn create_document(&self, doc: NewDocument) -> Document {
        let mut inner = self.inner.write().await;
        let id = inner.next_doc_id;
        inner.next_doc_id += 1;
        let document = Document {
            id,
            seller_id: doc.seller_id,
            title: doc.title,
            description: doc.description,
            category: doc.category,
            price_usdc: doc.price_usdc,
            file_size: doc.file_size,
            file_type: doc.file_type,
            ipfs_hash: doc.ipfs_hash,
            encryption_iv: doc.encryption_iv,
            thumbnail_url: doc.thumbnail_url,
            downloads: 0,
            rating: 0.0,
            rating_count: 0,
            is_active: doc.is_active.unwrap_or(true),
            created_at: Utc::now(),
        };
        inner.documents.insert(id, document.clone());
        document
    }

    async fn update_document(&self, id: u64, patch: DocumentPatch) -> Option<Document> {
        let mut inner = self.inner.write().await;
        let doc = inner.documents.get_mut(&id)?;
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(description) = patch.description {
            doc.description = description;
        }
        if let Some(category) = patch.category {
            doc.category = category;
        }
        if let Some(price) = patch.price_usdc {
            doc.price_usdc = price;
        }
        if let Some(thumbnail_url) = patch.thumbnail_url {
            doc.thumbnail_url = Some(thumbnail_url);
        }
        if let Some(downloads) = patch.downloads {
            doc.downloads = downloads;
        }
        if let Some(rating) = patch.rating {
            doc.rating = rating;
        }
        if let Some(rating_count) = patch.rating_count {
            doc.rating_count = rating_count;
        }
        if let Some(is_active) = patch.is_active {
            doc.is_active = is_active;
        }
        Some(doc.clone())
    }

    async fn delete_document(&self, id: u64) {
        self.inner.write().await.documents.remove(&id);
    }

    async fn increment_downloads(&self, id: u64) {
        let mut inner = self.inner.write().await;
        if let Some(doc) = inner.documents.get_mut(&id) {
            doc.downloads += 1;
        }
    }

    async fn search_documents(
        &self,
        query: &str,
        category: Option<DocumentCategory>,
        max_price: Option<f64>,
    ) -> Vec<DocumentWithSeller> {
        let query_lower = query.to_lowercase();
        self.inner
            .read()
            .await
            .active_documents()
            .into_iter()
            .filter(|d| {
                let doc = &d.document;
                let matches_query = doc.title.to_lowercase().contains(&query_lower)
                    || doc.description.to_lowercase().contains(&query_lower)
                    || doc
                        .category
                        .as_str()
                        .to_lowercase()
                        .contains(&query_lower);
                let matches_category = category.map_or(true, |c| doc.category == c);
                let matches_price = max_price.map_or(true, |p| doc.price_usdc <= p);
                matches_query && matches_category && matches_price
            })
            .collect()
    }

    async fn get_purchase(&self, id: u64) -> Option<Purchase> {
        self.inner.read().await.purchases.get(&id).cloned()
    }

    async fn record_purchase(&self, purchase: NewPurchase) -> Result<Purchase> {
        let mut inner = self.inner.write().await;

        // Unique-constraint insert: check and write under the same lock.
        let duplicate = inner.purchases.values().any(|p| {
            p.buyer_id == purchase.buyer_id
                && p.document_id == purchase.document_id
                && p.status == PurchaseStatus::Completed
        });
        if duplicate {
            return Err(StoreError::DuplicatePurchase {
                buyer_id: purchase.buyer_id,
                document_id: purchase.document_id,
            });
        }

        let id = inner.next_purchase_id;
        inner.next_purchase_id += 1;
        let record = Purchase {
            id,
            document_id: purchase.document_id,
            buyer_id: purchase.buyer_id,
            seller_id: purchase.seller_id,
            amount_usdc: purchase.amount_usdc,
            platform_fee_usdc: purchase.platform_fee_usdc,
            seller_revenue_usdc: purchase.seller_revenue_usdc,
            tx_hash: purchase.tx_hash,
            x402_payment_id: purchase.x402_payment_id,
            status: PurchaseStatus::Completed,
            purchased_by_agent: purchase.purchased_by_agent,
            created_at: Utc::now(),
        };
        inner.purchases.insert(id, record.clone());

        if let Some(doc) = inner.documents.get_mut(&record.document_id) {
            doc.downloads += 1;
        }

        Ok(record)
    }

    async fn purchases_by_buyer(&self, buyer_id: &str) -> Vec<PurchaseWithDocument> {
        let inner = self.inner.read().await;
        let purchases = inner
            .purchases
            .values()
            .filter(|p| p.buyer_id == buyer_id)
            .cloned()
            .collect();
        inner.join_purchases(purchases)
    }

    async fn purchases_by_seller(&self, seller_id: &str) -> Vec<PurchaseWithDocument> {
        let inner = self.inner.read().await;
        let purchases = inner
            .purchases
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        inner.join_purchases(purchases)
    }

    async fn has_purchased(&self, buyer_id: &str, document_id: u64) -> bool {
        let inner = self.inner.read().await;
        inner.purchases.values().any(|p| {
            p.buyer_id == buyer_id
                && p.document_id == document_id
                && p.status == PurchaseStatus::Completed
        })
    }

    async fn create_agent_session(&self, session: NewAgentSession) -> AgentSession {
        let mut inner = self.inner.write().await;
        let id = inner.next_session_id;
        inner.next_session_id += 1;
        let record = AgentSession {
            id,
            user_id: session.user_id,
            budget_usdc: session.budget_usdc,
            spent_usdc: 0.0,
            search_query: session.search_query,
            max_price_per_doc: session.max_price_per_doc,
            category: session.category,
            status: SessionStatus::Active,
            documents_found: 0,
            documents_purchased: 0,
            created_at: Utc::now(),
        };
        inner.agent_sessions.insert(id, record.clone());
        record
    }

    async fn get_agent_session(&self, id: u64) -> Option<AgentSession> {
        self.inner.read().await.agent_sessions.get(&id).cloned()
    }

    async fn agent_sessions_by_user(&self, user_id: &str) -> Vec<AgentSession> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<AgentSession> = inner
            .agent_sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| Reverse((s.created_at, s.id)));
        sessions
    }

    async fn update_agent_session(
        &self,
        id: u64,
        patch: AgentSessionPatch,
    ) -> Option<AgentSession> {
        let mut inner = self.inner.write().await;
        let session = inner.agent_sessions.get_mut(&id)?;
        if let Some(spent) = patch.spent_usdc {
            session.spent_usdc = spent;
        }
        if let Some(status) = patch.status {
            session.status = status;
        }
        if let Some(found) = patch.documents_found {
            session.documents_found = found;
        }
        if let Some(purchased) = patch.documents_purchased {
            session.documents_purchased = purchased;
        }
        Some(session.clone())
    }

    async fn reserve_session_funds(&self, id: u64, amount: f64) -> Result<AgentSession> {
        let mut inner = self.inner.write().await;
        let session = inner
            .agent_sessions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("agent session {id}")))?;

        // Check and bump under the same lock so concurrent reservations
        // cannot jointly exceed the budget.
        if session.spent_usdc + amount > session.budget_usdc {
            return Err(StoreError::BudgetExceeded {
                budget_usdc: session.budget_usdc,
                spent_usdc: session.spent_usdc,
                amount_usdc: amount,
            });
        }
        session.spent_usdc = round2(session.spent_usdc + amount);
        session.documents_purchased += 1;
        Ok(session.clone())
    }

    async fn release_session_funds(&self, id: u64, amount: f64) -> Option<AgentSession> {
        let mut inner = self.inner.write().await;
        let session = inner.agent_sessions.get_mut(&id)?;
        session.spent_usdc = round2((session.spent_usdc - amount).max(0.0));
        session.documents_purchased = session.documents_purchased.saturating_sub(1);
        Some(session.clone())
    }

    async fn create_agent_activity(&self, activity: NewActivity) -> AgentActivity {
        let mut inner = self.inner.write().await;
        let id = inner.next_activity_id;
        inner.next_activity_id += 1;
        let record = AgentActivity {
            id,
            session_id: activity.session_id,
            action: activity.action,
            details: activity.details,
            document_id: activity.document_id,
            created_at: Utc::now(),
        };
        inner.agent_activities.insert(id, record.clone());
        record
    }

    async fn activities_by_session(&self, session_id: u64) -> Vec<AgentActivity> {
        let inner = self.inner.read().await;
        let mut activities: Vec<AgentActivity> = inner
            .agent_activities
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        activities.sort_by_key(|a| (a.created_at, a.id));
        activities
    }

    async fn seller_stats(&self, seller_id: &str) -> SellerStats {
        let inner = self.inner.read().await;

        let completed: Vec<&Purchase> = inner
            .purchases
            .values()
            .filter(|p| p.seller_id == seller_id && p.status == PurchaseStatus::Completed)
            .collect();
        let total_revenue: f64 = completed.iter().map(|p| p.seller_revenue_usdc).sum();

        let listed: Vec<&Document> = inner
            .documents
            .values()
            .filter(|d| d.seller_id == seller_id && d.is_active)
            .collect();
        // Unweighted mean over active listings; unrated documents count as 0.
        let avg_rating = if listed.is_empty() {
            0.0
        } else {
            listed.iter().map(|d| d.rating).sum::<f64>() / listed.len() as f64
        };

        SellerStats {
            total_revenue: round2(total_revenue),
            total_sales: completed.len() as u64,
            documents_listed: listed.len() as u64,
            avg_rating: round1(avg_rating),
        }
    }

    async fn marketplace_stats(&self) -> MarketplaceStats {
        let inner = self.inner.read().await;

        let active: Vec<&Document> = inner.documents.values().filter(|d| d.is_active).collect();
        let completed: Vec<&Purchase> = inner
            .purchases
            .values()
            .filter(|p| p.status == PurchaseStatus::Completed)
            .collect();

        let total_volume: f64 = completed.iter().map(|p| p.amount_usdc).sum();
        let avg_price = if active.is_empty() {
            0.0
        } else {
            active.iter().map(|d| d.price_usdc).sum::<f64>() / active.len() as f64
        };

        MarketplaceStats {
            total_documents: active.len() as u64,
            total_sales: completed.len() as u64,
            total_volume: round2(total_volume),
            avg_price: round2(avg_price),
        }
    }
}
