//! Agent orchestrator: natural-language document search plus autonomous
//! purchasing on a user's behalf.
//!
//! The ranking call is a narrow pluggable capability ([`DocumentRanker`]).
//! Its output is narrative text surfaced to the user, never parsed or
//! branched on, so the search/purchase core stays testable without a live
//! model behind it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;

use crate::ledger::{LedgerError, PurchaseLedger, PurchaseReceipt};
use crate::storage::{MarketStore, NewActivity, StoreError};
use crate::types::{ActivityAction, DocumentCategory, DocumentWithSeller};

pub mod gemini;

pub use gemini::GeminiRanker;

/// How many candidates are handed to the ranking service.
const RANK_CANDIDATES: usize = 10;
/// How many matches are returned to the caller.
const TOP_RESULTS: usize = 5;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("agent session {0} not found")]
    SessionNotFound(u64),
    #[error("budget exceeded: spent {spent:.2} of {budget:.2} USDC, document costs {price:.2}")]
    BudgetExceeded { budget: f64, spent: f64, price: f64 },
}

/// Everything the ranking service sees for one query.
#[derive(Debug, Clone)]
pub struct RankRequest {
    pub query: String,
    pub budget: Option<f64>,
    pub max_price_per_doc: Option<f64>,
    pub category: Option<DocumentCategory>,
    pub candidates: Vec<DocumentWithSeller>,
}

/// Opaque narrative ranking/explanation capability.
#[async_trait]
pub trait DocumentRanker: Send + Sync {
    async fn rank(&self, request: &RankRequest) -> anyhow::Result<String>;
}

/// Condensed listing returned in agent query results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub id: u64,
    pub title: String,
    pub price: f64,
    pub rating: f64,
    pub category: DocumentCategory,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentQueryResult {
    pub query: String,
    pub documents_found: usize,
    pub top_documents: Vec<DocumentSummary>,
    pub agent_analysis: String,
    /// Matches that satisfy both the per-document and total budget ceilings.
    pub can_purchase: usize,
}

/// Document fields the buyer needs after an autonomous purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedDocument {
    pub title: String,
    pub ipfs_hash: String,
    pub encryption_iv: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPurchaseResult {
    pub purchase: PurchaseReceipt,
    pub document: UnlockedDocument,
}

pub struct AgentOrchestrator {
    store: Arc<dyn MarketStore>,
    ledger: Arc<PurchaseLedger>,
    ranker: Arc<dyn DocumentRanker>,
    ranker_timeout: Duration,
}

impl AgentOrchestrator {
    pub fn new(
        store: Arc<dyn MarketStore>,
        ledger: Arc<PurchaseLedger>,
        ranker: Arc<dyn DocumentRanker>,
        ranker_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            ranker,
            ranker_timeout,
        }
    }

    /// Searches the catalog and asks the ranking service for a narrative
    /// evaluation. Ranking failures and timeouts degrade to a canned
    /// analysis rather than failing the whole query.
    ///
    /// The price ceiling on the search is `max_price_per_doc` when given,
    /// falling back to the total budget, so listings priced above the total
    /// budget can still appear in `top_documents`; `can_purchase` applies
    /// both limits.
    pub async fn query(
        &self,
        query: &str,
        budget: Option<f64>,
        max_price_per_doc: Option<f64>,
        category: Option<DocumentCategory>,
    ) -> AgentQueryResult {
        let ceiling = max_price_per_doc.or(budget);
        let matches = self.store.search_documents(query, category, ceiling).await;

        let request = RankRequest {
            query: query.to_string(),
            budget,
            max_price_per_doc,
            category,
            candidates: matches.iter().take(RANK_CANDIDATES).cloned().collect(),
        };
        let analysis = match timeout(self.ranker_timeout, self.ranker.rank(&request)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("ranking service failed, degrading to canned analysis: {e:#}");
                degraded_analysis(matches.len())
            }
            Err(_) => {
                warn!(
                    "ranking service timed out after {:?}, degrading to canned analysis",
                    self.ranker_timeout
                );
                degraded_analysis(matches.len())
            }
        };

        let can_purchase = matches
            .iter()
            .filter(|d| {
                let price = d.document.price_usdc;
                max_price_per_doc.map_or(true, |p| price <= p)
                    && budget.map_or(true, |b| price <= b)
            })
            .count();

        AgentQueryResult {
            query: query.to_string(),
            documents_found: matches.len(),
            top_documents: matches
                .iter()
                .take(TOP_RESULTS)
                .map(|d| DocumentSummary {
                    id: d.document.id,
                    title: d.document.title.clone(),
                    price: d.document.price_usdc,
                    rating: d.document.rating,
                    category: d.document.category,
                })
                .collect(),
            agent_analysis: analysis,
            can_purchase,
        }
    }

    /// Executes a purchase on the user's behalf. When a session is supplied
    /// its funds are reserved atomically before settlement and returned if
    /// settlement fails, so concurrent purchases cannot jointly exceed the
    /// budget.
    pub async fn autonomous_purchase(
        &self,
        document_id: u64,
        user_id: &str,
        session_id: Option<u64>,
    ) -> Result<AgentPurchaseResult, AgentError> {
        let document = self
            .store
            .get_document(document_id)
            .await
            .ok_or(LedgerError::DocumentNotFound(document_id))?;

        if let Some(sid) = session_id {
            self.store
                .reserve_session_funds(sid, document.price_usdc)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(_) => AgentError::SessionNotFound(sid),
                    StoreError::BudgetExceeded {
                        budget_usdc,
                        spent_usdc,
                        amount_usdc,
                    } => AgentError::BudgetExceeded {
                        budget: budget_usdc,
                        spent: spent_usdc,
                        price: amount_usdc,
                    },
                    other => AgentError::Ledger(LedgerError::InvalidInput(other.to_string())),
                })?;
        }

        let receipt = match self.ledger.purchase(document_id, user_id, true).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Some(sid) = session_id {
                    self.store.release_session_funds(sid, document.price_usdc).await;
                }
                return Err(e.into());
            }
        };

        if let Some(sid) = session_id {
            self.store
                .create_agent_activity(NewActivity {
                    session_id: sid,
                    action: ActivityAction::Purchase,
                    details: format!(
                        "Purchased \"{}\" for ${:.2} USDC",
                        document.title, document.price_usdc
                    ),
                    document_id: Some(document_id),
                })
                .await;
        }

        info!(
            "agent purchase: document={} user={} session={:?} amount={:.2}",
            document_id, user_id, session_id, receipt.purchase.amount_usdc
        );

        Ok(AgentPurchaseResult {
            purchase: receipt,
            document: UnlockedDocument {
                title: document.title,
                ipfs_hash: document.ipfs_hash,
                encryption_iv: document.encryption_iv,
            },
        })
    }
}

fn degraded_analysis(found: usize) -> String {
    format!("Found {found} matching documents. Detailed analysis is unavailable right now.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::types::{NewAgentSession, NewDocument};

    struct CannedRanker(&'static str);

    #[async_trait]
    impl DocumentRanker for CannedRanker {
        async fn rank(&self, _request: &RankRequest) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingRanker;

    #[async_trait]
    impl DocumentRanker for FailingRanker {
        async fn rank(&self, _request: &RankRequest) -> anyhow::Result<String> {
            anyhow::bail!("upstream unavailable")
        }
    }

    struct HangingRanker;

    #[async_trait]
    impl DocumentRanker for HangingRanker {
        async fn rank(&self, _request: &RankRequest) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    async fn orchestrator_with(
        ranker: Arc<dyn DocumentRanker>,
    ) -> (Arc<MemoryStore>, AgentOrchestrator, u64) {
        let store = Arc::new(MemoryStore::new());
        let seller = store.create_user("0xseller", None).await;
        let doc = store
            .create_document(NewDocument {
                seller_id: seller.id,
                title: "Zero-Day Vulnerability Analysis Framework".to_string(),
                description: "Methodology and tools for zero-day analysis".to_string(),
                category: DocumentCategory::Research,
                price_usdc: 4.50,
                file_size: 1024,
                file_type: "pdf".to_string(),
                ipfs_hash: "QmZ4tDu".to_string(),
                encryption_iv: "y1z2a3b4".to_string(),
                thumbnail_url: None,
                is_active: None,
            })
            .await;
        let ledger = Arc::new(PurchaseLedger::new(store.clone()));
        let orchestrator = AgentOrchestrator::new(
            store.clone(),
            ledger,
            ranker,
            Duration::from_millis(100),
        );
        (store, orchestrator, doc.id)
    }

    #[tokio::test]
    async fn query_surfaces_ranker_analysis() {
        let (_store, orchestrator, _doc) =
            orchestrator_with(Arc::new(CannedRanker("Top pick: the framework."))).await;
        let result = orchestrator.query("zero-day", None, None, None).await;
        assert_eq!(result.documents_found, 1);
        assert_eq!(result.top_documents.len(), 1);
        assert_eq!(result.agent_analysis, "Top pick: the framework.");
        assert_eq!(result.can_purchase, 1);
    }

    #[tokio::test]
    async fn query_degrades_on_ranker_failure() {
        let (_store, orchestrator, _doc) = orchestrator_with(Arc::new(FailingRanker)).await;
        let result = orchestrator.query("zero-day", None, None, None).await;
        assert_eq!(result.documents_found, 1);
        assert!(result.agent_analysis.contains("unavailable"));
    }

    #[tokio::test]
    async fn query_degrades_on_ranker_timeout() {
        let (_store, orchestrator, _doc) = orchestrator_with(Arc::new(HangingRanker)).await;
        let result = orchestrator.query("zero-day", None, None, None).await;
        assert!(result.agent_analysis.contains("unavailable"));
    }

    #[tokio::test]
    async fn query_counts_purchasable_within_budget() {
        let (_store, orchestrator, _doc) = orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        // The ceiling also constrains the search itself.
        let result = orchestrator.query("zero-day", Some(1.0), None, None).await;
        assert_eq!(result.documents_found, 0);
        assert_eq!(result.can_purchase, 0);

        let result = orchestrator.query("zero-day", Some(10.0), Some(5.0), None).await;
        assert_eq!(result.documents_found, 1);
        assert_eq!(result.can_purchase, 1);
    }

    #[tokio::test]
    async fn query_may_list_documents_above_total_budget() {
        let (_store, orchestrator, _doc) = orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        // The per-document ceiling drives the search, so the $4.50 document
        // still surfaces even though it exceeds the $1 total budget.
        let result = orchestrator.query("zero-day", Some(1.0), Some(5.0), None).await;
        assert_eq!(result.documents_found, 1);
        assert_eq!(result.top_documents.len(), 1);
        assert_eq!(result.can_purchase, 0);
    }

    #[tokio::test]
    async fn autonomous_purchase_flags_agent_and_logs_activity() {
        let (store, orchestrator, doc_id) =
            orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        let session = store
            .create_agent_session(NewAgentSession {
                user_id: "u1".to_string(),
                budget_usdc: 10.0,
                search_query: "zero-day".to_string(),
                max_price_per_doc: None,
                category: None,
            })
            .await;

        let result = orchestrator
            .autonomous_purchase(doc_id, "u1", Some(session.id))
            .await
            .unwrap();
        assert!(result.purchase.purchase.purchased_by_agent);
        assert!(result.purchase.purchase.x402_payment_id.starts_with("x402_agent_"));
        assert_eq!(result.document.ipfs_hash, "QmZ4tDu");

        let updated = store.get_agent_session(session.id).await.unwrap();
        assert_eq!(updated.spent_usdc, 4.50);
        assert_eq!(updated.documents_purchased, 1);

        let log = store.activities_by_session(session.id).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, ActivityAction::Purchase);
        assert_eq!(log[0].document_id, Some(doc_id));
        assert!(log[0].details.contains("Zero-Day"));
    }

    #[tokio::test]
    async fn autonomous_purchase_enforces_session_budget() {
        let (store, orchestrator, doc_id) =
            orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        let session = store
            .create_agent_session(NewAgentSession {
                user_id: "u1".to_string(),
                budget_usdc: 4.0,
                search_query: "zero-day".to_string(),
                max_price_per_doc: None,
                category: None,
            })
            .await;

        let err = orchestrator
            .autonomous_purchase(doc_id, "u1", Some(session.id))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::BudgetExceeded { .. }));
        assert!(store.purchases_by_buyer("u1").await.is_empty());
    }

    #[tokio::test]
    async fn failed_settlement_returns_reserved_funds() {
        let (store, orchestrator, doc_id) =
            orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        let session = store
            .create_agent_session(NewAgentSession {
                user_id: "u1".to_string(),
                budget_usdc: 10.0,
                search_query: "zero-day".to_string(),
                max_price_per_doc: None,
                category: None,
            })
            .await;

        orchestrator
            .autonomous_purchase(doc_id, "u1", Some(session.id))
            .await
            .unwrap();
        // The duplicate fails at settlement; its reservation must be undone.
        let err = orchestrator
            .autonomous_purchase(doc_id, "u1", Some(session.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Ledger(LedgerError::AlreadyPurchased { .. })
        ));

        let updated = store.get_agent_session(session.id).await.unwrap();
        assert_eq!(updated.spent_usdc, 4.50);
        assert_eq!(updated.documents_purchased, 1);
    }

    #[tokio::test]
    async fn autonomous_purchase_without_session_skips_bookkeeping() {
        let (store, orchestrator, doc_id) =
            orchestrator_with(Arc::new(CannedRanker("ok"))).await;
        orchestrator
            .autonomous_purchase(doc_id, "u1", None)
            .await
            .unwrap();
        assert_eq!(store.purchases_by_buyer("u1").await.len(), 1);
    }
}
