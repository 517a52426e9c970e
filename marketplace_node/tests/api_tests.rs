//! End-to-end tests against the HTTP router with an in-memory store and a
//! stubbed ranking service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use marketplace_node::agent::{DocumentRanker, RankRequest};
use marketplace_node::api::{build_router, AppState};
use marketplace_node::storage::{seed::seed_demo_data, MarketStore, MemoryStore};

struct StubRanker;

#[async_trait]
impl DocumentRanker for StubRanker {
    async fn rank(&self, request: &RankRequest) -> anyhow::Result<String> {
        Ok(format!("Evaluated {} candidates.", request.candidates.len()))
    }
}

async fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    seed_demo_data(store.as_ref()).await;
    let state = AppState::new(
        store.clone(),
        Arc::new(StubRanker),
        Duration::from_millis(250),
    );
    (build_router(state), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn request_json(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn seeded_user_id(store: &MemoryStore, wallet: &str) -> String {
    store.get_user_by_wallet(wallet).await.unwrap().id
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _store) = test_app().await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn wallet_connect_is_get_or_create() {
    let (app, _store) = test_app().await;

    let first = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/users/wallet",
            json!({ "walletAddress": "0xAAA1", "displayName": "Alice" }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;

    // Same wallet in a different case resolves to the same user.
    let second = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/users/wallet",
            json!({ "walletAddress": "0xaaa1" }),
        ))
        .await
        .unwrap();
    let second = body_json(second).await;
    assert_eq!(first["id"], second["id"]);

    let missing = app
        .oneshot(request_json(Method::POST, "/api/users/wallet", json!({})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn documents_listing_is_newest_first_with_sellers() {
    let (app, _store) = test_app().await;
    let response = app.oneshot(get("/api/documents")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let docs = body_json(response).await;
    let docs = docs.as_array().unwrap();
    assert_eq!(docs.len(), 6);
    assert!(docs.iter().all(|d| d["seller"]["walletAddress"].is_string()));
}

#[tokio::test]
async fn document_crud_roundtrip() {
    let (app, store) = test_app().await;
    let seller = seeded_user_id(&store, "0x1234567890abcdef1234567890abcdef12345678").await;

    let created = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/documents",
            json!({
                "sellerId": seller,
                "title": "Quarterly Threat Landscape",
                "description": "Fresh intel",
                "category": "Research",
                "priceUsdc": 7.25,
                "fileSize": 1024,
                "fileType": "pdf",
                "ipfsHash": "QmNewDoc",
                "encryptionIv": "deadbeefcafe",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = body_json(created).await;
    let id = created["id"].as_u64().unwrap();
    assert_eq!(created["downloads"], 0);
    assert_eq!(created["isActive"], true);

    let fetched = app
        .clone()
        .oneshot(get(&format!("/api/documents/{id}")))
        .await
        .unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    let fetched = body_json(fetched).await;
    assert_eq!(fetched["title"], "Quarterly Threat Landscape");
    assert_eq!(fetched["seller"]["id"], json!(seller));

    let patched = app
        .clone()
        .oneshot(request_json(
            Method::PATCH,
            &format!("/api/documents/{id}"),
            json!({ "priceUsdc": 6.00, "isActive": false }),
        ))
        .await
        .unwrap();
    assert_eq!(patched.status(), StatusCode::OK);
    let patched = body_json(patched).await;
    assert_eq!(patched["priceUsdc"], 6.00);
    assert_eq!(patched["isActive"], false);

    let deleted = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri(format!("/api/documents/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .oneshot(get(&format!("/api/documents/{id}")))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_search_filters() {
    let (app, _store) = test_app().await;

    let by_text = app
        .clone()
        .oneshot(get("/api/documents/search?q=zero-day"))
        .await
        .unwrap();
    let by_text = body_json(by_text).await;
    assert_eq!(by_text.as_array().unwrap().len(), 1);

    let by_category = app
        .clone()
        .oneshot(get("/api/documents/search?q=&category=Research"))
        .await
        .unwrap();
    let by_category = body_json(by_category).await;
    assert!(by_category
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["category"] == "Research"));

    let by_price = app
        .oneshot(get("/api/documents/search?q=&maxPrice=3"))
        .await
        .unwrap();
    let by_price = body_json(by_price).await;
    assert!(by_price
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["priceUsdc"].as_f64().unwrap() <= 3.0));
}

#[tokio::test]
async fn purchase_unlocks_document_and_rejects_duplicates() {
    let (app, store) = test_app().await;
    let buyer = store.create_user("0xbuyer", None).await;
    let before = store.get_document(1).await.unwrap();

    let response = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 1, "buyerId": buyer.id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Payment successful via x402 protocol");
    assert_eq!(body["ipfsHash"], json!(before.ipfs_hash));
    assert_eq!(body["encryptionIv"], json!(before.encryption_iv));
    assert_eq!(body["purchase"]["status"], "completed");
    assert_eq!(body["purchase"]["amountUsdc"], 2.5);
    assert_eq!(body["purchase"]["platformFeeUsdc"], 0.13);
    assert_eq!(body["purchase"]["sellerRevenueUsdc"], 2.37);
    let tx_hash = body["purchase"]["txHash"].as_str().unwrap();
    assert!(tx_hash.starts_with("0x") && tx_hash.len() == 66);

    assert_eq!(
        store.get_document(1).await.unwrap().downloads,
        before.downloads + 1
    );

    // Second attempt for the same pair fails and leaves one record.
    let duplicate = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 1, "buyerId": buyer.id }),
        ))
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    let duplicate = body_json(duplicate).await;
    assert_eq!(duplicate["message"], "Document already purchased");
    assert_eq!(store.purchases_by_buyer(&buyer.id).await.len(), 1);
}

#[tokio::test]
async fn purchase_validates_input() {
    let (app, _store) = test_app().await;

    let missing = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

    let unknown = app
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 999, "buyerId": "someone" }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn purchase_history_merges_buyer_and_seller_sides() {
    let (app, store) = test_app().await;
    let buyer = store.create_user("0xbuyer", None).await;
    let seller = seeded_user_id(&store, "0x1234567890abcdef1234567890abcdef12345678").await;

    app.clone()
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 1, "buyerId": buyer.id }),
        ))
        .await
        .unwrap();

    let buyer_view = app
        .clone()
        .oneshot(get(&format!("/api/purchases?userId={}", buyer.id)))
        .await
        .unwrap();
    let buyer_view = body_json(buyer_view).await;
    assert_eq!(buyer_view.as_array().unwrap().len(), 1);
    // Joined document rides along for dashboard display.
    assert_eq!(buyer_view[0]["document"]["id"], 1);

    let seller_view = app
        .clone()
        .oneshot(get(&format!("/api/purchases?userId={seller}")))
        .await
        .unwrap();
    let seller_view = body_json(seller_view).await;
    assert_eq!(seller_view.as_array().unwrap().len(), 1);

    let missing = app.oneshot(get("/api/purchases")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_track_completed_purchases() {
    let (app, store) = test_app().await;
    let buyer = store.create_user("0xbuyer", None).await;
    let seller = seeded_user_id(&store, "0x1234567890abcdef1234567890abcdef12345678").await;

    // Document 1 is seeded at $2.50 and owned by the seeded researcher.
    app.clone()
        .oneshot(request_json(
            Method::POST,
            "/api/purchases",
            json!({ "documentId": 1, "buyerId": buyer.id }),
        ))
        .await
        .unwrap();

    let seller_stats = app
        .clone()
        .oneshot(get(&format!("/api/seller/stats?sellerId={seller}")))
        .await
        .unwrap();
    assert_eq!(seller_stats.status(), StatusCode::OK);
    let seller_stats = body_json(seller_stats).await;
    assert_eq!(seller_stats["totalSales"], 1);
    assert_eq!(seller_stats["totalRevenue"], 2.37);
    assert_eq!(seller_stats["documentsListed"], 2);

    let market = app
        .clone()
        .oneshot(get("/api/marketplace/stats"))
        .await
        .unwrap();
    let market = body_json(market).await;
    assert_eq!(market["totalDocuments"], 6);
    assert_eq!(market["totalSales"], 1);
    assert_eq!(market["totalVolume"], 2.5);

    let missing = app.oneshot(get("/api/seller/stats")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agent_query_returns_analysis_and_counts() {
    let (app, _store) = test_app().await;

    let response = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/agent/query",
            json!({ "query": "security", "budget": 10.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["documentsFound"].as_u64().unwrap() >= 1);
    assert!(body["agentAnalysis"].as_str().unwrap().contains("Evaluated"));
    assert!(body["topDocuments"].as_array().unwrap().len() <= 5);
    assert!(body["canPurchase"].as_u64().is_some());

    let missing = app
        .oneshot(request_json(Method::POST, "/api/agent/query", json!({})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn agent_purchase_with_session_enforces_budget_and_logs() {
    let (app, store) = test_app().await;
    let user = store.create_user("0xagentuser", None).await;

    let session = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/agent/sessions",
            json!({
                "userId": user.id,
                "budgetUsdc": 3.0,
                "searchQuery": "security reports",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(session.status(), StatusCode::CREATED);
    let session = body_json(session).await;
    let session_id = session["id"].as_u64().unwrap();
    assert_eq!(session["status"], "active");
    assert_eq!(session["spentUsdc"], 0.0);

    // Document 1 costs $2.50, inside the $3 budget.
    let purchase = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/agent/purchase",
            json!({ "documentId": 1, "userId": user.id, "sessionId": session_id }),
        ))
        .await
        .unwrap();
    assert_eq!(purchase.status(), StatusCode::CREATED);
    let purchase = body_json(purchase).await;
    assert_eq!(purchase["purchase"]["purchasedByAgent"], true);
    assert_eq!(purchase["document"]["title"], "Cybersecurity Trends Report 2025");
    assert!(purchase["document"]["ipfsHash"].is_string());
    assert!(purchase["document"]["encryptionIv"].is_string());

    // Document 2 costs $3.00; the remaining budget is $0.50.
    let over_budget = app
        .clone()
        .oneshot(request_json(
            Method::POST,
            "/api/agent/purchase",
            json!({ "documentId": 2, "userId": user.id, "sessionId": session_id }),
        ))
        .await
        .unwrap();
    assert_eq!(over_budget.status(), StatusCode::BAD_REQUEST);
    let over_budget = body_json(over_budget).await;
    assert_eq!(over_budget["message"], "Agent budget exceeded");

    let sessions = app
        .oneshot(get(&format!("/api/agent/sessions/{}", user.id)))
        .await
        .unwrap();
    let sessions = body_json(sessions).await;
    assert_eq!(sessions[0]["spentUsdc"], 2.5);
    assert_eq!(sessions[0]["documentsPurchased"], 1);

    let activities = store.activities_by_session(session_id).await;
    assert_eq!(activities.len(), 1);
    assert!(activities[0].details.contains("Cybersecurity Trends Report 2025"));
}
