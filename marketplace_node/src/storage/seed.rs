//! Demo catalog seeded at startup so the marketplace is browsable without
//! any prior uploads.

use log::info;

use super::MarketStore;
use crate::types::{DocumentCategory, DocumentPatch, NewDocument};

struct SeedDoc {
    title: &'static str,
    description: &'static str,
    category: DocumentCategory,
    price_usdc: f64,
    file_size: u64,
    file_type: &'static str,
    ipfs_hash: &'static str,
    encryption_iv: &'static str,
    downloads: u64,
    rating: f64,
    rating_count: u32,
}

pub async fn seed_demo_data(store: &dyn MarketStore) {
    let researcher = store
        .get_or_create_user_by_wallet(
            "0x1234567890abcdef1234567890abcdef12345678",
            Some("CryptoResearcher".to_string()),
        )
        .await;
    let scientist = store
        .get_or_create_user_by_wallet(
            "0xabcdef1234567890abcdef1234567890abcdef12",
            Some("DataScientist".to_string()),
        )
        .await;
    let expert = store
        .get_or_create_user_by_wallet(
            "0x9876543210fedcba9876543210fedcba98765432",
            Some("SecurityExpert".to_string()),
        )
        .await;

    let docs = [
        (
            &researcher,
            SeedDoc {
                title: "Cybersecurity Trends Report 2025",
                description: "Comprehensive analysis of emerging cyber threats, zero-day \
                              vulnerabilities, and defense strategies for enterprise security \
                              teams.",
                category: DocumentCategory::Research,
                price_usdc: 2.50,
                file_size: 2_048_576,
                file_type: "pdf",
                ipfs_hash: "QmXoypizjW3WknFiJnKLwHCnL72vedxjQkDDP1mXWo6uco",
                encryption_iv: "a1b2c3d4e5f6g7h8i9j0k1l2",
                downloads: 45,
                rating: 4.8,
                rating_count: 12,
            },
        ),
        (
            &scientist,
            SeedDoc {
                title: "AI in Enterprise Security: 2025 Handbook",
                description: "How machine learning and AI are transforming threat detection, \
                              incident response, and security automation.",
                category: DocumentCategory::Technical,
                price_usdc: 3.00,
                file_size: 3_145_728,
                file_type: "pdf",
                ipfs_hash: "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
                encryption_iv: "m1n2o3p4q5r6s7t8u9v0w1x2",
                downloads: 32,
                rating: 4.5,
                rating_count: 8,
            },
        ),
        (
            &expert,
            SeedDoc {
                title: "Zero-Day Vulnerability Analysis Framework",
                description: "Methodology and tools for identifying, analyzing, and responding \
                              to zero-day exploits in critical infrastructure.",
                category: DocumentCategory::Research,
                price_usdc: 4.50,
                file_size: 1_572_864,
                file_type: "pdf",
                ipfs_hash: "QmZ4tDuvesekSs4qM5ZBKpXiZGun7S2CYtEZRB3DYXkjGx",
                encryption_iv: "y1z2a3b4c5d6e7f8g9h0i1j2",
                downloads: 67,
                rating: 4.9,
                rating_count: 23,
            },
        ),
        (
            &researcher,
            SeedDoc {
                title: "Blockchain Smart Contract Audit Templates",
                description: "Professional audit templates and checklists for reviewing \
                              Solidity smart contracts. Includes common vulnerability patterns.",
                category: DocumentCategory::Legal,
                price_usdc: 5.00,
                file_size: 524_288,
                file_type: "docx",
                ipfs_hash: "QmPZ9gcCEpqKTo6aq61g2nXGUhM4iCL3ewB6LDXZCtioEB",
                encryption_iv: "k1l2m3n4o5p6q7r8s9t0u1v2",
                downloads: 28,
                rating: 4.6,
                rating_count: 15,
            },
        ),
        (
            &scientist,
            SeedDoc {
                title: "Machine Learning Dataset: Network Traffic Patterns",
                description: "Labeled dataset of 1M+ network traffic samples for training \
                              anomaly detection models. Includes benign and malicious traffic.",
                category: DocumentCategory::Data,
                price_usdc: 15.00,
                file_size: 52_428_800,
                file_type: "csv",
                ipfs_hash: "QmVLDAhCY3X9P2uqMqv3ZN7nM8iLNQxD9GHLxY2AhQEJj5",
                encryption_iv: "w1x2y3z4a5b6c7d8e9f0g1h2",
                downloads: 12,
                rating: 4.7,
                rating_count: 6,
            },
        ),
        (
            &expert,
            SeedDoc {
                title: "Incident Response Playbook",
                description: "Step-by-step playbooks for handling security incidents including \
                              ransomware, data breaches, and insider threats.",
                category: DocumentCategory::Business,
                price_usdc: 8.00,
                file_size: 4_194_304,
                file_type: "pdf",
                ipfs_hash: "QmRBkKi1PnthqaBaiZnXML6fH6PNqCFdpcBQGXd4KkP9Wa",
                encryption_iv: "i1j2k3l4m5n6o7p8q9r0s1t2",
                downloads: 54,
                rating: 4.8,
                rating_count: 19,
            },
        ),
    ];

    for (seller, seed) in &docs {
        let created = store
            .create_document(NewDocument {
                seller_id: seller.id.clone(),
                title: seed.title.to_string(),
                description: seed.description.to_string(),
                category: seed.category,
                price_usdc: seed.price_usdc,
                file_size: seed.file_size,
                file_type: seed.file_type.to_string(),
                ipfs_hash: seed.ipfs_hash.to_string(),
                encryption_iv: seed.encryption_iv.to_string(),
                thumbnail_url: None,
                is_active: Some(true),
            })
            .await;
        // Backfill the demo popularity counters the create path zeroes out.
        store
            .update_document(
                created.id,
                DocumentPatch {
                    downloads: Some(seed.downloads),
                    rating: Some(seed.rating),
                    rating_count: Some(seed.rating_count),
                    ..DocumentPatch::default()
                },
            )
            .await;
    }

    info!("seeded demo catalog: 3 users, {} documents", docs.len());
}
