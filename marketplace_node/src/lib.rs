//! Demo document marketplace node.
//!
//! A wallet connects, browses and uploads encrypted documents, and buys them
//! over a simulated x402 payment rail; an AI agent can search and purchase
//! autonomously within a budgeted session. Settlement identifiers and
//! storage locators are synthesized stand-ins, and the store is in-memory —
//! the purchase workflow is the real core: fee accounting, no-double-purchase
//! enforcement, and release of decryption parameters on success.

pub mod agent;
pub mod api;
pub mod config;
pub mod ledger;
pub mod storage;
pub mod types;
