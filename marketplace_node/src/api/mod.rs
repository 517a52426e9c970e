//! HTTP JSON API over the catalog, ledger, and agent orchestrator.

pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ApiResult};
pub use server::{build_router, AppState};
