//! Chain client - read-only queries against the launchpad data source
//!
//! The scan loop depends only on the narrow [`ChainClient`] contract: given a
//! cursor, return new records and the next cursor, and report unavailability
//! distinguishably from an empty page.

pub mod pumpfun;

pub use pumpfun::PumpFunClient;

use crate::types::{Cursor, TokenRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Chain client failure taxonomy. Transient variants are retried inside the
/// client; `Unavailable` is what surfaces to the scan loop once the bounded
/// retry budget is spent.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Retries exhausted - the endpoint could not be reached this cycle
    #[error("launchpad unavailable after {attempts} attempts: {reason}")]
    Unavailable { attempts: u32, reason: String },
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("rate limited by launchpad endpoint")]
    RateLimited,
    #[error("transport error: {0}")]
    Transport(String),
    /// Endpoint reachable but the payload could not be understood
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::RateLimited | FetchError::Transport(_)
        )
    }
}

/// One successful poll: the records inside the cursor window and the advanced
/// watermark. A page smaller than the request limit is not an error.
#[derive(Debug, Clone)]
pub struct FetchPage {
    pub records: Vec<TokenRecord>,
    pub next_cursor: Cursor,
}

/// Read-only enumeration of newly created token records. Safe to call on a
/// fixed interval indefinitely; the cursor advances only on success, so every
/// on-chain record reaches the filter at least once.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn fetch_since(&self, cursor: Cursor) -> Result<FetchPage, FetchError>;
}
