//! Pump.fun launchpad client
//!
//! Polls the frontend API's recent-coins listing, newest first, and maps the
//! payload onto [`TokenRecord`]. Cursor semantics are a creation-timestamp
//! watermark: each poll re-requests the newest page and keeps records created
//! at or after the watermark, so a record is never skipped even when several
//! share a timestamp (duplicates are suppressed downstream by the seen-set).
//!
//! Every request carries a timeout; transient failures (timeout, 429, 5xx)
//! are retried with the shared backoff policy and only surface as
//! `Unavailable` once the attempt budget is spent.

use super::{ChainClient, FetchError, FetchPage};
use crate::retry::RetryPolicy;
use crate::types::{Cursor, LaunchSource, TokenRecord};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://frontend-api.pump.fun";

/// Raw coin shape from `GET /coins` (fields observed on the frontend API)
#[derive(Debug, Deserialize)]
struct RawCoin {
    #[serde(default)]
    mint: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    /// SOL in the bonding curve
    #[serde(default)]
    virtual_sol_reserves: f64,
    /// Milliseconds since epoch
    #[serde(default)]
    created_timestamp: i64,
    #[serde(default)]
    creator: String,
    bonding_curve: Option<String>,
    twitter: Option<String>,
    telegram: Option<String>,
    website: Option<String>,
    image_uri: Option<String>,
    #[serde(default)]
    usd_market_cap: f64,
}

fn parse_coin(raw: RawCoin) -> Option<TokenRecord> {
    if raw.mint.is_empty() {
        return None;
    }
    let created_at = Utc.timestamp_millis_opt(raw.created_timestamp).single()?;
    Some(TokenRecord {
        mint: raw.mint,
        name: raw.name,
        symbol: raw.symbol,
        source: LaunchSource::PumpFun,
        liquidity_sol: raw.virtual_sol_reserves,
        creator: raw.creator,
        created_at,
        bonding_curve: raw.bonding_curve,
        twitter: raw.twitter,
        telegram: raw.telegram,
        website: raw.website,
        image_uri: raw.image_uri,
        market_cap_usd: raw.usd_market_cap,
    })
}

/// Keep records inside the cursor window and advance the watermark to the
/// newest creation timestamp seen. The cursor moves only here, after a
/// successful fetch.
fn assemble_page(records: Vec<TokenRecord>, cursor: Cursor) -> FetchPage {
    let mut next_cursor = cursor;
    let mut kept = Vec::new();
    for record in records {
        if cursor.includes(record.created_at) {
            next_cursor = next_cursor.advanced_to(record.created_at);
            kept.push(record);
        }
    }
    FetchPage {
        records: kept,
        next_cursor,
    }
}

pub struct PumpFunClient {
    http: reqwest::Client,
    base_url: String,
    page_limit: u32,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl PumpFunClient {
    pub fn new(
        base_url: Option<&str>,
        page_limit: u32,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or(DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            page_limit,
            request_timeout,
            retry,
        }
    }

    /// Single attempt: newest coins first, one page.
    async fn fetch_once(&self) -> Result<Vec<TokenRecord>, FetchError> {
        let url = format!("{}/coins", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("limit", self.page_limit.to_string()),
                ("offset", "0".to_string()),
                ("sort", "created_timestamp".to_string()),
                ("order", "DESC".to_string()),
            ])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.request_timeout)
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if status.is_server_error() {
            return Err(FetchError::Transport(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(FetchError::Malformed(format!("HTTP {}", status)));
        }

        let raw: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        // Degraded tolerance: skip individual records that fail to parse
        // rather than failing the whole page - partial discovery beats none.
        let total = raw.len();
        let mut records = Vec::with_capacity(total);
        for value in raw {
            match serde_json::from_value::<RawCoin>(value).ok().and_then(parse_coin) {
                Some(record) => records.push(record),
                None => debug!(component = "chain_client", "skipping unparseable coin record"),
            }
        }
        if records.len() < total {
            warn!(
                component = "chain_client",
                parsed = records.len(),
                total,
                "degraded page - proceeding with partial data"
            );
        }
        Ok(records)
    }
}

/// A transient error that survives the retry budget surfaces to the scan loop
/// as the distinguished `Unavailable`; permanent errors pass through as-is.
fn exhausted_to_unavailable(err: FetchError, attempts: u32) -> FetchError {
    if err.is_transient() {
        FetchError::Unavailable {
            attempts,
            reason: err.to_string(),
        }
    } else {
        err
    }
}

#[async_trait]
impl ChainClient for PumpFunClient {
    async fn fetch_since(&self, cursor: Cursor) -> Result<FetchPage, FetchError> {
        let records = self
            .retry
            .run("pumpfun fetch", || self.fetch_once(), FetchError::is_transient)
            .await
            .map_err(|e| exhausted_to_unavailable(e, self.retry.max_attempts))?;
        Ok(assemble_page(records, cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(mint: &str, created_secs: i64) -> TokenRecord {
        TokenRecord {
            mint: mint.to_string(),
            name: "Coin".to_string(),
            symbol: "C".to_string(),
            source: LaunchSource::PumpFun,
            liquidity_sol: 10.0,
            creator: String::new(),
            created_at: ts(created_secs),
            bonding_curve: None,
            twitter: None,
            telegram: None,
            website: None,
            image_uri: None,
            market_cap_usd: 0.0,
        }
    }

    #[test]
    fn test_parse_coin_maps_fields() {
        let raw: RawCoin = serde_json::from_str(
            r#"{
                "mint": "7xKqMintAddr",
                "name": "Doge Wif Hat",
                "symbol": "DWH",
                "virtual_sol_reserves": 32.5,
                "created_timestamp": 1750000000000,
                "creator": "CreatorAddr",
                "bonding_curve": "CurveAddr",
                "twitter": "https://x.com/dwh",
                "usd_market_cap": 6900.0
            }"#,
        )
        .unwrap();
        let record = parse_coin(raw).unwrap();
        assert_eq!(record.mint, "7xKqMintAddr");
        assert_eq!(record.symbol, "DWH");
        assert_eq!(record.liquidity_sol, 32.5);
        assert_eq!(record.created_at, ts(1_750_000_000));
        assert_eq!(record.twitter.as_deref(), Some("https://x.com/dwh"));
        assert_eq!(record.telegram, None);
        assert_eq!(record.market_cap_usd, 6900.0);
    }

    #[test]
    fn test_parse_coin_rejects_missing_mint() {
        let raw: RawCoin =
            serde_json::from_str(r#"{"name": "NoMint", "created_timestamp": 1}"#).unwrap();
        assert!(parse_coin(raw).is_none());
    }

    #[test]
    fn test_assemble_page_filters_by_watermark() {
        let cursor = Cursor(Some(ts(100)));
        let page = assemble_page(
            vec![record("new", 150), record("edge", 100), record("old", 99)],
            cursor,
        );
        let mints: Vec<&str> = page.records.iter().map(|r| r.mint.as_str()).collect();
        // Inclusive window: the record exactly at the watermark is redelivered
        assert_eq!(mints, vec!["new", "edge"]);
        assert_eq!(page.next_cursor, Cursor(Some(ts(150))));
    }

    #[test]
    fn test_empty_page_keeps_cursor() {
        let cursor = Cursor(Some(ts(100)));
        let page = assemble_page(vec![], cursor);
        assert!(page.records.is_empty());
        assert_eq!(page.next_cursor, cursor);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_transient_surfaces_as_unavailable() {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: std::time::Duration::from_millis(10),
            max_delay: std::time::Duration::from_millis(50),
            jitter_fraction: 0.0,
        };
        // Every single attempt is rate limited; the budget is spent and the
        // caller sees Unavailable carrying the attempt count and last cause.
        let result: Result<Vec<TokenRecord>, FetchError> = retry
            .run(
                "fetch",
                || async { Err(FetchError::RateLimited) },
                FetchError::is_transient,
            )
            .await
            .map_err(|e| exhausted_to_unavailable(e, retry.max_attempts));
        match result {
            Err(FetchError::Unavailable { attempts, reason }) => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("rate limited"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_permanent_error_passes_through_unmapped() {
        let mapped = exhausted_to_unavailable(FetchError::Malformed("bad json".to_string()), 3);
        assert!(matches!(mapped, FetchError::Malformed(_)));
    }

    #[test]
    fn test_first_poll_takes_everything() {
        let page = assemble_page(vec![record("a", 5), record("b", 50)], Cursor::start());
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next_cursor, Cursor(Some(ts(50))));
    }
}
