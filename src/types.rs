//! Core data types shared across the scanner
//!
//! Data flows one way: chain client -> discovery filter -> seen-set -> notifier.
//! `TokenRecord` is built once by the chain client and never mutated afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a token launch was observed. One launchpad today; adding another
/// source means a new variant plus a `ChainClient` implementation for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchSource {
    PumpFun,
}

impl std::fmt::Display for LaunchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LaunchSource::PumpFun => write!(f, "PUMP.FUN"),
        }
    }
}

/// Opaque position marker into the launchpad's append-only record stream.
///
/// Semantics: creation-timestamp watermark. Records created at or after the
/// watermark are redelivered on the next poll (at-least-once); the seen-set
/// suppresses duplicate alerts downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor(pub Option<DateTime<Utc>>);

impl Cursor {
    /// Cursor positioned before the start of the stream.
    pub fn start() -> Self {
        Cursor(None)
    }

    /// Advance the watermark, never moving backwards.
    pub fn advanced_to(self, ts: DateTime<Utc>) -> Self {
        match self.0 {
            Some(current) if current >= ts => self,
            _ => Cursor(Some(ts)),
        }
    }

    /// Whether a record at `ts` falls inside the unseen window.
    pub fn includes(&self, ts: DateTime<Utc>) -> bool {
        match self.0 {
            Some(watermark) => ts >= watermark,
            None => true,
        }
    }
}

/// A newly created token as observed on the launchpad at discovery time.
/// Read-only after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    /// Mint address - immutable, globally unique identifier
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub source: LaunchSource,
    /// SOL committed to the bonding curve at discovery time
    pub liquidity_sol: f64,
    pub creator: String,
    pub created_at: DateTime<Utc>,
    pub bonding_curve: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    pub image_uri: Option<String>,
    pub market_cap_usd: f64,
}

/// Alert urgency derived from the acceptance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
}

/// A record that passed the discovery filter. Exists only within one scan cycle.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub record: TokenRecord,
    pub score: u32,
    pub priority: Priority,
    pub passed_at: DateTime<Utc>,
}

/// Message class - heartbeats travel a separate low-priority queue so a burst
/// of alerts never starves liveness reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePriority {
    Alert,
    Heartbeat,
    Error,
}

/// A single outbound notification. Constructed fresh per send attempt.
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub destination: String,
    pub body: String,
    pub priority: MessagePriority,
}
