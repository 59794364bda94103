//! Early Token Launch Scanner Library
//!
//! Continuous-scan-and-notify engine: polls a launchpad data source for newly
//! created tokens, filters them, deduplicates, and delivers Telegram alerts
//! plus periodic heartbeats.

pub mod chain;
pub mod config;
pub mod filter;
pub mod notify;
pub mod retry;
pub mod scanner;
pub mod seen;
pub mod types;

// Re-export commonly used types
pub use chain::{ChainClient, FetchError, FetchPage, PumpFunClient};
pub use config::{load_config, ScannerConfig};
pub use notify::{NotifyService, Notifier, TelegramNotifier};
pub use retry::RetryPolicy;
pub use scanner::Scanner;
pub use seen::SeenSet;
pub use types::{Candidate, Cursor, Priority, TokenRecord};
