//! Scan loop - orchestrator state machine
//!
//! States: Starting → Polling → Idle → Polling → … → Stopped.
//! Each polling cycle pulls from the chain client, filters, deduplicates
//! against the seen-set, and hands fresh candidates to the notifier. A cycle
//! failure is logged and absorbed - the loop falls back to Idle and retries
//! on the next tick. Cycle starts are separated by a fixed wall-clock
//! interval; an overrunning cycle defers the next tick instead of running
//! concurrently, so a cursor window is never scanned twice in parallel.
//! Heartbeats go out on their own cadence regardless of scan results.
//!
//! The loop reaches Stopped only on an explicit shutdown signal; fatal
//! configuration errors never get this far (they abort at startup).

use crate::chain::{ChainClient, FetchError};
use crate::config::ScannerConfig;
use crate::filter;
use crate::notify::{format, NotifyService};
use crate::seen::SeenSet;
use crate::types::{Cursor, MessagePriority, NotificationMessage};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Sweep expired seen-set entries every this many cycles
const SWEEP_EVERY_CYCLES: u64 = 30;

/// After this many consecutive failed cycles, escalate once via the notifier
const FAILURE_ESCALATION_THRESHOLD: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Starting,
    Polling,
    Idle,
    Stopped,
}

/// Process-scoped liveness context, initialized on entry to Starting and
/// discarded at exit. Passed explicitly - never an ambient global.
#[derive(Debug, Clone)]
pub struct HeartbeatState {
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub alerts_sent: u64,
    pub consecutive_failures: u64,
}

impl HeartbeatState {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            last_heartbeat: None,
            cycles: 0,
            alerts_sent: 0,
            consecutive_failures: 0,
        }
    }
}

pub struct Scanner {
    client: Arc<dyn ChainClient>,
    notify: NotifyService,
    seen: SeenSet,
    config: ScannerConfig,
    cursor: Cursor,
    state: ScanState,
    heartbeat: HeartbeatState,
}

impl Scanner {
    pub fn new(client: Arc<dyn ChainClient>, notify: NotifyService, config: ScannerConfig) -> Self {
        let seen = SeenSet::new(config.seen_expiry);
        Self {
            client,
            notify,
            seen,
            config,
            cursor: Cursor::start(),
            state: ScanState::Starting,
            heartbeat: HeartbeatState::new(Utc::now()),
        }
    }

    /// Current position in the state machine.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Liveness counters, for inspection.
    pub fn heartbeat_state(&self) -> &HeartbeatState {
        &self.heartbeat
    }

    /// Run until the shutdown signal fires. Consumes the scanner; queued
    /// notifications are drained (bounded grace) before returning.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.state = ScanState::Starting;
        self.heartbeat = HeartbeatState::new(Utc::now());
        info!(component = "scan_loop", "starting - sending readiness notification");
        self.notify
            .dispatch(NotificationMessage {
                destination: self.config.telegram_chat_id.clone(),
                body: format::format_startup(
                    self.config.scan_interval.as_secs(),
                    self.config.filter.max_age_secs,
                ),
                priority: MessagePriority::Heartbeat,
            })
            .await;

        let mut scan_tick = tokio::time::interval(self.config.scan_interval);
        scan_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let heartbeat_period = self.config.heartbeat_interval;
        let mut heartbeat_tick = tokio::time::interval_at(
            tokio::time::Instant::now() + heartbeat_period,
            heartbeat_period,
        );
        heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    let requested = changed.is_err() || *shutdown.borrow();
                    if requested {
                        info!(component = "scan_loop", "shutdown requested - no new cycles will start");
                        break;
                    }
                }
                _ = scan_tick.tick() => {
                    self.state = ScanState::Polling;
                    self.run_cycle().await;
                    self.state = ScanState::Idle;
                }
                _ = heartbeat_tick.tick() => {
                    self.emit_heartbeat().await;
                }
            }
        }

        self.state = ScanState::Stopped;
        info!(
            component = "scan_loop",
            cycles = self.heartbeat.cycles,
            alerts = self.heartbeat.alerts_sent,
            "stopped - draining notification queues"
        );
        let grace = self.config.shutdown_grace;
        self.drain(grace).await;
        Ok(())
    }

    async fn drain(self, grace: Duration) {
        self.notify.shutdown(grace).await;
    }

    /// One polling cycle. Failures are recorded, never propagated - the loop
    /// owns resilience, the cycle owns the pipeline.
    async fn run_cycle(&mut self) {
        let now = Utc::now();
        let page = match self.client.fetch_since(self.cursor).await {
            Ok(page) => page,
            Err(e) => {
                // Unavailable after bounded retries, or a malformed payload:
                // either way the cycle is skipped, never the process.
                self.record_cycle_failure(&e).await;
                return;
            }
        };

        // Cursor advances only after a successful fetch
        self.cursor = page.next_cursor;
        self.heartbeat.consecutive_failures = 0;
        self.heartbeat.cycles += 1;

        let mut fresh_alerts = 0u64;
        let total = page.records.len();
        for record in &page.records {
            let Some(candidate) = filter::evaluate(&self.config.filter, record, now) else {
                continue;
            };
            if !self.seen.check_and_mark(&candidate.record.mint, now) {
                debug!(
                    component = "scan_loop",
                    mint = %candidate.record.mint,
                    "suppressed - already alerted within expiry window"
                );
                continue;
            }
            info!(
                component = "scan_loop",
                mint = %candidate.record.mint,
                symbol = %candidate.record.symbol,
                score = candidate.score,
                "new launch candidate"
            );
            let sent = self
                .notify
                .dispatch(NotificationMessage {
                    destination: self.config.telegram_chat_id.clone(),
                    body: format::format_alert(&candidate, now),
                    priority: MessagePriority::Alert,
                })
                .await;
            if sent {
                fresh_alerts += 1;
                self.heartbeat.alerts_sent += 1;
            }
        }

        if total > 0 || fresh_alerts > 0 {
            debug!(
                component = "scan_loop",
                records = total,
                alerts = fresh_alerts,
                seen_live = self.seen.len(),
                "cycle complete"
            );
        }

        if self.heartbeat.cycles % SWEEP_EVERY_CYCLES == 0 {
            self.seen.sweep(now);
        }
    }

    async fn record_cycle_failure(&mut self, err: &FetchError) {
        self.heartbeat.consecutive_failures += 1;
        warn!(
            component = "scan_loop",
            error = %err,
            consecutive = self.heartbeat.consecutive_failures,
            "cycle failed - will retry on next tick"
        );
        // One escalation per outage, through the high-priority path
        if self.heartbeat.consecutive_failures == FAILURE_ESCALATION_THRESHOLD {
            error!(
                component = "scan_loop",
                "upstream unavailable for {} consecutive cycles",
                FAILURE_ESCALATION_THRESHOLD
            );
            self.notify
                .dispatch(NotificationMessage {
                    destination: self.config.telegram_chat_id.clone(),
                    body: format!(
                        "\u{26A0} <b>Scanner degraded</b>: launchpad unreachable for {} cycles ({})",
                        FAILURE_ESCALATION_THRESHOLD, err
                    ),
                    priority: MessagePriority::Error,
                })
                .await;
        }
    }

    async fn emit_heartbeat(&mut self) {
        let now = Utc::now();
        self.heartbeat.last_heartbeat = Some(now);
        let body = format::format_heartbeat(
            now - self.heartbeat.started_at,
            self.heartbeat.cycles,
            self.heartbeat.alerts_sent,
            self.seen.len(),
            self.heartbeat.consecutive_failures,
        );
        debug!(component = "scan_loop", "emitting heartbeat");
        self.notify
            .dispatch(NotificationMessage {
                destination: self.config.telegram_chat_id.clone(),
                body,
                priority: MessagePriority::Heartbeat,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::FetchPage;
    use crate::filter::FilterConfig;
    use crate::notify::{Ack, Notifier, SendError};
    use crate::retry::RetryPolicy;
    use crate::types::{LaunchSource, TokenRecord};
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    enum Scripted {
        Page(Vec<TokenRecord>),
        Unavailable,
    }

    /// Chain client driven by a script; once the script runs out it returns
    /// empty pages (quiet chain).
    struct MockChain {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl MockChain {
        fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
            })
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn fetch_since(&self, cursor: Cursor) -> Result<FetchPage, FetchError> {
            match self.script.lock().unwrap().pop_front() {
                Some(Scripted::Page(records)) => Ok(FetchPage {
                    records,
                    next_cursor: cursor,
                }),
                Some(Scripted::Unavailable) => Err(FetchError::Unavailable {
                    attempts: 3,
                    reason: "request timed out".to_string(),
                }),
                None => Ok(FetchPage {
                    records: vec![],
                    next_cursor: cursor,
                }),
            }
        }
    }

    /// Transport that records every delivery.
    struct RecordingNotifier {
        sent: Mutex<Vec<NotificationMessage>>,
    }

    impl RecordingNotifier {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn count(&self, priority: MessagePriority) -> usize {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.priority == priority)
                .count()
        }

        fn heartbeat_bodies(&self) -> usize {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.body.contains("Heartbeat"))
                .count()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, message: &NotificationMessage) -> Result<Ack, SendError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(Ack {
                delivered_at: Utc::now(),
            })
        }
    }

    fn test_config(scan_secs: u64, heartbeat_secs: u64) -> ScannerConfig {
        ScannerConfig {
            telegram_bot_token: "token".to_string(),
            telegram_chat_id: "chat".to_string(),
            api_base_url: None,
            page_limit: 50,
            scan_interval: Duration::from_secs(scan_secs),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            seen_expiry: Duration::from_secs(86_400),
            request_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(15),
            retry_max_attempts: 3,
            retry_base_delay: Duration::from_millis(10),
            filter: FilterConfig::default(),
        }
    }

    fn record(mint: &str, age_secs: i64, liquidity: f64) -> TokenRecord {
        TokenRecord {
            mint: mint.to_string(),
            name: "Fresh Launch".to_string(),
            symbol: "FRSH".to_string(),
            source: LaunchSource::PumpFun,
            liquidity_sol: liquidity,
            creator: "Creator".to_string(),
            created_at: Utc::now() - ChronoDuration::seconds(age_secs),
            bonding_curve: None,
            twitter: None,
            telegram: None,
            website: None,
            image_uri: None,
            market_cap_usd: 0.0,
        }
    }

    fn scanner_with(
        script: Vec<Scripted>,
        config: ScannerConfig,
    ) -> (Scanner, Arc<RecordingNotifier>) {
        let notifier = RecordingNotifier::new();
        let service = NotifyService::spawn(
            Arc::clone(&notifier) as Arc<dyn Notifier>,
            RetryPolicy {
                jitter_fraction: 0.0,
                ..RetryPolicy::default()
            },
            64,
        );
        let scanner = Scanner::new(MockChain::new(script), service, config);
        (scanner, notifier)
    }

    #[tokio::test]
    async fn test_scenario_three_records_two_pass_one_repeat() {
        // 3 new records: 2 pass the filter, 1 of those already alerted →
        // exactly 1 notification.
        let records = vec![
            record("mint-fresh", 60, 10.0),
            record("mint-repeat", 120, 8.0),
            record("mint-illiquid", 60, 1.0), // below min liquidity
        ];
        let (mut scanner, notifier) = scanner_with(
            vec![Scripted::Page(records)],
            test_config(20, 3600),
        );
        assert_eq!(scanner.state(), ScanState::Starting);
        scanner.seen.check_and_mark("mint-repeat", Utc::now());

        scanner.run_cycle().await;
        scanner.drain(Duration::from_secs(5)).await;

        assert_eq!(notifier.count(MessagePriority::Alert), 1);
        let sent = notifier.sent.lock().unwrap();
        assert!(sent.iter().any(|m| m.body.contains("mint-fresh")));
    }

    #[tokio::test]
    async fn test_idempotent_over_unchanged_window() {
        // Same page twice (simulated retry of a cursor window) → the second
        // cycle produces zero additional notifications.
        let page = vec![record("mint-a", 60, 10.0), record("mint-b", 90, 12.0)];
        let (mut scanner, notifier) = scanner_with(
            vec![Scripted::Page(page.clone()), Scripted::Page(page)],
            test_config(20, 3600),
        );

        scanner.run_cycle().await;
        scanner.run_cycle().await;
        scanner.drain(Duration::from_secs(5)).await;

        assert_eq!(notifier.count(MessagePriority::Alert), 2);
    }

    #[tokio::test]
    async fn test_unavailable_cycles_do_not_kill_the_loop() {
        // Fetch exhausts its retries three cycles in a row → logged, no
        // crash, and the next good cycle flows normally.
        let (mut scanner, notifier) = scanner_with(
            vec![
                Scripted::Unavailable,
                Scripted::Unavailable,
                Scripted::Unavailable,
                Scripted::Page(vec![record("mint-after-outage", 60, 10.0)]),
            ],
            test_config(20, 3600),
        );

        for _ in 0..3 {
            scanner.run_cycle().await;
        }
        assert_eq!(scanner.heartbeat.consecutive_failures, 3);
        assert_eq!(scanner.heartbeat.cycles, 0);

        scanner.run_cycle().await;
        assert_eq!(scanner.heartbeat.consecutive_failures, 0);
        scanner.drain(Duration::from_secs(5)).await;

        assert_eq!(notifier.count(MessagePriority::Alert), 1);
    }

    #[tokio::test]
    async fn test_persistent_outage_escalates_once() {
        let script: Vec<Scripted> = (0..8).map(|_| Scripted::Unavailable).collect();
        let (mut scanner, notifier) = scanner_with(script, test_config(20, 3600));

        for _ in 0..8 {
            scanner.run_cycle().await;
        }
        scanner.drain(Duration::from_secs(5)).await;

        assert_eq!(notifier.count(MessagePriority::Error), 1);
        assert_eq!(notifier.count(MessagePriority::Alert), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_quiet_hours_two_heartbeats_zero_alerts() {
        // No new records for 2 hours with a 1 hour heartbeat interval →
        // exactly 2 heartbeats, 0 alert messages.
        let (scanner, notifier) = scanner_with(vec![], test_config(20, 3600));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scanner.run(shutdown_rx));
        tokio::time::sleep(Duration::from_secs(2 * 3600 + 300)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(notifier.heartbeat_bodies(), 2);
        assert_eq!(notifier.count(MessagePriority::Alert), 0);
        // Startup banner rides the low-priority queue but is not a heartbeat
        let sent = notifier.sent.lock().unwrap();
        assert!(sent.iter().any(|m| m.body.contains("SCANNER ONLINE")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reaches_stopped_without_polling_again() {
        let (scanner, notifier) = scanner_with(vec![], test_config(20, 3600));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(scanner.run(shutdown_rx));
        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        // Readiness banner made it out before shutdown
        assert!(notifier.sent.lock().unwrap().len() >= 1);
    }
}
