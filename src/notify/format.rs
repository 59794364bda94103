//! Message bodies for Telegram (HTML parse mode)
//!
//! Pure string builders - no network, no state. Token names and symbols come
//! from hostile input, so anything interpolated into markup is escaped.

use crate::types::{Candidate, Priority};
use chrono::{DateTime, Duration, Utc};

/// Escape the three characters Telegram's HTML mode treats specially.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn priority_tag(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "\u{1F525}\u{1F525}\u{1F525}",
        Priority::Normal => "\u{1F525}\u{1F525}",
        Priority::Low => "\u{1F525}",
    }
}

fn format_age(age: Duration) -> String {
    let mins = age.num_seconds() as f64 / 60.0;
    format!("{:.1} min", mins)
}

/// Alert body for a newly discovered launch.
pub fn format_alert(candidate: &Candidate, now: DateTime<Utc>) -> String {
    let record = &candidate.record;
    let tag = priority_tag(candidate.priority);
    let age = format_age(now - record.created_at);

    let mut msg = format!(
        "{tag} <b>EARLY LAUNCH DETECTED</b> {tag}\n\n\
         <b>{symbol}</b> - {name}\n\
         <code>{mint}</code>\n\
         Source: {source}\n\
         Age: {age}\n\
         Score: {score}/200\n\
         Liquidity: {liq:.2} SOL\n",
        tag = tag,
        symbol = escape_html(&record.symbol),
        name = escape_html(&record.name),
        mint = escape_html(&record.mint),
        source = record.source,
        age = age,
        score = candidate.score,
        liq = record.liquidity_sol,
    );

    if record.market_cap_usd > 0.0 {
        msg.push_str(&format!("Market Cap: ${:.0}\n", record.market_cap_usd));
    }

    let mut socials = Vec::new();
    if let Some(twitter) = &record.twitter {
        socials.push(format!("<a href=\"{}\">Twitter</a>", escape_html(twitter)));
    }
    if let Some(telegram) = &record.telegram {
        socials.push(format!("<a href=\"{}\">Telegram</a>", escape_html(telegram)));
    }
    if let Some(website) = &record.website {
        socials.push(format!("<a href=\"{}\">Website</a>", escape_html(website)));
    }
    if !socials.is_empty() {
        msg.push_str(&format!("\n{}\n", socials.join(" | ")));
    }

    msg.push_str(&format!(
        "\n<a href=\"https://pump.fun/{mint}\">Pump.fun</a> | \
         <a href=\"https://birdeye.so/token/{mint}?chain=solana\">Birdeye</a>\n\n\
         \u{26A0} <i>EXTREMELY EARLY - ULTRA HIGH RISK</i>",
        mint = escape_html(&record.mint),
    ));

    msg
}

/// Startup banner - the external readiness signal.
pub fn format_startup(scan_interval_secs: u64, max_age_secs: i64) -> String {
    format!(
        "\u{1F680} <b>LAUNCH SCANNER ONLINE</b>\n\n\
         Polling every {}s for tokens under {} minutes old.",
        scan_interval_secs,
        max_age_secs / 60,
    )
}

/// Heartbeat body. Carries enough counters that an external monitor can spot
/// anomalies (cycles not advancing, failures accumulating) without shell access.
pub fn format_heartbeat(
    uptime: Duration,
    cycles: u64,
    alerts_sent: u64,
    seen_live: usize,
    consecutive_failures: u64,
) -> String {
    let hours = uptime.num_minutes() as f64 / 60.0;
    let mut msg = format!(
        "\u{1F493} <b>Heartbeat</b>\n\
         Uptime: {:.1} h | Cycles: {} | Alerts: {} | Seen: {}",
        hours, cycles, alerts_sent, seen_live,
    );
    if consecutive_failures > 0 {
        msg.push_str(&format!(
            "\n\u{26A0} {} consecutive failed cycles",
            consecutive_failures
        ));
    }
    msg
}
