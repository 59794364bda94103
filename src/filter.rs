//! Discovery filter - acceptance heuristics for raw launch records
//!
//! Pure functions of the record's fields and a caller-supplied clock: no
//! network, no mutable state, identical input always yields identical output.
//! Thresholds are tunable via [`FilterConfig`] (TOML `[filter]` section).
//!
//! The policy prefers false positives over false negatives: a borderline
//! record that clears the hard thresholds passes through with `Priority::Low`
//! instead of being dropped - an unwanted alert is far cheaper than a missed
//! launch.

use crate::types::{Candidate, Priority, TokenRecord};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Tunable acceptance thresholds. All boundaries are inclusive: a record
/// exactly at a minimum passes, one unit below is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Minimum SOL in the bonding curve
    #[serde(default = "default_min_liquidity_sol")]
    pub min_liquidity_sol: f64,
    /// Minimum age since creation - skips instantaneous rug patterns
    #[serde(default = "default_min_age_secs")]
    pub min_age_secs: i64,
    /// Maximum age since creation - this scanner only cares about fresh launches
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: i64,
    /// Require at least one social link (many launches have none yet)
    #[serde(default)]
    pub require_socials: bool,
    /// Reject if name or symbol contains one of these (case-insensitive)
    #[serde(default = "default_blacklist_keywords")]
    pub blacklist_keywords: Vec<String>,
    /// Score bonus if name or symbol contains one of these
    #[serde(default = "default_priority_keywords")]
    pub priority_keywords: Vec<String>,
}

fn default_min_liquidity_sol() -> f64 {
    5.0
}
fn default_min_age_secs() -> i64 {
    45
}
fn default_max_age_secs() -> i64 {
    1800
}
fn default_blacklist_keywords() -> Vec<String> {
    ["test", "scam", "rug"].iter().map(|s| s.to_string()).collect()
}
fn default_priority_keywords() -> Vec<String> {
    ["doge", "pepe", "bonk", "wojak", "cat"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_liquidity_sol: default_min_liquidity_sol(),
            min_age_secs: default_min_age_secs(),
            max_age_secs: default_max_age_secs(),
            require_socials: false,
            blacklist_keywords: default_blacklist_keywords(),
            priority_keywords: default_priority_keywords(),
        }
    }
}

fn has_social(record: &TokenRecord) -> bool {
    record.twitter.is_some() || record.telegram.is_some() || record.website.is_some()
}

fn contains_keyword(record: &TokenRecord, keywords: &[String]) -> bool {
    let name = record.name.to_lowercase();
    let symbol = record.symbol.to_lowercase();
    keywords
        .iter()
        .any(|kw| name.contains(kw.as_str()) || symbol.contains(kw.as_str()))
}

/// Hard acceptance check. Deterministic for a given `(record, now)` pair.
pub fn accept(config: &FilterConfig, record: &TokenRecord, now: DateTime<Utc>) -> bool {
    // Required metadata
    if record.mint.is_empty() || record.name.is_empty() || record.symbol.is_empty() {
        return false;
    }
    if config.require_socials && !has_social(record) {
        return false;
    }

    let age_secs = (now - record.created_at).num_seconds();
    if age_secs < config.min_age_secs || age_secs > config.max_age_secs {
        return false;
    }

    if record.liquidity_sol < config.min_liquidity_sol {
        return false;
    }

    if contains_keyword(record, &config.blacklist_keywords) {
        return false;
    }

    true
}

/// Acceptance score, higher = more interesting. Composition follows the
/// launch-recency / liquidity / socials / keyword weighting of the scanner:
/// newer launches and deeper curves score higher, social links and meme
/// keywords add fixed bonuses. Range 0..=200.
pub fn score(config: &FilterConfig, record: &TokenRecord, now: DateTime<Utc>) -> u32 {
    let mut score = 0.0_f64;

    // Recency bonus: full 100 at creation, fading 2 points per minute
    let age_minutes = (now - record.created_at).num_seconds() as f64 / 60.0;
    score += (100.0 - age_minutes * 2.0).max(0.0);

    // Liquidity bonus, capped
    score += (record.liquidity_sol * 2.0).min(50.0);

    // Socials bonus
    if record.twitter.is_some() {
        score += 20.0;
    }
    if record.telegram.is_some() {
        score += 20.0;
    }
    if record.website.is_some() {
        score += 10.0;
    }

    if contains_keyword(record, &config.priority_keywords) {
        score += 30.0;
    }

    score.round().clamp(0.0, 200.0) as u32
}

fn priority_for(score: u32) -> Priority {
    if score >= 100 {
        Priority::High
    } else if score >= 50 {
        Priority::Normal
    } else {
        Priority::Low
    }
}

/// Run the full filter: `None` if rejected, otherwise a scored [`Candidate`].
pub fn evaluate(
    config: &FilterConfig,
    record: &TokenRecord,
    now: DateTime<Utc>,
) -> Option<Candidate> {
    if !accept(config, record, now) {
        return None;
    }
    let score = score(config, record, now);
    Some(Candidate {
        record: record.clone(),
        score,
        priority: priority_for(score),
        passed_at: now,
    })
}
