//! Retention policy evaluator
//!
//! Decides, for a newest-first list of backups, which ones a policy keeps.
//! Rules are OR-combined and tried in a fixed order per backup: `keep_last`,
//! then the hourly, daily, weekly, monthly and yearly tiers. The first rule
//! that fires gives the backup its only reason.

use crate::models::{
    BackupArtifact, KeepReason, RetentionDecision, RetentionPolicy, Tier, Verdict,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Evaluate `policy` against `artifacts` as of `now`.
///
/// `artifacts` must already be ordered newest first (see
/// [`build_catalog`](crate::catalog::build_catalog)); within a tier bucket the
/// first backup visited claims it. Returns one decision per artifact in the
/// same order. Nothing here touches storage.
pub fn evaluate<'a>(
    artifacts: &'a [BackupArtifact],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> Vec<RetentionDecision<'a>> {
    // bucket keys already claimed, per tier
    let mut buckets: HashMap<Tier, HashSet<String>> = HashMap::new();

    artifacts
        .iter()
        .enumerate()
        .map(|(index, artifact)| RetentionDecision {
            artifact,
            verdict: decide(index, artifact, policy, now, &mut buckets),
        })
        .collect()
}

fn decide(
    index: usize,
    artifact: &BackupArtifact,
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
    buckets: &mut HashMap<Tier, HashSet<String>>,
) -> Verdict {
    if index < policy.keep_last {
        return Verdict::Keep {
            reason: KeepReason::KeepLast,
            bucket: None,
        };
    }

    let age_secs = now.signed_duration_since(artifact.captured_at).num_seconds();

    for tier in Tier::ALL {
        let count = policy.count(tier);
        if count == 0 || !within_window(age_secs, count, tier) {
            continue;
        }

        let key = tier.bucket_key(&artifact.captured_at);
        if !buckets.entry(tier).or_default().insert(key.clone()) {
            continue;
        }

        return Verdict::Keep {
            reason: tier.reason(),
            bucket: Some(key),
        };
    }

    Verdict::Delete
}

/// Whether an artifact `age_secs` old lies inside the last `count` tier units.
fn within_window(age_secs: i64, count: usize, tier: Tier) -> bool {
    let count = i64::try_from(count).unwrap_or(i64::MAX);
    age_secs <= count.saturating_mul(tier.duration_secs())
}
