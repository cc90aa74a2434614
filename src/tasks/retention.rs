//! Retention task - applies the backup retention policy to the backup store

use crate::catalog::build_catalog;
use crate::executor::execute_deletions;
use crate::models::{RetentionPolicy, RunReport};
use crate::policy::evaluate;
use crate::safety::enforce_min_backups;
use crate::storage::BackupStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Run the retention pipeline once against `store` as of `now`.
///
/// Listing failures are logged and treated as an empty catalog, and
/// deletion failures are collected into the report, so a run never fails.
pub async fn run_retention<S>(
    store: &S,
    policy: &RetentionPolicy,
    delete_concurrency: usize,
    now: DateTime<Utc>,
) -> RunReport
where
    S: BackupStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("retention_run", run_id = %run_id, store = %store.describe());

    async move {
        info!(dry_run = policy.dry_run, "Running retention");

        let keys = match store.list().await {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "Failed to list backups, treating catalog as empty");
                Vec::new()
            }
        };

        let catalog = build_catalog(&keys);
        if catalog.artifacts.is_empty() {
            info!(skipped = catalog.skipped, "No backups found, nothing to do");
            return RunReport::empty(run_id, policy.dry_run, catalog.skipped);
        }

        let mut decisions = evaluate(&catalog.artifacts, policy, now);
        let rescued = enforce_min_backups(&mut decisions, policy.min_backups);

        let mut report = RunReport::empty(run_id, policy.dry_run, catalog.skipped);
        report.total = catalog.artifacts.len();
        report.rescued = rescued;

        let mut doomed: Vec<&str> = Vec::new();
        for decision in &decisions {
            let line = decision.to_string();
            info!("{}", line);
            report.decisions.push(line);

            if decision.is_keep() {
                report.kept += 1;
            } else {
                doomed.push(decision.artifact.path.as_str());
            }
        }
        report.delete_candidates = doomed.len();

        if policy.dry_run {
            info!(would_delete = doomed.len(), "Dry run, no backups deleted");
        } else if !doomed.is_empty() {
            let outcome = execute_deletions(store, &doomed, delete_concurrency).await;
            report.deleted = outcome.deleted;
            report.failures = outcome.failures;
        }

        if !report.failures.is_empty() {
            warn!(
                failed = report.failures.len(),
                "Some backups could not be deleted"
            );
        }
        info!("{}", report);
        report
    }
    .instrument(span)
    .await
}

/// Background task that re-applies the retention policy on a fixed interval.
///
/// The first run starts immediately. Runs are awaited one after another, so
/// they never overlap. Returns when Ctrl-C is received.
pub async fn retention_task(
    store: Arc<dyn BackupStore>,
    policy: RetentionPolicy,
    every: Duration,
    delete_concurrency: usize,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_secs = every.as_secs(),
        store = %store.describe(),
        "Retention task started"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping retention task");
                break;
            }
        }

        run_retention(store.as_ref(), &policy, delete_concurrency, Utc::now()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KeepReason;
    use crate::storage::MemoryStore;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn same_day_store() -> MemoryStore {
        MemoryStore::with_keys([
            "2024/06/15/app_100000.sql.gz",
            "2024/06/15/app_090000.sql.gz",
            "2024/06/15/app_080000.sql.gz",
            "2024/06/15/app_070000.sql.gz",
            "2024/06/15/app_060000.sql.gz",
        ])
    }

    fn keep_last(n: usize) -> RetentionPolicy {
        RetentionPolicy {
            keep_last: n,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_keep_last_run_deletes_oldest() {
        let store = same_day_store();

        let report = run_retention(&store, &keep_last(3), 4, now()).await;

        assert_eq!(
            store.keys(),
            [
                "2024/06/15/app_080000.sql.gz",
                "2024/06/15/app_090000.sql.gz",
                "2024/06/15/app_100000.sql.gz",
            ]
        );
        assert_eq!(report.total, 5);
        assert_eq!(report.kept, 3);
        assert_eq!(report.deleted, 2);
        assert_eq!(
            report.decisions,
            [
                "KEEP: 2024/06/15/app_100000.sql.gz (reason: keep_last)",
                "KEEP: 2024/06/15/app_090000.sql.gz (reason: keep_last)",
                "KEEP: 2024/06/15/app_080000.sql.gz (reason: keep_last)",
                "DELETE: 2024/06/15/app_070000.sql.gz",
                "DELETE: 2024/06/15/app_060000.sql.gz",
            ]
        );
        assert_eq!(report.to_string(), "SUMMARY: kept=3 deleted=2 failed=0");
    }

    #[tokio::test]
    async fn test_dry_run_leaves_store_untouched() {
        let store = same_day_store();
        let dry = RetentionPolicy {
            dry_run: true,
            ..keep_last(3)
        };

        let first = run_retention(&store, &dry, 4, now()).await;
        let second = run_retention(&store, &dry, 4, now()).await;

        assert_eq!(store.len(), 5);
        assert_eq!(first.deleted, 0);
        assert_eq!(first.delete_candidates, 2);
        assert_eq!(first.decisions, second.decisions);

        let real = run_retention(&same_day_store(), &keep_last(3), 4, now()).await;
        assert_eq!(first.decisions, real.decisions);
    }

    #[tokio::test]
    async fn test_single_backup_kept_by_floor() {
        let store = MemoryStore::with_keys(["2024/06/15/app_100000.sql.gz"]);

        let report = run_retention(&store, &RetentionPolicy::default(), 4, now()).await;

        assert_eq!(store.len(), 1);
        assert_eq!(report.rescued, 1);
        assert_eq!(
            report.decisions,
            ["KEEP: 2024/06/15/app_100000.sql.gz (reason: min_backups_safety)"]
        );
    }

    #[tokio::test]
    async fn test_empty_catalog_is_nothing_to_do() {
        let store = MemoryStore::new();

        let report = run_retention(&store, &keep_last(3), 4, now()).await;

        assert_eq!(report.total, 0);
        assert_eq!(report.kept, 0);
        assert_eq!(report.deleted, 0);
        assert!(report.decisions.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_listing_is_nothing_to_do() {
        let store = same_day_store();
        store.set_unavailable(true);

        let report = run_retention(&store, &keep_last(0), 4, now()).await;

        assert_eq!(report.total, 0);
        store.set_unavailable(false);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_unparseable_keys_are_never_touched() {
        let store = same_day_store();
        store.insert("README.md");
        store.insert("2024/06/15/partial.tmp");

        let report = run_retention(
            &store,
            &RetentionPolicy {
                min_backups: 0,
                ..Default::default()
            },
            4,
            now(),
        )
        .await;

        assert_eq!(report.skipped, 2);
        assert_eq!(report.deleted, 5);
        assert_eq!(store.keys(), ["2024/06/15/partial.tmp", "README.md"]);
    }

    #[tokio::test]
    async fn test_deletion_failures_are_reported_not_fatal() {
        let store = same_day_store();
        store.fail_deletes_for("2024/06/15/app_070000.sql.gz");

        let report = run_retention(&store, &keep_last(1), 2, now()).await;

        assert_eq!(report.delete_candidates, 4);
        assert_eq!(report.deleted, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "2024/06/15/app_070000.sql.gz");
        assert_eq!(store.len(), 2);
        assert_eq!(report.to_string(), "SUMMARY: kept=1 deleted=3 failed=1");
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let store = same_day_store();
        let policy = RetentionPolicy {
            keep_hourly: 2,
            keep_daily: 7,
            ..Default::default()
        };

        run_retention(&store, &policy, 4, now()).await;
        let after_first = store.keys();
        let second = run_retention(&store, &policy, 4, now()).await;

        assert_eq!(store.keys(), after_first);
        assert_eq!(second.delete_candidates, 0);
    }

    #[tokio::test]
    async fn test_multi_tier_history() {
        let now = now();
        let store = MemoryStore::new();
        // One nightly backup for 400 days
        for days in 0..400 {
            let at = now - ChronoDuration::days(days) - ChronoDuration::hours(10);
            store.insert(format!(
                "{}/app_{}.sql.gz",
                at.format("%Y/%m/%d"),
                at.format("%H%M%S")
            ));
        }
        let policy = RetentionPolicy {
            keep_daily: 7,
            keep_weekly: 4,
            keep_monthly: 6,
            keep_yearly: 2,
            ..Default::default()
        };

        let report = run_retention(&store, &policy, 8, now).await;

        assert_eq!(report.total, 400);
        assert_eq!(report.kept + report.deleted, 400);
        assert_eq!(store.len(), report.kept);

        let count = |reason: KeepReason| {
            let tag = format!("(reason: {},", reason);
            report
                .decisions
                .iter()
                .filter(|line| line.contains(&tag))
                .count()
        };
        // Counts size the windows, not the number of buckets: the 180-day
        // monthly window spans seven calendar months (2024-06 back to 2023-12).
        assert_eq!(count(KeepReason::KeepDaily), 7);
        assert_eq!(count(KeepReason::KeepWeekly), 4);
        assert_eq!(count(KeepReason::KeepMonthly), 7);
        assert_eq!(count(KeepReason::KeepYearly), 2);
        assert_eq!(report.kept, 20);

        let monthly: Vec<&str> = report
            .decisions
            .iter()
            .filter(|line| line.contains("(reason: keep_monthly,"))
            .filter_map(|line| line.rsplit("bucket: ").next())
            .map(|bucket| bucket.trim_end_matches(')'))
            .collect();
        assert_eq!(
            monthly,
            ["2024-06", "2024-05", "2024-04", "2024-03", "2024-02", "2024-01", "2023-12"]
        );
    }
}
