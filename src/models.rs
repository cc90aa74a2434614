//! Core domain models for backup retention

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A stored backup, identified by its `YYYY/MM/DD/<database>_<HHMMSS>.<ext>` key.
///
/// Ordering compares `captured_at` first and `path` second, so sorting in
/// reverse yields the newest-first order every retention rule relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BackupArtifact {
    /// When the backup was taken (UTC, second precision)
    pub captured_at: DateTime<Utc>,
    /// Storage key, relative to the backup namespace
    pub path: String,
    /// Database the dump belongs to (informational)
    pub database: String,
}

/// Retention configuration for a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub keep_last: usize,
    pub keep_hourly: usize,
    pub keep_daily: usize,
    pub keep_weekly: usize,
    pub keep_monthly: usize,
    pub keep_yearly: usize,
    /// Never let the number of surviving backups drop below this
    pub min_backups: usize,
    /// Compute and log decisions without deleting anything
    pub dry_run: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_last: 0,
            keep_hourly: 0,
            keep_daily: 0,
            keep_weekly: 0,
            keep_monthly: 0,
            keep_yearly: 0,
            min_backups: 1,
            dry_run: false,
        }
    }
}

impl RetentionPolicy {
    /// Configured bucket count for a time tier
    pub fn count(&self, tier: Tier) -> usize {
        match tier {
            Tier::Hourly => self.keep_hourly,
            Tier::Daily => self.keep_daily,
            Tier::Weekly => self.keep_weekly,
            Tier::Monthly => self.keep_monthly,
            Tier::Yearly => self.keep_yearly,
        }
    }
}

/// Time-bucketed retention tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Tier {
    /// Tiers in the order they are tried for each artifact
    pub const ALL: [Tier; 5] = [
        Tier::Hourly,
        Tier::Daily,
        Tier::Weekly,
        Tier::Monthly,
        Tier::Yearly,
    ];

    /// Length of one tier unit in seconds.
    ///
    /// Months are 30 days and years are 365 days; windows are not calendar-aware.
    pub fn duration_secs(self) -> i64 {
        match self {
            Tier::Hourly => 3_600,
            Tier::Daily => 86_400,
            Tier::Weekly => 604_800,
            Tier::Monthly => 2_592_000,
            Tier::Yearly => 31_536_000,
        }
    }

    /// UTC bucket key an instant falls into for this tier
    pub fn bucket_key(self, at: &DateTime<Utc>) -> String {
        match self {
            Tier::Hourly => at.format("%Y-%m-%d-%H").to_string(),
            Tier::Daily => at.format("%Y-%m-%d").to_string(),
            Tier::Weekly => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Tier::Monthly => at.format("%Y-%m").to_string(),
            Tier::Yearly => at.format("%Y").to_string(),
        }
    }

    pub fn reason(self) -> KeepReason {
        match self {
            Tier::Hourly => KeepReason::KeepHourly,
            Tier::Daily => KeepReason::KeepDaily,
            Tier::Weekly => KeepReason::KeepWeekly,
            Tier::Monthly => KeepReason::KeepMonthly,
            Tier::Yearly => KeepReason::KeepYearly,
        }
    }
}

/// Which rule saved a backup from deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    KeepLast,
    KeepHourly,
    KeepDaily,
    KeepWeekly,
    KeepMonthly,
    KeepYearly,
    MinBackupsSafety,
}

impl KeepReason {
    pub fn as_str(self) -> &'static str {
        match self {
            KeepReason::KeepLast => "keep_last",
            KeepReason::KeepHourly => "keep_hourly",
            KeepReason::KeepDaily => "keep_daily",
            KeepReason::KeepWeekly => "keep_weekly",
            KeepReason::KeepMonthly => "keep_monthly",
            KeepReason::KeepYearly => "keep_yearly",
            KeepReason::MinBackupsSafety => "min_backups_safety",
        }
    }
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep {
        reason: KeepReason,
        /// Bucket key that earned the keep, for tier rules
        bucket: Option<String>,
    },
    Delete,
}

/// Decision reached for one artifact during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionDecision<'a> {
    pub artifact: &'a BackupArtifact,
    pub verdict: Verdict,
}

impl RetentionDecision<'_> {
    #[inline]
    pub fn is_keep(&self) -> bool {
        matches!(self.verdict, Verdict::Keep { .. })
    }

    pub fn reason(&self) -> Option<KeepReason> {
        match self.verdict {
            Verdict::Keep { reason, .. } => Some(reason),
            Verdict::Delete => None,
        }
    }
}

/// Renders the audit line: `KEEP: <path> (reason: <tag>[, bucket: <key>])` or `DELETE: <path>`
impl fmt::Display for RetentionDecision<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Keep {
                reason,
                bucket: Some(bucket),
            } => write!(
                f,
                "KEEP: {} (reason: {}, bucket: {})",
                self.artifact.path, reason, bucket
            ),
            Verdict::Keep {
                reason,
                bucket: None,
            } => write!(f, "KEEP: {} (reason: {})", self.artifact.path, reason),
            Verdict::Delete => write!(f, "DELETE: {}", self.artifact.path),
        }
    }
}

/// A deletion that the storage backend refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub path: String,
    pub error: String,
}

/// Summary of one retention run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    /// Valid backups seen in the catalog
    pub total: usize,
    /// Keys that did not parse as backups and were ignored
    pub skipped: usize,
    pub kept: usize,
    /// Kept only because of the minimum backup floor
    pub rescued: usize,
    /// Backups selected for deletion after the safety net
    pub delete_candidates: usize,
    /// Backups actually removed (always 0 in dry run)
    pub deleted: usize,
    pub failures: Vec<DeletionFailure>,
    /// Audit line for every decision, newest backup first
    pub decisions: Vec<String>,
}

impl RunReport {
    pub fn empty(run_id: Uuid, dry_run: bool, skipped: usize) -> Self {
        Self {
            run_id,
            dry_run,
            total: 0,
            skipped,
            kept: 0,
            rescued: 0,
            delete_candidates: 0,
            deleted: 0,
            failures: Vec::new(),
            decisions: Vec::new(),
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(
                f,
                "SUMMARY: kept={} deleted=0 would_delete={} (dry run)",
                self.kept, self.delete_candidates
            )
        } else {
            write!(
                f,
                "SUMMARY: kept={} deleted={} failed={}",
                self.kept,
                self.deleted,
                self.failures.len()
            )
        }
    }
}
