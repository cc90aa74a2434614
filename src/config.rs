//! Runtime configuration read from environment variables

use crate::error::{AppError, Result};
use crate::models::RetentionPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Everything the binary needs for a retention run
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the backup namespace
    pub backup_dir: PathBuf,
    pub policy: RetentionPolicy,
    /// Re-run on this interval instead of exiting after one run
    pub interval: Option<Duration>,
    /// Maximum deletions in flight
    pub delete_concurrency: usize,
    /// Exit with an error when any deletion failed
    pub fail_on_delete_error: bool,
    /// Write the JSON run report here after a one-shot run
    pub report_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let policy = RetentionPolicy {
            keep_last: parse_or(&var, "RETENTION_KEEP_LAST", 0)?,
            keep_hourly: parse_or(&var, "RETENTION_KEEP_HOURLY", 0)?,
            keep_daily: parse_or(&var, "RETENTION_KEEP_DAILY", 7)?,
            keep_weekly: parse_or(&var, "RETENTION_KEEP_WEEKLY", 4)?,
            keep_monthly: parse_or(&var, "RETENTION_KEEP_MONTHLY", 6)?,
            keep_yearly: parse_or(&var, "RETENTION_KEEP_YEARLY", 0)?,
            min_backups: parse_or(&var, "RETENTION_MIN_BACKUPS", 1)?,
            dry_run: parse_bool_or(&var, "RETENTION_DRY_RUN", false)?,
        };

        let interval = match var("RETENTION_INTERVAL_SECS") {
            Some(raw) => match parse::<u64>("RETENTION_INTERVAL_SECS", &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            None => None,
        };

        let delete_concurrency: usize = parse_or(&var, "RETENTION_DELETE_CONCURRENCY", 4)?;
        if delete_concurrency == 0 {
            return Err(AppError::Config(
                "RETENTION_DELETE_CONCURRENCY must be at least 1".into(),
            ));
        }

        let log_format = match var("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "LOG_FORMAT must be \"text\" or \"json\", got {:?}",
                    other
                )))
            }
        };

        Ok(Self {
            backup_dir: var("BACKUP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/backups")),
            policy,
            interval,
            delete_concurrency,
            fail_on_delete_error: parse_bool_or(&var, "RETENTION_FAIL_ON_DELETE_ERROR", false)?,
            report_path: var("RETENTION_REPORT_PATH").map(PathBuf::from),
            log_format,
        })
    }

    /// One-shot settings that have no effect when running periodically
    pub fn ignored_in_periodic_mode(&self) -> Vec<&'static str> {
        if self.interval.is_none() {
            return Vec::new();
        }
        let mut ignored = Vec::new();
        if self.report_path.is_some() {
            ignored.push("RETENTION_REPORT_PATH");
        }
        if self.fail_on_delete_error {
            ignored.push("RETENTION_FAIL_ON_DELETE_ERROR");
        }
        ignored
    }
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("Invalid {}: {:?}", key, raw)))
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key).map_or(Ok(default), |raw| parse(key, &raw))
}

fn parse_bool_or<F>(var: &F, key: &str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(AppError::Config(format!("Invalid {}: {:?}", key, raw))),
        },
    }
}
