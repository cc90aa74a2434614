//! Backup pruner - applies a time-bucket retention policy to stored database backups

use anyhow::{bail, Context};
use backup_pruner::config::{Config, LogFormat};
use backup_pruner::storage::{BackupStore, FsStore};
use backup_pruner::tasks::retention;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "backup_pruner=info".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    info!("Backup pruner v{} starting", env!("CARGO_PKG_VERSION"));
    info!("Backup directory: {}", config.backup_dir.display());
    info!(
        keep_last = config.policy.keep_last,
        keep_hourly = config.policy.keep_hourly,
        keep_daily = config.policy.keep_daily,
        keep_weekly = config.policy.keep_weekly,
        keep_monthly = config.policy.keep_monthly,
        keep_yearly = config.policy.keep_yearly,
        min_backups = config.policy.min_backups,
        dry_run = config.policy.dry_run,
        "Retention policy"
    );

    let store: Arc<dyn BackupStore> = Arc::new(FsStore::new(config.backup_dir.clone()));

    if let Some(every) = config.interval {
        for setting in config.ignored_in_periodic_mode() {
            warn!(
                setting = setting,
                "Setting only applies to one-shot runs, ignored because RETENTION_INTERVAL_SECS is set"
            );
        }
        retention::retention_task(store, config.policy, every, config.delete_concurrency).await;
        return Ok(());
    }

    let report = retention::run_retention(
        store.as_ref(),
        &config.policy,
        config.delete_concurrency,
        Utc::now(),
    )
    .await;

    if let Some(path) = &config.report_path {
        let json = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if !report.failures.is_empty() {
        if config.fail_on_delete_error {
            bail!("{} backup(s) could not be deleted", report.failures.len());
        }
        warn!(
            failed = report.failures.len(),
            "Deletion failures ignored (RETENTION_FAIL_ON_DELETE_ERROR is off)"
        );
    }

    Ok(())
}
