//! Deletion executor - removes the final delete set from storage

use crate::models::DeletionFailure;
use crate::storage::BackupStore;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, error};

/// Outcome of a deletion pass
#[derive(Debug, Default)]
pub struct DeletionOutcome {
    pub deleted: usize,
    /// Failed deletions, sorted by path
    pub failures: Vec<DeletionFailure>,
}

/// Delete every path in `paths`, keeping at most `concurrency` requests in flight.
///
/// A failed deletion is logged and recorded; the remaining deletions still run.
pub async fn execute_deletions<S>(store: &S, paths: &[&str], concurrency: usize) -> DeletionOutcome
where
    S: BackupStore + ?Sized,
{
    let results: Vec<_> = stream::iter(paths.iter().copied())
        .map(|path| async move { (path, store.delete(path).await) })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = DeletionOutcome::default();
    for (path, result) in results {
        match result {
            Ok(()) => {
                debug!(path = %path, "Deleted backup");
                outcome.deleted += 1;
            }
            Err(e) => {
                error!(path = %path, error = %e, "Failed to delete backup");
                outcome.failures.push(DeletionFailure {
                    path: path.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    outcome.failures.sort_by(|a, b| a.path.cmp(&b.path));
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_deletes_all_paths() {
        let store = MemoryStore::with_keys(["a", "b", "c", "keep"]);

        let outcome = execute_deletions(&store, &["a", "b", "c"], 2).await;

        assert_eq!(outcome.deleted, 3);
        assert!(outcome.failures.is_empty());
        assert_eq!(store.keys(), ["keep"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_the_pass() {
        let store = MemoryStore::with_keys(["a", "b", "c", "d"]);
        store.fail_deletes_for("b");
        store.fail_deletes_for("d");

        let outcome = execute_deletions(&store, &["d", "c", "b", "a"], 1).await;

        assert_eq!(outcome.deleted, 2);
        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(failed, ["b", "d"]);
        assert_eq!(store.keys(), ["b", "d"]);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let store = MemoryStore::with_keys(["a"]);
        let outcome = execute_deletions(&store, &["a"], 0).await;
        assert_eq!(outcome.deleted, 1);
    }

    #[tokio::test]
    async fn test_nothing_to_delete() {
        let store = MemoryStore::with_keys(["a"]);
        let outcome = execute_deletions(&store, &[], 4).await;
        assert_eq!(outcome.deleted, 0);
        assert_eq!(store.len(), 1);
    }
}
