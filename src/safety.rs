//! Minimum-backups safety net

use crate::models::{KeepReason, RetentionDecision, Verdict};
use tracing::warn;

/// Make sure at least `min_backups` backups survive the run.
///
/// When the policy would leave fewer survivors, the newest delete candidates
/// are flipped to `min_backups_safety` until the floor is met (or nothing is
/// left to rescue). `decisions` must be in newest-first order. Returns how
/// many backups were rescued.
pub fn enforce_min_backups(decisions: &mut [RetentionDecision<'_>], min_backups: usize) -> usize {
    let surviving = decisions.iter().filter(|d| d.is_keep()).count();
    if surviving >= min_backups {
        return 0;
    }

    let shortfall = min_backups - surviving;
    let mut rescued = 0;

    for decision in decisions.iter_mut().filter(|d| !d.is_keep()).take(shortfall) {
        decision.verdict = Verdict::Keep {
            reason: KeepReason::MinBackupsSafety,
            bucket: None,
        };
        rescued += 1;
    }

    warn!(
        surviving = surviving,
        min_backups = min_backups,
        rescued = rescued,
        "Policy would leave too few backups, keeping newest candidates"
    );
    rescued
}
