use chrono::{DateTime, Utc};

use crate::core::FreshnessState;

/// Whether a source file dated `source_date` should be loaded on top of
/// `existing`. Only a strictly newer date proceeds; equal dates are skipped so
/// re-running with the same file is a no-op. `force` always proceeds.
pub fn should_proceed(source_date: DateTime<Utc>, existing: &FreshnessState, force: bool) -> bool {
    match existing.latest() {
        None => true,
        Some(latest) => force || source_date > latest,
    }
}
