use chrono::{DateTime, Utc};

use crate::session::SessionState;

/// Whole seconds between `reference_at` and `now`, clamped at zero when the
/// clock reads earlier than the reference.
pub fn running_seconds(reference_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let secs = now.signed_duration_since(reference_at).num_seconds();
    u64::try_from(secs).unwrap_or(0)
}

/// Total elapsed training time at `now`.
///
/// Paused sessions report the frozen baseline. Running sessions add the time
/// since the last transition into running, however long the process was
/// away in between.
pub fn elapsed(state: &SessionState, now: DateTime<Utc>) -> u64 {
    if state.is_paused {
        state.accumulated_seconds
    } else {
        state
            .accumulated_seconds
            .saturating_add(running_seconds(state.reference_at, now))
    }
}
