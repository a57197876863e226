use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of workout a session is timing. Only used to route restoration back
/// to the right screen, the manager never branches on it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkoutKind {
    Cardio,
    Strength,
    Outdoor,
}

/// Persisted record of the single active session.
///
/// The JSON field names are the durable format; keep them stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub workout_kind: WorkoutKind,
    pub started_at: DateTime<Utc>,
    pub reference_at: DateTime<Utc>,
    pub accumulated_seconds: u64,
    pub is_paused: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<usize>,
    /// Last time a live process wrote this record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fresh running session started at `now`.
    pub fn new(session_id: String, workout_kind: WorkoutKind, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            workout_kind,
            started_at: now,
            reference_at: now,
            accumulated_seconds: 0,
            is_paused: false,
            selected_index: None,
            last_seen_at: None,
        }
    }

    /// Point from which a restart counts the process as gone.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen_at
            .map_or(self.reference_at, |seen| seen.max(self.reference_at))
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_paused {
            SessionPhase::Paused
        } else {
            SessionPhase::Running
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[strum(serialize = "no session")]
    NoSession,
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "paused")]
    Paused,
}

/// What observers see. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub has_active_session: bool,
    pub is_paused: bool,
    pub elapsed_seconds: u64,
    pub session_started_at: Option<DateTime<Utc>>,
    pub active_workout_kind: Option<WorkoutKind>,
}

impl SessionSnapshot {
    pub fn empty() -> Self {
        Self {
            has_active_session: false,
            is_paused: false,
            elapsed_seconds: 0,
            session_started_at: None,
            active_workout_kind: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.has_active_session, self.is_paused) {
            (false, _) => SessionPhase::NoSession,
            (true, true) => SessionPhase::Paused,
            (true, false) => SessionPhase::Running,
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
