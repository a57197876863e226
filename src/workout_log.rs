//! Completed-workout sink. `SessionManager::end` only returns a duration;
//! whoever ends the session writes it into the workout record through here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::LogError;
use crate::session::WorkoutKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub session_id: String,
    pub workout_kind: WorkoutKind,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub minutes: u64,
}

impl WorkoutRecord {
    pub fn new(
        session_id: String,
        workout_kind: WorkoutKind,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        elapsed_seconds: u64,
    ) -> Self {
        Self {
            session_id,
            workout_kind,
            started_at,
            ended_at,
            elapsed_seconds,
            minutes: elapsed_seconds / 60,
        }
    }
}

pub trait WorkoutLog {
    fn record(&self, entry: &WorkoutRecord) -> Result<(), LogError>;
    /// Entries, most recent first.
    fn recent(&self, limit: usize) -> Result<Vec<WorkoutRecord>, LogError>;
}

/// Append-only CSV file with a header row.
#[derive(Debug, Clone)]
pub struct CsvWorkoutLog {
    path: PathBuf,
}

impl CsvWorkoutLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl WorkoutLog for CsvWorkoutLog {
    fn record(&self, entry: &WorkoutRecord) -> Result<(), LogError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush().map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<WorkoutRecord>, LogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = reader
            .deserialize()
            .collect::<Result<Vec<WorkoutRecord>, _>>()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn entry(id: &str, secs: u64) -> WorkoutRecord {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 7, 30, 0).unwrap();
        WorkoutRecord::new(
            id.into(),
            WorkoutKind::Strength,
            start,
            start + Duration::seconds(secs as i64),
            secs,
        )
    }

    #[test]
    fn minutes_are_whole() {
        assert_eq!(entry("a", 140).minutes, 2);
        assert_eq!(entry("a", 59).minutes, 0);
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempdir().unwrap();
        let log = CsvWorkoutLog::new(dir.path().join("workouts.csv"));
        assert!(log.recent(10).unwrap().is_empty());
    }

    #[test]
    fn appends_with_single_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("workouts.csv");
        let log = CsvWorkoutLog::new(&path);

        log.record(&entry("first", 140)).unwrap();
        log.record(&entry("second", 600)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("session_id").count(), 1);

        let recent = log.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0], entry("second", 600));
        assert_eq!(recent[1], entry("first", 140));
    }

    #[test]
    fn recent_respects_limit() {
        let dir = tempdir().unwrap();
        let log = CsvWorkoutLog::new(dir.path().join("workouts.csv"));
        for i in 0..5 {
            log.record(&entry(&format!("w{i}"), 60 * i)).unwrap();
        }
        let recent = log.recent(2).unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.session_id.as_str()).collect();
        assert_eq!(ids, vec!["w4", "w3"]);
    }
}
