//! Append-only feedback log
//!
//! User corrections are recorded as one JSON object per line for later
//! retraining runs. Nothing in the serving path reads this file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use geolens_core::models::FeedbackRecord;
use geolens_core::Result;
use tracing::info;

/// JSON-lines log of prediction corrections
#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &FeedbackRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(record)
            .map_err(|e| geolens_core::GeoLensError::Serialization(e.to_string()))?;
        writeln!(file, "{}", line)?;

        info!(analysis_id = %record.analysis_id, "feedback recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str) -> FeedbackRecord {
        FeedbackRecord {
            timestamp: Utc::now(),
            analysis_id: id.to_string(),
            predicted_lat: Some(38.71),
            predicted_lon: Some(-9.14),
            correct_lat: 38.72,
            correct_lon: -9.13,
            notes: String::new(),
        }
    }

    #[test]
    fn test_append_creates_parent_dirs_and_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback/corrections.jsonl"));

        log.append(&record("a")).unwrap();
        log.append(&record("b")).unwrap();

        let body = fs::read_to_string(dir.path().join("feedback/corrections.jsonl")).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: FeedbackRecord = serde_json::from_str(lines[0]).unwrap();
        let second: FeedbackRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.analysis_id, "a");
        assert_eq!(second.analysis_id, "b");
    }
}
