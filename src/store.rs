//! Sample log persistence
//!
//! The log lives under a single fixed key. Stores hand back whatever usable
//! samples they find for the requested day; malformed content is never fatal.

use crate::error::PlanError;
use crate::history::{HistoricalLog, LoadedLog};
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage key for the sample log
pub const STORAGE_KEY: &str = "stepData";

/// Durable home of the day's sample log
pub trait SampleStore {
    /// Load the usable samples for `today`, or `None` if nothing was stored
    fn load(&self, today: NaiveDate) -> Result<Option<LoadedLog>, PlanError>;

    /// Replace the stored log
    fn save(&mut self, log: &HistoricalLog) -> Result<(), PlanError>;
}

/// Sample log stored as a JSON array in `<dir>/stepData.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the fixed storage key inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{STORAGE_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleStore for JsonFileStore {
    fn load(&self, today: NaiveDate) -> Result<Option<LoadedLog>, PlanError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored sample log");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Some(HistoricalLog::decode_lenient(&raw, today)))
    }

    fn save(&mut self, log: &HistoricalLog) -> Result<(), PlanError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, log.to_json()?)?;
        debug!(path = %self.path.display(), samples = log.len(), "saved sample log");
        Ok(())
    }
}

/// In-process store holding the serialized log
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    raw: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from previously persisted JSON
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }
}

impl SampleStore for MemoryStore {
    fn load(&self, today: NaiveDate) -> Result<Option<LoadedLog>, PlanError> {
        Ok(self
            .raw
            .as_deref()
            .map(|raw| HistoricalLog::decode_lenient(raw, today)))
    }

    fn save(&mut self, log: &HistoricalLog) -> Result<(), PlanError> {
        self.raw = Some(log.to_json()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::record_sample;
    use chrono::{DateTime, Duration};

    fn now() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00+00:00").unwrap()
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(dir.path());
        assert!(store.path().ends_with("stepData.json"));
        assert!(store.load(now().date_naive()).unwrap().is_none());

        let log = record_sample(&HistoricalLog::new(), now(), 4200);
        store.save(&log).unwrap();

        let loaded = store.load(now().date_naive()).unwrap().unwrap();
        assert_eq!(loaded.log, log);
        assert_eq!(loaded.discarded, 0);
    }

    #[test]
    fn test_file_store_next_day_discards() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::in_dir(dir.path().join("nested"));
        store
            .save(&record_sample(&HistoricalLog::new(), now(), 4200))
            .unwrap();

        let tomorrow = (now() + Duration::days(1)).date_naive();
        let loaded = store.load(tomorrow).unwrap().unwrap();
        assert!(loaded.log.is_empty());
        assert_eq!(loaded.discarded, 1);
    }

    #[test]
    fn test_file_store_recovers_from_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::in_dir(dir.path());
        fs::write(store.path(), "{ not json").unwrap();

        let loaded = store.load(now().date_naive()).unwrap().unwrap();
        assert!(loaded.log.is_empty());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert!(store.load(now().date_naive()).unwrap().is_none());

        store
            .save(&record_sample(&HistoricalLog::new(), now(), 10))
            .unwrap();
        assert_eq!(
            store.raw(),
            Some(r#"[{"date":"2024-03-10","time":"12:00","steps":10}]"#)
        );
    }
}
