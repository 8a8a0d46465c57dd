//! Day-scoped log of recorded samples
//!
//! The log only ever holds samples for one calendar day. Appends and loads
//! both filter out entries from any other day, so stale data heals itself.

use crate::clock::parse_time_of_day;
use crate::error::PlanError;
use crate::types::Sample;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ordered samples for the current day, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoricalLog {
    samples: Vec<Sample>,
}

/// A log decoded from persisted data, with the number of entries dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedLog {
    pub log: HistoricalLog,
    pub discarded: usize,
}

/// Persisted entry shape; `date` is absent in the legacy format
#[derive(Deserialize)]
struct StoredSample {
    date: Option<NaiveDate>,
    time: String,
    steps: u32,
}

impl HistoricalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently appended sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// Keep only samples from `day`, returning how many were removed
    pub fn retain_day(&mut self, day: NaiveDate) -> usize {
        let before = self.samples.len();
        self.samples.retain(|sample| sample.date == day);
        before - self.samples.len()
    }

    /// Decode persisted JSON without ever failing.
    ///
    /// Entries without a usable `time` or `steps` are dropped, entries without
    /// a `date` are adopted as `today`, and entries from other days are dropped.
    /// Anything that is not a JSON array decodes to an empty log.
    pub fn decode_lenient(json: &str, today: NaiveDate) -> LoadedLog {
        match serde_json::from_str(json) {
            Ok(value) => Self::decode_value_lenient(value, today),
            Err(e) => {
                warn!(error = %e, "persisted sample log is unreadable; starting empty");
                LoadedLog::default()
            }
        }
    }

    /// Same as [`decode_lenient`](Self::decode_lenient), for an already parsed value
    pub fn decode_value_lenient(value: serde_json::Value, today: NaiveDate) -> LoadedLog {
        let entries = match value {
            serde_json::Value::Array(entries) => entries,
            _ => {
                warn!("persisted sample log is not an array; starting empty");
                return LoadedLog::default();
            }
        };

        let total = entries.len();
        let samples: Vec<Sample> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<StoredSample>(entry).ok())
            .filter_map(|stored| {
                let time = parse_time_of_day(&stored.time).ok()?;
                Some(Sample {
                    date: stored.date.unwrap_or(today),
                    time,
                    steps: stored.steps,
                })
            })
            .filter(|sample| sample.date == today)
            .collect();

        let discarded = total - samples.len();
        if discarded > 0 {
            warn!(discarded, kept = samples.len(), "discarded unusable or stale samples");
        }

        LoadedLog {
            log: Self { samples },
            discarded,
        }
    }

    /// Decode persisted JSON, keeping only the usable samples for `today`
    pub fn from_json_lenient(json: &str, today: NaiveDate) -> Self {
        Self::decode_lenient(json, today).log
    }

    pub fn to_json(&self) -> Result<String, PlanError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<'a> IntoIterator for &'a HistoricalLog {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Append a sample taken at `timestamp` and return the updated log.
///
/// Entries from any day other than `timestamp`'s date are filtered out before
/// and after the append. The input log is left untouched.
pub fn record_sample(
    history: &HistoricalLog,
    timestamp: DateTime<FixedOffset>,
    steps: u32,
) -> HistoricalLog {
    let sample = Sample::at(timestamp, steps);
    let today = sample.date;

    let mut updated = history.clone();
    let stale = updated.retain_day(today);
    updated.samples.push(sample);
    updated.retain_day(today);

    debug!(steps, stale, len = updated.len(), "recorded step sample");
    updated
}
