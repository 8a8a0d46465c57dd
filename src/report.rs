//! Plan report encoding
//!
//! This module wraps a computed plan into the JSON document handed to
//! presentation layers (CLI, FFI hosts). Checkpoints carry both RFC 3339 times
//! and epoch milliseconds so charts need no date parsing.

use crate::error::PlanError;
use crate::interval::interval_label;
use crate::types::{CheckpointKind, CheckpointStatus, Metrics, Plan, PlanInput, PlanStatus};
use crate::{PRODUCER_NAME, STRIDE_VERSION};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// A checkpoint as presented to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportCheckpoint {
    pub time: String,
    pub timestamp_ms: i64,
    pub steps: u32,
    pub kind: CheckpointKind,
    pub status: CheckpointStatus,
}

/// Complete plan report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at: String,
    pub status: PlanStatus,
    pub target_steps: u32,
    pub target_time: String,
    pub steps_left: i64,
    pub interval_minutes: u32,
    pub interval_label: String,
    pub checkpoints: Vec<ReportCheckpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

/// Encoder for plan reports
pub struct PlanEncoder {
    instance_id: String,
}

impl Default for PlanEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a plan computed at `now` from `input`
    pub fn encode(&self, plan: &Plan, input: &PlanInput, now: DateTime<FixedOffset>) -> PlanReport {
        let checkpoints = plan
            .checkpoints
            .iter()
            .map(|c| ReportCheckpoint {
                time: c.time.to_rfc3339(),
                timestamp_ms: c.timestamp_millis(),
                steps: c.steps,
                kind: c.kind,
                status: c.status_at(now),
            })
            .collect();

        PlanReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: STRIDE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at: now.to_rfc3339(),
            status: plan.status,
            target_steps: input.target_steps,
            target_time: plan.target.to_rfc3339(),
            steps_left: plan.steps_left,
            interval_minutes: input.checkpoint_interval,
            interval_label: interval_label(input.checkpoint_interval),
            checkpoints,
            metrics: plan.metrics.clone(),
        }
    }

    /// Encode a plan to a JSON string
    pub fn encode_to_json(
        &self,
        plan: &Plan,
        input: &PlanInput,
        now: DateTime<FixedOffset>,
    ) -> Result<String, PlanError> {
        let report = self.encode(plan, input, now);
        serde_json::to_string(&report).map_err(|e| PlanError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoricalLog;
    use crate::planner::compute_plan;
    use chrono::NaiveTime;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00+01:00").unwrap()
    }

    #[test]
    fn test_encode_report() {
        let input = PlanInput {
            target_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            current_steps: 6000,
            ..PlanInput::default()
        };
        let plan = compute_plan(&input, &HistoricalLog::new(), now()).unwrap();
        let encoder = PlanEncoder::with_instance_id("test-instance".to_string());

        let json = encoder.encode_to_json(&plan, &input, now()).unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["report_version"], "1.0.0");
        assert_eq!(report["producer"]["name"], "stride-planner");
        assert_eq!(report["producer"]["instance_id"], "test-instance");
        assert_eq!(report["status"], "on_track");
        assert_eq!(report["interval_label"], "1 hour");
        assert_eq!(report["target_time"], "2024-03-10T14:00:00+01:00");
        assert_eq!(report["steps_left"], 2000);

        let checkpoints = report["checkpoints"].as_array().unwrap();
        assert_eq!(checkpoints.len(), 3);
        assert_eq!(checkpoints[0]["kind"], "anchor");
        assert_eq!(checkpoints[0]["status"], "current");
        assert_eq!(checkpoints[1]["steps"], 7000);
        assert_eq!(checkpoints[1]["status"], "upcoming");
        assert_eq!(checkpoints[2]["kind"], "target");
        assert_eq!(
            checkpoints[2]["timestamp_ms"],
            DateTime::parse_from_rfc3339("2024-03-10T14:00:00+01:00")
                .unwrap()
                .timestamp_millis()
        );

        assert_eq!(report["metrics"]["steps_per_hour"], 1000);
    }

    #[test]
    fn test_encoders_have_distinct_instances() {
        assert_ne!(PlanEncoder::new().instance_id, PlanEncoder::new().instance_id);
    }
}
