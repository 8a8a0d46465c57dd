//! Core types for the Stride planner
//!
//! This module defines the data that flows through a planning request: the
//! user's inputs, recorded samples, generated checkpoints and derived metrics.

use crate::error::PlanError;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Default daily step target
pub const DEFAULT_TARGET_STEPS: u32 = 8000;

/// Default walking pace (steps per minute)
pub const DEFAULT_WALKING_PACE: u32 = 110;

/// Default checkpoint interval (minutes)
pub const DEFAULT_CHECKPOINT_INTERVAL: u32 = 60;

/// Default deadline hour (18:00)
pub const DEFAULT_TARGET_HOUR: u32 = 18;

/// Window around "now" in which a checkpoint counts as current
pub const CURRENT_WINDOW_MINUTES: i64 = 15;

/// A manually recorded step count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Calendar day the sample belongs to
    pub date: NaiveDate,
    /// Wall-clock time of the reading (minute precision)
    #[serde(with = "crate::clock::hhmm")]
    pub time: NaiveTime,
    /// Cumulative steps at that time
    pub steps: u32,
}

impl Sample {
    /// Build a sample from an instant, truncated to the minute
    pub fn at(instant: DateTime<FixedOffset>, steps: u32) -> Self {
        let truncated = crate::clock::truncate_to_minute(instant);
        Self {
            date: truncated.date_naive(),
            time: truncated.time(),
            steps,
        }
    }
}

/// User-configurable planning parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanInput {
    /// Daily step goal
    pub target_steps: u32,
    /// Deadline, as a time of day on the planning date
    #[serde(with = "crate::clock::hhmm")]
    pub target_time: NaiveTime,
    /// Walking pace in steps per minute
    pub walking_pace: u32,
    /// Steps already taken today
    pub current_steps: u32,
    /// Spacing of projected checkpoints (minutes)
    pub checkpoint_interval: u32,
}

impl Default for PlanInput {
    fn default() -> Self {
        Self {
            target_steps: DEFAULT_TARGET_STEPS,
            target_time: NaiveTime::from_hms_opt(DEFAULT_TARGET_HOUR, 0, 0).unwrap_or_default(),
            walking_pace: DEFAULT_WALKING_PACE,
            current_steps: 0,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}

impl PlanInput {
    /// Reject inputs no plan can be built from.
    ///
    /// A zero walking pace is not rejected here; it produces a plan with
    /// [`PlanStatus::InvalidPace`].
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.target_steps == 0 {
            return Err(PlanError::InvalidInput(
                "target_steps must be positive".to_string(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(PlanError::InvalidInput(
                "checkpoint_interval must be at least one minute".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a checkpoint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// The current instant with the current step count; replaced by a
    /// sample recorded in the same minute
    Anchor,
    /// A grid point on the projected schedule
    Projected,
    /// The deadline itself
    Target,
    /// A sample from today's log
    Recorded,
}

/// Position of a checkpoint relative to a reference instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Past,
    Current,
    Upcoming,
}

/// A (time, cumulative steps) point of the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: DateTime<FixedOffset>,
    pub steps: u32,
    pub kind: CheckpointKind,
}

impl Checkpoint {
    pub fn new(time: DateTime<FixedOffset>, steps: u32, kind: CheckpointKind) -> Self {
        Self { time, steps, kind }
    }

    /// Milliseconds since the Unix epoch, for charting
    pub fn timestamp_millis(&self) -> i64 {
        self.time.timestamp_millis()
    }

    /// Past before `now`, current within 15 minutes after it, upcoming otherwise
    pub fn status_at(&self, now: DateTime<FixedOffset>) -> CheckpointStatus {
        if self.time < now {
            CheckpointStatus::Past
        } else if self.time - now < Duration::minutes(CURRENT_WINDOW_MINUTES) {
            CheckpointStatus::Current
        } else {
            CheckpointStatus::Upcoming
        }
    }

    pub fn is_generated(&self) -> bool {
        self.kind != CheckpointKind::Recorded
    }
}

/// Outcome class of a planning request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Goal still ahead and reachable in principle
    OnTrack,
    /// Current steps already meet the target
    GoalMet,
    /// The deadline is not after now; only the anchor is returned
    TargetPassed,
    /// Walking pace is zero; checkpoints are built but no metrics
    InvalidPace,
}

/// Summary pace metrics for the remaining window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Required steps per hour (rounded up)
    pub steps_per_hour: u32,
    /// Rest minutes per walking minute, two decimals
    pub rest_walk_ratio: String,
    /// Walking minutes needed per hour, two decimals
    pub minutes_walk_per_hour: String,
    /// Whether the walking time fits inside the remaining window
    pub feasible: bool,
}

/// A computed plan for the rest of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub status: PlanStatus,
    /// Deadline instant on the planning date
    pub target: DateTime<FixedOffset>,
    /// Target minus current steps (negative once exceeded)
    pub steps_left: i64,
    /// Recorded and projected checkpoints, strictly ascending in time.
    /// Samples from earlier today come first, then the anchor (or the sample
    /// recorded in now's minute), then the projection.
    pub checkpoints: Vec<Checkpoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
}

impl Plan {
    pub fn is_on_track(&self) -> bool {
        self.status == PlanStatus::OnTrack
    }

    pub fn last_checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoints.last()
    }

    /// Checkpoints produced by the projection (anchor, grid points, target)
    pub fn generated(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter().filter(|c| c.is_generated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn test_checkpoint_status_window() {
        let now = at("2024-03-10T12:00:00+00:00");
        let checkpoint = |raw| Checkpoint::new(at(raw), 0, CheckpointKind::Projected);

        assert_eq!(checkpoint("2024-03-10T11:59:00+00:00").status_at(now), CheckpointStatus::Past);
        assert_eq!(checkpoint("2024-03-10T12:00:00+00:00").status_at(now), CheckpointStatus::Current);
        assert_eq!(checkpoint("2024-03-10T12:14:00+00:00").status_at(now), CheckpointStatus::Current);
        assert_eq!(checkpoint("2024-03-10T12:15:00+00:00").status_at(now), CheckpointStatus::Upcoming);
    }

    #[test]
    fn test_plan_input_defaults_fill_missing_fields() {
        let input: PlanInput = serde_json::from_str(r#"{"current_steps": 1200}"#).unwrap();

        assert_eq!(input.target_steps, DEFAULT_TARGET_STEPS);
        assert_eq!(input.target_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(input.walking_pace, DEFAULT_WALKING_PACE);
        assert_eq!(input.checkpoint_interval, DEFAULT_CHECKPOINT_INTERVAL);
        assert_eq!(input.current_steps, 1200);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_plan_input_serializes_time_as_hhmm() {
        let json = serde_json::to_value(PlanInput::default()).unwrap();
        assert_eq!(json["target_time"], "18:00");
    }
}
