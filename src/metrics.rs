//! Pace metrics
//!
//! Required pace, rest-to-walk ratio and walking minutes per hour for the
//! window between now and the deadline.

use crate::types::Metrics;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Constant hourly rate that reaches the goal exactly at the deadline.
///
/// Rounded up so the plan never undershoots; clamped at zero once the goal is
/// met. `time_left_hours` must be positive.
pub fn required_steps_per_hour(steps_left: i64, time_left_hours: f64) -> u32 {
    let rate = (steps_left as f64 / time_left_hours).ceil();
    if rate.is_nan() || rate <= 0.0 {
        0
    } else {
        rate.min(f64::from(u32::MAX)) as u32
    }
}

/// Metrics for a goal that is still ahead. `steps_left` and `walking_pace`
/// must both be positive.
pub fn remaining_metrics(
    steps_left: i64,
    time_left_hours: f64,
    walking_pace: u32,
    steps_per_hour: u32,
) -> Metrics {
    let total_minutes = time_left_hours * MINUTES_PER_HOUR;
    let walking_minutes = steps_left as f64 / f64::from(walking_pace);
    let rest_minutes = total_minutes - walking_minutes;

    Metrics {
        steps_per_hour,
        rest_walk_ratio: format_ratio(rest_minutes / walking_minutes),
        minutes_walk_per_hour: format_ratio(walking_minutes / time_left_hours),
        feasible: rest_minutes >= 0.0,
    }
}

/// Metrics once the goal is already met: no pace, no walking
pub fn goal_met_metrics() -> Metrics {
    Metrics {
        steps_per_hour: 0,
        rest_walk_ratio: format_ratio(0.0),
        minutes_walk_per_hour: format_ratio(0.0),
        feasible: true,
    }
}

fn format_ratio(value: f64) -> String {
    format!("{value:.2}")
}
