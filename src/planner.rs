//! Checkpoint planning
//!
//! This module provides the planning entry point. It turns the user's inputs
//! and today's sample log into a checkpoint schedule and pace metrics.
//!
//! Planning stages:
//! 1. Deadline - compose the target time onto today's date
//! 2. Pace - constant hourly rate needed to reach the goal at the deadline
//! 3. Projection - anchor, grid checkpoints, explicit target point
//! 4. Merge - fold in recorded samples, one checkpoint per timestamp
//! 5. Metrics - rest-to-walk ratio and walking minutes per hour

use crate::clock;
use crate::error::PlanError;
use crate::history::HistoricalLog;
use crate::merge::merge_with_history;
use crate::metrics::{goal_met_metrics, remaining_metrics, required_steps_per_hour};
use crate::types::{Checkpoint, CheckpointKind, Plan, PlanInput, PlanStatus};
use chrono::{DateTime, Duration, FixedOffset};
use tracing::debug;

/// Compute the plan for the rest of the day.
///
/// # Arguments
/// * `input` - Planning parameters
/// * `history` - Today's recorded samples
/// * `now` - The current instant; its date and offset define "today"
///
/// # Returns
/// A [`Plan`] whose status tells degenerate inputs apart. `Err` is reserved for
/// inputs that cannot be planned at all (zero target or zero interval).
///
/// # Example
/// ```ignore
/// let plan = compute_plan(&PlanInput::default(), &HistoricalLog::new(), now)?;
/// ```
pub fn compute_plan(
    input: &PlanInput,
    history: &HistoricalLog,
    now: DateTime<FixedOffset>,
) -> Result<Plan, PlanError> {
    input.validate()?;

    // Stage 1: Deadline on today's date
    let target = clock::at_time_of_day(&now, input.target_time)?;
    let time_left_hours = clock::hours_between(now, target);
    let steps_left = i64::from(input.target_steps) - i64::from(input.current_steps);

    if time_left_hours <= 0.0 {
        debug!(%target, %now, "target time has passed; returning anchor only");
        return Ok(Plan {
            status: PlanStatus::TargetPassed,
            target,
            steps_left,
            checkpoints: vec![Checkpoint::new(
                now,
                input.current_steps,
                CheckpointKind::Anchor,
            )],
            metrics: None,
        });
    }

    // Stage 2: Required pace
    let steps_per_hour = required_steps_per_hour(steps_left, time_left_hours);

    // Stage 3: Projected schedule
    let generated = project_checkpoints(input, now, target, steps_per_hour);

    // Stage 4: Merge recorded samples
    let checkpoints = merge_with_history(generated, history, &now)?;

    // Stage 5: Metrics
    let (status, metrics) = if steps_left <= 0 {
        (PlanStatus::GoalMet, Some(goal_met_metrics()))
    } else if input.walking_pace == 0 {
        (PlanStatus::InvalidPace, None)
    } else {
        let metrics = remaining_metrics(
            steps_left,
            time_left_hours,
            input.walking_pace,
            steps_per_hour,
        );
        (PlanStatus::OnTrack, Some(metrics))
    };

    debug!(
        ?status,
        steps_left,
        steps_per_hour,
        checkpoints = checkpoints.len(),
        recorded = history.len(),
        "computed step plan"
    );

    Ok(Plan {
        status,
        target,
        steps_left,
        checkpoints,
        metrics,
    })
}

/// Anchor, grid checkpoints up to the deadline, and the deadline itself.
///
/// Projected steps are capped at the goal and never fall below the anchor, so
/// a goal already exceeded stays flat at the current count.
fn project_checkpoints(
    input: &PlanInput,
    now: DateTime<FixedOffset>,
    target: DateTime<FixedOffset>,
    steps_per_hour: u32,
) -> Vec<Checkpoint> {
    let interval = Duration::minutes(i64::from(input.checkpoint_interval));
    let final_steps = input.target_steps.max(input.current_steps);

    let mut checkpoints = vec![Checkpoint::new(
        now,
        input.current_steps,
        CheckpointKind::Anchor,
    )];

    let mut at = clock::next_grid_point(now, input.checkpoint_interval);
    while at <= target {
        let checkpoint = if at == target {
            Checkpoint::new(at, final_steps, CheckpointKind::Target)
        } else {
            let hours_passed = clock::hours_between(now, at);
            let steps = projected_steps(input, hours_passed, steps_per_hour);
            Checkpoint::new(at, steps, CheckpointKind::Projected)
        };
        checkpoints.push(checkpoint);
        at += interval;
    }

    if checkpoints.last().map(|c| c.time) != Some(target) {
        checkpoints.push(Checkpoint::new(target, final_steps, CheckpointKind::Target));
    }

    checkpoints
}

fn projected_steps(input: &PlanInput, hours_passed: f64, steps_per_hour: u32) -> u32 {
    let gained = (hours_passed * f64::from(steps_per_hour)).ceil();
    let projected = (f64::from(input.current_steps) + gained).min(f64::from(input.target_steps));
    (projected as u32).max(input.current_steps)
}
