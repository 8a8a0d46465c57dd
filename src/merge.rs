//! Merging recorded samples into the projected schedule

use crate::clock;
use crate::error::PlanError;
use crate::history::HistoricalLog;
use crate::types::{Checkpoint, CheckpointKind};
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;

/// Place today's samples on `now`'s date and merge them with the generated
/// checkpoints. The result is strictly ascending; on a timestamp collision the
/// recorded sample is kept.
///
/// Samples have minute precision, so a sample taken in `now`'s minute
/// collides with the anchor and replaces it.
pub(crate) fn merge_with_history(
    mut generated: Vec<Checkpoint>,
    history: &HistoricalLog,
    now: &DateTime<FixedOffset>,
) -> Result<Vec<Checkpoint>, PlanError> {
    let recorded = recorded_checkpoints(history, now)?;

    let anchor_minute = clock::truncate_to_minute(*now);
    if recorded.iter().any(|c| c.time == anchor_minute) {
        generated.retain(|c| c.kind != CheckpointKind::Anchor);
    }

    Ok(merge_sorted(recorded, generated))
}

/// Samples as checkpoints, sorted, one per timestamp.
///
/// The first logged sample starts the day's series. A later-logged sample
/// whose clock time falls before it was taken after midnight and is rolled
/// forward a day. Samples logged out of clock order (a replayed day) are
/// rolled forward the same way.
fn recorded_checkpoints(
    history: &HistoricalLog,
    now: &DateTime<FixedOffset>,
) -> Result<Vec<Checkpoint>, PlanError> {
    let mut recorded = history
        .iter()
        .map(|sample| {
            clock::at_time_of_day(now, sample.time)
                .map(|time| Checkpoint::new(time, sample.steps, CheckpointKind::Recorded))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(start) = recorded.first().map(|c| c.time) {
        for checkpoint in recorded.iter_mut().filter(|c| c.time < start) {
            checkpoint.time = clock::roll_forward_day(checkpoint.time);
        }
    }

    // Stable sort: among equal timestamps the later-logged reading wins
    recorded.sort_by_key(|c| c.time);
    let mut deduped: Vec<Checkpoint> = Vec::with_capacity(recorded.len());
    for checkpoint in recorded {
        match deduped.last_mut() {
            Some(last) if last.time == checkpoint.time => *last = checkpoint,
            _ => deduped.push(checkpoint),
        }
    }
    Ok(deduped)
}

/// Merge two strictly ascending sequences, preferring `recorded` on ties
fn merge_sorted(recorded: Vec<Checkpoint>, generated: Vec<Checkpoint>) -> Vec<Checkpoint> {
    let mut merged = Vec::with_capacity(recorded.len() + generated.len());
    let mut recorded = recorded.into_iter().peekable();
    let mut generated = generated.into_iter().peekable();

    loop {
        let order = match (recorded.peek(), generated.peek()) {
            (Some(r), Some(g)) => r.time.cmp(&g.time),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => merged.extend(recorded.next()),
            Ordering::Greater => merged.extend(generated.next()),
            Ordering::Equal => {
                generated.next();
                merged.extend(recorded.next());
            }
        }
    }

    merged
}
