//! Planner session
//!
//! Owns the user's inputs, today's sample log and the store behind it. The
//! presentation layer keeps one session and calls into it; the calculator
//! itself stays stateless.

use crate::error::PlanError;
use crate::history::{record_sample, HistoricalLog};
use crate::planner::compute_plan;
use crate::store::SampleStore;
use crate::types::{Plan, PlanInput};
use chrono::{DateTime, FixedOffset};
use tracing::info;

/// Stateful planner for a single user and day.
pub struct PlannerSession<S: SampleStore> {
    input: PlanInput,
    history: HistoricalLog,
    store: S,
}

impl<S: SampleStore> PlannerSession<S> {
    /// Open a session with default inputs
    pub fn open(store: S, now: DateTime<FixedOffset>) -> Result<Self, PlanError> {
        Self::open_with_input(store, PlanInput::default(), now)
    }

    /// Open a session, loading today's log from `store`.
    ///
    /// Current steps are restored from the latest sample when one exists. If
    /// stale or malformed entries were dropped, the store is rewritten.
    pub fn open_with_input(
        mut store: S,
        mut input: PlanInput,
        now: DateTime<FixedOffset>,
    ) -> Result<Self, PlanError> {
        let mut history = HistoricalLog::new();

        if let Some(loaded) = store.load(now.date_naive())? {
            if loaded.discarded > 0 {
                info!(
                    discarded = loaded.discarded,
                    kept = loaded.log.len(),
                    "rewriting sample log for today"
                );
                store.save(&loaded.log)?;
            }
            history = loaded.log;
        }

        if let Some(latest) = history.latest() {
            input.current_steps = latest.steps;
        }

        Ok(Self {
            input,
            history,
            store,
        })
    }

    pub fn input(&self) -> &PlanInput {
        &self.input
    }

    /// Edit inputs in place; the next [`plan`](Self::plan) call picks them up
    pub fn input_mut(&mut self) -> &mut PlanInput {
        &mut self.input
    }

    pub fn history(&self) -> &HistoricalLog {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Record the current step count at `now` and persist the log
    pub fn save_current_steps(
        &mut self,
        now: DateTime<FixedOffset>,
    ) -> Result<&HistoricalLog, PlanError> {
        let updated = record_sample(&self.history, now, self.input.current_steps);
        self.store.save(&updated)?;
        self.history = updated;
        Ok(&self.history)
    }

    /// Plan the rest of the day from the current inputs and log
    pub fn plan(&self, now: DateTime<FixedOffset>) -> Result<Plan, PlanError> {
        compute_plan(&self.input, &self.history, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{CheckpointKind, PlanStatus};

    fn at(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[test]
    fn test_session_restores_current_steps() {
        let store = MemoryStore::with_raw(
            r#"[{"date":"2024-03-10","time":"08:00","steps":900},
                {"date":"2024-03-10","time":"10:00","steps":3100}]"#,
        );

        let session = PlannerSession::open(store, at("2024-03-10T11:00:00+00:00")).unwrap();

        assert_eq!(session.input().current_steps, 3100);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_session_rewrites_stale_store() {
        let store = MemoryStore::with_raw(
            r#"[{"date":"2024-03-09","time":"20:00","steps":9900}]"#,
        );

        let session = PlannerSession::open(store, at("2024-03-10T07:00:00+00:00")).unwrap();

        assert!(session.history().is_empty());
        assert_eq!(session.input().current_steps, 0);
        assert_eq!(session.store().raw(), Some("[]"));
    }

    #[test]
    fn test_save_and_plan() {
        let mut session =
            PlannerSession::open(MemoryStore::new(), at("2024-03-10T12:00:00+00:00")).unwrap();
        session.input_mut().current_steps = 2500;

        session
            .save_current_steps(at("2024-03-10T12:00:00+00:00"))
            .unwrap();
        assert!(session.store().raw().unwrap().contains(r#""steps":2500"#));

        let plan = session.plan(at("2024-03-10T12:00:00+00:00")).unwrap();
        assert_eq!(plan.status, PlanStatus::OnTrack);
        // The saved sample collides with the anchor and wins
        assert_eq!(plan.checkpoints[0].kind, CheckpointKind::Recorded);
        assert_eq!(plan.checkpoints[0].steps, 2500);
    }

    #[test]
    fn test_save_mid_minute_does_not_duplicate_anchor() {
        let now = at("2024-03-10T12:00:30+00:00");
        let mut session = PlannerSession::open(MemoryStore::new(), now).unwrap();
        session.input_mut().current_steps = 2500;
        session.input_mut().target_time = chrono::NaiveTime::from_hms_opt(15, 0, 0).unwrap();

        session.save_current_steps(now).unwrap();
        let plan = session.plan(now).unwrap();

        assert_eq!(plan.checkpoints[0].time, at("2024-03-10T12:00:00+00:00"));
        assert_eq!(plan.checkpoints[0].kind, CheckpointKind::Recorded);
        assert_eq!(plan.checkpoints[1].time, at("2024-03-10T13:00:00+00:00"));
        assert_eq!(plan.checkpoints[1].kind, CheckpointKind::Projected);
        assert_eq!(
            plan.checkpoints
                .iter()
                .filter(|c| c.steps == 2500)
                .count(),
            1
        );
    }
}
