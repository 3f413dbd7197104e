//! Campaign sessions: the stateful wrapper around the pure pipeline.
//!
//! A session owns the current snapshot, the live turn instance, and the
//! store handle. Ordering is apply-before-persist: the pipeline must
//! succeed before anything reaches the store, and the store must accept
//! the record before the session adopts the new state. The append-only
//! store is what makes two racing resolutions of the same turn safe — the
//! slower one fails instead of overwriting.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use persistence::{StateStore, StoreError, TurnRecord};
use sim_core::{
    validate_decision, Decision, Difficulty, EngineConfig, GameEvent, GameSpeed, ProductLine,
    TurnPhase, TurnState, ValidationError, ENGINE_VERSION,
};
use sim_effects::{compensation_option, CompensationError, CompensationOption};

use crate::feedback::TurnFeedback;
use crate::phase::{PhaseError, TurnInstance};
use crate::resolve::{resolve_turn, ResolveError, ResolveInput};

/// Errors surfaced by the session layer. Each carries a stable,
/// machine-readable kind for the orchestration above.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Compensation(#[from] CompensationError),
    #[error("events can only be provided during the Events phase (current: {0:?})")]
    NotInEventsPhase(TurnPhase),
    #[error("engine version mismatch: session stored with {stored}, running {running}")]
    EngineVersionMismatch { stored: String, running: String },
}

/// One player campaign bound to a store.
#[derive(Debug)]
pub struct Session<S: StateStore> {
    id: String,
    engine_version: String,
    seed: u64,
    speed: GameSpeed,
    difficulty: Difficulty,
    config: EngineConfig,
    store: S,
    state: TurnState,
    turn: TurnInstance,
    events: Vec<GameEvent>,
    compensations: Vec<String>,
    last_feedback: Option<TurnFeedback>,
}

impl<S: StateStore> Session<S> {
    /// Start a fresh campaign at turn 1 from the documented defaults.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: &str,
        seed: u64,
        speed: GameSpeed,
        difficulty: Difficulty,
        start_date: NaiveDate,
        products: Vec<ProductLine>,
        budget: Decimal,
        config: EngineConfig,
        store: S,
    ) -> Self {
        info!(session = id, seed, "campaign started");
        Self {
            id: id.to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            seed,
            speed,
            difficulty,
            config,
            store,
            state: TurnState::campaign_start(start_date, products, budget),
            turn: TurnInstance::new(1),
            events: Vec::new(),
            compensations: Vec::new(),
            last_feedback: None,
        }
    }

    /// Resume a campaign from its last stored turn.
    ///
    /// Fails with `StateNotFound` when no prior state exists (the caller
    /// decides whether to fall back to a fresh campaign — the engine never
    /// guesses), and with `EngineVersionMismatch` when the stored history
    /// was produced by a different engine version: recalculating it here
    /// would yield a non-comparable history, so this is always fatal.
    #[allow(clippy::too_many_arguments)]
    pub fn resume(
        id: &str,
        seed: u64,
        speed: GameSpeed,
        difficulty: Difficulty,
        config: EngineConfig,
        store: S,
    ) -> Result<Self, SessionError> {
        let last = store.last_turn(id).ok_or_else(|| StoreError::NotFound {
            session: id.to_string(),
            turn: 1,
        })?;
        let record = store.load(id, last)?;
        if record.engine_version != ENGINE_VERSION {
            warn!(
                session = id,
                stored = %record.engine_version,
                running = ENGINE_VERSION,
                "refusing to resume across engine versions"
            );
            return Err(SessionError::EngineVersionMismatch {
                stored: record.engine_version,
                running: ENGINE_VERSION.to_string(),
            });
        }
        let next_turn = record.state.turn + 1;
        info!(session = id, turn = next_turn, "campaign resumed");
        Ok(Self {
            id: id.to_string(),
            engine_version: record.engine_version,
            seed,
            speed,
            difficulty,
            config,
            store,
            state: record.state,
            turn: TurnInstance::new(next_turn),
            events: Vec::new(),
            compensations: Vec::new(),
            last_feedback: None,
        })
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.turn.phase()
    }

    pub fn turn_number(&self) -> u32 {
        self.turn.turn()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_feedback(&self) -> Option<&TurnFeedback> {
        self.last_feedback.as_ref()
    }

    /// Advance Dashboard → Events → Decisions.
    pub fn advance_phase(&mut self) -> Result<TurnPhase, SessionError> {
        Ok(self.turn.advance()?)
    }

    /// Provide this turn's external events; Events phase only.
    pub fn set_events(&mut self, events: Vec<GameEvent>) -> Result<(), SessionError> {
        if self.turn.phase() != TurnPhase::Events {
            return Err(SessionError::NotInEventsPhase(self.turn.phase()));
        }
        self.events = events;
        Ok(())
    }

    /// Submit a decision; Decisions phase only, validated before queueing.
    pub fn submit_decision(&mut self, decision: Decision) -> Result<(), SessionError> {
        validate_decision(&decision, &self.config, &self.state)?;
        self.turn.add_decision(decision)?;
        Ok(())
    }

    /// Withdraw a queued decision by id; Decisions phase only.
    pub fn withdraw_decision(&mut self, id: &str) -> Result<bool, SessionError> {
        Ok(self.turn.remove_decision(id)?)
    }

    /// Price the reversal of every applied effect at the turn being
    /// resolved. Non-viable options are included, marked as such.
    pub fn compensation_options(&self) -> Vec<CompensationOption> {
        let at_turn = self.state.turn + 1;
        self.state
            .queue
            .applied
            .iter()
            .map(|e| compensation_option(e, at_turn, &self.config.constants))
            .collect()
    }

    /// Schedule a compensation for this turn's resolution; Decisions phase
    /// only, and refused when the effect is no longer viable.
    pub fn schedule_compensation(&mut self, effect_id: &str) -> Result<(), SessionError> {
        if self.turn.phase() != TurnPhase::Decisions {
            return Err(ValidationError::NotInDecisionsPhase(self.turn.phase()).into());
        }
        let at_turn = self.state.turn + 1;
        let effect = self
            .state
            .queue
            .find_applied(effect_id)
            .ok_or_else(|| CompensationError::UnknownEffect(effect_id.to_string()))?;
        let option = compensation_option(effect, at_turn, &self.config.constants);
        if !option.viable {
            return Err(CompensationError::NotViable {
                effect: effect_id.to_string(),
                status: option.status,
            }
            .into());
        }
        self.compensations.push(effect_id.to_string());
        Ok(())
    }

    /// Resolve the current turn: run the pipeline, persist the snapshot,
    /// then adopt it. On any failure the session drops back to the
    /// Decisions phase with its decisions intact and the prior state
    /// untouched.
    pub fn resolve(&mut self) -> Result<TurnFeedback, SessionError> {
        if self.engine_version != ENGINE_VERSION {
            return Err(SessionError::EngineVersionMismatch {
                stored: self.engine_version.clone(),
                running: ENGINE_VERSION.to_string(),
            });
        }
        self.turn.begin_resolution()?;

        let input = ResolveInput {
            state: &self.state,
            decisions: self.turn.decisions(),
            events: &self.events,
            compensations: &self.compensations,
            config: &self.config,
            speed: self.speed,
            difficulty: self.difficulty,
            seed: self.seed,
        };
        let outcome = match resolve_turn(input) {
            Ok(outcome) => outcome,
            Err(e) => {
                let _ = self.turn.abort_resolution();
                return Err(e.into());
            }
        };

        let record = match TurnRecord::seal(&self.id, ENGINE_VERSION, outcome.state.clone()) {
            Ok(record) => record,
            Err(e) => {
                let _ = self.turn.abort_resolution();
                return Err(e.into());
            }
        };
        if let Err(e) = self.store.append(record) {
            let _ = self.turn.abort_resolution();
            return Err(e.into());
        }

        self.state = outcome.state;
        self.turn.complete_resolution()?;
        self.compensations.clear();
        self.last_feedback = Some(outcome.feedback.clone());
        Ok(outcome.feedback)
    }

    /// Move on to the next turn once Feedback has been reached.
    pub fn next_turn(&mut self) -> Result<u32, SessionError> {
        self.turn = self.turn.next_turn()?;
        self.events.clear();
        self.compensations.clear();
        Ok(self.turn.turn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::MemoryStore;
    use sim_core::IndexId;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Test-only store handle so two sessions can race on one store.
    #[derive(Clone, Default, Debug)]
    struct SharedStore(Rc<RefCell<MemoryStore>>);

    impl StateStore for SharedStore {
        fn append(&mut self, record: TurnRecord) -> Result<(), StoreError> {
            self.0.borrow_mut().append(record)
        }
        fn load(&self, session: &str, turn: u32) -> Result<TurnRecord, StoreError> {
            self.0.borrow().load(session, turn)
        }
        fn last_turn(&self, session: &str) -> Option<u32> {
            self.0.borrow().last_turn(session)
        }
    }

    fn session(store: SharedStore) -> Session<SharedStore> {
        Session::new(
            "s1",
            42,
            GameSpeed::Medium,
            Difficulty::Normal,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            vec![ProductLine::new("auto", "Auto")],
            Decimal::new(2_000_000, 0),
            EngineConfig::default(),
            store,
        )
    }

    fn to_decisions(s: &mut Session<SharedStore>) {
        s.advance_phase().unwrap();
        s.advance_phase().unwrap();
    }

    #[test]
    fn full_turn_cycle_persists_and_advances() {
        let mut s = session(SharedStore::default());
        assert_eq!(s.phase(), TurnPhase::Dashboard);
        to_decisions(&mut s);
        s.submit_decision(Decision {
            id: "dec:1:1".to_string(),
            lever: "hr.hiring".to_string(),
            value: 10.0,
            product: None,
        })
        .unwrap();

        let feedback = s.resolve().unwrap();
        assert_eq!(feedback.turn, 1);
        assert_eq!(feedback.summary.decisions_applied, 1);
        assert_eq!(s.phase(), TurnPhase::Feedback);
        assert_eq!(s.state().turn, 1);
        assert_eq!(s.store().last_turn("s1"), Some(1));

        assert_eq!(s.next_turn().unwrap(), 2);
        assert_eq!(s.phase(), TurnPhase::Dashboard);
        to_decisions(&mut s);
        s.resolve().unwrap();
        assert_eq!(s.store().last_turn("s1"), Some(2));
    }

    #[test]
    fn racing_resolutions_cannot_both_persist_the_same_turn() {
        let store = SharedStore::default();
        let mut a = session(store.clone());
        let mut b = session(store);

        to_decisions(&mut a);
        to_decisions(&mut b);
        a.resolve().unwrap();

        // The second writer loses at the store boundary and keeps its
        // prior state.
        let err = b.resolve().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(StoreError::AlreadyExists { turn: 1, .. })
        ));
        assert_eq!(b.state().turn, 0);
        assert_eq!(b.phase(), TurnPhase::Decisions);
    }

    #[test]
    fn decisions_rejected_outside_decisions_phase() {
        let mut s = session(SharedStore::default());
        let err = s
            .submit_decision(Decision {
                id: "dec:1:1".to_string(),
                lever: "hr.hiring".to_string(),
                value: 5.0,
                product: None,
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Phase(_)));
    }

    #[test]
    fn events_only_during_events_phase() {
        let mut s = session(SharedStore::default());
        assert!(matches!(
            s.set_events(vec![]),
            Err(SessionError::NotInEventsPhase(TurnPhase::Dashboard))
        ));
        s.advance_phase().unwrap();
        s.set_events(vec![]).unwrap();
    }

    #[test]
    fn resume_restores_the_last_stored_state() {
        let store = SharedStore::default();
        let mut s = session(store.clone());
        to_decisions(&mut s);
        s.resolve().unwrap();
        let iac = s.state().indices.get(IndexId::CommercialAttractiveness);

        let resumed = Session::resume(
            "s1",
            42,
            GameSpeed::Medium,
            Difficulty::Normal,
            EngineConfig::default(),
            store,
        )
        .unwrap();
        assert_eq!(resumed.state().turn, 1);
        assert_eq!(resumed.turn_number(), 2);
        assert_eq!(
            resumed.state().indices.get(IndexId::CommercialAttractiveness),
            iac
        );
    }

    #[test]
    fn resume_without_history_is_not_found() {
        let err = Session::resume(
            "ghost",
            42,
            GameSpeed::Medium,
            Difficulty::Normal,
            EngineConfig::default(),
            SharedStore::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Store(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn resume_across_engine_versions_is_fatal() {
        let store = SharedStore::default();
        {
            let mut handle = store.clone();
            let state = TurnState::campaign_start(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                vec![ProductLine::new("auto", "Auto")],
                Decimal::new(2_000_000, 0),
            );
            let mut state = state;
            state.turn = 1;
            let record = TurnRecord::seal("s1", "0.0.1-legacy", state).unwrap();
            handle.append(record).unwrap();
        }
        let err = Session::resume(
            "s1",
            42,
            GameSpeed::Medium,
            Difficulty::Normal,
            EngineConfig::default(),
            store,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::EngineVersionMismatch { .. }));
    }

    #[test]
    fn failed_resolution_leaves_state_and_decisions_intact() {
        let mut s = session(SharedStore::default());
        to_decisions(&mut s);
        // Bypass submit-time validation to force a pipeline failure.
        s.turn
            .add_decision(Decision {
                id: "dec:1:1".to_string(),
                lever: "hr.mystery".to_string(),
                value: 1.0,
                product: None,
            })
            .unwrap();
        let err = s.resolve().unwrap_err();
        assert!(matches!(err, SessionError::Resolve(_)));
        assert_eq!(s.phase(), TurnPhase::Decisions);
        assert_eq!(s.state().turn, 0);
        assert_eq!(s.store().last_turn("s1"), None);
        // The offending decision can be withdrawn and the turn retried.
        assert!(s.withdraw_decision("dec:1:1").unwrap());
        s.resolve().unwrap();
    }
}
