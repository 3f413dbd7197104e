//! The turn phase state machine.
//!
//! Phases advance forward only; there is no back-transition and no
//! skipping. Decisions may change only during the Decisions phase, and a
//! turn instance admits at most one in-flight resolution.

use thiserror::Error;

use sim_core::{Decision, TurnPhase, ValidationError};

/// Errors raised by illegal phase transitions.
#[derive(Debug, Error, PartialEq)]
pub enum PhaseError {
    #[error("turn {0} is complete; Feedback is terminal until a new turn begins")]
    Terminal(u32),
    #[error("resolution can only start from the Decisions phase (current: {0:?})")]
    NotAtDecisions(TurnPhase),
    #[error("a resolution is already in flight for turn {0}")]
    ResolutionInFlight(u32),
    #[error("no resolution is in flight for turn {0}")]
    NotResolving(u32),
    #[error("the next turn can only start from Feedback (current: {0:?})")]
    NotAtFeedback(TurnPhase),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One turn's live progress through the phase sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnInstance {
    turn: u32,
    phase: TurnPhase,
    decisions: Vec<Decision>,
    resolving: bool,
}

impl TurnInstance {
    /// A fresh turn starts at Dashboard (phase index 0).
    pub fn new(turn: u32) -> Self {
        Self {
            turn,
            phase: TurnPhase::Dashboard,
            decisions: Vec::new(),
            resolving: false,
        }
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Advance one phase forward. Entering and leaving Resolution go
    /// through `begin_resolution`/`complete_resolution` instead, so this
    /// only walks Dashboard → Events → Decisions.
    pub fn advance(&mut self) -> Result<TurnPhase, PhaseError> {
        match self.phase {
            TurnPhase::Dashboard | TurnPhase::Events => {
                // The sequence is total on these phases.
                if let Some(next) = self.phase.next() {
                    self.phase = next;
                }
                Ok(self.phase)
            }
            TurnPhase::Decisions => Err(PhaseError::NotAtDecisions(self.phase)),
            TurnPhase::Resolution => Err(PhaseError::ResolutionInFlight(self.turn)),
            TurnPhase::Feedback => Err(PhaseError::Terminal(self.turn)),
        }
    }

    /// Add a decision; only legal during the Decisions phase.
    pub fn add_decision(&mut self, decision: Decision) -> Result<(), PhaseError> {
        if self.phase != TurnPhase::Decisions {
            return Err(ValidationError::NotInDecisionsPhase(self.phase).into());
        }
        self.decisions.push(decision);
        Ok(())
    }

    /// Remove a decision by id; only legal during the Decisions phase.
    pub fn remove_decision(&mut self, id: &str) -> Result<bool, PhaseError> {
        if self.phase != TurnPhase::Decisions {
            return Err(ValidationError::NotInDecisionsPhase(self.phase).into());
        }
        let before = self.decisions.len();
        self.decisions.retain(|d| d.id != id);
        Ok(self.decisions.len() != before)
    }

    /// Enter Resolution. Only reachable from Decisions, and rejected while
    /// a previous resolution is still in flight.
    pub fn begin_resolution(&mut self) -> Result<(), PhaseError> {
        if self.resolving {
            return Err(PhaseError::ResolutionInFlight(self.turn));
        }
        if self.phase != TurnPhase::Decisions {
            return Err(PhaseError::NotAtDecisions(self.phase));
        }
        self.phase = TurnPhase::Resolution;
        self.resolving = true;
        Ok(())
    }

    /// Resolution finished: move to Feedback.
    pub fn complete_resolution(&mut self) -> Result<(), PhaseError> {
        if !self.resolving {
            return Err(PhaseError::NotResolving(self.turn));
        }
        self.phase = TurnPhase::Feedback;
        self.resolving = false;
        Ok(())
    }

    /// Resolution failed: return to Decisions so the player can amend and
    /// retry. The decision list is kept.
    pub fn abort_resolution(&mut self) -> Result<(), PhaseError> {
        if !self.resolving {
            return Err(PhaseError::NotResolving(self.turn));
        }
        self.phase = TurnPhase::Decisions;
        self.resolving = false;
        Ok(())
    }

    /// Begin the next turn; only legal once Feedback is reached.
    pub fn next_turn(&self) -> Result<TurnInstance, PhaseError> {
        if self.phase != TurnPhase::Feedback {
            return Err(PhaseError::NotAtFeedback(self.phase));
        }
        Ok(TurnInstance::new(self.turn + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(id: &str) -> Decision {
        Decision {
            id: id.to_string(),
            lever: "hr.hiring".to_string(),
            value: 5.0,
            product: None,
        }
    }

    #[test]
    fn phases_walk_forward_only() {
        let mut t = TurnInstance::new(1);
        assert_eq!(t.phase(), TurnPhase::Dashboard);
        assert_eq!(t.advance().unwrap(), TurnPhase::Events);
        assert_eq!(t.advance().unwrap(), TurnPhase::Decisions);
        // From Decisions the only way forward is begin_resolution.
        assert_eq!(
            t.advance().unwrap_err(),
            PhaseError::NotAtDecisions(TurnPhase::Decisions)
        );
        t.begin_resolution().unwrap();
        t.complete_resolution().unwrap();
        assert_eq!(t.phase(), TurnPhase::Feedback);
        assert_eq!(t.advance().unwrap_err(), PhaseError::Terminal(1));
    }

    #[test]
    fn decisions_only_change_in_decisions_phase() {
        let mut t = TurnInstance::new(1);
        assert!(matches!(
            t.add_decision(decision("dec:1:1")),
            Err(PhaseError::Validation(_))
        ));
        t.advance().unwrap();
        t.advance().unwrap();
        t.add_decision(decision("dec:1:1")).unwrap();
        t.add_decision(decision("dec:1:2")).unwrap();
        assert!(t.remove_decision("dec:1:1").unwrap());
        assert!(!t.remove_decision("dec:1:1").unwrap());
        assert_eq!(t.decisions().len(), 1);

        t.begin_resolution().unwrap();
        assert!(matches!(
            t.add_decision(decision("dec:1:3")),
            Err(PhaseError::Validation(_))
        ));
    }

    #[test]
    fn at_most_one_resolution_in_flight() {
        let mut t = TurnInstance::new(3);
        t.advance().unwrap();
        t.advance().unwrap();
        t.begin_resolution().unwrap();
        assert_eq!(
            t.begin_resolution().unwrap_err(),
            PhaseError::ResolutionInFlight(3)
        );
    }

    #[test]
    fn aborted_resolution_returns_to_decisions_with_decisions_kept() {
        let mut t = TurnInstance::new(1);
        t.advance().unwrap();
        t.advance().unwrap();
        t.add_decision(decision("dec:1:1")).unwrap();
        t.begin_resolution().unwrap();
        t.abort_resolution().unwrap();
        assert_eq!(t.phase(), TurnPhase::Decisions);
        assert_eq!(t.decisions().len(), 1);
        // And the machine can resolve again afterwards.
        t.begin_resolution().unwrap();
    }

    #[test]
    fn next_turn_resets_to_dashboard() {
        let mut t = TurnInstance::new(1);
        t.advance().unwrap();
        t.advance().unwrap();
        t.begin_resolution().unwrap();
        t.complete_resolution().unwrap();
        let next = t.next_turn().unwrap();
        assert_eq!(next.turn(), 2);
        assert_eq!(next.phase(), TurnPhase::Dashboard);
        assert!(next.decisions().is_empty());
    }
}
