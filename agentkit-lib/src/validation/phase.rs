//! Request lifecycle.
//!
//! ```text
//! Idle -> Preparing -> Prepared -> Signing -> Submitted -> Confirmed
//!   \________\____________\__________\__________\-> Failed
//! ```

use std::fmt;

use crate::{AgentkitError, Result};

/// Lifecycle phase of one validation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidationPhase {
    #[default]
    Idle,
    Preparing,
    Prepared,
    Signing,
    Submitted,
    Confirmed,
    Failed,
}

impl ValidationPhase {
    /// `Confirmed` and `Failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: ValidationPhase) -> bool {
        use ValidationPhase::*;
        match (self, next) {
            (from, Failed) => !from.is_terminal(),
            (Idle, Preparing)
            | (Preparing, Prepared)
            | (Prepared, Signing)
            | (Signing, Submitted)
            | (Submitted, Confirmed) => true,
            _ => false,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Prepared => "prepared",
            Self::Signing => "signing",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ValidationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the phase of a single `prepare` or `execute` call.
#[derive(Debug)]
pub(crate) struct PhaseTracker {
    phase: ValidationPhase,
}

impl PhaseTracker {
    pub(crate) fn starting_at(phase: ValidationPhase) -> Self {
        Self { phase }
    }

    pub(crate) fn phase(&self) -> ValidationPhase {
        self.phase
    }

    pub(crate) fn advance(&mut self, next: ValidationPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(AgentkitError::Internal(format!(
                "illegal phase transition {} -> {}",
                self.phase, next
            )));
        }
        tracing::debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        Ok(())
    }

    /// Moves to `Failed` unless already terminal, then hands back `err`.
    pub(crate) fn fail(&mut self, err: AgentkitError) -> AgentkitError {
        if !self.phase.is_terminal() {
            tracing::debug!(from = %self.phase, error = %err, "phase transition to failed");
            self.phase = ValidationPhase::Failed;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::ValidationPhase::*;
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let path = [Idle, Preparing, Prepared, Signing, Submitted, Confirmed];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        for phase in [Idle, Preparing, Prepared, Signing, Submitted] {
            assert!(phase.can_transition_to(Failed));
        }
        assert!(!Confirmed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn test_skipping_is_rejected() {
        assert!(!Idle.can_transition_to(Signing));
        assert!(!Prepared.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Idle));
    }

    #[test]
    fn test_tracker() {
        let mut tracker = PhaseTracker::starting_at(Idle);
        tracker.advance(Preparing).unwrap();
        assert!(tracker.advance(Confirmed).is_err());
        let err = tracker.fail(AgentkitError::MissingValidator);
        assert_eq!(err, AgentkitError::MissingValidator);
        assert_eq!(tracker.phase(), Failed);
    }
}
