//! Per-engine workflow tracking
//!
//! ```text
//! Idle ──begin──▶ AwaitingResponse ──finish──▶ Success | Aborted | TimedOut
//!   ▲                                                   │
//!   └──────────────────── take_outcome ─────────────────┘
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Workflow lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingResponse,
    Success,
    Aborted,
    TimedOut,
}

impl WorkflowState {
    pub fn is_in_flight(&self) -> bool {
        *self == WorkflowState::AwaitingResponse
    }

    /// Success, Aborted or TimedOut
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            WorkflowState::Success | WorkflowState::Aborted | WorkflowState::TimedOut
        )
    }
}

/// At most one workflow in flight
#[derive(Debug, Clone, Copy, Default)]
pub struct Workflow {
    state: WorkflowState,
}

impl Workflow {
    pub const fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    /// Enter `AwaitingResponse`; false if a workflow is already in flight
    ///
    /// An unconsumed outcome is discarded.
    pub fn begin(&mut self) -> bool {
        if self.state.is_in_flight() {
            return false;
        }
        self.state = WorkflowState::AwaitingResponse;
        true
    }

    /// Resolve the workflow in flight; ignored otherwise
    pub fn finish(&mut self, outcome: WorkflowState) {
        if self.state.is_in_flight() && outcome.is_resolved() {
            self.state = outcome;
        }
    }

    /// Consume a resolved outcome, returning to `Idle`
    pub fn take_outcome(&mut self) -> Option<WorkflowState> {
        if self.state.is_resolved() {
            Some(core::mem::replace(&mut self.state, WorkflowState::Idle))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut workflow = Workflow::new();
        assert!(workflow.begin());
        assert!(!workflow.begin());
        assert_eq!(workflow.take_outcome(), None);

        workflow.finish(WorkflowState::TimedOut);
        assert_eq!(workflow.state(), WorkflowState::TimedOut);
        assert_eq!(workflow.take_outcome(), Some(WorkflowState::TimedOut));
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[test]
    fn test_finish_requires_flight() {
        let mut workflow = Workflow::new();
        workflow.finish(WorkflowState::Success);
        assert_eq!(workflow.state(), WorkflowState::Idle);

        workflow.begin();
        workflow.finish(WorkflowState::Idle);
        assert!(workflow.is_in_flight());
        workflow.finish(WorkflowState::Aborted);
        workflow.finish(WorkflowState::Success);
        assert_eq!(workflow.state(), WorkflowState::Aborted);
    }

    #[test]
    fn test_begin_discards_stale_outcome() {
        let mut workflow = Workflow::new();
        workflow.begin();
        workflow.finish(WorkflowState::Success);
        assert!(workflow.begin());
        assert_eq!(workflow.take_outcome(), None);
    }
}
