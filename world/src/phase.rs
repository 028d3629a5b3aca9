//! Planning, execution and waiting cycle with the per-team completion cache.

use skirmish_core::{Phase, RejectionReason, Team, TEAM_COUNT};

#[derive(Clone, Debug)]
pub(crate) struct PhaseTracker {
    phase: Phase,
    completed: [bool; TEAM_COUNT],
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Planning,
            completed: [false; TEAM_COUNT],
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Validates and performs an external phase request.
    ///
    /// Returns `Ok(false)` when the world is already in the requested phase.
    /// Execution may only start from planning; waiting is entered by the
    /// world alone.
    pub(crate) fn request(&mut self, phase: Phase) -> Result<bool, RejectionReason> {
        if phase == self.phase {
            return Ok(false);
        }
        match phase {
            Phase::Waiting => Err(RejectionReason::PhaseNotRequestable),
            Phase::Executing if self.phase != Phase::Planning => {
                Err(RejectionReason::PhaseLocked(self.phase))
            }
            Phase::Executing => {
                self.completed = [false; TEAM_COUNT];
                self.phase = Phase::Executing;
                Ok(true)
            }
            Phase::Planning => {
                self.phase = Phase::Planning;
                Ok(true)
            }
        }
    }

    /// Records that the team is complete. Returns `true` only the first time
    /// in the current execution phase.
    pub(crate) fn mark_team_complete(&mut self, team: Team) -> bool {
        let slot = &mut self.completed[team.index()];
        let first = !*slot;
        *slot = true;
        first
    }

    pub(crate) fn enter_waiting(&mut self) {
        self.phase = Phase::Waiting;
    }
}
