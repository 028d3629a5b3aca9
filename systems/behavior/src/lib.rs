#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-character behaviour state machine.
//!
//! States are plain [`CharacterState`] tags. Every hook is a pure function of
//! the state and a [`BehaviorSnapshot`] of the character, returning
//! [`Effect`] values the world applies afterwards. The machine never touches
//! the character directly.

use std::time::Duration;

use skirmish_core::{CharacterState, ChunkCoord};

/// States checked before anything else every tick. Combat and flee
/// behaviours slot in here.
pub const INTERRUPT_STATES: &[CharacterState] = &[];

/// States considered while the character stands in its unfinished mission chunk.
pub const MISSION_STATES: &[CharacterState] = &[
    CharacterState::ArrivedAtMissionChunk,
    CharacterState::MissionComplete,
];

/// States considered everywhere else.
pub const TRAVEL_STATES: &[CharacterState] = &[CharacterState::Idle, CharacterState::Travel];

/// Character fields the state machine reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BehaviorSnapshot {
    /// Chunk containing the character's tile.
    pub current_chunk: ChunkCoord,
    /// Chunk the character spawned in.
    pub base_chunk: ChunkCoord,
    /// Chunk the character is heading for, if any.
    pub target_chunk: Option<ChunkCoord>,
    /// Whether the current mission has been carried out.
    pub mission_complete: bool,
    /// Whether the mission chunk has been scanned on arrival.
    pub chunk_scanned: bool,
}

impl BehaviorSnapshot {
    /// Reports whether the character is resting at base with nothing to do.
    #[must_use]
    pub fn is_idle_at_base(&self) -> bool {
        self.current_chunk == self.base_chunk
            && self.target_chunk.is_none()
            && self.mission_complete
    }

    /// Chunk travel should head for: home once the mission is done.
    #[must_use]
    pub fn destination_chunk(&self) -> Option<ChunkCoord> {
        if self.mission_complete {
            Some(self.base_chunk)
        } else {
            self.target_chunk
        }
    }

    fn in_unfinished_mission_chunk(&self) -> bool {
        self.target_chunk == Some(self.current_chunk) && !self.mission_complete
    }

    /// Mirrors the flag-changing effects so later hooks in the same step see them.
    pub fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ClearTarget => self.target_chunk = None,
            Effect::MarkMissionComplete => self.mission_complete = true,
            Effect::RedirectHome => self.target_chunk = Some(self.base_chunk),
            Effect::ScanMissionChunk => self.chunk_scanned = true,
            Effect::PlanPath { .. } | Effect::StopTravel | Effect::Advance { .. } => {}
        }
    }
}

/// Side effects requested by the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Forget the target chunk.
    ClearTarget,
    /// Flag the mission as carried out.
    MarkMissionComplete,
    /// Point the target chunk back at the base.
    RedirectHome,
    /// Scan the whole mission chunk for coins and enemies.
    ScanMissionChunk,
    /// Compute a fresh path to the centre of `destination`.
    PlanPath {
        /// Chunk whose centre is the goal.
        destination: ChunkCoord,
    },
    /// Drop the remaining path.
    StopTravel,
    /// Accumulate `dt` of movement toward `destination`.
    Advance {
        /// Chunk whose centre is the goal.
        destination: ChunkCoord,
        /// Simulated time to spend walking.
        dt: Duration,
    },
}

/// Hooks every behaviour state provides.
pub trait StateLogic {
    /// Entry guard: whether the state may be selected for the snapshot.
    fn is_valid(&self, snapshot: &BehaviorSnapshot) -> bool;
    /// Effects performed once when the state is entered.
    fn on_enter(&self, snapshot: &BehaviorSnapshot) -> Vec<Effect>;
    /// Effects performed every tick while the state is current.
    fn run(&self, snapshot: &BehaviorSnapshot, dt: Duration) -> Vec<Effect>;
    /// Effects performed once when the state is left.
    fn on_exit(&self, snapshot: &BehaviorSnapshot) -> Vec<Effect>;
}

impl StateLogic for CharacterState {
    fn is_valid(&self, snapshot: &BehaviorSnapshot) -> bool {
        match self {
            Self::Idle => snapshot.current_chunk == snapshot.base_chunk && snapshot.mission_complete,
            Self::Travel => snapshot
                .target_chunk
                .is_some_and(|target| target != snapshot.current_chunk),
            Self::ArrivedAtMissionChunk => {
                snapshot.in_unfinished_mission_chunk()
                    && snapshot.target_chunk != Some(snapshot.base_chunk)
                    && !snapshot.chunk_scanned
            }
            Self::MissionComplete => snapshot.in_unfinished_mission_chunk(),
        }
    }

    fn on_enter(&self, snapshot: &BehaviorSnapshot) -> Vec<Effect> {
        match self {
            Self::Idle => vec![Effect::ClearTarget, Effect::MarkMissionComplete],
            Self::Travel => snapshot
                .destination_chunk()
                .map(|destination| vec![Effect::PlanPath { destination }])
                .unwrap_or_default(),
            Self::ArrivedAtMissionChunk => vec![Effect::ScanMissionChunk],
            Self::MissionComplete => vec![Effect::MarkMissionComplete, Effect::RedirectHome],
        }
    }

    fn run(&self, snapshot: &BehaviorSnapshot, dt: Duration) -> Vec<Effect> {
        match self {
            Self::Travel => snapshot
                .destination_chunk()
                .map(|destination| vec![Effect::Advance { destination, dt }])
                .unwrap_or_default(),
            Self::Idle | Self::ArrivedAtMissionChunk | Self::MissionComplete => Vec::new(),
        }
    }

    fn on_exit(&self, _snapshot: &BehaviorSnapshot) -> Vec<Effect> {
        match self {
            Self::Travel => vec![Effect::StopTravel],
            Self::Idle | Self::ArrivedAtMissionChunk | Self::MissionComplete => Vec::new(),
        }
    }
}

/// Picks the state for this tick.
///
/// Interrupts win, then the list matching the character's context. When no
/// state accepts the snapshot the current state is kept.
#[must_use]
pub fn select(current: CharacterState, snapshot: &BehaviorSnapshot) -> CharacterState {
    let context = if snapshot.in_unfinished_mission_chunk() {
        MISSION_STATES
    } else {
        TRAVEL_STATES
    };

    INTERRUPT_STATES
        .iter()
        .chain(context)
        .copied()
        .find(|state| state.is_valid(snapshot))
        .unwrap_or(current)
}

/// Outcome of one machine step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// State current before the step.
    pub from: CharacterState,
    /// State current after the step.
    pub to: CharacterState,
    /// Effects in the order they must be applied.
    pub effects: Vec<Effect>,
    /// Snapshot with the flag effects already folded in.
    pub snapshot: BehaviorSnapshot,
}

impl Transition {
    /// Reports whether the step changed state.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Runs one tick of the machine: select, exit/enter on change, then run.
#[must_use]
pub fn step(current: CharacterState, snapshot: &BehaviorSnapshot, dt: Duration) -> Transition {
    let mut snapshot = *snapshot;
    let next = select(current, &snapshot);
    let mut effects = Vec::new();

    if next != current {
        let exit = current.on_exit(&snapshot);
        collect(&mut effects, &mut snapshot, exit);
        let enter = next.on_enter(&snapshot);
        collect(&mut effects, &mut snapshot, enter);
    }
    let run = next.run(&snapshot, dt);
    collect(&mut effects, &mut snapshot, run);

    Transition {
        from: current,
        to: next,
        effects,
        snapshot,
    }
}

fn collect(out: &mut Vec<Effect>, snapshot: &mut BehaviorSnapshot, effects: Vec<Effect>) {
    for effect in effects {
        snapshot.apply(&effect);
        out.push(effect);
    }
}
