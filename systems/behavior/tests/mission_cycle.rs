use std::time::Duration;

use skirmish_core::{CharacterState, ChunkCoord};
use skirmish_system_behavior::{step, BehaviorSnapshot, Effect};

const BASE: ChunkCoord = ChunkCoord::new(0, 0);
const MISSION: ChunkCoord = ChunkCoord::new(2, 1);
const TICK: Duration = Duration::from_millis(250);

/// Stand-in for the world: walks one chunk per `Advance` along x, then y.
fn walk_one_chunk(current: ChunkCoord, destination: ChunkCoord) -> ChunkCoord {
    if current.x() != destination.x() {
        ChunkCoord::new(current.x() + (destination.x() - current.x()).signum(), current.y())
    } else {
        ChunkCoord::new(current.x(), current.y() + (destination.y() - current.y()).signum())
    }
}

#[test]
fn mission_cycle_visits_expected_states() {
    let mut state = CharacterState::Idle;
    let mut snapshot = BehaviorSnapshot {
        current_chunk: BASE,
        base_chunk: BASE,
        target_chunk: None,
        mission_complete: true,
        chunk_scanned: false,
    };
    assert!(snapshot.is_idle_at_base());

    snapshot.target_chunk = Some(MISSION);
    snapshot.mission_complete = false;

    let mut visited = vec![state];
    let mut completion_flips = 0;
    let mut plans = 0;

    for _ in 0..64 {
        let before = snapshot.mission_complete;
        let transition = step(state, &snapshot, TICK);
        snapshot = transition.snapshot;
        state = transition.to;
        if transition.changed() {
            visited.push(state);
        }
        if !before && snapshot.mission_complete {
            completion_flips += 1;
        }

        for effect in transition.effects {
            match effect {
                Effect::PlanPath { .. } => plans += 1,
                Effect::Advance { destination, .. } => {
                    snapshot.current_chunk = walk_one_chunk(snapshot.current_chunk, destination);
                }
                _ => {}
            }
        }

        if state == CharacterState::Idle && snapshot.is_idle_at_base() {
            break;
        }
    }

    assert_eq!(
        visited,
        vec![
            CharacterState::Idle,
            CharacterState::Travel,
            CharacterState::ArrivedAtMissionChunk,
            CharacterState::MissionComplete,
            CharacterState::Travel,
            CharacterState::Idle,
        ]
    );
    assert_eq!(completion_flips, 1);
    assert_eq!(plans, 2, "one plan outbound, one homeward");
    assert!(snapshot.is_idle_at_base());
    assert_eq!(snapshot.current_chunk, BASE);
}

#[test]
fn retargeting_mid_travel_changes_advance_destination() {
    let snapshot = BehaviorSnapshot {
        current_chunk: ChunkCoord::new(1, 0),
        base_chunk: BASE,
        target_chunk: Some(MISSION),
        mission_complete: false,
        chunk_scanned: false,
    };
    let first = step(CharacterState::Travel, &snapshot, TICK);

    let retargeted = BehaviorSnapshot {
        target_chunk: Some(ChunkCoord::new(1, 2)),
        ..snapshot
    };
    let second = step(CharacterState::Travel, &retargeted, TICK);

    assert_eq!(
        first.effects,
        vec![Effect::Advance {
            destination: MISSION,
            dt: TICK
        }]
    );
    assert_eq!(
        second.effects,
        vec![Effect::Advance {
            destination: ChunkCoord::new(1, 2),
            dt: TICK
        }]
    );
}
