use std::time::Duration;

use skirmish_core::{
    CharacterId, CharacterState, ChunkCoord, Command, Event, MapConfig, Phase, RejectionReason,
    Team, TileCoord,
};
use skirmish_world::{apply, query, World};

const TICK: Duration = Duration::from_millis(250);

fn team(index: u8) -> Team {
    Team::new(index).expect("valid team")
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, command, &mut events);
    events
}

fn tick(world: &mut World) -> Vec<Event> {
    run(world, Command::Tick { dt: TICK })
}

fn spawn(world: &mut World, team: Team, chunk: ChunkCoord, tile: Option<TileCoord>) -> CharacterId {
    let events = run(world, Command::SpawnCharacter { team, chunk, tile });
    match events.as_slice() {
        [Event::CharacterSpawned { character, .. }] => *character,
        other => panic!("unexpected spawn events: {other:?}"),
    }
}

fn assign(world: &mut World, character: CharacterId, chunk: ChunkCoord) -> Vec<Event> {
    run(world, Command::AssignMission { character, chunk })
}

fn request(world: &mut World, phase: Phase) -> Vec<Event> {
    run(world, Command::RequestPhase { phase })
}

fn rejection(events: &[Event]) -> Option<RejectionReason> {
    events.iter().find_map(|event| match event {
        Event::CommandRejected { reason } => Some(*reason),
        _ => None,
    })
}

fn world_without_coins() -> World {
    World::with_config(MapConfig {
        coin_chance: 0.0,
        ..MapConfig::default()
    })
    .expect("valid config")
}

#[test]
fn single_mission_round_trip_reaches_waiting() {
    let mut world = World::new();
    let initial_coins = query::coins(&world).total();
    let scout = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);

    assert_eq!(
        assign(&mut world, scout, ChunkCoord::new(2, 2)),
        vec![Event::MissionAssigned {
            character: scout,
            chunk: ChunkCoord::new(2, 2),
        }]
    );
    assert_eq!(
        request(&mut world, Phase::Executing),
        vec![Event::PhaseChanged {
            phase: Phase::Executing
        }]
    );

    let mut log = Vec::new();
    for _ in 0..200 {
        log.extend(tick(&mut world));
        if query::phase(&world) == Phase::Waiting {
            break;
        }
    }

    let transitions: Vec<_> = log
        .iter()
        .filter_map(|event| match event {
            Event::StateChanged { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (CharacterState::Idle, CharacterState::Travel),
            (CharacterState::Travel, CharacterState::ArrivedAtMissionChunk),
            (
                CharacterState::ArrivedAtMissionChunk,
                CharacterState::MissionComplete
            ),
            (CharacterState::MissionComplete, CharacterState::Travel),
            (CharacterState::Travel, CharacterState::Idle),
        ]
    );

    let first_plan = log.iter().find_map(|event| match event {
        Event::PathPlanned {
            destination, steps, ..
        } => Some((*destination, *steps)),
        _ => None,
    });
    assert_eq!(first_plan, Some((TileCoord::new(12, 12), 24)));

    let completions = |wanted: fn(&Event) -> bool| log.iter().filter(|event| wanted(event)).count();
    assert_eq!(completions(|event| matches!(event, Event::TeamCompleted { .. })), 1);
    assert_eq!(completions(|event| matches!(event, Event::AllTeamsCompleted)), 1);
    assert_eq!(
        log.last(),
        Some(&Event::PhaseChanged {
            phase: Phase::Waiting
        })
    );

    let character = query::character(&world, scout).expect("alive");
    assert!(character.is_idle_at_base());
    assert_eq!(character.state(), CharacterState::Idle);
    assert_eq!(character.current_chunk(), ChunkCoord::new(0, 0));
    assert!(!character.is_traveling());

    let collected: u32 = log
        .iter()
        .filter_map(|event| match event {
            Event::CoinCollected { amount, .. } => Some(amount.get()),
            _ => None,
        })
        .sum();
    assert_eq!(query::team_coins(&world, team(0)), collected);
    assert_eq!(query::coins(&world).total() + collected, initial_coins);
}

#[test]
fn every_move_is_a_single_step() {
    let mut world = World::new();
    let scout = spawn(&mut world, team(3), ChunkCoord::new(2, 2), None);
    let _ = assign(&mut world, scout, ChunkCoord::new(0, 1));
    let _ = request(&mut world, Phase::Executing);

    for _ in 0..200 {
        for event in tick(&mut world) {
            if let Event::CharacterMoved { from, to, .. } = event {
                assert_eq!(from.manhattan_distance(to), 1, "{from} -> {to}");
                assert!(query::terrain(&world).class_at(to).is_some());
            }
        }
        if query::phase(&world) == Phase::Waiting {
            return;
        }
    }
    panic!("mission never completed");
}

#[test]
fn identifiers_follow_spawn_order_and_kill_is_idempotent() {
    let mut world = World::new();
    let ids: Vec<_> = Team::ALL
        .into_iter()
        .map(|team| spawn(&mut world, team, team.base_chunk(3), None))
        .collect();
    assert_eq!(
        ids.iter().map(CharacterId::get).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );

    let fallen_tile = query::character(&world, ids[1]).expect("spawned").tile();
    let _ = run(
        &mut world,
        Command::SetSelection {
            characters: vec![ids[0], ids[1]],
        },
    );

    assert_eq!(
        run(&mut world, Command::KillCharacter { character: ids[1] }),
        vec![Event::CharacterKilled { character: ids[1] }]
    );
    assert!(run(&mut world, Command::KillCharacter { character: ids[1] }).is_empty());
    assert!(query::character(&world, ids[1]).is_none());
    assert_eq!(query::characters(&world).len(), 3);
    assert!(query::characters_at(&world, fallen_tile).is_empty());
    assert!(query::characters_in_chunk(&world, team(1).base_chunk(3)).is_empty());
    assert_eq!(
        query::enemies_of(&world, team(0))
            .iter()
            .map(|character| character.id())
            .collect::<Vec<_>>(),
        vec![ids[2], ids[3]]
    );
    assert_eq!(query::selection(&world), vec![ids[0]]);

    let replacement = spawn(&mut world, team(1), ChunkCoord::new(2, 0), None);
    assert_eq!(replacement, CharacterId::new(4));
}

#[test]
fn spatial_queries_track_positions() {
    let mut world = World::new();
    let red = spawn(&mut world, team(0), ChunkCoord::new(1, 1), None);
    let blue = spawn(&mut world, team(1), ChunkCoord::new(1, 1), None);

    assert_eq!(
        query::characters_at(&world, TileCoord::new(7, 7))
            .iter()
            .map(|character| character.id())
            .collect::<Vec<_>>(),
        vec![red]
    );
    assert_eq!(query::characters_in_chunk(&world, ChunkCoord::new(1, 1)).len(), 2);
    assert_eq!(query::enemy_at(&world, TileCoord::new(5, 5), team(0)), Some(blue));
    assert_eq!(query::enemy_at(&world, TileCoord::new(5, 5), team(1)), None);
    assert_eq!(
        query::enemies_of(&world, team(1))
            .iter()
            .map(|character| character.id())
            .collect::<Vec<_>>(),
        vec![red]
    );
    assert_eq!(query::spawn_locations(&world, team(1)), &[TileCoord::new(5, 5)]);
}

#[test]
fn mission_assignment_enforces_planning_rules() {
    let mut world = World::new();
    let scout = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);

    assert_eq!(
        rejection(&assign(&mut world, CharacterId::new(42), ChunkCoord::new(1, 1))),
        Some(RejectionReason::UnknownCharacter(CharacterId::new(42)))
    );
    assert_eq!(
        rejection(&assign(&mut world, scout, ChunkCoord::new(3, 1))),
        Some(RejectionReason::ChunkOutOfBounds(ChunkCoord::new(3, 1)))
    );

    assert!(rejection(&assign(&mut world, scout, ChunkCoord::new(1, 1))).is_none());
    assert_eq!(
        rejection(&assign(&mut world, scout, ChunkCoord::new(2, 1))),
        Some(RejectionReason::MissionAlreadyAccepted(scout))
    );
    assert_eq!(
        query::character(&world, scout).and_then(|character| character.target_chunk()),
        Some(ChunkCoord::new(1, 1))
    );

    let _ = request(&mut world, Phase::Executing);
    assert_eq!(
        rejection(&assign(&mut world, scout, ChunkCoord::new(2, 1))),
        Some(RejectionReason::PhaseLocked(Phase::Executing))
    );

    for _ in 0..3 {
        let _ = tick(&mut world);
    }
    let _ = request(&mut world, Phase::Planning);
    assert!(query::character(&world, scout).is_some_and(|character| character.accepting_missions()));
    assert_eq!(
        rejection(&assign(&mut world, scout, ChunkCoord::new(2, 1))),
        Some(RejectionReason::CharacterBusy(scout))
    );
}

#[test]
fn phase_requests_are_validated() {
    let mut world = World::new();
    assert!(request(&mut world, Phase::Planning).is_empty());
    assert_eq!(
        rejection(&request(&mut world, Phase::Waiting)),
        Some(RejectionReason::PhaseNotRequestable)
    );

    let _ = spawn(&mut world, team(2), ChunkCoord::new(0, 2), None);
    let _ = request(&mut world, Phase::Executing);
    let events = tick(&mut world);
    assert!(events.contains(&Event::TeamCompleted { team: team(2) }));
    assert!(events.contains(&Event::AllTeamsCompleted));
    assert_eq!(query::phase(&world), Phase::Waiting);

    assert_eq!(
        rejection(&request(&mut world, Phase::Executing)),
        Some(RejectionReason::PhaseLocked(Phase::Waiting))
    );
    let events = tick(&mut world);
    assert_eq!(events, vec![Event::TimeAdvanced { dt: TICK }]);
    assert_eq!(
        request(&mut world, Phase::Planning),
        vec![Event::PhaseChanged {
            phase: Phase::Planning
        }]
    );
}

#[test]
fn team_completion_waits_for_every_member() {
    let mut world = World::new();
    let runner = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);
    let _stayer = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);
    let _ = spawn(&mut world, team(1), ChunkCoord::new(2, 0), None);
    let _ = assign(&mut world, runner, ChunkCoord::new(1, 0));
    let _ = request(&mut world, Phase::Executing);

    let first = tick(&mut world);
    assert!(first.contains(&Event::TeamCompleted { team: team(1) }));
    assert!(!first.contains(&Event::TeamCompleted { team: team(0) }));
    assert!(!query::team_complete(&world, team(0)));
    assert!(query::team_complete(&world, team(1)));

    let mut team_zero_completions = 0;
    for _ in 0..100 {
        let events = tick(&mut world);
        team_zero_completions += events
            .iter()
            .filter(|event| **event == Event::TeamCompleted { team: team(0) })
            .count();
        assert!(!events.contains(&Event::TeamCompleted { team: team(1) }));
        if query::phase(&world) == Phase::Waiting {
            break;
        }
    }
    assert_eq!(team_zero_completions, 1);
    assert!(query::all_teams_complete(&world));
}

#[test]
fn friend_on_next_tile_forces_replan_and_retry_delay() {
    let mut world = world_without_coins();
    let runner = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);
    let _ = assign(&mut world, runner, ChunkCoord::new(2, 2));
    let _ = request(&mut world, Phase::Executing);

    let mut blocked = None;
    for _ in 0..6 {
        let _ = tick(&mut world);
        let next = query::character(&world, runner)
            .and_then(|character| character.path().next())
            .expect("runner still travelling");
        if query::structure_at(&world, next).is_none() {
            blocked = Some(next);
            break;
        }
    }
    let blocked = blocked.expect("an open tile ahead of the runner");
    let before = query::character(&world, runner).expect("alive").tile();
    let _ = spawn(&mut world, team(0), blocked.chunk(5), Some(blocked));

    let events = tick(&mut world);
    assert!(events.iter().any(|event| matches!(
        event,
        Event::PathPlanned { character, .. } if *character == runner
    )));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::CharacterMoved { .. })));
    let runner_state = query::character(&world, runner).expect("alive");
    assert_eq!(runner_state.tile(), before);
    assert_ne!(runner_state.path().next(), Some(blocked));

    // Half a second at four tiles per second holds the runner for two steps.
    for _ in 0..2 {
        let events = tick(&mut world);
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::CharacterMoved { .. })));
    }

    let mut moved = false;
    for _ in 0..40 {
        for event in tick(&mut world) {
            if let Event::CharacterMoved { character, to, .. } = event {
                assert_eq!(character, runner);
                assert_ne!(to, blocked);
                moved = true;
            }
        }
    }
    assert!(moved);
}

#[test]
fn sealed_character_reports_unavailable_path() {
    let mut world = world_without_coins();
    let trapped = spawn(&mut world, team(0), ChunkCoord::new(0, 0), Some(TileCoord::new(0, 0)));
    let _ = spawn(&mut world, team(0), ChunkCoord::new(0, 0), Some(TileCoord::new(1, 0)));
    let _ = spawn(&mut world, team(0), ChunkCoord::new(0, 0), Some(TileCoord::new(0, 1)));
    let _ = assign(&mut world, trapped, ChunkCoord::new(1, 0));
    let _ = request(&mut world, Phase::Executing);

    let events = tick(&mut world);

    assert!(events.contains(&Event::PathUnavailable {
        character: trapped,
        destination: TileCoord::new(7, 2),
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::CharacterMoved { .. })));
    assert_eq!(
        query::character(&world, trapped).map(|character| character.tile()),
        Some(TileCoord::new(0, 0))
    );
}

#[test]
fn vision_tracks_coins_and_enemies_and_prunes_the_dead() {
    let mut world = world_without_coins();
    let scout = spawn(&mut world, team(0), ChunkCoord::new(0, 0), Some(TileCoord::new(0, 4)));
    let enemy = spawn(&mut world, team(1), ChunkCoord::new(0, 1), Some(TileCoord::new(1, 5)));
    assert!(run(
        &mut world,
        Command::PlaceCoin {
            tile: TileCoord::new(0, 5),
            amount: 5,
        },
    )
    .is_empty());
    let _ = assign(&mut world, scout, ChunkCoord::new(2, 0));
    let _ = request(&mut world, Phase::Executing);

    let _ = tick(&mut world);
    let character = query::character(&world, scout).expect("alive");
    assert_eq!(character.seen_coins().collect::<Vec<_>>(), vec![TileCoord::new(0, 5)]);
    assert_eq!(character.seen_enemies().collect::<Vec<_>>(), vec![enemy]);

    let _ = run(&mut world, Command::KillCharacter { character: enemy });
    let _ = tick(&mut world);
    let character = query::character(&world, scout).expect("alive");
    assert_eq!(character.seen_enemies().count(), 0);
}

#[test]
fn arrival_scans_the_whole_mission_chunk() {
    let mut world = World::with_config(MapConfig {
        coin_chance: 0.0,
        vision_radius: 0,
        map_size: 2,
        ..MapConfig::default()
    })
    .expect("valid config");
    let scout = spawn(&mut world, team(0), ChunkCoord::new(0, 0), Some(TileCoord::new(0, 0)));
    let _ = run(
        &mut world,
        Command::PlaceCoin {
            tile: TileCoord::new(9, 5),
            amount: 1,
        },
    );
    let _ = assign(&mut world, scout, ChunkCoord::new(1, 1));
    let _ = request(&mut world, Phase::Executing);

    let arrived = Event::StateChanged {
        character: scout,
        from: CharacterState::Travel,
        to: CharacterState::ArrivedAtMissionChunk,
    };
    for _ in 0..100 {
        if tick(&mut world).contains(&arrived) {
            let character = query::character(&world, scout).expect("alive");
            assert!(character.seen_coins().any(|tile| tile == TileCoord::new(9, 5)));
            assert!(query::has_coin(&world, TileCoord::new(9, 5)));
            return;
        }
    }
    panic!("scout never arrived");
}

#[test]
fn walking_over_coins_credits_the_team() {
    let mut world = World::with_config(MapConfig {
        chunk_size: 3,
        map_size: 2,
        coin_chance: 0.0,
        ..MapConfig::default()
    })
    .expect("valid config");
    let side = 6;
    for y in 0..side {
        for x in 0..side {
            let _ = run(
                &mut world,
                Command::PlaceCoin {
                    tile: TileCoord::new(x, y),
                    amount: 5,
                },
            );
        }
    }
    let scout = spawn(&mut world, team(1), ChunkCoord::new(1, 0), None);
    let _ = assign(&mut world, scout, ChunkCoord::new(0, 1));
    let _ = request(&mut world, Phase::Executing);

    let mut visited = std::collections::BTreeSet::new();
    for _ in 0..100 {
        for event in tick(&mut world) {
            if let Event::CharacterMoved { to, .. } = event {
                let _ = visited.insert(to);
            }
        }
        if query::phase(&world) == Phase::Waiting {
            break;
        }
    }

    assert!(!visited.is_empty());
    assert_eq!(query::team_coins(&world, team(1)), 5 * visited.len() as u32);
    assert!(visited.iter().all(|tile| !query::has_coin(&world, *tile)));
}

#[test]
fn configure_during_execution_is_deferred_to_tick_end() {
    let mut world = World::new();
    let scout = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);
    let _ = assign(&mut world, scout, ChunkCoord::new(2, 0));
    let _ = request(&mut world, Phase::Executing);

    let config = MapConfig {
        map_size: 2,
        ..MapConfig::default()
    };
    assert_eq!(
        run(
            &mut world,
            Command::ConfigureMap {
                config: Box::new(config.clone()),
            },
        ),
        vec![Event::RebuildDeferred]
    );
    assert!(query::rebuild_pending(&world));
    assert_eq!(query::terrain(&world).map_size(), 3);

    let events = tick(&mut world);
    let moved = events
        .iter()
        .position(|event| matches!(event, Event::CharacterMoved { .. }))
        .expect("scout moved before the rebuild");
    let rebuilt = events
        .iter()
        .position(|event| matches!(event, Event::MapGenerated { .. }))
        .expect("rebuild applied");
    assert!(moved < rebuilt);
    assert_eq!(
        events.last(),
        Some(&Event::PhaseChanged {
            phase: Phase::Planning
        })
    );
    assert!(!query::rebuild_pending(&world));
    assert_eq!(query::config(&world), &config);
    assert!(query::characters(&world).is_empty());
    assert_eq!(query::phase(&world), Phase::Planning);
}

#[test]
fn selection_skips_unknown_and_dead_characters() {
    let mut world = World::new();
    let first = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);
    let second = spawn(&mut world, team(0), ChunkCoord::new(0, 0), None);

    assert_eq!(
        run(
            &mut world,
            Command::SetSelection {
                characters: vec![second, CharacterId::new(77), first],
            },
        ),
        vec![Event::SelectionChanged {
            characters: vec![first, second],
        }]
    );

    let _ = run(&mut world, Command::KillCharacter { character: first });
    assert_eq!(query::selection(&world), vec![second]);

    assert_eq!(
        run(&mut world, Command::ClearSelection),
        vec![Event::SelectionChanged {
            characters: Vec::new(),
        }]
    );
}

#[test]
fn identical_configurations_generate_identical_worlds() {
    let first = World::new();
    let second = World::new();

    assert!(query::terrain(&first).iter().eq(query::terrain(&second).iter()));
    assert_eq!(query::decorations(&first), query::decorations(&second));
    assert_eq!(query::coins(&first), query::coins(&second));
    assert_eq!(query::structures(&first), query::structures(&second));
}
