//! Scripted headless run: spawn, order by pointer presses, execute.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use glam::Vec2;
use skirmish_core::{ChunkCoord, Command, Event, Phase, Team, TileCoord};
use skirmish_rendering::{PointerEvent, Viewport};
use skirmish_system_orders::{OrderInput, Orders, PressTarget};
use skirmish_world::{apply, query, World};
use tracing::info;

use crate::config::ScenarioSettings;

const TILE_LENGTH: f32 = 16.0;

/// Summary of a scripted run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Outcome {
    pub(crate) ticks: u32,
    pub(crate) completed: bool,
    pub(crate) moves: usize,
    pub(crate) rejections: usize,
    pub(crate) team_coins: Vec<(Team, u32)>,
}

/// Spawns one character per listed team, orders them all to the mission
/// chunk through simulated pointer presses, then ticks until every team is
/// back at base or the tick budget runs out.
pub(crate) fn run(world: &mut World, settings: &ScenarioSettings) -> Result<Outcome> {
    let map_size = query::config(world).map_size;
    let mission = ChunkCoord::new(settings.mission_chunk[0], settings.mission_chunk[1]);
    ensure!(
        mission.within(map_size),
        "mission chunk {mission} lies outside the {map_size}x{map_size} map"
    );

    let teams = settings
        .teams
        .iter()
        .map(|index| Team::new(*index).with_context(|| format!("team {index} does not exist")))
        .collect::<Result<Vec<_>>>()?;

    let viewport = Viewport::new(Vec2::ZERO, TILE_LENGTH).context("invalid viewport")?;
    let mut controller = Controller {
        orders: Orders::new(),
        viewport,
        teams,
        events: Vec::new(),
        rejections: 0,
    };

    for team in controller.teams.clone() {
        controller.submit(
            world,
            Command::SpawnCharacter {
                team,
                chunk: team.base_chunk(map_size),
                tile: None,
            },
        );
    }

    let positions: Vec<TileCoord> = query::characters(world)
        .iter()
        .map(|character| character.tile())
        .collect();
    for tile in positions {
        controller.press(world, tile);
    }
    controller.press(world, mission.center(query::config(world).chunk_size));
    controller.submit(
        world,
        Command::RequestPhase {
            phase: Phase::Executing,
        },
    );

    let dt = Duration::from_millis(settings.tick_ms);
    let mut moves = 0;
    let mut ticks = 0;
    while ticks < settings.max_ticks && query::phase(world) == Phase::Executing {
        ticks += 1;
        controller.submit(world, Command::Tick { dt });
        moves += controller
            .events
            .iter()
            .filter(|event| matches!(event, Event::CharacterMoved { .. }))
            .count();
    }

    let completed = query::phase(world) == Phase::Waiting;
    info!(ticks, completed, moves, "scenario finished");

    Ok(Outcome {
        ticks,
        completed,
        moves,
        rejections: controller.rejections,
        team_coins: Team::ALL
            .into_iter()
            .map(|team| (team, query::team_coins(world, team)))
            .collect(),
    })
}

/// Feeds world events to the orders system and world commands back in.
struct Controller {
    orders: Orders,
    viewport: Viewport,
    teams: Vec<Team>,
    events: Vec<Event>,
    rejections: usize,
}

impl Controller {
    fn submit(&mut self, world: &mut World, command: Command) {
        self.events.clear();
        apply(world, command, &mut self.events);
        self.rejections += self
            .events
            .iter()
            .filter(|event| matches!(event, Event::CommandRejected { .. }))
            .count();
    }

    /// Presses the pointer over the middle of the tile.
    fn press(&mut self, world: &mut World, tile: TileCoord) {
        let half = Vec2::splat(self.viewport.tile_length() * 0.5);
        let pointer = PointerEvent::Press(self.viewport.tile_origin(tile) + half);
        let Some(pressed) = self.viewport.resolve_press(pointer) else {
            return;
        };
        let input = OrderInput {
            press: Some(PressTarget::new(pressed, query::config(world).chunk_size)),
            cancel: false,
        };

        let teams = &self.teams;
        let mut commands = Vec::new();
        self.orders.handle(
            &self.events,
            input,
            |tile| {
                query::characters_at(world, tile)
                    .into_iter()
                    .find(|character| teams.contains(&character.team()))
                    .map(|character| character.id())
            },
            &mut commands,
        );

        let mut batch = Vec::new();
        for command in commands {
            self.submit(world, command);
            batch.append(&mut self.events);
        }
        self.events = batch;
    }
}
