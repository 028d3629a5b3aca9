#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Skirmish.
//!
//! The world owns the generated map, the coin ledger, every character and the
//! phase cycle. All mutation flows through [`apply`]; reads go through
//! [`query`].

use skirmish_core::{
    CharacterId, ChunkCoord, CoinError, Command, ConfigError, Event, MapConfig, Phase,
    RejectionReason, Structure, Team, TerrainOracle, TileCoord, TEAM_COUNT,
};
use skirmish_system_pathfinding::Pathfinder;
use skirmish_system_terrain::{generate, DecorationOverlay, GeneratedMap, TerrainMap};
use tracing::{debug, info};

mod coins;
mod movement;
mod phase;
mod registry;
mod vision;

pub use coins::CoinLedger;
pub use registry::{Character, CharacterRegistry, SpawnError};

use phase::PhaseTracker;

/// Represents the authoritative Skirmish world state.
#[derive(Debug)]
pub struct World {
    config: MapConfig,
    terrain: TerrainMap,
    decorations: DecorationOverlay,
    structures: Vec<Structure>,
    coins: CoinLedger,
    characters: CharacterRegistry,
    phase: PhaseTracker,
    team_coins: [u32; TEAM_COUNT],
    pathfinder: Pathfinder,
    pending_config: Option<MapConfig>,
    tick_index: u64,
}

impl World {
    /// Creates a world generated from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        let config = MapConfig::default();
        let map = generate(&config).unwrap_or_default();
        Self::from_parts(config, map)
    }

    /// Creates a world generated from the provided configuration.
    pub fn with_config(config: MapConfig) -> Result<Self, ConfigError> {
        let map = generate(&config)?;
        Ok(Self::from_parts(config, map))
    }

    fn from_parts(config: MapConfig, map: GeneratedMap) -> Self {
        Self {
            characters: CharacterRegistry::new(config.chunk_size),
            coins: CoinLedger::from_coins(map.coins),
            terrain: map.terrain,
            decorations: map.decorations,
            structures: map.structures,
            phase: PhaseTracker::new(),
            team_coins: [0; TEAM_COUNT],
            pathfinder: Pathfinder::new(),
            pending_config: None,
            tick_index: 0,
            config,
        }
    }

    fn rebuild(&mut self, config: MapConfig, out_events: &mut Vec<Event>) {
        let map = match generate(&config) {
            Ok(map) => map,
            Err(error) => {
                reject(out_events, error.into());
                return;
            }
        };

        self.characters.reset(config.chunk_size);
        self.coins = CoinLedger::from_coins(map.coins);
        self.team_coins = [0; TEAM_COUNT];
        self.terrain = map.terrain;
        self.decorations = map.decorations;
        self.structures = map.structures;
        self.config = config;

        info!(
            chunk_size = self.config.chunk_size,
            map_size = self.config.map_size,
            seed = self.config.seed,
            "map rebuilt"
        );
        out_events.push(Event::MapGenerated {
            tiles: self.terrain.len(),
            decorated: self.decorations.len(),
            coins: self.coins.len(),
            structures: self.structures.len(),
        });

        // A fresh map always starts in planning.
        if self.phase.phase() != Phase::Planning {
            let _ = self.phase.request(Phase::Planning);
            info!("phase reset to planning by rebuild");
            out_events.push(Event::PhaseChanged {
                phase: Phase::Planning,
            });
        }
    }

    fn apply_pending_config(&mut self, out_events: &mut Vec<Event>) {
        if let Some(config) = self.pending_config.take() {
            self.rebuild(config, out_events);
        }
    }

    fn check_completion(&mut self, out_events: &mut Vec<Event>) {
        for team in Team::ALL {
            if !self.characters.has_members(team) || !self.characters.team_complete(team) {
                continue;
            }
            if self.phase.mark_team_complete(team) {
                info!(%team, "team completed");
                out_events.push(Event::TeamCompleted { team });
            }
        }

        if self.characters.all_teams_complete() {
            self.phase.enter_waiting();
            info!(tick = self.tick_index, "all teams completed");
            out_events.push(Event::AllTeamsCompleted);
            out_events.push(Event::PhaseChanged {
                phase: Phase::Waiting,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn reject(out_events: &mut Vec<Event>, reason: RejectionReason) {
    debug!(%reason, "command rejected");
    out_events.push(Event::CommandRejected { reason });
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Invalid commands leave the world untouched and emit
/// [`Event::CommandRejected`].
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMap { config } => {
            if let Err(error) = config.validate() {
                reject(out_events, error.into());
                return;
            }
            if world.phase.phase() == Phase::Executing {
                info!("map rebuild deferred until the end of the next tick");
                world.pending_config = Some(*config);
                out_events.push(Event::RebuildDeferred);
            } else {
                world.rebuild(*config, out_events);
            }
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            if world.phase.phase() == Phase::Executing {
                world.run_behavior(dt, out_events);
                world.check_completion(out_events);
            }
            world.apply_pending_config(out_events);
        }
        Command::RequestPhase { phase } => match world.phase.request(phase) {
            Ok(false) => {}
            Ok(true) => {
                if phase == Phase::Planning {
                    for character in world.characters.iter_mut() {
                        character.accepting_missions = true;
                    }
                    world.apply_pending_config(out_events);
                }
                info!(?phase, "phase changed");
                out_events.push(Event::PhaseChanged { phase });
            }
            Err(reason) => reject(out_events, reason),
        },
        Command::SpawnCharacter { team, chunk, tile } => {
            if !chunk.within(world.config.map_size) {
                reject(out_events, RejectionReason::ChunkOutOfBounds(chunk));
                return;
            }
            let terrain = &world.terrain;
            let structures = &world.structures;
            let is_open = |candidate: TileCoord| {
                terrain.has_tile(candidate)
                    && !structures.iter().any(|structure| structure.base == candidate)
            };
            let spawned =
                world
                    .characters
                    .spawn(team, chunk, tile, world.config.max_health, is_open);
            match spawned {
                Ok(character) => {
                    let tile = world
                        .characters
                        .get(character)
                        .map_or(chunk.center(world.config.chunk_size), Character::tile);
                    debug!(%character, %team, %tile, "character spawned");
                    out_events.push(Event::CharacterSpawned {
                        character,
                        team,
                        tile,
                    });
                }
                Err(SpawnError::NoOpenTile(chunk)) => {
                    reject(out_events, RejectionReason::NoOpenTile { team, chunk });
                }
                Err(
                    SpawnError::TileNotOpen(tile) | SpawnError::TileOutsideChunk { tile, .. },
                ) => reject(out_events, RejectionReason::TileUnavailable(tile)),
            }
        }
        Command::KillCharacter { character } => {
            if world.characters.kill(character) {
                debug!(%character, "character killed");
                out_events.push(Event::CharacterKilled { character });
            }
        }
        Command::AssignMission { character, chunk } => {
            if let Err(reason) = validate_mission(world, character, chunk) {
                reject(out_events, reason);
                return;
            }
            if let Some(assignee) = world.characters.get_mut(character) {
                assignee.target_chunk = Some(chunk);
                assignee.mission_complete = false;
                assignee.chunk_scanned = false;
                assignee.accepting_missions = false;
            }
            info!(%character, %chunk, "mission assigned");
            out_events.push(Event::MissionAssigned { character, chunk });
        }
        Command::SetSelection { characters } => {
            let selected = world.characters.set_selection(characters);
            out_events.push(Event::SelectionChanged {
                characters: selected,
            });
        }
        Command::ClearSelection => {
            let selected = world.characters.set_selection(Vec::new());
            out_events.push(Event::SelectionChanged {
                characters: selected,
            });
        }
        Command::PlaceCoin { tile, amount } => {
            if !world.terrain.has_tile(tile) {
                reject(out_events, CoinError::NoGround(tile).into());
                return;
            }
            match world.coins.place_coin(tile, amount) {
                Ok(amount) => debug!(%tile, amount = amount.get(), "coin placed"),
                Err(error) => reject(out_events, error.into()),
            }
        }
    }
}

fn validate_mission(
    world: &World,
    id: CharacterId,
    chunk: ChunkCoord,
) -> Result<(), RejectionReason> {
    let phase = world.phase.phase();
    if phase != Phase::Planning {
        return Err(RejectionReason::PhaseLocked(phase));
    }
    let character = world
        .characters
        .get(id)
        .ok_or(RejectionReason::UnknownCharacter(id))?;
    if !chunk.within(world.config.map_size) {
        return Err(RejectionReason::ChunkOutOfBounds(chunk));
    }
    if !character.accepting_missions() {
        return Err(RejectionReason::MissionAlreadyAccepted(id));
    }
    if !character.is_idle_at_base() {
        return Err(RejectionReason::CharacterBusy(id));
    }
    Ok(())
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use skirmish_core::{
        CharacterId, ChunkCoord, CoinAmount, MapConfig, Phase, Structure, Team, TileCoord,
    };
    use skirmish_system_terrain::{DecorationOverlay, TerrainMap};

    use super::{Character, CharacterRegistry, CoinLedger, World};

    /// Configuration the current map was generated from.
    #[must_use]
    pub fn config(world: &World) -> &MapConfig {
        &world.config
    }

    /// Reports whether a rebuild is waiting for the end of the next tick.
    #[must_use]
    pub fn rebuild_pending(world: &World) -> bool {
        world.pending_config.is_some()
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Ground tiles of the current map.
    #[must_use]
    pub fn terrain(world: &World) -> &TerrainMap {
        &world.terrain
    }

    /// Grass painted over the ground.
    #[must_use]
    pub fn decorations(world: &World) -> &DecorationOverlay {
        &world.decorations
    }

    /// Structures standing on the corner chunks.
    #[must_use]
    pub fn structures(world: &World) -> &[Structure] {
        &world.structures
    }

    /// Structure whose base occupies the tile. Roof tiles never match.
    #[must_use]
    pub fn structure_at(world: &World, tile: TileCoord) -> Option<Structure> {
        world
            .structures
            .iter()
            .copied()
            .find(|structure| structure.base == tile)
    }

    /// Coins still lying on the ground.
    #[must_use]
    pub fn coins(world: &World) -> &CoinLedger {
        &world.coins
    }

    /// Reports whether a coin rests on the tile.
    #[must_use]
    pub fn has_coin(world: &World, tile: TileCoord) -> bool {
        world.coins.has_coin(tile)
    }

    /// Denomination of the coin on the tile.
    #[must_use]
    pub fn coin_at(world: &World, tile: TileCoord) -> Option<CoinAmount> {
        world.coins.amount_at(tile)
    }

    /// Coins collected by the team since the map was generated.
    #[must_use]
    pub fn team_coins(world: &World, team: Team) -> u32 {
        world.team_coins[team.index()]
    }

    /// Phase the world is in.
    #[must_use]
    pub fn phase(world: &World) -> Phase {
        world.phase.phase()
    }

    /// Read-only access to every live character.
    #[must_use]
    pub fn characters(world: &World) -> &CharacterRegistry {
        &world.characters
    }

    /// Looks up a live character.
    #[must_use]
    pub fn character(world: &World, id: CharacterId) -> Option<&Character> {
        world.characters.get(id)
    }

    /// Characters standing on the tile.
    #[must_use]
    pub fn characters_at(world: &World, tile: TileCoord) -> Vec<&Character> {
        world.characters.at_tile(tile).collect()
    }

    /// Characters inside the chunk.
    #[must_use]
    pub fn characters_in_chunk(world: &World, chunk: ChunkCoord) -> Vec<&Character> {
        world.characters.in_chunk(chunk).collect()
    }

    /// Characters of every team other than `team`.
    #[must_use]
    pub fn enemies_of(world: &World, team: Team) -> Vec<&Character> {
        world.characters.enemies_of(team).collect()
    }

    /// First character on the tile that does not belong to `team`.
    #[must_use]
    pub fn enemy_at(world: &World, tile: TileCoord, team: Team) -> Option<CharacterId> {
        world.characters.enemy_at(tile, team)
    }

    /// Selected characters that are still alive, ordered by identifier.
    #[must_use]
    pub fn selection(world: &World) -> Vec<CharacterId> {
        world.characters.selected().collect()
    }

    /// Tiles the team's characters were spawned on, oldest first.
    #[must_use]
    pub fn spawn_locations(world: &World, team: Team) -> &[TileCoord] {
        world.characters.spawn_locations(team)
    }

    /// Every live member of the team is idle at base.
    #[must_use]
    pub fn team_complete(world: &World, team: Team) -> bool {
        world.characters.team_complete(team)
    }

    /// Every team is complete and at least one character is alive.
    #[must_use]
    pub fn all_teams_complete(world: &World) -> bool {
        world.characters.all_teams_complete()
    }
}
