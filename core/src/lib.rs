#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skirmish simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values describing what
//! changed. Systems consume immutable snapshots and answer with new command
//! batches or pure effect lists.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::{ConfigError, DecorationTuning, MapConfig};

/// Number of teams that may field characters.
pub const TEAM_COUNT: usize = 4;

/// Phases of the planning/execution cycle driven by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Missions may be assigned; characters do not act.
    Planning,
    /// Assignment is locked and characters run their behaviour every tick.
    Executing,
    /// Every team finished; nothing happens until planning is requested again.
    Waiting,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the generation parameters and regenerates the whole map.
    ConfigureMap {
        /// Parameters used for the regenerated map.
        config: Box<MapConfig>,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests a transition into the provided phase.
    RequestPhase {
        /// Phase the world should enter.
        phase: Phase,
    },
    /// Requests a new character for a team inside the provided chunk.
    SpawnCharacter {
        /// Team the character fights for.
        team: Team,
        /// Chunk that becomes the character's base.
        chunk: ChunkCoord,
        /// Explicit tile to spawn on instead of searching the chunk.
        tile: Option<TileCoord>,
    },
    /// Removes a character from the world. Unknown identifiers are ignored.
    KillCharacter {
        /// Character to remove.
        character: CharacterId,
    },
    /// Sends an idle character on a mission to the provided chunk.
    AssignMission {
        /// Character receiving the mission.
        character: CharacterId,
        /// Chunk the character should travel to.
        chunk: ChunkCoord,
    },
    /// Replaces the selection set.
    SetSelection {
        /// Characters that form the new selection.
        characters: Vec<CharacterId>,
    },
    /// Empties the selection set.
    ClearSelection,
    /// Places a coin on the provided tile.
    PlaceCoin {
        /// Tile that receives the coin.
        tile: TileCoord,
        /// Denomination of the coin; must be 1, 3 or 5.
        amount: u32,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that the map was regenerated from scratch.
    MapGenerated {
        /// Number of ground tiles in the terrain map.
        tiles: usize,
        /// Number of tiles carrying decoration.
        decorated: usize,
        /// Number of coins placed on the ground.
        coins: usize,
        /// Number of structures placed on corner chunks.
        structures: usize,
    },
    /// Reports that a configuration change will be applied at the end of the next tick.
    RebuildDeferred,
    /// Announces that the world entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: Phase,
    },
    /// Confirms that a character was created.
    CharacterSpawned {
        /// Identifier assigned to the character.
        character: CharacterId,
        /// Team of the new character.
        team: Team,
        /// Tile the character occupies after spawning.
        tile: TileCoord,
    },
    /// Confirms that a character was removed.
    CharacterKilled {
        /// Identifier of the removed character.
        character: CharacterId,
    },
    /// Reports the selection set after a change.
    SelectionChanged {
        /// Characters currently selected, ordered by identifier.
        characters: Vec<CharacterId>,
    },
    /// Confirms that a mission was accepted.
    MissionAssigned {
        /// Character that accepted the mission.
        character: CharacterId,
        /// Chunk the character travels to.
        chunk: ChunkCoord,
    },
    /// Reports a behaviour state transition.
    StateChanged {
        /// Character whose state changed.
        character: CharacterId,
        /// State that was exited.
        from: CharacterState,
        /// State that was entered.
        to: CharacterState,
    },
    /// Reports that a fresh path was computed.
    PathPlanned {
        /// Character following the path.
        character: CharacterId,
        /// Final tile of the path.
        destination: TileCoord,
        /// Number of steps queued.
        steps: usize,
    },
    /// Reports that no path exists to the destination right now.
    PathUnavailable {
        /// Character left standing.
        character: CharacterId,
        /// Tile that could not be reached.
        destination: TileCoord,
    },
    /// Confirms that a character moved between two tiles.
    CharacterMoved {
        /// Character that moved.
        character: CharacterId,
        /// Tile occupied before the step.
        from: TileCoord,
        /// Tile occupied after the step.
        to: TileCoord,
    },
    /// Confirms that a character picked up a coin.
    CoinCollected {
        /// Character that collected the coin.
        character: CharacterId,
        /// Team credited with the coin.
        team: Team,
        /// Tile the coin was lying on.
        tile: TileCoord,
        /// Denomination of the coin.
        amount: CoinAmount,
    },
    /// Announces that every live member of a team is idle at base.
    TeamCompleted {
        /// Team that completed its missions.
        team: Team,
    },
    /// Announces that every team completed; the world enters [`Phase::Waiting`].
    AllTeamsCompleted,
    /// Reports that a command was rejected without mutating state.
    CommandRejected {
        /// Specific reason the command failed.
        reason: RejectionReason,
    },
}

/// Behaviour states a character moves between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterState {
    /// Resting at base with no mission pending.
    Idle,
    /// Following a path toward the mission chunk or home.
    Travel,
    /// Just reached the mission chunk; performs the full-chunk scan.
    ArrivedAtMissionChunk,
    /// Mission finished; redirects the character home.
    MissionComplete,
}

/// Reasons a command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RejectionReason {
    /// No live character carries the identifier.
    #[error("character {0} does not exist")]
    UnknownCharacter(CharacterId),
    /// The command is not permitted in the current phase.
    #[error("command not permitted during {0:?}")]
    PhaseLocked(Phase),
    /// The waiting phase is entered by the world only.
    #[error("the waiting phase cannot be requested")]
    PhaseNotRequestable,
    /// The character is not idle at its base.
    #[error("character {0} is not idle at base")]
    CharacterBusy(CharacterId),
    /// The character already accepted a mission during this planning round.
    #[error("character {0} already accepted a mission")]
    MissionAlreadyAccepted(CharacterId),
    /// The chunk lies outside the generated map.
    #[error("chunk {0} lies outside the map")]
    ChunkOutOfBounds(ChunkCoord),
    /// No open tile could be found for a new character.
    #[error("no open tile for team {team} in chunk {chunk}")]
    NoOpenTile {
        /// Team that requested the spawn.
        team: Team,
        /// Chunk that was searched.
        chunk: ChunkCoord,
    },
    /// The requested spawn tile is missing, built on, taken, or outside the chunk.
    #[error("tile {0} is not available for spawning")]
    TileUnavailable(TileCoord),
    /// The coin command violated the ledger invariants.
    #[error(transparent)]
    Coin(#[from] CoinError),
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Violations of the coin ledger invariants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CoinError {
    /// Coins only come in denominations of 1, 3 and 5.
    #[error("coin amount {0} is not one of 1, 3 or 5")]
    InvalidAmount(u32),
    /// Coins may only rest on existing ground.
    #[error("tile {0} has no ground")]
    NoGround(TileCoord),
}

/// Denomination of a coin lying on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoinAmount(u8);

impl CoinAmount {
    /// Every denomination in ascending order.
    pub const ALL: [CoinAmount; 3] = [CoinAmount(1), CoinAmount(3), CoinAmount(5)];

    /// Numeric value of the coin.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u32> for CoinAmount {
    type Error = CoinError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 | 3 | 5 => Ok(Self(value as u8)),
            other => Err(CoinError::InvalidAmount(other)),
        }
    }
}

/// Team affiliation of a character. Valid teams are `0..4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Team(u8);

impl Team {
    /// Every team in ascending order.
    pub const ALL: [Team; TEAM_COUNT] = [Team(0), Team(1), Team(2), Team(3)];

    /// Creates a team from its index, returning `None` when out of range.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < TEAM_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Zero-based index of the team.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Corner chunk that hosts the team's base on a square map of `map_size` chunks.
    #[must_use]
    pub const fn base_chunk(&self, map_size: u32) -> ChunkCoord {
        let far = map_size.saturating_sub(1) as i32;
        match self.0 {
            0 => ChunkCoord::new(0, 0),
            1 => ChunkCoord::new(far, 0),
            2 => ChunkCoord::new(0, far),
            _ => ChunkCoord::new(far, far),
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier assigned to a character. Identifiers are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(u32);

impl CharacterId {
    /// Creates a new character identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Location of a single tile in the unbounded logical grid.
///
/// Rows grow southward: `y == 0` is the northern edge of the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    y: i32,
    x: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the tile displaced by the provided offsets.
    #[must_use]
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Chunk that contains the tile, using floor division.
    #[must_use]
    pub const fn chunk(&self, chunk_size: u32) -> ChunkCoord {
        let size = if chunk_size == 0 { 1 } else { chunk_size as i32 };
        ChunkCoord::new(self.x.div_euclid(size), self.y.div_euclid(size))
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub const fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king-move) distance between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// The four cardinal neighbours in north, east, south, west order.
    #[must_use]
    pub const fn neighbors(&self) -> [TileCoord; 4] {
        [
            self.offset(0, -1),
            self.offset(1, 0),
            self.offset(0, 1),
            self.offset(-1, 0),
        ]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Location of a square chunk of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    y: i32,
    x: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { y, x }
    }

    /// Column of the chunk.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the chunk.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Upper-left tile of the chunk.
    #[must_use]
    pub const fn origin(&self, chunk_size: u32) -> TileCoord {
        let size = chunk_size as i32;
        TileCoord::new(self.x * size, self.y * size)
    }

    /// Centre tile of the chunk. Exact only for odd chunk sizes.
    #[must_use]
    pub const fn center(&self, chunk_size: u32) -> TileCoord {
        let half = (chunk_size / 2) as i32;
        self.origin(chunk_size).offset(half, half)
    }

    /// Reports whether the chunk lies inside a square map of `map_size` chunks.
    #[must_use]
    pub const fn within(&self, map_size: u32) -> bool {
        let size = map_size as i32;
        self.x >= 0 && self.y >= 0 && self.x < size && self.y < size
    }

    /// Iterates the chunk's tiles in row-major order.
    pub fn tiles(&self, chunk_size: u32) -> impl Iterator<Item = TileCoord> {
        let origin = self.origin(chunk_size);
        let size = chunk_size as i32;
        (0..size).flat_map(move |dy| (0..size).map(move |dx| origin.offset(dx, dy)))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// Corner positions within a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    /// `x == 0`, `y == 0`.
    NorthWest,
    /// `x == n - 1`, `y == 0`.
    NorthEast,
    /// `x == 0`, `y == n - 1`.
    SouthWest,
    /// `x == n - 1`, `y == n - 1`.
    SouthEast,
}

/// Sides of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Row `0`.
    North,
    /// Column `n - 1`.
    East,
    /// Row `n - 1`.
    South,
    /// Column `0`.
    West,
}

/// Classification of a ground tile by its position inside its chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileClass {
    /// Tile on two chunk borders.
    Corner(Corner),
    /// Tile on exactly one chunk border.
    Edge(Side),
    /// Tile away from every border.
    Interior,
}

/// Density bucket of a decorated tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Thickness {
    /// Painted early in a walk.
    Thick,
    /// Painted mid-walk.
    Medium,
    /// Painted late in a walk or by branches.
    Thin,
}

/// Building placed at the centre of a corner chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Structure {
    /// Logical cell the structure occupies.
    pub base: TileCoord,
    /// Team whose base chunk hosts the structure.
    pub team: Team,
}

impl Structure {
    /// Tile drawn above the base. It is never reported as occupied.
    #[must_use]
    pub const fn roof(&self) -> TileCoord {
        self.base.offset(0, -1)
    }
}

/// Oracle answering whether ground exists at a tile.
pub trait TerrainOracle {
    /// Reports whether the tile carries ground.
    fn has_tile(&self, tile: TileCoord) -> bool;
}

impl<T: TerrainOracle + ?Sized> TerrainOracle for &T {
    fn has_tile(&self, tile: TileCoord) -> bool {
        (**self).has_tile(tile)
    }
}
