#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic terrain generation: chunk tiling, border classification,
//! grass growth, coin scattering and structure placement.
//!
//! Base terrain carries no randomness. Every random layer draws from its own
//! ChaCha stream derived from the map seed, so identical configurations yield
//! bit-identical maps.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{
    CoinAmount, ConfigError, Corner, MapConfig, Side, Structure, Team, TerrainOracle, TileClass,
    TileCoord,
};
use tracing::debug;

pub mod decoration;

pub use decoration::{grow_decorations, DecorationOverlay};

/// Stream label mixed into the seed for grass growth.
pub const RNG_STREAM_DECORATION: u64 = 0x6465_636f_7261_7465;
/// Stream label mixed into the seed for coin placement.
pub const RNG_STREAM_COINS: u64 = 0x636f_696e_735f_7631;

/// Ground tiles of the map keyed by coordinate.
///
/// The default value is a map without any ground.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TerrainMap {
    chunk_size: u32,
    map_size: u32,
    seed: u64,
    tiles: BTreeMap<TileCoord, TileClass>,
}

impl TerrainMap {
    /// Tiles every chunk in `[0, map_size)²` and classifies each tile.
    ///
    /// The seed is recorded for the random layers built on top; the base
    /// terrain itself is a pure function of chunk-local position.
    pub fn build(chunk_size: u32, map_size: u32, seed: u64) -> Result<Self, ConfigError> {
        if chunk_size < 3 {
            return Err(ConfigError::ChunkTooSmall(chunk_size));
        }
        if map_size == 0 {
            return Err(ConfigError::EmptyMap);
        }

        let mut tiles = BTreeMap::new();
        let side = chunk_size as i32;
        for cy in 0..map_size as i32 {
            for cx in 0..map_size as i32 {
                for y in 0..chunk_size {
                    for x in 0..chunk_size {
                        let tile = TileCoord::new(cx * side + x as i32, cy * side + y as i32);
                        let _ = tiles.insert(tile, classify(x, y, chunk_size));
                    }
                }
            }
        }

        Ok(Self {
            chunk_size,
            map_size,
            seed,
            tiles,
        })
    }

    /// Side length of a chunk in tiles.
    #[must_use]
    pub const fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Side length of the map in chunks.
    #[must_use]
    pub const fn map_size(&self) -> u32 {
        self.map_size
    }

    /// Seed the map was generated from.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Side length of the whole map in tiles.
    #[must_use]
    pub const fn side_tiles(&self) -> u32 {
        self.chunk_size * self.map_size
    }

    /// Number of ground tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the map has no ground at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Classification of the tile, if ground exists there.
    #[must_use]
    pub fn class_at(&self, tile: TileCoord) -> Option<TileClass> {
        self.tiles.get(&tile).copied()
    }

    /// Iterates ground tiles and their classification in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, TileClass)> + '_ {
        self.tiles.iter().map(|(tile, class)| (*tile, *class))
    }

    /// Iterates ground tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.keys().copied()
    }
}

impl TerrainOracle for TerrainMap {
    fn has_tile(&self, tile: TileCoord) -> bool {
        self.tiles.contains_key(&tile)
    }
}

/// Classifies a chunk-local position for a chunk of side `n`.
///
/// Corners take priority over single-edge matches.
#[must_use]
pub fn classify(x: u32, y: u32, n: u32) -> TileClass {
    let last = n.saturating_sub(1);
    let west = x == 0;
    let east = x == last;
    let north = y == 0;
    let south = y == last;

    match (west, east, north, south) {
        (true, _, true, _) => TileClass::Corner(Corner::NorthWest),
        (_, true, true, _) => TileClass::Corner(Corner::NorthEast),
        (true, _, _, true) => TileClass::Corner(Corner::SouthWest),
        (_, true, _, true) => TileClass::Corner(Corner::SouthEast),
        (_, _, true, _) => TileClass::Edge(Side::North),
        (_, _, _, true) => TileClass::Edge(Side::South),
        (true, _, _, _) => TileClass::Edge(Side::West),
        (_, true, _, _) => TileClass::Edge(Side::East),
        _ => TileClass::Interior,
    }
}

/// Every layer produced by one generation pass.
#[derive(Clone, Debug, Default)]
pub struct GeneratedMap {
    /// Ground tiles and their classification.
    pub terrain: TerrainMap,
    /// Grass density painted over the ground.
    pub decorations: DecorationOverlay,
    /// Coins scattered over the ground in row-major order.
    pub coins: Vec<(TileCoord, CoinAmount)>,
    /// Structures standing on the corner chunks.
    pub structures: Vec<Structure>,
}

/// Runs every generation stage for the provided configuration.
pub fn generate(config: &MapConfig) -> Result<GeneratedMap, ConfigError> {
    config.validate()?;

    let terrain = TerrainMap::build(config.chunk_size, config.map_size, config.seed)?;
    let decorations = grow_decorations(&terrain, config.seed, &config.decoration);
    let coins = place_coins(&terrain, config.seed, config.coin_chance);
    let structures = structure_sites(&terrain);

    debug!(
        tiles = terrain.len(),
        decorated = decorations.len(),
        coins = coins.len(),
        structures = structures.len(),
        seed = config.seed,
        "map generated"
    );

    Ok(GeneratedMap {
        terrain,
        decorations,
        coins,
        structures,
    })
}

/// Scans the full map rectangle and drops a coin on ground tiles with probability `coin_chance`.
#[must_use]
pub fn place_coins(terrain: &TerrainMap, seed: u64, coin_chance: f32) -> Vec<(TileCoord, CoinAmount)> {
    let chance = probability(coin_chance);
    let mut rng = ChaCha8Rng::seed_from_u64(stream_seed(seed, RNG_STREAM_COINS));
    let side = terrain.side_tiles() as i32;
    let mut coins = Vec::new();

    for y in 0..side {
        for x in 0..side {
            let tile = TileCoord::new(x, y);
            if !terrain.has_tile(tile) {
                continue;
            }
            if rng.gen_bool(chance) {
                let amount = CoinAmount::ALL[rng.gen_range(0..CoinAmount::ALL.len())];
                coins.push((tile, amount));
            }
        }
    }

    coins
}

/// Places one structure at the centre of each corner chunk.
///
/// On a single-chunk map all corners coincide and only the first team's
/// structure is kept. Even chunk sizes have no exact centre; the tile just
/// south-east of the middle is used.
#[must_use]
pub fn structure_sites(terrain: &TerrainMap) -> Vec<Structure> {
    if terrain.chunk_size() % 2 == 0 {
        debug!(
            chunk_size = terrain.chunk_size(),
            "even chunk size, structures sit off-centre"
        );
    }

    let mut structures: Vec<Structure> = Vec::with_capacity(Team::ALL.len());
    for team in Team::ALL {
        let base = team
            .base_chunk(terrain.map_size())
            .center(terrain.chunk_size());
        if !terrain.has_tile(base) || structures.iter().any(|existing| existing.base == base) {
            continue;
        }
        structures.push(Structure { base, team });
    }
    structures
}

/// Mixes a stream label into the map seed.
#[must_use]
pub const fn stream_seed(seed: u64, label: u64) -> u64 {
    (seed ^ label).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

pub(crate) fn probability(value: f32) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        f64::from(value).clamp(0.0, 1.0)
    }
}
