#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid A* over ground tiles with friendly blocking and an enemy-avoidance
//! cost field.
//!
//! Searches are 4-connected with unit step cost and a Manhattan heuristic.
//! Among open nodes with equal f-score the one queued first is expanded first,
//! which keeps results reproducible from run to run.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

use skirmish_core::{TerrainOracle, TileCoord};
use tracing::{debug, info};

/// Extra cost charged for stepping near known enemies.
///
/// An inert field (no enemies or zero penalty) leaves every step at unit cost,
/// reducing the search to the base algorithm.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvoidanceField {
    enemy_tiles: Vec<TileCoord>,
    radius: u32,
    penalty: u32,
}

impl AvoidanceField {
    /// Creates a field that charges `penalty` for every cell within Chebyshev
    /// `radius` of an enemy tile.
    #[must_use]
    pub fn new(enemy_tiles: Vec<TileCoord>, radius: u32, penalty: u32) -> Self {
        Self {
            enemy_tiles,
            radius,
            penalty,
        }
    }

    /// Field that never biases the search.
    #[must_use]
    pub fn inert() -> Self {
        Self::default()
    }

    /// Reports whether the field leaves every step at unit cost.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        self.penalty == 0 || self.enemy_tiles.is_empty()
    }

    /// Cost of stepping onto the provided tile.
    #[must_use]
    pub fn step_cost(&self, tile: TileCoord) -> u32 {
        if self.is_inert() {
            return 1;
        }
        let threatened = self
            .enemy_tiles
            .iter()
            .any(|enemy| enemy.chebyshev_distance(tile) <= self.radius);
        if threatened {
            1 + self.penalty
        } else {
            1
        }
    }
}

/// Reusable A* workspace.
///
/// Holding one instance across searches keeps the open set and score maps
/// allocated between replans.
#[derive(Debug, Default)]
pub struct Pathfinder {
    open: BinaryHeap<OpenNode>,
    came_from: HashMap<TileCoord, TileCoord>,
    g_score: HashMap<TileCoord, u32>,
    closed: HashSet<TileCoord>,
    sequence: u64,
    expanded: usize,
}

impl Pathfinder {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes expanded by the most recent search.
    #[must_use]
    pub fn last_expanded(&self) -> usize {
        self.expanded
    }

    /// Finds a route from `start` to `goal`.
    ///
    /// The returned tiles run from the first step to `goal`, excluding
    /// `start`. The result is empty when `start == goal`, when either endpoint
    /// has no ground, or when no route exists. `is_friendly` reports tiles held
    /// by the requesting unit's team; those are impassable except for `goal`,
    /// whose occupant is expected to move away.
    pub fn find_path<T, F>(
        &mut self,
        start: TileCoord,
        goal: TileCoord,
        terrain: &T,
        is_friendly: F,
    ) -> Vec<TileCoord>
    where
        T: TerrainOracle + ?Sized,
        F: Fn(TileCoord) -> bool,
    {
        self.find_path_avoiding(start, goal, terrain, is_friendly, &AvoidanceField::inert())
    }

    /// Variant of [`Pathfinder::find_path`] that biases step costs near enemies.
    pub fn find_path_avoiding<T, F>(
        &mut self,
        start: TileCoord,
        goal: TileCoord,
        terrain: &T,
        is_friendly: F,
        avoidance: &AvoidanceField,
    ) -> Vec<TileCoord>
    where
        T: TerrainOracle + ?Sized,
        F: Fn(TileCoord) -> bool,
    {
        self.reset();

        if start == goal || !terrain.has_tile(start) || !terrain.has_tile(goal) {
            return Vec::new();
        }

        let _ = self.g_score.insert(start, 0);
        self.push(start, start.manhattan_distance(goal));

        while let Some(node) = self.open.pop() {
            if node.tile == goal {
                let path = self.reconstruct(start, goal);
                debug!(%start, %goal, steps = path.len(), expanded = self.expanded, "path found");
                return path;
            }

            if !self.closed.insert(node.tile) {
                continue;
            }
            self.expanded += 1;

            let current_g = self.g_score.get(&node.tile).copied().unwrap_or(u32::MAX);
            for neighbor in node.tile.neighbors() {
                if self.closed.contains(&neighbor) || !terrain.has_tile(neighbor) {
                    continue;
                }
                if neighbor != goal && is_friendly(neighbor) {
                    continue;
                }

                let tentative = current_g.saturating_add(avoidance.step_cost(neighbor));
                let known = self.g_score.get(&neighbor).copied().unwrap_or(u32::MAX);
                if tentative >= known {
                    continue;
                }

                let _ = self.came_from.insert(neighbor, node.tile);
                let _ = self.g_score.insert(neighbor, tentative);
                self.push(
                    neighbor,
                    tentative.saturating_add(neighbor.manhattan_distance(goal)),
                );
            }
        }

        info!(%start, %goal, expanded = self.expanded, "no path");
        Vec::new()
    }

    fn reset(&mut self) {
        self.open.clear();
        self.came_from.clear();
        self.g_score.clear();
        self.closed.clear();
        self.sequence = 0;
        self.expanded = 0;
    }

    fn push(&mut self, tile: TileCoord, f_score: u32) {
        self.open.push(OpenNode {
            tile,
            f_score,
            sequence: self.sequence,
        });
        self.sequence += 1;
    }

    fn reconstruct(&self, start: TileCoord, goal: TileCoord) -> Vec<TileCoord> {
        let mut path = vec![goal];
        let mut cursor = goal;
        while let Some(&previous) = self.came_from.get(&cursor) {
            if previous == start {
                break;
            }
            path.push(previous);
            cursor = previous;
        }
        path.reverse();
        path
    }
}

/// Convenience wrapper running a single search with a throwaway workspace.
pub fn find_path<T, F>(start: TileCoord, goal: TileCoord, terrain: &T, is_friendly: F) -> Vec<TileCoord>
where
    T: TerrainOracle + ?Sized,
    F: Fn(TileCoord) -> bool,
{
    Pathfinder::new().find_path(start, goal, terrain, is_friendly)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OpenNode {
    tile: TileCoord,
    f_score: u32,
    sequence: u64,
}

impl Ord for OpenNode {
    // Reversed so the max-heap yields the lowest f-score, oldest first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
