//! Random-walk grass growth stamped over existing ground.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_core::{DecorationTuning, TerrainOracle, Thickness, TileCoord};

use crate::{probability, stream_seed, TerrainMap, RNG_STREAM_DECORATION};

const MIN_PATCH_SIZE: f64 = 6.0;
const MAX_PATCH_SIZE: f64 = 48.0;

const CARDINALS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONALS: [(i32, i32); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Grass density painted on ground tiles. Each tile is painted at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecorationOverlay {
    cells: BTreeMap<TileCoord, Thickness>,
}

impl DecorationOverlay {
    /// Number of decorated tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Reports whether nothing was painted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Density bucket painted on the tile, if any.
    #[must_use]
    pub fn thickness_at(&self, tile: TileCoord) -> Option<Thickness> {
        self.cells.get(&tile).copied()
    }

    /// Iterates decorated tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, Thickness)> + '_ {
        self.cells.iter().map(|(tile, thickness)| (*tile, *thickness))
    }
}

/// Grows grass patches over the terrain until `coverage` of it is painted.
///
/// Every random decision is drawn from a single seeded generator in a fixed
/// order, so identical inputs produce identical overlays.
#[must_use]
pub fn grow_decorations(
    terrain: &TerrainMap,
    seed: u64,
    tuning: &DecorationTuning,
) -> DecorationOverlay {
    let mut overlay = DecorationOverlay::default();
    let tiles: Vec<TileCoord> = terrain.tiles().collect();
    if tiles.is_empty() {
        return overlay;
    }

    let target = (tiles.len() as f64 * probability(tuning.coverage)).round() as usize;
    if target == 0 {
        return overlay;
    }

    let plan = WalkPlan::derive(target, tuning);
    let mut painter = Painter {
        terrain,
        tuning: Probabilities::from(tuning),
        plan,
        target,
        overlay: &mut overlay,
        rng: ChaCha8Rng::seed_from_u64(stream_seed(seed, RNG_STREAM_DECORATION)),
    };

    for _ in 0..plan.patch_count {
        if painter.done() {
            break;
        }
        let origin = tiles[painter.rng.gen_range(0..tiles.len())];
        painter.walk(origin, plan.steps, 0, true);
    }

    overlay
}

/// Sizes derived once from the target tile count and the tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WalkPlan {
    patch_count: usize,
    steps: usize,
    branch_steps: usize,
    thick_until: usize,
    medium_until: usize,
    radius_min: u32,
    radius_max: u32,
}

impl WalkPlan {
    fn derive(target: usize, tuning: &DecorationTuning) -> Self {
        let patchiness = probability(tuning.patchiness);
        let avg_patch_size = MIN_PATCH_SIZE + (MAX_PATCH_SIZE - MIN_PATCH_SIZE) * patchiness;
        let patch_count = ((target as f64 / avg_patch_size).ceil() as usize).max(1);

        let radius_min = tuning.brush_radius_min.min(tuning.brush_radius_max);
        let radius_max = tuning.brush_radius_min.max(tuning.brush_radius_max);
        let avg_radius = (f64::from(radius_min) + f64::from(radius_max)) / 2.0;
        // A brush sweeping one tile forward uncovers roughly one diameter of new cells.
        let swept = 2.0 * avg_radius + 1.0;
        let steps = ((avg_patch_size / swept).ceil() as usize).max(1);

        Self {
            patch_count,
            steps,
            branch_steps: (steps / 2).max(1),
            thick_until: steps.div_ceil(3),
            medium_until: (2 * steps).div_ceil(3),
            radius_min,
            radius_max,
        }
    }

    fn bucket(&self, step: usize) -> Thickness {
        if step < self.thick_until {
            Thickness::Thick
        } else if step < self.medium_until {
            Thickness::Medium
        } else {
            Thickness::Thin
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Probabilities {
    persistence: f64,
    diagonal: f64,
    recenter: f64,
    branch: f64,
    density: f64,
}

impl From<&DecorationTuning> for Probabilities {
    fn from(tuning: &DecorationTuning) -> Self {
        Self {
            persistence: probability(tuning.direction_persistence),
            diagonal: probability(tuning.diagonal_probability),
            recenter: probability(tuning.recenter_probability),
            branch: probability(tuning.branch_probability),
            density: probability(tuning.density),
        }
    }
}

struct Painter<'a> {
    terrain: &'a TerrainMap,
    tuning: Probabilities,
    plan: WalkPlan,
    target: usize,
    overlay: &'a mut DecorationOverlay,
    rng: ChaCha8Rng,
}

impl Painter<'_> {
    fn done(&self) -> bool {
        self.overlay.len() >= self.target
    }

    fn walk(&mut self, origin: TileCoord, steps: usize, bias: usize, may_branch: bool) {
        let mut position = origin;
        let mut heading = CARDINALS[self.rng.gen_range(0..CARDINALS.len())];
        let mut branched = !may_branch;

        for step in 0..steps {
            if self.done() {
                return;
            }

            let radius = self
                .rng
                .gen_range(self.plan.radius_min..=self.plan.radius_max);
            self.stamp(position, radius, self.plan.bucket(step + bias));

            if !branched && self.rng.gen_bool(self.tuning.branch) {
                branched = true;
                let (branch_steps, branch_bias) = (self.plan.branch_steps, self.plan.thick_until);
                self.walk(position, branch_steps, branch_bias, false);
            }

            if self.rng.gen_bool(self.tuning.recenter) {
                position = origin;
                continue;
            }

            if !self.rng.gen_bool(self.tuning.persistence) {
                heading = self.reroll(heading);
            }

            let next = position.offset(heading.0, heading.1);
            if self.terrain.has_tile(next) {
                position = next;
            } else {
                heading = self.reroll(heading);
            }
        }
    }

    fn reroll(&mut self, current: (i32, i32)) -> (i32, i32) {
        let pool = if self.rng.gen_bool(self.tuning.diagonal) {
            DIAGONALS
        } else {
            CARDINALS
        };
        let reverse = (-current.0, -current.1);
        let candidates: Vec<(i32, i32)> = pool
            .into_iter()
            .filter(|direction| *direction != reverse)
            .collect();
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    fn stamp(&mut self, center: TileCoord, radius: u32, thickness: Thickness) {
        // Nothing beyond one map side can land on ground.
        let reach = i64::from(radius.min(self.terrain.side_tiles()));
        let reach_squared = reach * reach;
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                if dx * dx + dy * dy > reach_squared {
                    continue;
                }
                let tile = center.offset(dx as i32, dy as i32);
                if !self.terrain.has_tile(tile) || self.overlay.cells.contains_key(&tile) {
                    continue;
                }
                if self.rng.gen_bool(self.tuning.density) {
                    let _ = self.overlay.cells.insert(tile, thickness);
                    if self.done() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain() -> TerrainMap {
        TerrainMap::build(5, 4, 0).expect("valid terrain")
    }

    #[test]
    fn identical_inputs_produce_identical_overlays() {
        let terrain = terrain();
        let tuning = DecorationTuning::default();
        let first = grow_decorations(&terrain, 1234, &tuning);
        let second = grow_decorations(&terrain, 1234, &tuning);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_diverge() {
        let terrain = terrain();
        let tuning = DecorationTuning::default();
        assert_ne!(
            grow_decorations(&terrain, 1, &tuning),
            grow_decorations(&terrain, 2, &tuning)
        );
    }

    #[test]
    fn decoration_stays_on_ground_and_under_target() {
        let terrain = terrain();
        let tuning = DecorationTuning {
            coverage: 0.5,
            density: 1.0,
            ..DecorationTuning::default()
        };
        let overlay = grow_decorations(&terrain, 77, &tuning);
        let target = (terrain.len() as f64 * 0.5).round() as usize;

        assert!(overlay.len() <= target);
        assert!(overlay.iter().all(|(tile, _)| terrain.has_tile(tile)));
    }

    #[test]
    fn zero_coverage_paints_nothing() {
        let tuning = DecorationTuning {
            coverage: 0.0,
            ..DecorationTuning::default()
        };
        assert!(grow_decorations(&terrain(), 5, &tuning).is_empty());
    }

    #[test]
    fn full_density_full_coverage_reaches_target() {
        let terrain = TerrainMap::build(3, 1, 0).expect("valid terrain");
        let tuning = DecorationTuning {
            coverage: 1.0,
            density: 1.0,
            brush_radius_min: 3,
            brush_radius_max: 3,
            recenter_probability: 0.0,
            ..DecorationTuning::default()
        };
        let overlay = grow_decorations(&terrain, 3, &tuning);
        assert_eq!(overlay.len(), terrain.len());
    }

    #[test]
    fn oversized_brush_stays_on_ground() {
        let terrain = TerrainMap::build(3, 1, 0).expect("valid terrain");
        let tuning = DecorationTuning {
            brush_radius_min: 50_000,
            brush_radius_max: 50_000,
            ..DecorationTuning::default()
        };
        let overlay = grow_decorations(&terrain, 1, &tuning);

        assert!(!overlay.is_empty());
        assert!(overlay.iter().all(|(tile, _)| terrain.has_tile(tile)));
    }

    #[test]
    fn buckets_progress_from_thick_to_thin() {
        let plan = WalkPlan::derive(100, &DecorationTuning::default());
        assert_eq!(plan.bucket(0), Thickness::Thick);
        assert_eq!(plan.bucket(plan.thick_until), Thickness::Medium);
        assert_eq!(plan.bucket(plan.medium_until), Thickness::Thin);
        assert!(plan.thick_until <= plan.medium_until);
        assert!(plan.medium_until <= plan.steps);
    }
}
