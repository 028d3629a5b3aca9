//! Generation and simulation parameters recognised by the world.

use serde::Deserialize;
use thiserror::Error;

/// Every parameter that shapes a generated map and the characters on it.
///
/// Changing any field regenerates the whole map.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Side length of a chunk in tiles. Must be at least 3.
    pub chunk_size: u32,
    /// Side length of the map in chunks. Must be at least 1.
    pub map_size: u32,
    /// Seed feeding every random stream used during generation.
    pub seed: u64,
    /// Probability that a ground tile receives a coin.
    pub coin_chance: f32,
    /// Half-width of the square each character scans every tick.
    pub vision_radius: u32,
    /// Movement speed in tiles per second.
    pub speed: f32,
    /// Health assigned to freshly spawned characters.
    pub max_health: u32,
    /// Seconds a character waits after finding its next tile blocked by a friend.
    pub blocked_retry_delay: f32,
    /// Chebyshev radius around spotted enemies that planned paths steer clear of.
    pub enemy_avoid_radius: u32,
    /// Extra step cost inside the avoidance radius. Zero disables avoidance.
    pub enemy_avoid_penalty: u32,
    /// Grass-blob growth parameters.
    pub decoration: DecorationTuning,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            map_size: 3,
            seed: 42,
            coin_chance: 0.05,
            vision_radius: 2,
            speed: 4.0,
            max_health: 10,
            blocked_retry_delay: 0.5,
            enemy_avoid_radius: 1,
            enemy_avoid_penalty: 0,
            decoration: DecorationTuning::default(),
        }
    }
}

impl MapConfig {
    /// Checks every field against its documented range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < 3 {
            return Err(ConfigError::ChunkTooSmall(self.chunk_size));
        }
        if self.map_size == 0 {
            return Err(ConfigError::EmptyMap);
        }
        check_probability("coin_chance", self.coin_chance)?;
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ConfigError::InvalidSpeed);
        }
        if !self.blocked_retry_delay.is_finite() || self.blocked_retry_delay < 0.0 {
            return Err(ConfigError::InvalidRetryDelay);
        }
        if self.max_health == 0 {
            return Err(ConfigError::ZeroHealth);
        }
        self.decoration.validate()?;
        let limit = self.map_tiles();
        if self.decoration.brush_radius_max > limit {
            return Err(ConfigError::BrushTooLarge {
                radius: self.decoration.brush_radius_max,
                limit,
            });
        }
        Ok(())
    }

    /// Side length of the whole map in tiles.
    #[must_use]
    pub fn map_tiles(&self) -> u32 {
        self.chunk_size.saturating_mul(self.map_size)
    }
}

/// Knobs controlling the random-walk grass growth.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecorationTuning {
    /// Fraction of ground tiles to decorate.
    pub coverage: f32,
    /// Low values favour many small patches, high values few large ones.
    pub patchiness: f32,
    /// Smallest brush radius stamped per step.
    pub brush_radius_min: u32,
    /// Largest brush radius stamped per step.
    pub brush_radius_max: u32,
    /// Probability of keeping the current walk direction.
    pub direction_persistence: f32,
    /// Probability that a re-rolled direction is diagonal.
    pub diagonal_probability: f32,
    /// Probability of jumping back to the patch origin after a step.
    pub recenter_probability: f32,
    /// Probability of spawning one short branch walk per patch.
    pub branch_probability: f32,
    /// Probability that a cell inside the brush is painted.
    pub density: f32,
}

impl Default for DecorationTuning {
    fn default() -> Self {
        Self {
            coverage: 0.3,
            patchiness: 0.5,
            brush_radius_min: 1,
            brush_radius_max: 2,
            direction_persistence: 0.7,
            diagonal_probability: 0.25,
            recenter_probability: 0.05,
            branch_probability: 0.1,
            density: 0.85,
        }
    }
}

impl DecorationTuning {
    /// Checks every probability and the brush range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_probability("coverage", self.coverage)?;
        check_probability("patchiness", self.patchiness)?;
        check_probability("direction_persistence", self.direction_persistence)?;
        check_probability("diagonal_probability", self.diagonal_probability)?;
        check_probability("recenter_probability", self.recenter_probability)?;
        check_probability("branch_probability", self.branch_probability)?;
        check_probability("density", self.density)?;
        if self.brush_radius_min > self.brush_radius_max {
            return Err(ConfigError::InvertedBrushRange {
                min: self.brush_radius_min,
                max: self.brush_radius_max,
            });
        }
        Ok(())
    }
}

fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange(field))
    }
}

/// Reasons a configuration is refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Chunks need room for corners, edges and an interior.
    #[error("chunk size {0} is below the minimum of 3")]
    ChunkTooSmall(u32),
    /// The map must contain at least one chunk.
    #[error("map size must be at least 1")]
    EmptyMap,
    /// A probability lies outside `[0, 1]` or is not a number.
    #[error("{0} must lie within [0, 1]")]
    ProbabilityOutOfRange(&'static str),
    /// Speed must be a finite, non-negative number.
    #[error("speed must be finite and non-negative")]
    InvalidSpeed,
    /// Retry delay must be a finite, non-negative number.
    #[error("blocked retry delay must be finite and non-negative")]
    InvalidRetryDelay,
    /// Characters need at least one point of health.
    #[error("max health must be at least 1")]
    ZeroHealth,
    /// The smallest brush exceeds the largest.
    #[error("brush radius range {min}..={max} is inverted")]
    InvertedBrushRange {
        /// Configured minimum radius.
        min: u32,
        /// Configured maximum radius.
        max: u32,
    },
    /// The largest brush is wider than the map itself.
    #[error("brush radius {radius} exceeds the map side of {limit} tiles")]
    BrushTooLarge {
        /// Configured maximum radius.
        radius: u32,
        /// Map side length in tiles.
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(MapConfig::default().validate(), Ok(()));
    }

    #[test]
    fn small_chunks_are_rejected() {
        let config = MapConfig {
            chunk_size: 2,
            ..MapConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ChunkTooSmall(2)));
    }

    #[test]
    fn nan_probability_is_rejected() {
        let mut config = MapConfig::default();
        config.decoration.density = f32::NAN;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ProbabilityOutOfRange("density"))
        );
    }

    #[test]
    fn inverted_brush_is_rejected() {
        let mut config = MapConfig::default();
        config.decoration.brush_radius_min = 3;
        config.decoration.brush_radius_max = 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedBrushRange { min: 3, max: 1 })
        );
    }

    #[test]
    fn brush_wider_than_map_is_rejected() {
        let mut config = MapConfig::default();
        config.decoration.brush_radius_min = 50_000;
        config.decoration.brush_radius_max = 50_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::BrushTooLarge {
                radius: 50_000,
                limit: 15
            })
        );

        config.decoration.brush_radius_min = 15;
        config.decoration.brush_radius_max = 15;
        assert_eq!(config.validate(), Ok(()));
    }
}
