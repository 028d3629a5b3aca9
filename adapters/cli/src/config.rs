//! Settings file loading.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use skirmish_core::MapConfig;

/// Contents of a settings file. Every table and key is optional.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Generation and simulation parameters.
    pub(crate) map: MapConfig,
    /// Scripted run performed by the CLI.
    pub(crate) scenario: ScenarioSettings,
}

/// Parameters of the scripted run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct ScenarioSettings {
    /// Teams that field one character at their base.
    pub(crate) teams: Vec<u8>,
    /// Chunk every character is sent to, as `[x, y]`.
    pub(crate) mission_chunk: [i32; 2],
    /// Ticks simulated before giving up on completion.
    pub(crate) max_ticks: u32,
    /// Simulated milliseconds per tick.
    pub(crate) tick_ms: u64,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            teams: vec![0],
            mission_chunk: [2, 2],
            max_ticks: 400,
            tick_ms: 250,
        }
    }
}

/// Reads settings from the path, or returns the defaults without one.
pub(crate) fn load(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings from {}", path.display()))?;
    parse(&contents).with_context(|| format!("invalid settings in {}", path.display()))
}

/// Parses and validates settings from TOML text.
pub(crate) fn parse(contents: &str) -> Result<Settings> {
    let settings: Settings = toml::from_str(contents).context("failed to parse settings toml")?;
    settings
        .map
        .validate()
        .context("map configuration out of range")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = parse("").expect("empty settings are valid");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.map.chunk_size, 5);
        assert_eq!(settings.scenario.mission_chunk, [2, 2]);
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let settings = parse(
            r#"
            [map]
            seed = 7
            coin_chance = 0.2

            [map.decoration]
            coverage = 0.5

            [scenario]
            teams = [0, 3]
            "#,
        )
        .expect("valid settings");

        assert_eq!(settings.map.seed, 7);
        assert_eq!(settings.map.map_size, 3);
        assert!((settings.map.decoration.coverage - 0.5).abs() < f32::EPSILON);
        assert!((settings.map.decoration.density - 0.85).abs() < f32::EPSILON);
        assert_eq!(settings.scenario.teams, vec![0, 3]);
        assert_eq!(settings.scenario.tick_ms, 250);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let error = parse("[map]\nchunk_size = 2\n").expect_err("chunk too small");
        assert!(format!("{error:#}").contains("chunk size 2"));
    }

    #[test]
    fn missing_file_reports_path() {
        let error = load(Some(Path::new("/nonexistent/skirmish.toml"))).expect_err("missing file");
        assert!(format!("{error}").contains("/nonexistent/skirmish.toml"));
    }
}
