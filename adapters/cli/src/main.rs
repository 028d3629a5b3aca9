#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless runner: generates a map, plays a scripted mission and prints
//! the result as ASCII.

mod config;
mod scenario;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use skirmish_rendering::{SceneBinding, TextSurface};
use skirmish_world::{query, World};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Skirmish scenario runner", long_about = None)]
struct Args {
    /// TOML file with optional `[map]` and `[scenario]` tables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the map seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the number of ticks simulated before giving up.
    #[arg(long)]
    ticks: Option<u32>,

    /// Skips printing the final map.
    #[arg(long, default_value_t = false)]
    no_map: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut settings = config::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        settings.map.seed = seed;
    }
    if let Some(ticks) = args.ticks {
        settings.scenario.max_ticks = ticks;
    }

    let mut world = World::with_config(settings.map).context("invalid map configuration")?;
    let map = query::config(&world);
    println!(
        "skirmish: {size}x{size} chunks of {chunk} tiles, seed {seed}",
        size = map.map_size,
        chunk = map.chunk_size,
        seed = map.seed
    );

    let outcome = scenario::run(&mut world, &settings.scenario)?;
    println!(
        "ticks: {}, completed: {}, moves: {}, rejected commands: {}",
        outcome.ticks, outcome.completed, outcome.moves, outcome.rejections
    );
    for (team, coins) in &outcome.team_coins {
        println!("team {team}: {coins} coins");
    }

    if !args.no_map {
        let mut binding = SceneBinding::bind(Some(TextSurface::new()));
        let _ = binding.rebuild(&world);
        if let Some(surface) = binding.surface() {
            surface.write_ascii(&mut io::stdout().lock())?;
        }
    }

    Ok(())
}
