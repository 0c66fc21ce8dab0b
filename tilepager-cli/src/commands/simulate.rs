//! Page a grid of tiles in rounds.
//!
//! Each round requests every tile of the grid, holds them all, then lets
//! them go and ticks the director. With an in-memory bin, later rounds are
//! served from the bin while the shared caches are released between rounds.

use crate::error::CliError;
use crate::runner::CliRunner;
use clap::Args;
use std::sync::Arc;
use std::time::Instant;
use tilepager::cache::{CacheBin, MemoryCacheBin};
use tilepager::coord::TileProfile;
use tilepager::director::{PagerConfig, PagingDirector, ResidentTile};

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Tile level
    #[arg(long)]
    pub level: u32,

    /// Number of request/release rounds
    #[arg(long, default_value_t = 3)]
    pub rounds: usize,

    /// Grid edge length in tiles, starting at the north-west corner
    #[arg(long, default_value_t = 4)]
    pub grid: u32,

    /// Number of synthetic features per tile
    #[arg(long, default_value_t = 24)]
    pub features: usize,

    /// Use the configured disk bin instead of an in-memory one
    #[arg(long)]
    pub disk: bool,
}

pub fn run(runner: &CliRunner, args: SimulateArgs) -> Result<(), CliError> {
    runner.log_startup("simulate");
    let profile = TileProfile::global_geodetic();
    let (tiles_x, tiles_y) = profile.num_tiles(args.level);
    let keys = (0..args.grid.min(tiles_y))
        .flat_map(|y| (0..args.grid.min(tiles_x)).map(move |x| (x, y)))
        .map(|(x, y)| super::resolve_key(args.level, x, y))
        .collect::<Result<Vec<_>, _>>()?;

    let bin: Option<Arc<dyn CacheBin>> = if args.disk {
        None
    } else {
        Some(Arc::new(MemoryCacheBin::new(
            "simulate",
            runner.config().cache.memory_size,
        )))
    };
    let bench = runner.workbench(args.level, args.features, bin)?;
    let config = PagerConfig::from(runner.config());
    let director = PagingDirector::new(bench.builder, config).map_err(CliError::Startup)?;

    println!(
        "Simulating {} tiles at level {} for {} rounds ({} workers)",
        keys.len(),
        args.level,
        args.rounds,
        director.config().workers
    );

    for round in 1..=args.rounds {
        let started = Instant::now();
        let pending: Vec<_> = keys.iter().map(|key| director.request(*key)).collect();
        let tiles = pending
            .into_iter()
            .map(|p| p.wait())
            .collect::<Result<Vec<ResidentTile>, _>>()?;
        let elapsed = started.elapsed();

        let from_cache = tiles.iter().filter(|t| t.is_from_cache()).count();
        let placements: usize = tiles.iter().map(|t| t.content.placement_count()).sum();
        let caches = bench.manager.stats();
        println!();
        println!("Round {} ({:.1} ms)", round, elapsed.as_secs_f64() * 1000.0);
        println!("  Tiles:      {} ({} from bin)", tiles.len(), from_cache);
        println!("  Placements: {}", placements);
        println!(
            "  Resources:  {} (hit rate {:.1}%)",
            caches.resources.entries,
            caches.resources.hit_rate() * 100.0
        );
        println!(
            "  Arenas:     {} models, {} textures live",
            caches.chonks.live, caches.textures.live
        );
        println!("  States:     {}", caches.states);
        println!("  Resident:   {}", director.resident_count());

        drop(tiles);
        let report = director.tick();
        match report.released {
            Some(summary) => println!(
                "  Idle release: {} resources, {} states, {} arena entries",
                summary.resources, summary.states, summary.arena_entries
            ),
            None => println!("  Idle release: none"),
        }
    }

    let stats = director.stats();
    println!();
    println!("Director: {}", stats);
    println!("Feature cursors opened: {}", bench.source.cursors_created());
    director.shutdown();
    Ok(())
}
