//! Build a single tile.

use crate::error::CliError;
use crate::runner::CliRunner;
use clap::Args;
use std::time::Instant;
use tilepager::compiled::CompiledTile;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Tile level
    #[arg(long)]
    pub level: u32,

    /// Tile column (0 = west edge)
    #[arg(long)]
    pub x: u32,

    /// Tile row (0 = north edge)
    #[arg(long)]
    pub y: u32,

    /// Number of synthetic features in the tile
    #[arg(long, default_value_t = 24)]
    pub features: usize,

    /// Store the tile under this name instead of its level_x_y key
    #[arg(long)]
    pub name: Option<String>,
}

pub fn run(runner: &CliRunner, args: BuildArgs) -> Result<(), CliError> {
    runner.log_startup("build");
    let key = super::resolve_key(args.level, args.x, args.y)?;
    let bench = runner.workbench(args.level, args.features, None)?;

    let started = Instant::now();
    let cancel = CancellationToken::new();
    let tile = match &args.name {
        Some(name) => bench.builder.build_as(name, name, &key, &cancel)?,
        None => bench.builder.build(&key, &cancel)?,
    };
    let elapsed = started.elapsed();
    info!(tile = %key, origin = %tile.origin, "CLI build finished");

    print_summary(&tile);
    println!("  Elapsed:         {:.1} ms", elapsed.as_secs_f64() * 1000.0);
    println!(
        "  Bin:             {}/{}",
        runner.config().cache.directory.display(),
        runner.config().cache.bin
    );
    Ok(())
}

pub(crate) fn print_summary(tile: &CompiledTile) {
    let content = &tile.content;
    println!("Tile {} ({})", tile.name, tile.origin);
    println!("  Cache key:       {}", tile.cache_key);
    println!("  Features:        {}", content.feature_count);
    println!("  Batches:         {}", content.batches.len());
    println!("  Vertices:        {}", content.vertex_count());
    println!("  Instance groups: {}", content.instance_groups.len());
    println!("  Placements:      {}", content.placement_count());
    println!("  Range:           {:.0} m", content.range);
    println!("  Shared objects:  {}", tile.resources.len());
    if !tile.warnings.is_empty() {
        println!("  Warnings:");
        for warning in &tile.warnings {
            println!("    - {}", warning);
        }
    }
}
