//! gpsraster CLI - georeferenced elevation rasters from GPS survey points

mod points;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gpsraster_algorithms::{RasterCreator, RasterParams};
use gpsraster_core::io::{fit_affine, read_geotiff, SidecarFormat};
use gpsraster_core::BitDepth;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "gpsraster")]
#[command(author, version, about = "Georeferenced elevation rasters from GPS survey points", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpolate survey points into a GeoTIFF plus control-point sidecar
    Create {
        /// Points file: latitude,longitude,elevation per line
        input: PathBuf,
        /// Output raster (GeoTIFF)
        raster: PathBuf,
        /// Control-point sidecar (default: <raster>.points)
        #[arg(short, long)]
        sidecar: Option<PathBuf>,
        /// Cells along the longer raster side
        #[arg(short = 'd', long, default_value = "1024")]
        max_dimension: usize,
        /// Margin around the points, as a fraction of their extent
        #[arg(short, long, default_value = "0.05")]
        margin: f64,
        /// Pixel bit depth: 8 or 16
        #[arg(short, long, default_value = "16")]
        bit_depth: BitDepth,
        /// IDW power used outside the triangulation
        #[arg(long, default_value = "2.0")]
        idw_power: f64,
        /// IDW neighbours used outside the triangulation
        #[arg(long, default_value = "6")]
        idw_neighbors: usize,
        /// Survey span (m) above which a warning is logged
        #[arg(long, default_value = "1000000")]
        max_span: f64,
        /// Control points per side (2 = corners only)
        #[arg(short = 'g', long, default_value = "2")]
        control_grid: usize,
        /// Sidecar layout: qgis or csv (default: from the sidecar extension)
        #[arg(short, long)]
        format: Option<SidecarFormat>,
        /// Do not embed control points as GeoTIFF tiepoints
        #[arg(long)]
        no_tiepoints: bool,
    },
    /// Show information about a raster produced by `create`
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// `out.tif` -> `out.tif.points`, the name QGIS looks for
fn default_sidecar(raster: &Path) -> PathBuf {
    let mut name = raster.as_os_str().to_owned();
    name.push(".points");
    PathBuf::from(name)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Create ───────────────────────────────────────────────────
        Commands::Create {
            input,
            raster,
            sidecar,
            max_dimension,
            margin,
            bit_depth,
            idw_power,
            idw_neighbors,
            max_span,
            control_grid,
            format,
            no_tiepoints,
        } => {
            let points = points::read_points(&input)?;
            info!("Input: {} points", points.len());

            let sidecar = sidecar.unwrap_or_else(|| default_sidecar(&raster));
            let creator = RasterCreator::new(RasterParams {
                max_dimension,
                margin,
                bit_depth,
                idw_power,
                idw_neighbors,
                max_span_m: max_span,
                control_grid,
                sidecar_format: format,
                embed_tiepoints: !no_tiepoints,
            });

            let start = Instant::now();
            let pb = spinner("Interpolating surface...");
            let product = creator.build(&points);
            pb.finish_and_clear();
            let product = product.context("Failed to build raster")?;

            let pb = spinner("Writing output...");
            let written = product.write(&raster, &sidecar);
            pb.finish_and_clear();
            written.context("Failed to write output")?;
            let elapsed = start.elapsed();

            println!(
                "Raster: {} x {} ({}), elevation {:.3} - {:.3} m",
                product.grid.width(),
                product.grid.height(),
                product.pixels.bit_depth(),
                product.pixels.elevation_min(),
                product.pixels.elevation_max()
            );
            if product.merged_duplicates > 0 {
                println!("  Merged duplicates: {}", product.merged_duplicates);
            }
            println!("  Projection: {}", product.projection);
            done("Raster", &raster, elapsed);
            println!(
                "Control points ({}) saved to: {}",
                product.control_points.len(),
                sidecar.display()
            );
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let decoded = read_geotiff(&input);
            pb.finish_and_clear();
            let decoded = decoded.context("Failed to read raster")?;

            let (rows, cols) = decoded.pixels.shape();
            let stats = decoded.pixels.statistics();
            let tiepoints = decoded.tiepoints.clone();
            let bit_depth = decoded.bit_depth;
            let recorded = decoded.offset.is_some() && decoded.scale.is_some();
            let grid = decoded.into_pixel_grid().context("Invalid elevation scaling")?;

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, rows * cols);
            println!("Bit depth: {}", bit_depth);
            if recorded {
                println!(
                    "Elevation: {:.3} - {:.3} m ({:.6} m per step)",
                    grid.elevation_min(),
                    grid.elevation_max(),
                    grid.scale()
                );
            }

            println!("\nStatistics:");
            if let (Some(min), Some(max)) = (stats.min, stats.max) {
                println!("  Pixel range: {} - {}", min, max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }

            if tiepoints.is_empty() {
                println!("\nNo embedded tiepoints");
            } else {
                println!("\nTiepoints ({}):", tiepoints.len());
                for tp in &tiepoints {
                    println!(
                        "  ({:.1}, {:.1}) -> lon {:.8}, lat {:.8}",
                        tp.pixel_x, tp.pixel_y, tp.longitude, tp.latitude
                    );
                }
                if let Some(affine) = fit_affine(&tiepoints) {
                    let (min_lon, max_lat) = affine.apply(0.0, 0.0);
                    let (max_lon, min_lat) = affine.apply(cols as f64, rows as f64);
                    println!(
                        "Bounds: ({:.8}, {:.8}) - ({:.8}, {:.8})",
                        min_lon, min_lat, max_lon, max_lat
                    );
                }
            }
        }
    }

    Ok(())
}
