//! Command-line front end: align a sequence of PLY scan series.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scan_align::io::{read_ply_file, write_ply_file};
use scan_align::pipeline::{AlignConfig, AlignmentReport, MemoryHost, SeriesAligner};
use scan_align::point_cloud::cpu::estimate_normals;

#[derive(Parser)]
#[command(name = "scan-align")]
#[command(about = "Crop scan series at their base plane and align them onto the first", version)]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the aligned PLY files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Worker threads for CPU-parallel stages
    #[arg(long)]
    threads: Option<usize>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the effective configuration as YAML and exit
    #[arg(long)]
    dump_config: bool,

    /// Series files in processing order; the first is the reference
    #[arg(required_unless_present = "dump_config")]
    series: Vec<PathBuf>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn series_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Series names become output file names, so no two inputs may share one.
fn check_distinct_names(paths: &[PathBuf]) -> Result<()> {
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for path in paths {
        if let Some(first) = seen.insert(series_name(path), path) {
            bail!(
                "{} and {} would both be written as {}_aligned.ply",
                first.display(),
                path.display(),
                series_name(path)
            );
        }
    }
    Ok(())
}

fn load_host(paths: &[PathBuf], config: &AlignConfig) -> Result<MemoryHost> {
    let mut host = MemoryHost::new().with_registration_config(config.registration.clone());
    for path in paths {
        let vertices =
            read_ply_file(path).with_context(|| format!("reading {}", path.display()))?;
        if vertices.normals.is_none() {
            warn!(file = %path.display(), k = config.normals.k, "no normals in file, estimating");
        }
        let cloud = vertices
            .into_cloud_with(|points| estimate_normals(points, config.normals.k, config.up_axis))
            .with_context(|| format!("building cloud from {}", path.display()))?;
        info!(file = %path.display(), points = cloud.len(), "loaded series");
        host.add_series(series_name(path), cloud);
    }
    Ok(host)
}

fn print_report(report: &AlignmentReport) {
    println!();
    println!("{:<24} {:>8} {:>8} {:>8} {:>10} {:>12}", "series", "points", "plane", "above", "fitness", "rmse");
    for outcome in &report.outcomes {
        let above = outcome
            .partition
            .as_ref()
            .map(|p| p.above.len().to_string())
            .unwrap_or_else(|| "-".to_string());
        let (fitness, rmse) = match &outcome.registration {
            Some(r) => (format!("{:.3}", r.fitness), format!("{:.6}", r.rmse)),
            None => ("reference".to_string(), "-".to_string()),
        };
        println!(
            "{:<24} {:>8} {:>8} {:>8} {:>10} {:>12}",
            outcome.series.name, outcome.point_count, outcome.plane_points, above, fitness, rmse
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AlignConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AlignConfig::default(),
    };

    if cli.dump_config {
        print!("{}", config.to_yaml()?);
        return Ok(());
    }

    let threads = scan_align::init_thread_pool(cli.threads).context("configuring worker threads")?;
    info!(threads, "worker pool ready");

    if cli.series.is_empty() {
        bail!("no series given");
    }
    check_distinct_names(&cli.series)?;
    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;

    let start = Instant::now();
    let mut host = load_host(&cli.series, &config)?;
    let report = SeriesAligner::new(&mut host, config).run_project()?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "alignment finished");

    for (series, cloud) in host.into_clouds() {
        let path = cli.output_dir.join(format!("{}_aligned.ply", series.name));
        write_ply_file(&path, &cloud).with_context(|| format!("writing {}", path.display()))?;
        info!(file = %path.display(), points = cloud.len(), "wrote series");
    }

    print_report(&report);
    Ok(())
}
