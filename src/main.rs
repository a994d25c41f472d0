//! Command line entry point of the voyage wave simulator.
//! Runs one voyage, writes the records to CSV and optionally draws the voyage on a map.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use voyage_wave_simulator::*;

#[derive(Parser, Debug)]
#[command(
    name = "voyage_wave_simulator",
    version,
    about = "Simulate a vessel transiting a maritime route and sample sea state along the way",
    long_about = "Steps a vessel along a multi-waypoint route at constant nominal speed. \
                  At every time step the significant wave height is looked up from a marine \
                  weather service and the sea state, ambient temperature and instantaneous \
                  speed are recorded. Failed lookups fall back to a fixed wave height."
)]
struct Args {
    /// Voyage config as JSON, defaults are used for everything not given
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Route CSV with a header and latitude;longitude rows, replaces the route in the config
    #[arg(short, long)]
    route: Option<String>,

    /// Output CSV file for the voyage records
    #[arg(short, long, default_value = "voyage.csv")]
    output: String,

    /// Also draw the voyage on a map and save it to this HTML file
    #[arg(short, long)]
    map: Option<String>,

    /// Seed for the speed jitter, overrides the seed in the config
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbose output (show debug messages)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" }),
    )
    .format_timestamp(None)
    .init();

    let config = match &args.config {
        Some(path) => VoyageConfig::from_json_file(path)
            .with_context(|| format!("Failed to read voyage config {}", path.display()))?,
        None => VoyageConfig::default(),
    };

    let route = match &args.route {
        Some(path) => load_route(path).with_context(|| format!("Failed to load route {}", path))?,
        None => config.route().context("Invalid route in voyage config")?,
    };
    let parameters = config.parameters().context("Invalid voyage parameters")?;

    let client = config.environment.client().context("Failed to set up the marine weather client")?;
    let environment = config.environment.provider(client);

    let rng = match args.seed.or(config.seed) {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut simulator = VoyageSimulator::new(&route, parameters, environment, rng)
        .context("Failed to set up the voyage")?;

    // Progress bar when someone is watching, otherwise log every tenth of the voyage
    let records = if atty::is(atty::Stream::Stderr) {
        let bar = indicatif::ProgressBar::new(simulator.step_count() as u64 + 1);
        bar.set_style(
            indicatif::ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps (eta {eta})")?
                .progress_chars("##-"),
        );
        let records = simulator.run_with_observer(&mut |_: usize, _: usize, _: &VoyageRecord| bar.inc(1))?;
        bar.finish_and_clear();
        records
    } else {
        let every = ((simulator.step_count() + 1) / 10).max(1);
        simulator.run_with_observer(&mut |step: usize, step_count: usize, record: &VoyageRecord| {
            if step % every == 0 || step == step_count {
                info!(
                    "Step {}/{} at {:.1} h: ({:.3}, {:.3}) wave height {} m",
                    step, step_count, record.elapsed_hours, record.latitude, record.longitude, record.wave_height_m
                );
            }
        })?
    };

    let summary = VoyageSummary::from_records(&records)?;
    info!("Records: {} over {:.1} h", summary.records, summary.elapsed_hours);
    info!(
        "Speed: {:.2} ± {:.2} kn",
        summary.speed_mean.get::<uom::si::velocity::knot>(),
        summary.speed_std.get::<uom::si::velocity::knot>()
    );
    info!(
        "Wave height: mean {:.2} m, max {:.2} m, max sea state {}",
        summary.wave_height_mean_m, summary.wave_height_max_m, summary.max_sea_state
    );
    info!("Mean ambient temperature: {:.2} K", summary.temperature_mean_k);

    records_to_csv(&args.output, &records)
        .with_context(|| format!("Failed to write voyage records to {}", args.output))?;
    info!("Saved voyage records to {}", args.output);

    if let Some(map_path) = &args.map {
        visualize_voyage(map_path, &route, &records)
            .with_context(|| format!("Failed to draw voyage map to {}", map_path))?;
        info!("Saved voyage map to {}", map_path);
    }

    Ok(())
}
