//! Flood Frequency Explorer
//!
//! Runs a Log-Pearson Type III flood-frequency analysis for one gauge:
//! 1. Loads the station list and analysis settings (ffa.toml)
//! 2. Reads the station's annual peak file into memory
//! 3. Fits LP3 to the full record and to repeated random sub-samples
//! 4. Prints the fit, uncertainty at common return periods, and any
//!    configuration warnings; optionally writes the full report as JSON
//!
//! Usage:
//!   cargo run --release -- --station 05570000
//!   cargo run --release -- --simulations 200 --sample-size 15 --seed 42
//!   cargo run --release -- --output report.json
//!
//! Environment:
//!   FFA_CONFIG  - config file path (default ffa.toml, also read from .env)
//!   FFA_SEED    - master seed for reproducible simulations
//!   FFA_WORKERS - simulation worker threads

use ffa_explorer::config::{load_config, load_config_from, ExplorerConfig};
use ffa_explorer::explorer::Explorer;
use std::env;
use std::fs;
use std::str::FromStr;

/// Return periods shown in the summary table.
const SUMMARY_RETURN_PERIODS: [f64; 6] = [2.0, 5.0, 10.0, 25.0, 50.0, 100.0];

#[derive(Default)]
struct CliArgs {
    config: Option<String>,
    station: Option<String>,
    simulations: Option<usize>,
    sample_size: Option<usize>,
    seed: Option<u64>,
    workers: Option<usize>,
    output: Option<String>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [--config PATH] [--station SITE] [--simulations N] [--sample-size N] \
         [--seed N] [--workers N] [--output FILE]",
        program
    )
}

/// Value following `args[i]`, or exit with a message.
fn flag_value<T: FromStr>(args: &[String], i: usize) -> T {
    let flag = &args[i];
    let Some(raw) = args.get(i + 1) else {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    };
    raw.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value '{}' for {}", raw, flag);
        std::process::exit(1);
    })
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = env::args().collect();
    let mut cli = CliArgs::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => cli.config = Some(flag_value(&args, i)),
            "--station" => cli.station = Some(flag_value(&args, i)),
            "--simulations" => cli.simulations = Some(flag_value(&args, i)),
            "--sample-size" => cli.sample_size = Some(flag_value(&args, i)),
            "--seed" => cli.seed = Some(flag_value(&args, i)),
            "--workers" => cli.workers = Some(flag_value(&args, i)),
            "--output" => cli.output = Some(flag_value(&args, i)),
            "--help" | "-h" => {
                println!("{}", usage(&args[0]));
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("{}", usage(&args[0]));
                std::process::exit(1);
            }
        }
        i += 2;
    }
    cli
}

fn load(cli: &CliArgs) -> Result<ExplorerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            dotenv::dotenv().ok();
            let mut config = load_config_from(path)?;
            config.analysis.apply_env_overrides(|name| env::var(name).ok())?;
            config
        }
        None => load_config()?,
    };

    // Command-line flags win over file and environment
    let analysis = &mut config.analysis;
    if let Some(n) = cli.simulations {
        analysis.n_simulations = n;
    }
    if let Some(n) = cli.sample_size {
        analysis.sample_size = n;
    }
    if let Some(seed) = cli.seed {
        analysis.seed = Some(seed);
    }
    if let Some(workers) = cli.workers {
        analysis.workers = workers;
    }
    analysis.validate()?;
    Ok(config)
}

fn main() {
    println!("🌊 Flood Frequency Explorer");
    println!("===========================\n");

    let cli = parse_args();

    println!("📋 Loading configuration...");
    let config = load(&cli).unwrap_or_else(|e| {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    });
    println!("✓ Loaded {} stations\n", config.stations.len());

    println!("📥 Reading annual peak files...");
    let explorer = Explorer::from_config(&config).unwrap_or_else(|e| {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    });
    println!("✓ Ready\n");

    let station = cli
        .station
        .clone()
        .unwrap_or_else(|| explorer.default_station().to_string());

    println!(
        "📊 Analyzing {} ({} simulations, sample size {})...",
        explorer.station_name(&station),
        config.analysis.n_simulations,
        config.analysis.sample_size
    );
    let outcome = match explorer.analyze_with_fallback(&station, &config.analysis) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("\n❌ Analysis failed: {}\n", e);
            std::process::exit(1);
        }
    };

    if let Some(notice) = &outcome.fallback {
        eprintln!("   ⚠️  {}", notice.message());
    }
    for warning in &outcome.report.warnings {
        eprintln!("   ⚠️  {}", warning);
    }
    if outcome.report.discarded_peaks > 0 {
        eprintln!(
            "   ⚠️  {} non-positive peaks were left out of the fit",
            outcome.report.discarded_peaks
        );
    }

    let report = &outcome.report;
    println!(
        "✓ {} - {} years of record\n",
        explorer.station_name(&report.station_id),
        report.n_years
    );

    println!("📈 LP3 fit (log10 space)");
    println!("   mean  {:.4}", report.fit.log_mean);
    println!("   stdev {:.4}", report.fit.log_stdev);
    println!("   skew  {:.4}\n", report.fit.log_skew);

    println!("   {:>8}  {:>12}  {:>12}  {:>12}  {:>12}", "Tr (yr)", "LP3 (cfs)", "sim mean", "-2σ", "+2σ");
    let rows = report.summary_rows(&SUMMARY_RETURN_PERIODS).unwrap_or_else(|e| {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    });
    for row in rows {
        match row.band {
            Some(band) => println!(
                "   {:>8.1}  {:>12.0}  {:>12.0}  {:>12.0}  {:>12.0}",
                row.return_period, row.lp3_flow, band.mean, band.lower_2_sigma, band.upper_2_sigma
            ),
            None => println!("   {:>8.1}  {:>12.0}", row.return_period, row.lp3_flow),
        }
    }
    println!("\n   {}\n", report.summary());

    if let Some(path) = &cli.output {
        println!("💾 Writing report to {}...", path);
        let written = serde_json::to_string_pretty(report)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(path, json).map_err(|e| e.to_string()));
        match written {
            Ok(()) => println!("✓ Wrote {} records, {} bands\n", report.records.len(), report.bands.len()),
            Err(e) => {
                eprintln!("\n❌ Failed to write {}: {}\n", path, e);
                std::process::exit(1);
            }
        }
    }
}
