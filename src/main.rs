//! Grid simulator entry point: CLI wiring and config-driven model construction.

use std::process;

use tracing_subscriber::EnvFilter;

use sgt_sim::cli::{self, CliCommand};
use sgt_sim::config::ScenarioConfig;
use sgt_sim::io::export::export_csv;
use sgt_sim::runner::run_scenario;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let opts = match cli::parse_args() {
        Ok(CliCommand::Run(opts)) => opts,
        Ok(CliCommand::Help) => {
            cli::print_usage();
            return;
        }
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };

    // --scenario takes priority, then --preset
    let loaded = match (&opts.scenario, &opts.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::baseline()),
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = opts.seed {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let result = match run_scenario(&scenario) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for r in &result.records {
        println!("{r}");
    }

    if opts.trace {
        println!("\n--- Update trace ---");
        for u in &result.trace {
            println!("{u}");
        }
    }

    println!("\n{}", result.kpis);

    if let Some(ref path) = opts.telemetry_out {
        if let Err(e) = export_csv(&result.records, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Telemetry written to {}", path.display());
    }
}
