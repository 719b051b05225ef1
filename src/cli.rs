use std::env;
use std::path::PathBuf;

use crate::config::ScenarioConfig;

/// Parsed command-line options for a scenario run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub telemetry_out: Option<PathBuf>,
    /// Print every component update after the run.
    pub trace: bool,
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Help,
    Run(CliOptions),
}

pub fn parse_args() -> Result<CliCommand, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(&args)
}

pub fn parse_args_from(args: &[String]) -> Result<CliCommand, String> {
    let mut i = 0usize;
    let mut scenario = None;
    let mut preset = None;
    let mut seed = None;
    let mut telemetry_out = None;
    let mut trace = false;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path =
                    args.next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                if scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected an integer)")?;
                let value = raw
                    .parse::<u64>()
                    .map_err(|_| format!("invalid value for --seed: {raw}"))?;
                if seed.replace(value).is_some() {
                    return Err("--seed provided more than once".to_string());
                }
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(
                    i,
                    "missing value for --telemetry-out (expected a file path)",
                )?;
                if telemetry_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-out provided more than once".to_string());
                }
            }
            "--trace" => trace = true,
            "--help" | "-h" => return Ok(CliCommand::Help),
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if scenario.is_some() && preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }

    if scenario.is_none() && preset.is_none() {
        preset = Some("baseline".to_string());
    }

    Ok(CliCommand::Run(CliOptions {
        scenario,
        preset,
        seed,
        telemetry_out,
        trace,
    }))
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

pub fn print_usage() {
    eprintln!("sgt-sim - dependency-aware discrete-event grid simulator");
    eprintln!();
    eprintln!("Usage:");
    eprintln!(
        "  sgt-sim [--scenario <path> | --preset <name>] [--seed <n>] [--telemetry-out <path>] [--trace]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>       Load scenario from a TOML file");
    eprintln!(
        "  --preset <name>         Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <n>              Override the scenario seed");
    eprintln!("  --telemetry-out <path>  Write per-instant records to CSV");
    eprintln!("  --trace                 Print every component update");
    eprintln!("  -h, --help              Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG (e.g. RUST_LOG=sgt_sim=debug) to adjust log output.");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(list: &[&str]) -> CliOptions {
        match parse_args_from(&args(list)).expect("parse should succeed") {
            CliCommand::Run(opts) => opts,
            CliCommand::Help => panic!("expected a run command"),
        }
    }

    #[test]
    fn supports_scenario_cli() {
        let opts = run(&["--scenario", "scenario.toml"]);
        assert_eq!(
            opts.scenario.as_deref().and_then(|p| p.to_str()),
            Some("scenario.toml")
        );
        assert!(opts.preset.is_none());
    }

    #[test]
    fn supports_preset_cli() {
        let opts = run(&["--preset", "tight_feeder"]);
        assert_eq!(opts.preset.as_deref(), Some("tight_feeder"));
        assert!(opts.scenario.is_none());
    }

    #[test]
    fn defaults_to_baseline_preset() {
        let opts = run(&[]);
        assert_eq!(opts.preset.as_deref(), Some("baseline"));
        assert_eq!(opts.seed, None);
        assert!(!opts.trace);
    }

    #[test]
    fn parses_seed_trace_and_output() {
        let opts = run(&["--seed", "7", "--trace", "--telemetry-out", "out.csv"]);
        assert_eq!(opts.seed, Some(7));
        assert!(opts.trace);
        assert_eq!(
            opts.telemetry_out.as_deref().and_then(|p| p.to_str()),
            Some("out.csv")
        );
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(
            parse_args_from(&args(&["--seed", "1", "--help"])),
            Ok(CliCommand::Help)
        );
    }

    #[test]
    fn rejects_conflicting_sources() {
        let err = parse_args_from(&args(&["--scenario", "a.toml", "--preset", "baseline"]))
            .expect_err("sources conflict");
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_args_from(&args(&["--seed", "many"])).is_err());
        assert!(parse_args_from(&args(&["--seed"])).is_err());
        assert!(parse_args_from(&args(&["--preset", "a", "--preset", "b"])).is_err());
        assert!(parse_args_from(&args(&["--bogus"])).is_err());
    }
}
