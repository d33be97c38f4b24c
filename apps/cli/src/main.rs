// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cutcell CLI: cut elements by planes and report their volume cells.
//!
//! Usage:
//!   cutcell <scenario.json> [options]
//!
//! The report is printed to stdout as JSON; logs go to stderr.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

mod config;
mod scenario;

use config::Config;
use scenario::Scenario;

#[derive(Debug, Default)]
struct Args {
    scenario: PathBuf,
    output: Option<PathBuf>,
    snapshot: Option<PathBuf>,
    dump_dir: Option<PathBuf>,
    max_steps: Option<usize>,
}

fn print_usage() {
    eprintln!("Usage: cutcell <scenario.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --output <path>     Write the report to a file instead of stdout");
    eprintln!("  --snapshot <path>   Write the cut mesh as a JSON snapshot");
    eprintln!("  --dump-dir <dir>    Write Gmsh dumps of failing elements into <dir>");
    eprintln!("  --max-steps <n>     Cycle search step budget per element");
}

fn parse_args(args: &[String]) -> Result<Option<Args>> {
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        return Ok(None);
    }

    let mut parsed = Args {
        scenario: PathBuf::from(&args[1]),
        ..Args::default()
    };
    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .with_context(|| format!("missing value for {flag}"))
        };
        match flag.as_str() {
            "--output" => parsed.output = Some(PathBuf::from(value()?)),
            "--snapshot" => parsed.snapshot = Some(PathBuf::from(value()?)),
            "--dump-dir" => parsed.dump_dir = Some(PathBuf::from(value()?)),
            "--max-steps" => {
                let raw = value()?;
                parsed.max_steps = Some(
                    raw.parse()
                        .with_context(|| format!("invalid step budget: {raw}"))?,
                );
            }
            other => bail!("unknown option: {other}"),
        }
    }
    Ok(Some(parsed))
}

fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.clone())
        .with_writer(std::io::stderr);
    if config.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let raw: Vec<String> = std::env::args().collect();
    let args = match parse_args(&raw) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(err) => {
            print_usage();
            return Err(err);
        }
    };

    let mut options = config.graph.clone();
    if let Some(dir) = &args.dump_dir {
        options = options.with_dumps(dir);
    }
    if let Some(steps) = args.max_steps {
        options.max_search_steps = steps;
    }

    tracing::info!(
        scenario = %args.scenario.display(),
        dump_on_failure = options.dump_on_failure,
        max_search_steps = options.max_search_steps,
        "Starting cut-cell run"
    );

    let text = fs::read_to_string(&args.scenario)
        .with_context(|| format!("cannot read scenario {}", args.scenario.display()))?;
    let scenario: Scenario = serde_json::from_str(&text)
        .with_context(|| format!("invalid scenario {}", args.scenario.display()))?;

    let (mesh, report) = scenario::run(&scenario, &options);

    if let Some(path) = &args.snapshot {
        fs::write(path, mesh.to_json()?)
            .with_context(|| format!("cannot write snapshot {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote mesh snapshot");
    }

    let rendered = if config.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("cannot write report {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if report.failed > 0 {
        bail!("{} of {} elements failed", report.failed, report.elements.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn help_prints_usage() {
        assert!(parse_args(&args(&["cutcell"])).unwrap().is_none());
        assert!(parse_args(&args(&["cutcell", "-h"])).unwrap().is_none());
    }

    #[test]
    fn options_are_parsed() {
        let parsed = parse_args(&args(&[
            "cutcell",
            "cube.json",
            "--snapshot",
            "mesh.json",
            "--max-steps",
            "42",
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(parsed.scenario, PathBuf::from("cube.json"));
        assert_eq!(parsed.snapshot, Some(PathBuf::from("mesh.json")));
        assert_eq!(parsed.max_steps, Some(42));
        assert!(parsed.output.is_none());
    }

    #[test]
    fn bad_options_are_rejected() {
        assert!(parse_args(&args(&["cutcell", "a.json", "--bogus"])).is_err());
        assert!(parse_args(&args(&["cutcell", "a.json", "--max-steps"])).is_err());
        assert!(parse_args(&args(&["cutcell", "a.json", "--max-steps", "x"])).is_err());
    }
}
