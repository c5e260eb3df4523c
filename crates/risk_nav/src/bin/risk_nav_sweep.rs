use std::env;
use std::path::PathBuf;
use std::process;

use risk_nav::experiment::{summarize, sweep, Agent, AlphaSummary, ExperimentConfig, Variant};

fn main() {
    init_tracing();

    let mut args = env::args().skip(1);
    let mut variant: Option<Variant> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut alphas: Option<Vec<f64>> = None;
    let mut seeds: Option<u64> = None;
    let mut max_steps: Option<u64> = None;
    let mut json = false;
    let mut baseline = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return;
            }
            "--config" => {
                let raw = require_value(&mut args, "--config", "a file path");
                config_path = Some(PathBuf::from(raw));
            }
            "--alphas" => {
                let raw = require_value(&mut args, "--alphas", "a comma-separated list");
                alphas = Some(parse_alphas(&raw));
            }
            "--seeds" => {
                let raw = require_value(&mut args, "--seeds", "a count");
                seeds = Some(parse_number(&raw, "--seeds"));
            }
            "--max-steps" => {
                let raw = require_value(&mut args, "--max-steps", "a count");
                max_steps = Some(parse_number(&raw, "--max-steps"));
            }
            "--json" => json = true,
            "--baseline" => baseline = true,
            _ => match Variant::parse(&arg) {
                Some(parsed) if variant.is_none() => variant = Some(parsed),
                _ => {
                    eprintln!("Unexpected argument: {arg}");
                    print_help();
                    process::exit(1);
                }
            },
        }
    }

    let mut config = match &config_path {
        Some(path) => match ExperimentConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        },
        None => ExperimentConfig::default(),
    };
    if let Some(variant) = variant {
        config.variant = variant;
    }
    if let Some(alphas) = alphas {
        config.sweep.alphas = alphas;
    }
    if let Some(seeds) = seeds {
        config.sweep.seeds = seeds;
    }
    if let Some(max_steps) = max_steps {
        config.sweep.max_steps = max_steps;
    }
    if baseline {
        config.sweep.baseline = true;
    }
    let config = config.sanitized();

    let records = match sweep(&config) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("sweep failed: {err}");
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&records) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("failed to encode records: {err}");
                process::exit(1);
            }
        }
        return;
    }

    println!(
        "variant: {} | seeds: {} from {} | max_steps: {}",
        config.variant.label(),
        config.sweep.seeds,
        config.sweep.seed_start,
        config.sweep.max_steps
    );
    let summaries = summarize(&records);
    let baseline_summary = summaries.iter().find(|summary| summary.agent == Agent::Baseline);
    if let Some(baseline) = baseline_summary {
        println!("baseline {}", summary_line(baseline));
    }
    for summary in summaries.iter().filter(|summary| summary.agent == Agent::Gated) {
        println!("alpha={:.2} {}", summary.alpha, summary_line(summary));
        if let Some(baseline) = baseline_summary {
            let delta = summary.delta_from(baseline);
            println!(
                "  delta steps={:+.1} length={:+.2} moved={:+.3} deadlock={:+.2} recharge={:+.2} cleaned={:+.1} survived={:+}",
                delta.steps,
                delta.final_length,
                delta.moved_ratio,
                delta.deadlock_steps,
                delta.recharge_cycles,
                delta.cells_cleaned,
                delta.survived
            );
        }
    }
}

fn summary_line(summary: &AlphaSummary) -> String {
    let deaths = summary
        .deaths
        .iter()
        .map(|(reason, count)| format!("{reason}={count}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "steps={:.1} length={:.2} panic={:.2} rescue={:.3} drop={:.3} panic_ratio={:.3} moved={:.3} deadlock={:.2} recharge={:.2} cleaned={:.1} risk_th={:.3} survived={} deaths=[{}]",
        summary.mean_steps,
        summary.mean_final_length,
        summary.mean_panic_events,
        summary.rescue_rate,
        summary.risk_drop_rate,
        summary.mean_panic_ratio,
        summary.mean_moved_ratio,
        summary.mean_deadlock_steps,
        summary.mean_recharge_cycles,
        summary.mean_cells_cleaned,
        summary.mean_risk_threshold,
        summary.survived,
        deaths
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn require_value(args: &mut impl Iterator<Item = String>, flag: &str, what: &str) -> String {
    match args.next() {
        Some(value) => value,
        None => {
            eprintln!("{flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_number(raw: &str, flag: &str) -> u64 {
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            eprintln!("{flag} expects a non-negative integer, got {raw}");
            process::exit(1);
        }
    }
}

fn parse_alphas(raw: &str) -> Vec<f64> {
    let mut alphas = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.parse::<f64>() {
            Ok(alpha) if alpha.is_finite() && alpha >= 0.0 => alphas.push(alpha),
            _ => {
                eprintln!("--alphas expects non-negative numbers, got {part}");
                process::exit(1);
            }
        }
    }
    if alphas.is_empty() {
        eprintln!("--alphas requires at least one value");
        process::exit(1);
    }
    alphas
}

fn print_help() {
    println!(
        "Usage: risk_nav_sweep [snake|vacuum] [--config <file>] [--alphas a,b,c] [--seeds <n>] [--max-steps <n>] [--baseline] [--json]"
    );
    println!("Options:");
    println!("  --config <file>   TOML experiment config (default: built-in presets)");
    println!("  --alphas <list>   Comma-separated sensitivity values (default: 0,0.5,...,3)");
    println!("  --seeds <n>       Seeds per alpha (default: 50)");
    println!("  --max-steps <n>   Step limit per run (default: 2000)");
    println!("  --baseline        Also run the ungated baseline and print deltas against it");
    println!("  --json            Print every run record as JSON instead of summaries");
    println!("Set RUST_LOG=info (or debug) for progress and mode transitions on stderr.");
}
