//! Queueing Estimator
//!
//! Replays recorded scheduler traces and prints the queueing time estimates.

use std::env;
use std::process;
use std::time::Duration;

use queueing_estimator::trace::{self, ReplaySummary};
use queueing_estimator::{EstimatorConfig, NAME, Result, VERSION};

const USAGE: &str = "\
Usage: queueing-estimator replay <trace.jsonl> [options]

Options:
    --config <file>     JSON estimator config
    --window-ms <ms>    Sliding window length
    --steps <n>         Steps per window
    -h, --help          Print this help";

struct ReplayArgs {
    trace_path: String,
    config_path: Option<String>,
    window_ms: Option<u64>,
    steps: Option<usize>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{} v{}\n\n{}", NAME, VERSION, USAGE);
        return;
    }

    let result = match args[0].as_str() {
        "replay" => parse_replay_args(&args[1..]).and_then(|parsed| run_replay(&parsed)),
        other => Err(format!("unknown command '{}'", other)),
    };

    if let Err(e) = result {
        eprintln!("❌ {}\n\n{}", e, USAGE);
        process::exit(1);
    }
}

fn parse_replay_args(args: &[String]) -> std::result::Result<ReplayArgs, String> {
    let mut trace_path = None;
    let mut config_path = None;
    let mut window_ms = None;
    let mut steps = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = Some(value_for(arg, iter.next())?.to_string()),
            "--window-ms" => window_ms = Some(parse_number(arg, iter.next())?),
            "--steps" => steps = Some(parse_number(arg, iter.next())?),
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path if trace_path.is_none() => trace_path = Some(path.to_string()),
            extra => return Err(format!("unexpected argument '{}'", extra)),
        }
    }

    Ok(ReplayArgs {
        trace_path: trace_path.ok_or("missing trace file")?,
        config_path,
        window_ms,
        steps,
    })
}

fn value_for<'a>(flag: &str, value: Option<&'a String>) -> std::result::Result<&'a str, String> {
    value
        .map(String::as_str)
        .ok_or_else(|| format!("{} needs a value", flag))
}

fn parse_number<T: std::str::FromStr>(
    flag: &str,
    value: Option<&String>,
) -> std::result::Result<T, String> {
    let raw = value_for(flag, value)?;
    raw.parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, raw))
}

fn build_config(args: &ReplayArgs) -> Result<EstimatorConfig> {
    let mut config = match &args.config_path {
        Some(path) => EstimatorConfig::from_json_file(path)?,
        None => EstimatorConfig::default(),
    };
    if let Some(ms) = args.window_ms {
        config.window_duration = Duration::from_millis(ms);
    }
    if let Some(steps) = args.steps {
        config.steps_per_window = steps;
    }
    config.validate()?;
    Ok(config)
}

fn run_replay(args: &ReplayArgs) -> std::result::Result<(), String> {
    let config = build_config(args).map_err(|e| e.to_string())?;
    let summary = trace::replay_file(&args.trace_path, config.clone())
        .map_err(|e| format!("{}: {}", args.trace_path, e))?;
    print_summary(&config, &summary);
    Ok(())
}

fn print_summary(config: &EstimatorConfig, summary: &ReplaySummary) {
    println!("{} v{}", NAME, VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Window {:?} in {} steps of {:?}",
        config.window_duration,
        config.steps_per_window,
        config.step_width()
    );
    println!();

    for window in &summary.windows {
        println!(
            "  step @ {:>10.3}s  EQT {:>10.3}ms{}",
            window.step_offset.as_secs_f64(),
            window.queueing_time.as_secs_f64() * 1000.0,
            if window.is_disjoint_window { "  *" } else { "" }
        );
    }

    if !summary.estimates.is_empty() {
        println!();
        for estimate in &summary.estimates {
            println!(
                "  estimate @ {:>10.3}s  EQT {:>10.3}ms",
                estimate.at.as_secs_f64(),
                estimate.queueing_time.as_secs_f64() * 1000.0
            );
        }
    }

    let stats = &summary.stats;
    println!();
    println!("📊 {} events replayed", summary.events);
    println!("   • Tasks counted: {}", stats.tasks_completed);
    println!("   • Invalid tasks dropped: {}", stats.invalid_tasks);
    println!("   • Nested run loop tasks: {}", stats.nested_tasks);
    println!(
        "   • Steps reported / skipped: {} / {}",
        stats.steps_reported, stats.steps_skipped
    );
    println!(
        "   • Max window EQT: {:.3}ms",
        summary.max_queueing_time().as_secs_f64() * 1000.0
    );
}
