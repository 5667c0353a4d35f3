//! CLI entrypoint for the minarena workload harness.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use minarena_harness::report::{LogEmitter, LogEntry, LogLevel};
use minarena_harness::workload::{WorkloadConfig, WorkloadRunner};

/// Randomized workload tooling for the minarena allocator.
#[derive(Debug, Parser)]
#[command(name = "minarena-harness")]
#[command(about = "Randomized workload harness for the minarena allocator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a seeded allocate/free campaign and verify allocator properties.
    Run {
        /// Campaign seed; the same seed replays the same sequence.
        #[arg(long, default_value_t = 0x5eed_cafe)]
        seed: u64,
        /// Mixed allocate/free steps before the final drain.
        #[arg(long, default_value_t = 4096)]
        operations: usize,
        /// Arena size in bytes.
        #[arg(long, default_value_t = 2 * 1024 * 1024)]
        arena_size: usize,
        /// Fragment capacity (sizes the node table).
        #[arg(long, default_value_t = 2048)]
        max_fragments: usize,
        /// Request alignment in bytes.
        #[arg(long, default_value_t = 8)]
        alignment: usize,
        /// Smallest request size drawn.
        #[arg(long, default_value_t = 1)]
        min_alloc: usize,
        /// Largest request size drawn.
        #[arg(long, default_value_t = 32)]
        max_alloc: usize,
        /// Write the campaign report as JSON.
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write JSONL log entries to a file, or `-` for stdout.
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            seed,
            operations,
            arena_size,
            max_fragments,
            alignment,
            min_alloc,
            max_alloc,
            report,
            log,
        } => {
            let config = WorkloadConfig {
                seed,
                operations,
                arena_size,
                max_fragments,
                alignment,
                min_alloc,
                max_alloc,
            };
            run_campaign(config, report.as_deref(), log.as_deref())
        }
    }
}

fn run_campaign(
    config: WorkloadConfig,
    report_path: Option<&std::path::Path>,
    log_path: Option<&std::path::Path>,
) -> ExitCode {
    let mut emitter = match log_path {
        Some(path) if path.as_os_str() == "-" => Some(LogEmitter::stdout()),
        Some(path) => match LogEmitter::to_file(path) {
            Ok(emitter) => Some(emitter),
            Err(err) => {
                eprintln!("cannot open log file {}: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    emit(
        &mut emitter,
        LogLevel::Info,
        "campaign_start",
        None,
        Some(format!("seed={:#x}", config.seed)),
    );

    match WorkloadRunner::new(config).run() {
        Ok(report) => {
            println!(
                "campaign passed: seed={:#x} allocations={} oom_events={} peak_fragments={}",
                report.seed, report.allocations, report.oom_events, report.peak_fragments
            );
            emit(
                &mut emitter,
                LogLevel::Info,
                "campaign_complete",
                Some(report.operations),
                Some("pass".into()),
            );
            if let Some(path) = report_path {
                let json = match report.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        eprintln!("cannot serialize report: {err}");
                        return ExitCode::FAILURE;
                    }
                };
                if let Err(err) = std::fs::write(path, json) {
                    eprintln!("cannot write report {}: {err}", path.display());
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("campaign failed: {err}");
            emit(
                &mut emitter,
                LogLevel::Error,
                "campaign_failed",
                None,
                Some(err.to_string()),
            );
            ExitCode::FAILURE
        }
    }
}

fn emit(
    emitter: &mut Option<LogEmitter<'static>>,
    level: LogLevel,
    event: &str,
    step: Option<usize>,
    outcome: Option<String>,
) {
    if let Some(emitter) = emitter {
        let entry = LogEntry {
            trace_id: format!("harness::{event}"),
            level,
            event: event.to_string(),
            step,
            displacement: None,
            size: None,
            outcome,
        };
        if let Err(err) = emitter.emit(&entry) {
            eprintln!("cannot emit log entry: {err}");
        }
    }
}
