#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `insertion` command-line front end: runs the supervisor against the
//! simulated cell, checks configs, and exports search spirals.

mod cli;
mod error_fmt;
mod logging;
mod run;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use eyre::WrapErr;
use insertion_core::runner::RunReport;
use insertion_traits::Point;
use serde_json::json;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error hooks: {e}");
    }

    if let Err(err) = real_main(cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let text = std::fs::read_to_string(&cli.config)
        .wrap_err_with(|| format!("failed to read config {}", cli.config.display()))?;
    let cfg = toml::from_str::<insertion_config::Config>(&text)
        .wrap_err_with(|| format!("failed to parse config {}", cli.config.display()))?;
    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging);
    cfg.validate().wrap_err("invalid configuration")?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run {
            max_run_ms,
            trajectory_csv,
            print_runtime,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                tracing::warn!("received shutdown signal");
                flag.store(true, Ordering::Relaxed);
            }) {
                tracing::warn!(error = %e, "failed to install Ctrl-C handler; continuing");
            }

            let report =
                run::run_insertion(&cfg, max_run_ms, trajectory_csv.as_deref(), shutdown)?;
            if cli.json {
                println!("{}", report_json(&report));
            } else {
                print_report(&report, print_runtime);
            }
        }
        Commands::SelfCheck => {
            let line = run::self_check(&cfg)?;
            if cli.json {
                println!("{}", json!({ "self_check": "ok", "detail": line }));
            } else {
                println!("{line}");
            }
        }
        Commands::Spiral { x, y, z, out } => {
            let origin = Point::new(x, y, z);
            match run::spiral(&cfg, origin, out.as_deref())? {
                Some(csv) => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(csv.as_bytes())?;
                    stdout.flush()?;
                }
                None => {
                    if let Some(path) = out {
                        eprintln!("spiral written to {}", path.display());
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_report(report: &RunReport, print_runtime: bool) {
    match report.final_pose {
        Some(p) => println!(
            "insertion complete: {} ticks, final pose ({:.4}, {:.4}, {:.4})",
            report.ticks, p.x, p.y, p.z
        ),
        None => println!("insertion complete: {} ticks", report.ticks),
    }
    let phases: Vec<String> = report.history.iter().map(ToString::to_string).collect();
    println!("phases: {}", phases.join(" -> "));
    if print_runtime {
        println!("runtime: {} ms", report.elapsed_ms);
    }
}

fn report_json(report: &RunReport) -> serde_json::Value {
    let ts_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    let phases: Vec<String> = report.history.iter().map(ToString::to_string).collect();
    json!({
        "timestamp": ts_ms,
        "outcome": "complete",
        "ticks": report.ticks,
        "duration_ms": report.elapsed_ms,
        "final_pose": report.final_pose.map(|p| [p.x, p.y, p.z]),
        "phases": phases,
        "force_samples": report.force_samples,
        "abort_reason": null,
    })
}
