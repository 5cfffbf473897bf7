mod cli;
mod logging;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use log::info;

use erp_reports::config::{load_config_from_env, load_env_file};
use erp_reports::pipeline::LogProgress;
use erp_reports::planner::Plan;
use erp_reports::portal::ChromeLauncher;
use erp_reports::session::Session;
use erp_reports::status::RunReport;
use erp_reports::Config;

use cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    load_env_file(cli.env_file.as_deref())?;
    logging::init(cli.log_json).context("failed to initialise logging")?;

    let mut config = load_config_from_env().context("invalid configuration")?;
    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(secs) = cli.hold_secs {
        config.session.hold_open = Duration::from_secs(secs);
    }

    if cli.plan {
        print_plan(&config);
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install Ctrl-C handler")?;

    info!("erp-reports v{}", env!("CARGO_PKG_VERSION"));
    let launcher = ChromeLauncher::from_config(&config);
    let report = Session::new(&config, &launcher, shutdown).run(&LogProgress);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_plan(config: &Config) {
    let plan = Plan::build(config, Local::now());
    for target in &plan.fresh {
        println!(
            "{} - already generated {}",
            target.filename,
            target.cadence.window_label()
        );
    }
    for target in &plan.stale {
        println!("{} - needs regenerating", target.filename);
    }
}

fn print_report(report: &RunReport) {
    println!("Summary:");
    for line in report.summary_lines() {
        println!("  {}", line);
    }

    let errors = report.actionable_errors();
    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for record in errors {
            println!("  {}", record);
        }
    }
}
