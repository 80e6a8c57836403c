//! main.rs
//! Entry point for burrow

pub(crate) mod app;
pub(crate) mod config;
pub(crate) mod core;
pub(crate) mod ui;
pub(crate) mod utils;

use crate::app::{Outcome, Session, plan_tasks};
use crate::config::Config;
use crate::core::terminal;
use crate::utils::cli::handle_args;
use crate::utils::logging;

use std::io::IsTerminal;
use std::time::Duration;

fn main() -> std::io::Result<()> {
    std::panic::set_hook(Box::new(|info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let mut stdout = std::io::stdout();
        let _ = crossterm::execute!(
            stdout,
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        );

        eprintln!("\n[bw] Error occurred: {}", info);

        #[cfg(debug_assertions)]
        {
            let bt = std::backtrace::Backtrace::force_capture();
            eprintln!("\nStack Backtrace:\n{}", bt);
        }
    }));

    let request = match handle_args() {
        Ok(Some(request)) => request,
        Ok(None) => return Ok(()),
        Err(code) => std::process::exit(code),
    };

    if let Some(path) = logging::init() {
        tracing::info!(log = %path.display(), "burrow {} starting", env!("CARGO_PKG_VERSION"));
    }

    let config = Config::load();
    let tasks = match plan_tasks(&request, &config) {
        Ok(tasks) => tasks,
        Err(e) => {
            eprintln!("[bw] Error: {}", e);
            std::process::exit(1);
        }
    };

    let interactive = !request.headless && std::io::stdout().is_terminal();
    let mut session = Session::new(
        tasks,
        config.tasks().budget(),
        config.behavior().conflicts(),
        interactive,
    );

    if interactive {
        let tick = Duration::from_millis(config.tasks().tick_ms());
        terminal::run_terminal(&mut session, config.theme(), tick)?;
    } else {
        terminal::run_headless(&mut session);
    }

    match session.outcome() {
        Outcome::Finished => {
            println!("{}", session.summary());
            Ok(())
        }
        Outcome::Failed(msg) => {
            eprintln!("[bw] Error: {}", msg);
            eprintln!("{}", session.summary());
            std::process::exit(1);
        }
        Outcome::Aborted { conflicts } => {
            eprintln!(
                "[bw] {} destination(s) already exist; rerun with --skip or --overwrite",
                conflicts
            );
            std::process::exit(1);
        }
        Outcome::Cancelled | Outcome::Running => {
            eprintln!("[bw] Cancelled. {}", session.summary());
            std::process::exit(130);
        }
    }
}
