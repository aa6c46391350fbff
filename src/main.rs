//! # sched - task scheduler CLI
//!
//! Command-line front end for the `task_scheduler` library: tasks with
//! owners, projects, priorities and deadlines, undo/redo, and reminders that
//! fire a configurable number of minutes before each deadline.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! sched add "Prepare release notes" --due tomorrow --owner "Ivan Ivanov" --priority high
//!
//! # List open tasks by priority
//! sched list --hide-completed --sort priority --descending
//!
//! # Interactive shell with undo/redo and live reminders
//! sched shell
//! ```
//!
//! Data is stored in `~/.scheduler/data.json` unless `--db` says otherwise.
//! Set `RUST_LOG=task_scheduler=debug` to see what the library is doing.

use std::process;
use std::rc::Rc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use task_scheduler::clock::{Clock, SystemClock};
use task_scheduler::db::default_data_path;
use task_scheduler::session::Session;

mod cli;
mod cmd;

use cli::Cli;
use cmd::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("task_scheduler=warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let db_path = cli.db.unwrap_or_else(default_data_path);
    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let mut session = Session::open(&db_path, clock.clone());

    let outcome = match cli.command {
        Commands::Task(command) => run_task_command(&mut session, clock.as_ref(), command)
            .and_then(|changed| if changed { session.save() } else { Ok(()) }),
        Commands::Shell => cmd_shell(&mut session, clock.as_ref()),
        Commands::Watch => cmd_watch(&mut session, clock.as_ref()),
        Commands::Completions { .. } => unreachable!("completions handled above"),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
