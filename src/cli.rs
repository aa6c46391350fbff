use std::path::PathBuf;

use clap::Parser;

use crate::cmd::{Commands, ShellCommand};

/// File-backed task scheduler with undo/redo and deadline reminders.
/// Storage defaults to ~/.scheduler/data.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "sched", version, about = "Task scheduler with deadline reminders")]
pub struct Cli {
    /// Path to the JSON data file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// One line typed into the interactive shell.
#[derive(Parser)]
#[command(name = "sched", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}
