//! Command implementations for the CLI and the interactive shell.
//!
//! One-shot subcommands and shell lines share [`TaskCommand`], so every task,
//! user and project operation behaves the same in both modes. The shell adds
//! undo/redo and prints reminders while it waits for input.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration as StdDuration;

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use clap_complete::{generate, Shell};

use task_scheduler::clock::Clock;
use task_scheduler::db::{parse_date_input, parse_deadline_input};
use task_scheduler::error::{Result, SchedulerError};
use task_scheduler::fields::{Priority, SortCriterion, DEFAULT_REMINDER_MINUTES};
use task_scheduler::reminder::ReminderNotification;
use task_scheduler::service::{FilterOptions, SortOptions, TaskService};
use task_scheduler::session::Session;
use task_scheduler::task::{Task, TaskDetails};

use crate::cli::ShellLine;

/// Longest the event loops wait without checking for reminders.
const IDLE_WAIT: StdDuration = StdDuration::from_secs(30);

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    Task(TaskCommand),

    /// Interactive session with undo/redo and live reminders.
    Shell,

    /// Print reminders as they fire until interrupted.
    Watch,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands available both on the command line and inside the shell.
#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Deadline: YYYY-MM-DD[THH:MM], "today", "tomorrow", or "in N min|h|d|w".
        #[arg(long)]
        due: String,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Owner name or ID.
        #[arg(long)]
        owner: String,
        /// Project name or ID.
        #[arg(long)]
        project: Option<String>,
        /// Minutes before the deadline to remind.
        #[arg(long, default_value_t = DEFAULT_REMINDER_MINUTES)]
        remind: i64,
    },

    /// List tasks, open ones first.
    List {
        /// Case-insensitive title search.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Project name or ID.
        #[arg(long)]
        project: Option<String>,
        /// Owner name or ID.
        #[arg(long)]
        user: Option<String>,
        /// Only tasks due on this day: YYYY-MM-DD, "today" or "tomorrow".
        #[arg(long)]
        date: Option<String>,
        /// Leave out completed tasks.
        #[arg(long)]
        hide_completed: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortCriterion::Date)]
        sort: SortCriterion,
        /// Reverse the sort order.
        #[arg(long)]
        descending: bool,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show every field of a task.
    View { id: u64 },

    /// Change fields on a task. The whole edit is undone as one step.
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Owner name or ID.
        #[arg(long)]
        owner: Option<String>,
        /// Project name or ID.
        #[arg(long)]
        project: Option<String>,
        /// Detach the task from its project.
        #[arg(long, conflicts_with = "project")]
        clear_project: bool,
        #[arg(long)]
        remind: Option<i64>,
    },

    /// Mark a task done.
    Complete { id: u64 },

    /// Reopen a completed task.
    Reopen { id: u64 },

    /// Delete a task.
    Delete { id: u64 },

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage projects.
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Show task counts.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Import tasks from a JSON array file.
    Import {
        input: String,
        /// Keep tasks whose title, deadline and owner match an existing task.
        #[arg(long)]
        allow_duplicates: bool,
    },

    /// Export all tasks to a JSON array file.
    Export {
        /// Output file path (default: tasks_export.json)
        #[arg(long, short)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user.
    Add { name: String },
    /// Rename a user given by name or ID.
    Rename { user: String, name: String },
    /// Delete a user that owns no tasks.
    Rm { user: String },
    /// List users with their task counts.
    List,
}

#[derive(Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        name: String,
        #[arg(long)]
        desc: Option<String>,
    },
    /// Rename a project or change its description.
    Update {
        project: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        desc: Option<String>,
    },
    /// Delete a project that has no tasks.
    Rm { project: String },
    /// List projects with their task counts.
    List,
}

/// Shell-only commands on top of [`TaskCommand`].
#[derive(Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    Task(TaskCommand),
    /// Undo the last task change.
    Undo,
    /// Redo the last undone change.
    Redo,
    /// Write the data file now.
    Save,
    /// Save and leave the shell.
    #[command(alias = "exit")]
    Quit,
}

/// Run one task command. Returns `true` when data changed and should be saved.
pub fn run_task_command(session: &mut Session, clock: &dyn Clock, command: TaskCommand) -> Result<bool> {
    let now = clock.now();
    match command {
        TaskCommand::Add { title, desc, due, priority, owner, project, remind } => {
            cmd_add(session, now, title, desc, due, priority, owner, project, remind)
        }

        TaskCommand::List { search, priority, project, user, date, hide_completed, sort, descending, limit } => {
            let service = session.service();
            let filter = FilterOptions {
                search_text: search.unwrap_or_default(),
                priority,
                project: project.as_deref().map(|p| resolve_project(service, p)).transpose()?,
                user: user.as_deref().map(|u| resolve_user(service, u)).transpose()?,
                date: date.as_deref().map(|d| date_arg(d, now)).transpose()?,
                show_completed: !hide_completed,
            };
            let sort = SortOptions { criterion: sort, ascending: !descending };
            cmd_list(service, &filter, &sort, limit);
            Ok(false)
        }

        TaskCommand::View { id } => {
            cmd_view(session.service(), id)?;
            Ok(false)
        }

        TaskCommand::Edit { id, title, desc, due, priority, owner, project, clear_project, remind } => {
            let service = session.service();
            let mut details = service.find_task(id).ok_or(SchedulerError::TaskNotFound(id))?.details();
            if let Some(title) = title {
                details.title = title;
            }
            if let Some(desc) = desc {
                details.description = desc;
            }
            if let Some(due) = due {
                details.deadline = deadline_arg(&due, now)?;
            }
            if let Some(priority) = priority {
                details.priority = priority;
            }
            if let Some(owner) = owner {
                details.owner = Some(resolve_user(service, &owner)?);
            }
            if clear_project {
                details.project = None;
            } else if let Some(project) = project {
                details.project = Some(resolve_project(service, &project)?);
            }
            if let Some(remind) = remind {
                details.reminder_minutes = remind;
            }
            session.edit_task(id, details)?;
            println!("Updated {id}");
            Ok(true)
        }

        TaskCommand::Complete { id } => {
            if session.set_completed(id, true)? {
                println!("Marked done.");
            } else {
                println!("Task {id} is already done.");
            }
            Ok(true)
        }

        TaskCommand::Reopen { id } => {
            if session.set_completed(id, false)? {
                println!("Reopened {id}");
            } else {
                println!("Task {id} is already open.");
            }
            Ok(true)
        }

        TaskCommand::Delete { id } => {
            let task = session.remove_task(id)?;
            println!("Deleted {} - {}", task.id, task.title);
            Ok(true)
        }

        TaskCommand::User { action } => cmd_user(session.service_mut(), action),

        TaskCommand::Project { action } => cmd_project(session.service_mut(), action),

        TaskCommand::Stats { json } => {
            let stats = session.service().statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Total:     {}", stats.total);
                println!("Completed: {}", stats.completed);
                println!("Active:    {}", stats.active);
            }
            Ok(false)
        }

        TaskCommand::Import { input, allow_duplicates } => {
            let count = session.import_tasks(Path::new(&input), !allow_duplicates)?;
            println!("Import completed. {count} task(s) imported.");
            Ok(count > 0)
        }

        TaskCommand::Export { output } => {
            let output = output.unwrap_or_else(|| "tasks_export.json".to_string());
            let count = session.service().export_tasks_to_file(Path::new(&output))?;
            println!("Exported {count} task(s) to {output}");
            Ok(false)
        }
    }
}

/// Add a new task as an undoable step.
#[allow(clippy::too_many_arguments)]
fn cmd_add(
    session: &mut Session,
    now: NaiveDateTime,
    title: String,
    desc: Option<String>,
    due: String,
    priority: Priority,
    owner: String,
    project: Option<String>,
    remind: i64,
) -> Result<bool> {
    let service = session.service();
    let details = TaskDetails {
        title,
        description: desc.unwrap_or_default(),
        deadline: deadline_arg(&due, now)?,
        priority,
        owner: Some(resolve_user(service, &owner)?),
        project: project.as_deref().map(|p| resolve_project(service, p)).transpose()?,
        reminder_minutes: remind,
    };
    let id = session.add_task(details)?;
    println!("Added {id}");
    Ok(true)
}

/// Print the filtered, sorted task table.
pub fn cmd_list(service: &TaskService, filter: &FilterOptions, sort: &SortOptions, limit: Option<usize>) {
    let mut tasks = service.filtered_and_sorted_tasks(filter, sort);
    if let Some(n) = limit {
        tasks.truncate(n);
    }
    print_table(&tasks, service);
}

/// View detailed information about a specific task.
pub fn cmd_view(service: &TaskService, id: u64) -> Result<()> {
    let t = service.find_task(id).ok_or(SchedulerError::TaskNotFound(id))?;
    println!("ID:        {}", t.id);
    println!("Title:     {}", t.title);
    if !t.description.is_empty() {
        println!("Details:   {}", t.description);
    }
    println!("Deadline:  {}", t.deadline.format("%Y-%m-%d %H:%M"));
    println!("Priority:  {}", t.priority.label());
    println!("Status:    {}", if t.completed { "done" } else { "open" });
    println!("Owner:     {}", owner_name(service, t));
    println!("Project:   {}", project_name(service, t));
    println!("Reminder:  {} min before", t.reminder_minutes);
    Ok(())
}

fn cmd_user(service: &mut TaskService, action: UserAction) -> Result<bool> {
    match action {
        UserAction::Add { name } => {
            let id = service.create_user(&name)?;
            println!("Added user {id}");
            Ok(true)
        }
        UserAction::Rename { user, name } => {
            let id = resolve_user(service, &user)?;
            service.rename_user(id, &name)?;
            println!("Renamed user {id}");
            Ok(true)
        }
        UserAction::Rm { user } => {
            let id = resolve_user(service, &user)?;
            match service.remove_user(id)? {
                Some(removed) => println!("Deleted user {}", removed.name),
                None => return Err(SchedulerError::UnknownUser(id)),
            }
            Ok(true)
        }
        UserAction::List => {
            println!("{:<5} {:<24} {}", "ID", "Name", "Tasks");
            for u in service.get_all_users() {
                println!("{:<5} {:<24} {}", u.id, truncate(&u.name, 24), service.tasks_of_user(u.id).len());
            }
            Ok(false)
        }
    }
}

fn cmd_project(service: &mut TaskService, action: ProjectAction) -> Result<bool> {
    match action {
        ProjectAction::Add { name, desc } => {
            let id = service.create_project(&name, desc.as_deref().unwrap_or(""))?;
            println!("Added project {id}");
            Ok(true)
        }
        ProjectAction::Update { project, name, desc } => {
            let id = resolve_project(service, &project)?;
            let current = service.find_project_by_id(id).cloned().ok_or(SchedulerError::UnknownProject(id))?;
            let name = name.unwrap_or(current.name);
            let desc = desc.unwrap_or(current.description);
            service.update_project(id, &name, &desc)?;
            println!("Updated project {id}");
            Ok(true)
        }
        ProjectAction::Rm { project } => {
            let id = resolve_project(service, &project)?;
            match service.remove_project(id)? {
                Some(removed) => println!("Deleted project {}", removed.name),
                None => return Err(SchedulerError::UnknownProject(id)),
            }
            Ok(true)
        }
        ProjectAction::List => {
            println!("{:<5} {:<20} {:<6} {}", "ID", "Name", "Tasks", "Description");
            for p in service.get_all_projects() {
                println!(
                    "{:<5} {:<20} {:<6} {}",
                    p.id,
                    truncate(&p.name, 20),
                    service.tasks_of_project(p.id).len(),
                    p.description
                );
            }
            Ok(false)
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut io::stdout());
}

/// Interactive loop.
///
/// Stdin is read on a helper thread and handed over a channel; this thread
/// owns the session and wakes for input or for the next reminder, whichever
/// comes first. Saves on exit.
pub fn cmd_shell(session: &mut Session, clock: &dyn Clock) -> Result<()> {
    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("Data file: {}", session.data_path().display());
    println!("Type 'help' for commands, 'quit' to leave.");
    prompt();
    loop {
        let fired = session.poll_reminders();
        if !fired.is_empty() {
            println!();
            for note in &fired {
                print_notification(note);
            }
            prompt();
        }

        match rx.recv_timeout(wait_for_next(session, clock)) {
            Ok(line) => {
                if !run_shell_line(session, clock, &line) {
                    break;
                }
                prompt();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    session.save()?;
    println!("Saved to {}", session.data_path().display());
    Ok(())
}

/// Handle one shell line. Returns `false` when the shell should end.
fn run_shell_line(session: &mut Session, clock: &dyn Clock, line: &str) -> bool {
    let args = split_args(line);
    if args.is_empty() {
        return true;
    }
    let parsed = match ShellLine::try_parse_from(args) {
        Ok(parsed) => parsed,
        Err(e) => {
            let _ = e.print();
            return true;
        }
    };

    match parsed.command {
        ShellCommand::Task(command) => {
            if let Err(e) = run_task_command(session, clock, command) {
                eprintln!("Error: {e}");
            }
        }
        ShellCommand::Undo => match session.commands().undo_description() {
            Some(what) => {
                session.undo();
                println!("Undone: {what}");
            }
            None => println!("Nothing to undo."),
        },
        ShellCommand::Redo => match session.commands().redo_description() {
            Some(what) => {
                session.redo();
                println!("Redone: {what}");
            }
            None => println!("Nothing to redo."),
        },
        ShellCommand::Save => match session.save() {
            Ok(()) => println!("Saved to {}", session.data_path().display()),
            Err(e) => eprintln!("Failed to save: {e}"),
        },
        ShellCommand::Quit => return false,
    }
    true
}

/// Print reminders as they fire. Never returns on its own.
pub fn cmd_watch(session: &mut Session, clock: &dyn Clock) -> Result<()> {
    println!("Watching {} reminder(s). Press Ctrl-C to stop.", session.reminders().len());
    loop {
        for note in session.poll_reminders() {
            print_notification(&note);
        }
        thread::sleep(wait_for_next(session, clock));
    }
}

fn wait_for_next(session: &Session, clock: &dyn Clock) -> StdDuration {
    session
        .next_reminder_due()
        .map(|due| (due - clock.now()).to_std().unwrap_or(StdDuration::ZERO))
        .unwrap_or(IDLE_WAIT)
        .min(IDLE_WAIT)
}

fn prompt() {
    print!("sched> ");
    let _ = io::stdout().flush();
}

fn print_notification(note: &ReminderNotification) {
    println!("Reminder: {} (due {})", note.message, note.deadline.format("%Y-%m-%d %H:%M"));
}

/// Print tasks as a fixed-width table.
pub fn print_table(tasks: &[Task], service: &TaskService) {
    println!(
        "{:<5} {:<4} {:<9} {:<16} {:<14} {:<14} {}",
        "ID", "Done", "Priority", "Deadline", "Owner", "Project", "Title"
    );
    for t in tasks {
        println!(
            "{:<5} {:<4} {:<9} {:<16} {:<14} {:<14} {}",
            t.id,
            if t.completed { "x" } else { "" },
            t.priority.label(),
            t.deadline.format("%Y-%m-%d %H:%M").to_string(),
            truncate(owner_name(service, t), 14),
            truncate(project_name(service, t), 14),
            t.title
        );
    }
}

fn owner_name<'a>(service: &'a TaskService, task: &Task) -> &'a str {
    task.owner
        .and_then(|id| service.find_user_by_id(id))
        .map(|u| u.name.as_str())
        .unwrap_or("-")
}

fn project_name<'a>(service: &'a TaskService, task: &Task) -> &'a str {
    task.project
        .and_then(|id| service.find_project_by_id(id))
        .map(|p| p.name.as_str())
        .unwrap_or("-")
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Resolve a user given by ID or exact name.
fn resolve_user(service: &TaskService, key: &str) -> Result<u64> {
    if let Ok(id) = key.trim().parse::<u64>() {
        if service.find_user_by_id(id).is_some() {
            return Ok(id);
        }
    }
    service
        .find_user_by_name(key.trim())
        .map(|u| u.id)
        .ok_or_else(|| SchedulerError::NotFound(format!("user '{key}'")))
}

/// Resolve a project given by ID or exact name.
fn resolve_project(service: &TaskService, key: &str) -> Result<u64> {
    if let Ok(id) = key.trim().parse::<u64>() {
        if service.find_project_by_id(id).is_some() {
            return Ok(id);
        }
    }
    service
        .find_project_by_name(key.trim())
        .map(|p| p.id)
        .ok_or_else(|| SchedulerError::NotFound(format!("project '{key}'")))
}

fn deadline_arg(s: &str, now: NaiveDateTime) -> Result<NaiveDateTime> {
    parse_deadline_input(s, now).ok_or_else(|| {
        SchedulerError::InvalidFormat(format!(
            "unrecognised deadline '{s}'. Use YYYY-MM-DD[THH:MM], 'today', 'tomorrow', or 'in N min|h|d|w'"
        ))
    })
}

fn date_arg(s: &str, now: NaiveDateTime) -> Result<chrono::NaiveDate> {
    parse_date_input(s, now.date())
        .ok_or_else(|| SchedulerError::InvalidFormat(format!("unrecognised date '{s}'. Use YYYY-MM-DD, 'today' or 'tomorrow'")))
}

/// Split a shell line into arguments. Whitespace separates arguments except
/// inside double quotes; `""` inside quotes is a literal quote.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                    in_token = true;
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_token {
        args.push(current);
    }
    args
}
