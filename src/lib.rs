//! # Task scheduler core
//!
//! Tasks, users and projects with filtering and sorting, undoable task
//! edits, deadline reminders and JSON persistence.
//!
//! ## Layers
//!
//! - **Entities**: [`task::Task`], [`user::User`], [`project::Project`]
//! - **Storage**: [`repository::Repository`] and the event-raising
//!   [`repository::TaskRepository`]
//! - **Queries**: [`strategy::Filter`] and [`strategy::SortStrategy`]
//! - **Facade**: [`service::TaskService`], which also owns the JSON snapshot,
//!   import/export and file persistence
//! - **History**: [`command::CommandManager`], a bounded undo/redo stack
//! - **Reminders**: [`reminder::ReminderManager`], driven by a
//!   [`clock::Clock`] and a [`timer::TimerQueue`]
//! - **Session**: [`session::Session`] wires the three together for a front
//!   end
//!
//! Everything runs on one thread. Change notifications are delivered
//! synchronously through [`events::Signal`].
//!
//! ## Quick start
//!
//! ```no_run
//! use std::rc::Rc;
//! use task_scheduler::clock::SystemClock;
//! use task_scheduler::session::Session;
//!
//! let mut session = Session::open("data.json", Rc::new(SystemClock));
//! for note in session.poll_reminders() {
//!     println!("{}", note.message);
//! }
//! session.save().ok();
//! ```

pub mod clock;
pub mod command;
pub mod db;
pub mod error;
pub mod events;
pub mod fields;
pub mod project;
pub mod reminder;
pub mod repository;
pub mod service;
pub mod session;
pub mod strategy;
pub mod task;
pub mod timer;
pub mod user;

pub use error::{Result, SchedulerError};
