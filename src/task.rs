//! Task data structure and related functionality.
//!
//! A task references its owner and project by id only. The reverse view
//! (which tasks a user owns) is derived on demand by the service, so there is
//! no back-pointer list to keep consistent.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::fields::{Priority, DEFAULT_REMINDER_MINUTES};
use crate::repository::Entity;

/// A schedulable work item with a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Repository id; `0` until the task is first stored.
    pub id: u64,
    pub title: String,
    pub description: String,
    pub deadline: NaiveDateTime,
    pub priority: Priority,
    pub completed: bool,
    pub owner: Option<u64>,
    pub project: Option<u64>,
    /// Reminder lead time in minutes before the deadline.
    pub reminder_minutes: i64,
}

impl Task {
    /// Create an unsaved, incomplete task with the default reminder lead time.
    pub fn new(title: impl Into<String>, deadline: NaiveDateTime, priority: Priority, owner: Option<u64>) -> Self {
        Task {
            id: 0,
            title: title.into(),
            description: String::new(),
            deadline,
            priority,
            completed: false,
            owner,
            project: None,
            reminder_minutes: DEFAULT_REMINDER_MINUTES,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_project(mut self, project: Option<u64>) -> Self {
        self.project = project;
        self
    }

    pub fn with_reminder_minutes(mut self, minutes: i64) -> Self {
        self.reminder_minutes = minutes;
        self
    }

    /// Calendar date of the deadline.
    pub fn deadline_date(&self) -> NaiveDate {
        self.deadline.date()
    }

    /// Snapshot of every user-editable field.
    pub fn details(&self) -> TaskDetails {
        TaskDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            deadline: self.deadline,
            priority: self.priority,
            owner: self.owner,
            project: self.project,
            reminder_minutes: self.reminder_minutes,
        }
    }
}

impl Entity for Task {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// The editable fields of a task, as entered in an editor.
///
/// Used both as the input for new tasks and as the before/after state of an
/// undoable edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDetails {
    pub title: String,
    pub description: String,
    pub deadline: NaiveDateTime,
    pub priority: Priority,
    pub owner: Option<u64>,
    pub project: Option<u64>,
    pub reminder_minutes: i64,
}

impl TaskDetails {
    /// Overwrite the editable fields of `task`, leaving id and completion alone.
    pub fn apply_to(&self, task: &mut Task) {
        task.title = self.title.clone();
        task.description = self.description.clone();
        task.deadline = self.deadline;
        task.priority = self.priority;
        task.owner = self.owner;
        task.project = self.project;
        task.reminder_minutes = self.reminder_minutes;
    }

    /// Build a new, unsaved task from these details.
    pub fn into_task(self) -> Task {
        Task {
            id: 0,
            title: self.title,
            description: self.description,
            deadline: self.deadline,
            priority: self.priority,
            completed: false,
            owner: self.owner,
            project: self.project,
            reminder_minutes: self.reminder_minutes,
        }
    }
}
