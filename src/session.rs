//! A working session: the service, its undo history and its reminders,
//! wired together the way an interactive front end needs them.
//!
//! Task mutations go through the [`CommandManager`] so they can be undone.
//! User and project management is not undoable and goes straight to the
//! service via [`Session::service_mut`].

use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::command::{Command, CommandManager};
use crate::db;
use crate::error::{Result, SchedulerError};
use crate::events::SubscriptionId;
use crate::reminder::{ReminderManager, ReminderNotification};
use crate::service::TaskService;
use crate::task::{Task, TaskDetails};

pub struct Session {
    service: TaskService,
    commands: CommandManager,
    reminders: Rc<RefCell<ReminderManager>>,
}

impl Session {
    /// Open the data file at `path`. A missing or unreadable file starts a
    /// fresh session seeded with the default users and projects.
    pub fn open(path: impl Into<PathBuf>, clock: Rc<dyn Clock>) -> Self {
        let mut service = TaskService::with_data_path(path);
        let reminders = Rc::new(RefCell::new(ReminderManager::new(clock)));
        ReminderManager::attach(&reminders, &mut service);

        match service.try_load_from_file(None) {
            Ok(()) => info!(path = %service.data_path().display(), "session loaded"),
            Err(SchedulerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no data file, starting with defaults");
            }
            Err(e) => warn!(error = %e, "could not load data file, starting with defaults"),
        }
        service.initialize_default_data();

        Session {
            service,
            commands: CommandManager::new(),
            reminders,
        }
    }

    pub fn service(&self) -> &TaskService {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut TaskService {
        &mut self.service
    }

    pub fn commands(&self) -> &CommandManager {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandManager {
        &mut self.commands
    }

    pub fn reminders(&self) -> Ref<'_, ReminderManager> {
        self.reminders.borrow()
    }

    pub fn data_path(&self) -> &Path {
        self.service.data_path()
    }

    /// Listen to fired reminders.
    pub fn subscribe_reminders(&mut self, listener: impl FnMut(&ReminderNotification) + 'static) -> SubscriptionId {
        self.reminders.borrow_mut().subscribe(listener)
    }

    /// Validate and add a task as an undoable step. Returns the new id.
    pub fn add_task(&mut self, details: TaskDetails) -> Result<u64> {
        self.service.validate_details(&details)?;
        self.commands.execute(Command::add_task(details.into_task()), &mut self.service);
        match self.commands.last_applied() {
            Some(command) if command.task_id() != 0 => Ok(command.task_id()),
            _ => Err(SchedulerError::InvalidFormat("task could not be stored".into())),
        }
    }

    /// Replace every editable field of a task as one undoable step.
    pub fn edit_task(&mut self, id: u64, details: TaskDetails) -> Result<()> {
        self.service.validate_details(&details)?;
        let command = Command::edit_task(&self.service, id, details).ok_or(SchedulerError::TaskNotFound(id))?;
        self.commands.execute(command, &mut self.service);
        Ok(())
    }

    /// Complete or resume a task. Returns `false`, recording nothing, if the
    /// task is already in that state.
    pub fn set_completed(&mut self, id: u64, completed: bool) -> Result<bool> {
        let task = self.service.find_task(id).ok_or(SchedulerError::TaskNotFound(id))?;
        if task.completed == completed {
            return Ok(false);
        }
        self.commands.execute(Command::set_completed(id, completed), &mut self.service);
        Ok(true)
    }

    /// Delete a task as an undoable step. Returns the removed snapshot.
    pub fn remove_task(&mut self, id: u64) -> Result<Task> {
        let task = self.service.find_task(id).cloned().ok_or(SchedulerError::TaskNotFound(id))?;
        self.commands.execute(Command::remove_task(id), &mut self.service);
        Ok(task)
    }

    pub fn undo(&mut self) -> bool {
        self.commands.undo(&mut self.service)
    }

    pub fn redo(&mut self) -> bool {
        self.commands.redo(&mut self.service)
    }

    /// Import an exchange file. Each imported task is recorded as its own
    /// undoable add; users and projects created on the way stay.
    pub fn import_tasks(&mut self, path: &Path, skip_duplicates: bool) -> Result<usize> {
        let items = db::read_json_array(path)?;
        let tasks = self.service.prepare_import(&items, skip_duplicates);
        let count = tasks.len();
        for task in tasks {
            self.commands.execute(Command::add_task(task), &mut self.service);
        }
        info!(count, path = %path.display(), "tasks imported");
        Ok(count)
    }

    /// Fire every reminder that is due now.
    pub fn poll_reminders(&mut self) -> Vec<ReminderNotification> {
        self.reminders.borrow_mut().poll(&self.service)
    }

    /// When the next reminder is due, if any is pending.
    pub fn next_reminder_due(&self) -> Option<NaiveDateTime> {
        self.reminders.borrow().next_due()
    }

    /// Persist to the session's data file.
    pub fn save(&self) -> Result<()> {
        self.service.try_save_to_file(None)
    }
}
