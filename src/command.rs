//! Undoable task commands and the linear undo/redo history.
//!
//! Commands refer to tasks by id and carry value snapshots, never
//! references, and are resolved against the [`TaskService`] each time they
//! are applied or reverted.

use std::collections::VecDeque;

use tracing::debug;

use crate::events::{HistoryState, Signal, SubscriptionId};
use crate::service::TaskService;
use crate::task::{Task, TaskDetails};

/// Maximum number of commands kept in the undo window.
pub const MAX_HISTORY: usize = 50;

/// A reversible task mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert a task; reverting removes it. The id assigned on the first
    /// apply is kept, so redo restores the same task.
    AddTask { task: Task },
    /// Remove a task; reverting re-inserts the snapshot taken at removal
    /// at the position it held.
    RemoveTask { task_id: u64, removed: Option<(usize, Task)> },
    /// Replace every editable field.
    EditTask {
        task_id: u64,
        before: TaskDetails,
        after: TaskDetails,
    },
    /// Complete (`true`) or resume (`false`) a task; reverting flips it.
    SetCompleted { task_id: u64, completed: bool },
}

impl Command {
    pub fn add_task(task: Task) -> Self {
        Command::AddTask { task }
    }

    pub fn remove_task(task_id: u64) -> Self {
        Command::RemoveTask { task_id, removed: None }
    }

    /// Edit command from the task's current state to `after`.
    /// Returns `None` if the task does not exist.
    pub fn edit_task(service: &TaskService, task_id: u64, after: TaskDetails) -> Option<Self> {
        let before = service.find_task(task_id)?.details();
        Some(Command::EditTask { task_id, before, after })
    }

    pub fn set_completed(task_id: u64, completed: bool) -> Self {
        Command::SetCompleted { task_id, completed }
    }

    /// Perform the mutation.
    pub fn apply(&mut self, service: &mut TaskService) {
        match self {
            Command::AddTask { task } => {
                if let Some(id) = service.add_task(task.clone()) {
                    task.id = id;
                }
            }
            Command::RemoveTask { task_id, removed } => {
                if let Some(entry) = service.remove_task_indexed(*task_id) {
                    *removed = Some(entry);
                }
            }
            Command::EditTask { task_id, after, .. } => {
                service.update_task(*task_id, |t| after.apply_to(t));
            }
            Command::SetCompleted { task_id, completed } => {
                service.set_completed(*task_id, *completed);
            }
        }
    }

    /// Invert the mutation.
    pub fn revert(&mut self, service: &mut TaskService) {
        match self {
            Command::AddTask { task } => {
                service.remove_task(task.id);
            }
            Command::RemoveTask { removed, .. } => {
                if let Some((idx, task)) = removed.clone() {
                    service.insert_task_at(idx, task);
                }
            }
            Command::EditTask { task_id, before, .. } => {
                service.update_task(*task_id, |t| before.apply_to(t));
            }
            Command::SetCompleted { task_id, completed } => {
                service.set_completed(*task_id, !*completed);
            }
        }
    }

    /// Id of the task this command touches. For `AddTask` this is `0` until
    /// the first apply.
    pub fn task_id(&self) -> u64 {
        match self {
            Command::AddTask { task } => task.id,
            Command::RemoveTask { task_id, .. }
            | Command::EditTask { task_id, .. }
            | Command::SetCompleted { task_id, .. } => *task_id,
        }
    }

    /// Short label for menus and history listings.
    pub fn description(&self) -> &'static str {
        match self {
            Command::AddTask { .. } => "Add task",
            Command::RemoveTask { .. } => "Delete task",
            Command::EditTask { .. } => "Edit task",
            Command::SetCompleted { completed: true, .. } => "Complete task",
            Command::SetCompleted { completed: false, .. } => "Resume task",
        }
    }
}

/// Bounded linear history with a cursor at the last applied command.
#[derive(Debug)]
pub struct CommandManager {
    history: VecDeque<Command>,
    /// Number of commands currently applied; the cursor is `applied - 1`.
    applied: usize,
    capacity: usize,
    availability: Signal<HistoryState>,
}

impl Default for CommandManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CommandManager {
            history: VecDeque::new(),
            applied: 0,
            capacity: capacity.max(1),
            availability: Signal::new(),
        }
    }

    /// Listen to undo/redo availability changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&HistoryState) + 'static) -> SubscriptionId {
        self.availability.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.availability.unsubscribe(id)
    }

    /// Apply `command` and record it, discarding any redo history. The
    /// oldest entry is evicted once the history exceeds its capacity.
    pub fn execute(&mut self, mut command: Command, service: &mut TaskService) {
        self.history.truncate(self.applied);
        command.apply(service);
        debug!(command = command.description(), "command executed");
        self.history.push_back(command);
        self.applied += 1;
        if self.history.len() > self.capacity {
            self.history.pop_front();
            self.applied -= 1;
        }
        self.notify();
    }

    /// Revert the command at the cursor. Returns `false` if there is none.
    pub fn undo(&mut self, service: &mut TaskService) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.applied -= 1;
        let command = &mut self.history[self.applied];
        command.revert(service);
        debug!(command = command.description(), "command undone");
        self.notify();
        true
    }

    /// Re-apply the command after the cursor. Returns `false` if there is none.
    pub fn redo(&mut self, service: &mut TaskService) -> bool {
        if !self.can_redo() {
            return false;
        }
        let command = &mut self.history[self.applied];
        command.apply(service);
        debug!(command = command.description(), "command redone");
        self.applied += 1;
        self.notify();
        true
    }

    /// Forget every command.
    pub fn clear(&mut self) {
        self.history.clear();
        self.applied = 0;
        self.notify();
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.history.len()
    }

    /// Index of the last applied command, `None` before the first entry.
    pub fn current_index(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Label of the command `undo` would revert.
    pub fn undo_description(&self) -> Option<&'static str> {
        self.current_index().map(|i| self.history[i].description())
    }

    /// Label of the command `redo` would apply.
    pub fn redo_description(&self) -> Option<&'static str> {
        self.history.get(self.applied).map(Command::description)
    }

    /// The command at the cursor, i.e. the one `undo` would revert.
    pub fn last_applied(&self) -> Option<&Command> {
        self.applied.checked_sub(1).and_then(|i| self.history.get(i))
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    fn notify(&mut self) {
        let state = self.state();
        self.availability.emit(&state);
    }
}
