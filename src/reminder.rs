//! Deadline reminders.
//!
//! A [`Reminder`] is a one-shot alarm bound to a single open task, due at
//! `deadline - lead time`. The [`ReminderManager`] keeps at most one per task
//! and re-arms them as task events arrive. Alarms are delivered by
//! [`ReminderManager::poll`] from the event loop, never from inside the call
//! that armed them.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::clock::Clock;
use crate::events::{Signal, SubscriptionId, TaskEvent};
use crate::fields::MIN_REMINDER_MINUTES;
use crate::service::TaskService;
use crate::task::Task;
use crate::timer::TimerQueue;

/// A pending alarm for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: u64,
    /// Lead time in minutes, at least [`MIN_REMINDER_MINUTES`].
    pub minutes_before: i64,
    /// Deadline minus lead time.
    pub fire_at: NaiveDateTime,
}

/// Raised when a reminder fires for a still-open task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotification {
    pub task_id: u64,
    pub title: String,
    pub deadline: NaiveDateTime,
    pub message: String,
}

/// Per-task alarm scheduler.
pub struct ReminderManager {
    clock: Rc<dyn Clock>,
    reminders: BTreeMap<u64, Reminder>,
    timers: TimerQueue<u64>,
    /// Tasks this manager has armed at least once; they are re-armed when
    /// their deadline or lead time changes.
    watched: BTreeSet<u64>,
    notifications: Signal<ReminderNotification>,
}

impl ReminderManager {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        ReminderManager {
            clock,
            reminders: BTreeMap::new(),
            timers: TimerQueue::new(),
            watched: BTreeSet::new(),
            notifications: Signal::new(),
        }
    }

    /// Route `service` task events into `manager`.
    ///
    /// The subscription holds only a weak handle, so dropping the manager
    /// silently ends it.
    pub fn attach(manager: &Rc<RefCell<ReminderManager>>, service: &mut TaskService) -> SubscriptionId {
        let weak = Rc::downgrade(manager);
        service.subscribe(move |event| {
            if let Some(manager) = weak.upgrade() {
                manager.borrow_mut().handle_task_event(event);
            }
        })
    }

    /// Listen to fired reminders.
    pub fn subscribe(&mut self, listener: impl FnMut(&ReminderNotification) + 'static) -> SubscriptionId {
        self.notifications.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifications.unsubscribe(id)
    }

    /// Arm a reminder `minutes_before` the task's deadline, replacing any
    /// existing one. Completed tasks are ignored. A reminder that is already
    /// due is armed with zero delay and fires on the next [`Self::poll`].
    pub fn add_reminder(&mut self, task: &Task, minutes_before: i64) {
        if task.completed {
            return;
        }
        self.remove_reminder(task.id);

        let minutes_before = minutes_before.max(MIN_REMINDER_MINUTES);
        let now = self.clock.now();
        // A lead time reaching past the representable range is already due.
        let fire_at = Duration::try_minutes(minutes_before)
            .and_then(|lead| task.deadline.checked_sub_signed(lead))
            .unwrap_or(now);
        let delay = if task.deadline <= now || fire_at <= now {
            Duration::zero()
        } else {
            fire_at - now
        };
        let due = self.timers.arm_after(task.id, now, delay);
        self.reminders.insert(
            task.id,
            Reminder {
                task_id: task.id,
                minutes_before,
                fire_at,
            },
        );
        self.watched.insert(task.id);
        debug!(task_id = task.id, minutes_before, %due, "reminder armed");
    }

    /// Cancel the reminder for `task_id`. Returns `false` if there was none.
    pub fn remove_reminder(&mut self, task_id: u64) -> bool {
        self.timers.cancel(task_id);
        let removed = self.reminders.remove(&task_id).is_some();
        if removed {
            debug!(task_id, "reminder removed");
        }
        removed
    }

    /// Cancel every reminder.
    pub fn remove_all_reminders(&mut self) {
        self.timers.clear();
        self.reminders.clear();
    }

    pub fn find_reminder(&self, task_id: u64) -> Option<&Reminder> {
        self.reminders.get(&task_id)
    }

    pub fn reminders(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.values()
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// When the event loop next needs to call [`Self::poll`].
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.timers.next_due()
    }

    /// Fire every due reminder.
    ///
    /// Each task is looked up in `service` at fire time; one that is gone or
    /// completed is dropped silently. Fired reminders are removed, so each
    /// fires at most once.
    pub fn poll(&mut self, service: &TaskService) -> Vec<ReminderNotification> {
        let now = self.clock.now();
        let mut fired = Vec::new();
        for task_id in self.timers.expire(now) {
            let Some(reminder) = self.reminders.remove(&task_id) else {
                continue;
            };
            let Some(task) = service.find_task(task_id).filter(|t| !t.completed) else {
                debug!(task_id, "reminder dropped for missing or completed task");
                continue;
            };
            let message = if task.deadline <= now {
                format!("Task '{}' is overdue", task.title)
            } else {
                format!("Task '{}' is due in {} minutes", task.title, reminder.minutes_before)
            };
            let notification = ReminderNotification {
                task_id,
                title: task.title.clone(),
                deadline: task.deadline,
                message,
            };
            debug!(task_id, "reminder fired");
            self.notifications.emit(&notification);
            fired.push(notification);
        }
        fired
    }

    /// React to a task lifecycle event.
    pub fn handle_task_event(&mut self, event: &TaskEvent) {
        match event {
            TaskEvent::Added(task) => {
                if !task.completed {
                    self.add_reminder(task, task.reminder_minutes);
                }
            }
            TaskEvent::Removed(task) => {
                self.remove_reminder(task.id);
                self.watched.remove(&task.id);
            }
            TaskEvent::Changed { before, after } => {
                if self.reminders.contains_key(&after.id) {
                    if after.completed {
                        self.remove_reminder(after.id);
                    } else {
                        self.add_reminder(after, after.reminder_minutes);
                    }
                    return;
                }
                let resumed = before.completed && !after.completed;
                let rescheduled = self.watched.contains(&after.id)
                    && !after.completed
                    && (before.deadline != after.deadline || before.reminder_minutes != after.reminder_minutes);
                if resumed || rescheduled {
                    self.add_reminder(after, after.reminder_minutes);
                }
            }
            TaskEvent::Cleared => {
                self.remove_all_reminders();
                self.watched.clear();
            }
        }
    }
}
