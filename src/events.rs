//! Explicit observer registration for cross-component notifications.
//!
//! Everything runs on one thread, so listeners are plain `FnMut` closures
//! called synchronously, in subscription order, in the order events are
//! raised.

use std::fmt;

use crate::task::Task;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
pub type SubscriptionId = u64;

/// An ordered list of listeners for events of type `E`.
pub struct Signal<E> {
    listeners: Vec<(SubscriptionId, Box<dyn FnMut(&E)>)>,
    next_id: SubscriptionId,
}

impl<E> Signal<E> {
    pub fn new() -> Self {
        Signal {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a listener. It receives every event emitted after this call.
    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Task lifecycle events raised by the task repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Added(Task),
    Removed(Task),
    Changed { before: Task, after: Task },
    /// Every task was dropped at once, without individual `Removed` events.
    Cleared,
}

/// Undo/redo availability after a history change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryState {
    pub can_undo: bool,
    pub can_redo: bool,
}
