//! In-memory repositories keyed by auto-assigned integer ids.
//!
//! Every operation is total: adding an item that is already stored, or
//! removing one that is not, is a silent no-op. Ids start at 1, grow
//! monotonically and are never reused, even after removal.

use crate::events::{Signal, SubscriptionId, TaskEvent};
use crate::task::Task;

/// An item with a repository-assigned id. Id `0` means "not yet assigned".
pub trait Entity: Clone {
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

/// An item with a human-meaningful name used as a secondary key.
pub trait Named {
    fn name(&self) -> &str;
}

/// Ordered collection of entities that owns its items by value.
#[derive(Debug, Clone)]
pub struct Repository<T> {
    items: Vec<T>,
    next_id: u64,
}

impl<T: Entity> Repository<T> {
    pub fn new() -> Self {
        Repository {
            items: Vec::new(),
            next_id: 1,
        }
    }

    /// Store `item`, assigning the next id if it has none.
    ///
    /// Returns the id it was stored under, or `None` if an item with the same
    /// id is already present.
    pub fn add(&mut self, mut item: T) -> Option<u64> {
        if item.id() != 0 && self.contains(item.id()) {
            return None;
        }
        if item.id() == 0 {
            item.set_id(self.next_id);
            self.next_id += 1;
        }
        let id = item.id();
        self.items.push(item);
        Some(id)
    }

    /// Remove by id, returning the removed item.
    pub fn remove(&mut self, id: u64) -> Option<T> {
        self.remove_indexed(id).map(|(_, item)| item)
    }

    /// Remove by id, returning the item and the position it held.
    pub fn remove_indexed(&mut self, id: u64) -> Option<(usize, T)> {
        let idx = self.position(id)?;
        Some((idx, self.items.remove(idx)))
    }

    /// Store `item` at `index` (clamped to the end). Same id rules as
    /// [`Self::add`].
    pub fn insert_at(&mut self, index: usize, mut item: T) -> Option<u64> {
        if item.id() != 0 && self.contains(item.id()) {
            return None;
        }
        if item.id() == 0 {
            item.set_id(self.next_id);
            self.next_id += 1;
        }
        let id = item.id();
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        Some(id)
    }

    /// Insertion-order position of the item with `id`.
    pub fn position(&self, id: u64) -> Option<usize> {
        self.items.iter().position(|t| t.id() == id)
    }

    /// Copy of every item in insertion order.
    pub fn get_all(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|t| t.id() == id)
    }

    pub fn find_by_id_mut(&mut self, id: u64) -> Option<&mut T> {
        self.items.iter_mut().find(|t| t.id() == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.find_by_id(id).is_some()
    }

    /// Drop everything and restart ids at 1.
    pub fn clear(&mut self) {
        self.items.clear();
        self.next_id = 1;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Id the next id-less item will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Move the id counter past every stored id (`max + 1`, or 1 when empty).
    pub fn resync_next_id(&mut self) {
        self.next_id = self.items.iter().map(|t| t.id()).max().unwrap_or(0) + 1;
    }
}

impl<T: Entity + Named> Repository<T> {
    /// First item whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&T> {
        self.items.iter().find(|t| t.name() == name)
    }
}

impl<T: Entity> Default for Repository<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Task storage that raises lifecycle events for downstream listeners.
#[derive(Debug, Default)]
pub struct TaskRepository {
    tasks: Repository<Task>,
    events: Signal<TaskEvent>,
}

impl TaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&TaskEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Store a task and raise [`TaskEvent::Added`] with the stored copy.
    pub fn add(&mut self, task: Task) -> Option<u64> {
        let id = self.tasks.add(task)?;
        self.announce_added(id);
        Some(id)
    }

    /// Store a task at `index` in insertion order and raise
    /// [`TaskEvent::Added`].
    pub fn insert_at(&mut self, index: usize, task: Task) -> Option<u64> {
        let id = self.tasks.insert_at(index, task)?;
        self.announce_added(id);
        Some(id)
    }

    fn announce_added(&mut self, id: u64) {
        if let Some(stored) = self.tasks.find_by_id(id).cloned() {
            self.events.emit(&TaskEvent::Added(stored));
        }
    }

    /// Remove a task and raise [`TaskEvent::Removed`].
    pub fn remove(&mut self, id: u64) -> Option<Task> {
        self.remove_indexed(id).map(|(_, task)| task)
    }

    /// Like [`Self::remove`], also returning the position the task held.
    pub fn remove_indexed(&mut self, id: u64) -> Option<(usize, Task)> {
        let (idx, task) = self.tasks.remove_indexed(id)?;
        self.events.emit(&TaskEvent::Removed(task.clone()));
        Some((idx, task))
    }

    /// Mutate a task in place. Raises [`TaskEvent::Changed`] only when the
    /// task actually differs afterwards.
    ///
    /// Returns `None` if the task does not exist, otherwise whether it changed.
    pub fn update(&mut self, id: u64, f: impl FnOnce(&mut Task)) -> Option<bool> {
        let task = self.tasks.find_by_id_mut(id)?;
        let before = task.clone();
        f(task);
        // The id is the task's identity and cannot be edited.
        task.id = before.id;
        if task.reminder_minutes < 0 {
            task.reminder_minutes = 0;
        }
        if *task == before {
            return Some(false);
        }
        let after = task.clone();
        self.events.emit(&TaskEvent::Changed { before, after });
        Some(true)
    }

    pub fn get_all(&self) -> Vec<Task> {
        self.tasks.get_all()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Task> {
        self.tasks.find_by_id(id)
    }

    /// Tasks whose title contains `keyword`, ignoring case.
    pub fn search_by_title(&self, keyword: &str) -> Vec<Task> {
        let keyword = keyword.to_lowercase();
        self.tasks
            .iter()
            .filter(|t| t.title.to_lowercase().contains(&keyword))
            .cloned()
            .collect()
    }

    /// Drop every task, restart ids, and raise [`TaskEvent::Cleared`].
    pub fn clear(&mut self) {
        self.tasks.clear();
        self.events.emit(&TaskEvent::Cleared);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.tasks.next_id()
    }

    pub fn resync_next_id(&mut self) {
        self.tasks.resync_next_id();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Priority;
    use crate::user::User;
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn task(title: &str) -> Task {
        let deadline = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        Task::new(title, deadline, Priority::Medium, None)
    }

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let mut repo: Repository<User> = Repository::new();
        assert_eq!(repo.add(User::new("a")), Some(1));
        assert_eq!(repo.add(User::new("b")), Some(2));
        assert!(repo.remove(2).is_some());
        assert_eq!(repo.add(User::new("c")), Some(3));
        assert_eq!(repo.get_all().iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn adding_a_stored_item_is_a_no_op() {
        let mut repo: Repository<User> = Repository::new();
        let id = repo.add(User::new("a")).unwrap();
        let stored = repo.find_by_id(id).cloned().unwrap();
        assert_eq!(repo.add(stored), None);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn explicit_ids_are_kept() {
        let mut repo: Repository<User> = Repository::new();
        let mut u = User::new("x");
        u.id = 10;
        assert_eq!(repo.add(u), Some(10));
        assert_eq!(repo.next_id(), 1);
        repo.resync_next_id();
        assert_eq!(repo.next_id(), 11);
    }

    #[test]
    fn remove_missing_is_a_no_op() {
        let mut repo: Repository<User> = Repository::new();
        repo.add(User::new("a"));
        assert!(repo.remove(42).is_none());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn clear_resets_the_counter() {
        let mut repo: Repository<User> = Repository::new();
        repo.add(User::new("a"));
        repo.add(User::new("b"));
        repo.clear();
        assert!(repo.is_empty());
        assert_eq!(repo.add(User::new("c")), Some(1));
    }

    #[test]
    fn find_by_name_is_exact_and_first() {
        let mut repo: Repository<User> = Repository::new();
        repo.add(User::new("Ann"));
        repo.add(User::new("ann"));
        repo.add(User::new("Ann"));
        assert_eq!(repo.find_by_name("Ann").map(|u| u.id), Some(1));
        assert_eq!(repo.find_by_name("ann").map(|u| u.id), Some(2));
        assert!(repo.find_by_name("An").is_none());
    }

    #[test]
    fn get_all_is_a_copy() {
        let mut repo: Repository<User> = Repository::new();
        repo.add(User::new("a"));
        let mut snapshot = repo.get_all();
        snapshot[0].name = "changed".into();
        assert_eq!(repo.find_by_id(1).unwrap().name, "a");
    }

    #[test]
    fn task_repository_raises_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut repo = TaskRepository::new();
        let sink = seen.clone();
        repo.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let id = repo.add(task("Plan")).unwrap();
        assert_eq!(repo.update(id, |t| t.title = "Plan".into()), Some(false));
        assert_eq!(repo.update(id, |t| t.completed = true), Some(true));
        assert_eq!(repo.update(99, |t| t.completed = true), None);
        repo.remove(id);
        repo.remove(id);
        repo.clear();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 4);
        assert!(matches!(&seen[0], TaskEvent::Added(t) if t.id == id));
        assert!(matches!(&seen[1], TaskEvent::Changed { before, after } if !before.completed && after.completed));
        assert!(matches!(&seen[2], TaskEvent::Removed(t) if t.id == id));
        assert_eq!(seen[3], TaskEvent::Cleared);
    }

    #[test]
    fn update_cannot_change_the_id() {
        let mut repo = TaskRepository::new();
        let id = repo.add(task("Plan")).unwrap();
        repo.update(id, |t| {
            t.id = 500;
            t.reminder_minutes = -5;
        });
        let stored = repo.find_by_id(id).unwrap();
        assert_eq!(stored.reminder_minutes, 0);
    }

    #[test]
    fn search_by_title_ignores_case() {
        let mut repo = TaskRepository::new();
        repo.add(task("Write REPORT"));
        repo.add(task("Call Bob"));
        repo.add(task("report review"));
        let titles: Vec<_> = repo.search_by_title("Report").into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Write REPORT", "report review"]);
    }

    #[test]
    fn reinserting_at_the_old_position_keeps_order() {
        let mut repo = TaskRepository::new();
        let a = repo.add(task("A")).unwrap();
        repo.add(task("B"));
        repo.add(task("C"));
        let added = Rc::new(RefCell::new(0));
        let sink = added.clone();
        repo.subscribe(move |e| {
            if matches!(e, TaskEvent::Added(_)) {
                *sink.borrow_mut() += 1;
            }
        });

        let (idx, removed) = repo.remove_indexed(a).unwrap();
        assert_eq!(idx, 0);
        assert_eq!(repo.insert_at(idx, removed), Some(a));
        let titles: Vec<_> = repo.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(*added.borrow(), 1);
        let duplicate = repo.find_by_id(a).cloned().unwrap();
        assert_eq!(repo.insert_at(0, duplicate), None);
        assert_eq!(repo.next_id(), 4);
    }
}
