//! Task service facade.
//!
//! `TaskService` owns the task, user and project repositories and is the
//! single entry point for queries and mutations. It derives filtered and
//! sorted views, statistics, the JSON snapshot and the name-based
//! import/export format. Task lifecycle events are raised by the task
//! repository and reach listeners registered with [`TaskService::subscribe`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::db::{self, Document, ExchangeRecord, ProjectRecord, TaskRecord, UserRecord};
use crate::error::{Result, SchedulerError};
use crate::events::{SubscriptionId, TaskEvent};
use crate::fields::{Priority, SortCriterion, MIN_REMINDER_MINUTES};
use crate::project::Project;
use crate::repository::{Repository, TaskRepository};
use crate::strategy::{apply_filters, Filter, SortStrategy};
use crate::task::{Task, TaskDetails};
use crate::user::User;

/// Combined filter selection, applied in a fixed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    /// Case-insensitive title substring; blank disables it.
    pub search_text: String,
    pub priority: Option<Priority>,
    pub project: Option<u64>,
    pub user: Option<u64>,
    pub date: Option<NaiveDate>,
    pub show_completed: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            search_text: String::new(),
            priority: None,
            project: None,
            user: None,
            date: None,
            show_completed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    pub criterion: SortCriterion,
    pub ascending: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            criterion: SortCriterion::Date,
            ascending: true,
        }
    }
}

/// Task counts over the live task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
}

/// Facade over the three repositories.
#[derive(Debug)]
pub struct TaskService {
    tasks: TaskRepository,
    users: Repository<User>,
    projects: Repository<Project>,
    data_path: PathBuf,
}

impl Default for TaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService {
    /// Empty service persisting to [`db::default_data_path`].
    pub fn new() -> Self {
        Self::with_data_path(db::default_data_path())
    }

    /// Empty service persisting to `path` when no explicit path is given.
    pub fn with_data_path(path: impl Into<PathBuf>) -> Self {
        TaskService {
            tasks: TaskRepository::new(),
            users: Repository::new(),
            projects: Repository::new(),
            data_path: path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Listen to task added/removed/changed/cleared events.
    pub fn subscribe(&mut self, listener: impl FnMut(&TaskEvent) + 'static) -> SubscriptionId {
        self.tasks.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.tasks.unsubscribe(id)
    }

    // ---- tasks ----

    /// Store a task, assigning an id if it has none.
    pub fn add_task(&mut self, task: Task) -> Option<u64> {
        let id = self.tasks.add(task)?;
        debug!(task_id = id, "task added");
        Some(id)
    }

    /// Validate editor input and store it as a new task.
    pub fn create_task(&mut self, details: TaskDetails) -> Result<u64> {
        self.validate_details(&details)?;
        let id = self.tasks.add(details.into_task()).ok_or_else(|| {
            SchedulerError::InvalidFormat("task could not be stored".into())
        })?;
        debug!(task_id = id, "task created");
        Ok(id)
    }

    /// Check editor input without mutating anything.
    pub fn validate_details(&self, details: &TaskDetails) -> Result<()> {
        if details.title.trim().is_empty() {
            return Err(SchedulerError::EmptyTitle);
        }
        let owner = details.owner.ok_or(SchedulerError::MissingOwner)?;
        if !self.users.contains(owner) {
            return Err(SchedulerError::UnknownUser(owner));
        }
        if let Some(project) = details.project {
            if !self.projects.contains(project) {
                return Err(SchedulerError::UnknownProject(project));
            }
        }
        Ok(())
    }

    pub fn remove_task(&mut self, id: u64) -> Option<Task> {
        self.remove_task_indexed(id).map(|(_, task)| task)
    }

    /// Remove a task, also returning its position in insertion order so it
    /// can be put back with [`Self::insert_task_at`].
    pub fn remove_task_indexed(&mut self, id: u64) -> Option<(usize, Task)> {
        let (idx, task) = self.tasks.remove_indexed(id)?;
        debug!(task_id = id, position = idx, "task removed");
        Some((idx, task))
    }

    /// Store a task at `index` in insertion order.
    pub fn insert_task_at(&mut self, index: usize, task: Task) -> Option<u64> {
        let id = self.tasks.insert_at(index, task)?;
        debug!(task_id = id, position = index, "task inserted");
        Some(id)
    }

    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.tasks.get_all()
    }

    pub fn find_task(&self, id: u64) -> Option<&Task> {
        self.tasks.find_by_id(id)
    }

    /// Mutate a task; listeners see a `Changed` event if anything differs.
    ///
    /// Returns `None` if the task does not exist, otherwise whether it changed.
    pub fn update_task(&mut self, id: u64, f: impl FnOnce(&mut Task)) -> Option<bool> {
        self.tasks.update(id, f)
    }

    pub fn set_completed(&mut self, id: u64, completed: bool) -> Option<bool> {
        self.tasks.update(id, |t| t.completed = completed)
    }

    /// Tasks owned by `user_id`, derived from the task set.
    pub fn tasks_of_user(&self, user_id: u64) -> Vec<Task> {
        self.filter_by_user(Some(user_id))
    }

    pub fn tasks_of_project(&self, project_id: u64) -> Vec<Task> {
        self.filter_by_project(Some(project_id))
    }

    // ---- users ----

    pub fn add_user(&mut self, user: User) -> Option<u64> {
        self.users.add(user)
    }

    /// Add a user by name. Names are trimmed, non-empty and unique.
    pub fn create_user(&mut self, name: &str) -> Result<u64> {
        let name = checked_name(name)?;
        if self.users.find_by_name(&name).is_some() {
            return Err(SchedulerError::DuplicateName(name));
        }
        self.users
            .add(User::new(name.clone()))
            .ok_or(SchedulerError::DuplicateName(name))
    }

    pub fn rename_user(&mut self, id: u64, name: &str) -> Result<()> {
        let name = checked_name(name)?;
        if self.users.find_by_name(&name).is_some_and(|u| u.id != id) {
            return Err(SchedulerError::DuplicateName(name));
        }
        let user = self.users.find_by_id_mut(id).ok_or(SchedulerError::UnknownUser(id))?;
        user.name = name;
        Ok(())
    }

    /// Remove a user that owns no tasks.
    pub fn remove_user(&mut self, id: u64) -> Result<Option<User>> {
        let Some(user) = self.users.find_by_id(id) else {
            return Ok(None);
        };
        let count = self.tasks.iter().filter(|t| t.owner == Some(id)).count();
        if count > 0 {
            return Err(SchedulerError::UserHasTasks {
                name: user.name.clone(),
                count,
            });
        }
        Ok(self.users.remove(id))
    }

    pub fn get_all_users(&self) -> Vec<User> {
        self.users.get_all()
    }

    pub fn find_user_by_id(&self, id: u64) -> Option<&User> {
        self.users.find_by_id(id)
    }

    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        self.users.find_by_name(name)
    }

    // ---- projects ----

    pub fn add_project(&mut self, project: Project) -> Option<u64> {
        self.projects.add(project)
    }

    /// Add a project by name. Names are trimmed, non-empty and unique.
    pub fn create_project(&mut self, name: &str, description: &str) -> Result<u64> {
        let name = checked_name(name)?;
        if self.projects.find_by_name(&name).is_some() {
            return Err(SchedulerError::DuplicateName(name));
        }
        self.projects
            .add(Project::new(name.clone(), description))
            .ok_or(SchedulerError::DuplicateName(name))
    }

    pub fn update_project(&mut self, id: u64, name: &str, description: &str) -> Result<()> {
        let name = checked_name(name)?;
        if self.projects.find_by_name(&name).is_some_and(|p| p.id != id) {
            return Err(SchedulerError::DuplicateName(name));
        }
        let project = self
            .projects
            .find_by_id_mut(id)
            .ok_or(SchedulerError::UnknownProject(id))?;
        project.name = name;
        project.description = description.to_string();
        Ok(())
    }

    /// Remove a project that has no tasks.
    pub fn remove_project(&mut self, id: u64) -> Result<Option<Project>> {
        let Some(project) = self.projects.find_by_id(id) else {
            return Ok(None);
        };
        let count = self.tasks.iter().filter(|t| t.project == Some(id)).count();
        if count > 0 {
            return Err(SchedulerError::ProjectHasTasks {
                name: project.name.clone(),
                count,
            });
        }
        Ok(self.projects.remove(id))
    }

    pub fn get_all_projects(&self) -> Vec<Project> {
        self.projects.get_all()
    }

    pub fn find_project_by_id(&self, id: u64) -> Option<&Project> {
        self.projects.find_by_id(id)
    }

    pub fn find_project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.find_by_name(name)
    }

    // ---- derived views ----

    /// Apply `filters` in order to the full task set.
    pub fn filter_tasks(&self, filters: &[Filter]) -> Vec<Task> {
        apply_filters(self.tasks.get_all(), filters)
    }

    pub fn filter_by_priority(&self, priority: Priority) -> Vec<Task> {
        self.filter_tasks(&[Filter::Priority(priority)])
    }

    pub fn filter_by_date(&self, date: NaiveDate) -> Vec<Task> {
        self.filter_tasks(&[Filter::Date(date)])
    }

    pub fn filter_by_project(&self, project: Option<u64>) -> Vec<Task> {
        self.filter_tasks(&[Filter::Project(project)])
    }

    pub fn filter_by_user(&self, user: Option<u64>) -> Vec<Task> {
        self.filter_tasks(&[Filter::User(user)])
    }

    pub fn filter_completed(&self, completed: bool) -> Vec<Task> {
        self.filter_tasks(&[Filter::Completed(completed)])
    }

    pub fn search_by_title(&self, keyword: &str) -> Vec<Task> {
        self.tasks.search_by_title(keyword)
    }

    /// The task list as shown to the user.
    ///
    /// Filters run in the order search, priority, project, user, date,
    /// completion. Incomplete tasks always come before completed ones; each
    /// group is then ordered by the selected criterion.
    pub fn filtered_and_sorted_tasks(&self, filter: &FilterOptions, sort: &SortOptions) -> Vec<Task> {
        let mut filters = Vec::new();
        let search = filter.search_text.trim();
        if !search.is_empty() {
            filters.push(Filter::TitleSearch(search.to_string()));
        }
        if let Some(p) = filter.priority {
            filters.push(Filter::Priority(p));
        }
        if let Some(project) = filter.project {
            filters.push(Filter::Project(Some(project)));
        }
        if let Some(user) = filter.user {
            filters.push(Filter::User(Some(user)));
        }
        if let Some(date) = filter.date {
            filters.push(Filter::Date(date));
        }
        if !filter.show_completed {
            filters.push(Filter::Completed(false));
        }

        let (mut open, mut done): (Vec<Task>, Vec<Task>) = self
            .filter_tasks(&filters)
            .into_iter()
            .partition(|t| !t.completed);
        let strategy = SortStrategy::new(sort.criterion, sort.ascending);
        strategy.sort(&mut open, &self.projects);
        strategy.sort(&mut done, &self.projects);
        open.extend(done);
        open
    }

    pub fn statistics(&self) -> TaskStatistics {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|t| t.completed).count();
        TaskStatistics {
            total,
            completed,
            active: total - completed,
        }
    }

    // ---- snapshot ----

    /// Full id-referenced snapshot of users, projects and tasks.
    pub fn to_json(&self) -> Value {
        let doc = Document {
            users: self.users.iter().map(UserRecord::from).collect(),
            projects: self.projects.iter().map(ProjectRecord::from).collect(),
            tasks: self.tasks.iter().map(TaskRecord::from).collect(),
        };
        serde_json::to_value(doc).unwrap_or(Value::Null)
    }

    /// Replace all state with a snapshot.
    ///
    /// The document is decoded before anything is touched, so a malformed
    /// snapshot leaves the service unchanged.
    pub fn from_json(&mut self, value: &Value) -> Result<()> {
        let doc = Document::from_value(value)?;
        self.clear_all();

        let mut users_by_id: HashMap<i64, u64> = HashMap::new();
        for rec in doc.users {
            let mut user = User::new(rec.name);
            user.id = db::id_ref(rec.id).unwrap_or(0);
            match self.users.add(user) {
                Some(id) => {
                    users_by_id.insert(rec.id, id);
                }
                None => warn!(id = rec.id, "duplicate user id in snapshot, skipped"),
            }
        }

        let mut projects_by_id: HashMap<i64, u64> = HashMap::new();
        for rec in doc.projects {
            let mut project = Project::new(rec.name, rec.description);
            project.id = db::id_ref(rec.id).unwrap_or(0);
            match self.projects.add(project) {
                Some(id) => {
                    projects_by_id.insert(rec.id, id);
                }
                None => warn!(id = rec.id, "duplicate project id in snapshot, skipped"),
            }
        }

        for rec in doc.tasks {
            let Some(deadline) = db::parse_datetime(&rec.deadline) else {
                warn!(id = rec.id, deadline = %rec.deadline, "unreadable deadline in snapshot, task skipped");
                continue;
            };
            let owner = db::id_ref(rec.owner_id).and_then(|raw| users_by_id.get(&(raw as i64)).copied());
            let project = db::id_ref(rec.project_id).and_then(|raw| projects_by_id.get(&(raw as i64)).copied());
            let mut task = Task::new(rec.title, deadline, Priority::from_localized(&rec.priority), owner)
                .with_description(rec.description)
                .with_project(project)
                .with_reminder_minutes(rec.reminder_minutes);
            task.id = db::id_ref(rec.id).unwrap_or(0);
            task.completed = rec.completed;
            if self.tasks.add(task).is_none() {
                warn!(id = rec.id, "duplicate task id in snapshot, skipped");
            }
        }

        self.tasks.resync_next_id();
        self.users.resync_next_id();
        self.projects.resync_next_id();
        info!(
            tasks = self.tasks.len(),
            users = self.users.len(),
            projects = self.projects.len(),
            "snapshot loaded"
        );
        Ok(())
    }

    /// Drop every task, user and project and restart all id counters.
    pub fn clear_all(&mut self) {
        self.tasks.clear();
        self.users.clear();
        self.projects.clear();
    }

    // ---- import / export ----

    /// Every task as a name-referenced exchange record.
    pub fn export_tasks_to_json_array(&self) -> Value {
        let records: Vec<ExchangeRecord> = self
            .tasks
            .iter()
            .map(|t| ExchangeRecord {
                title: t.title.clone(),
                description: t.description.clone(),
                deadline: db::format_datetime(t.deadline),
                priority: t.priority.to_localized().to_string(),
                completed: t.completed,
                owner: t
                    .owner
                    .and_then(|id| self.users.find_by_id(id))
                    .map(|u| u.name.clone())
                    .unwrap_or_default(),
                project: t
                    .project
                    .and_then(|id| self.projects.find_by_id(id))
                    .map(|p| p.name.clone())
                    .unwrap_or_default(),
                reminder_minutes: t.reminder_minutes,
            })
            .collect();
        serde_json::to_value(records).unwrap_or_else(|_| Value::Array(Vec::new()))
    }

    /// Add tasks from exchange records, creating missing users and projects
    /// by name. Returns how many tasks were added.
    ///
    /// See [`Self::prepare_import`] for which records are skipped.
    pub fn import_tasks_from_json_array(&mut self, array: &[Value], skip_duplicates: bool) -> usize {
        let imported = self
            .prepare_import(array, skip_duplicates)
            .into_iter()
            .filter_map(|task| self.tasks.add(task))
            .count();
        info!(imported, "tasks imported");
        imported
    }

    /// Turn exchange records into unsaved tasks without storing them, so a
    /// caller can add them through its own path (e.g. as undoable commands).
    ///
    /// Users and projects named by the records are created when missing.
    /// Records without a title or with an unreadable deadline are skipped.
    /// With `skip_duplicates`, a record whose title, deadline and owner match
    /// a stored task or an earlier record of the same batch is skipped.
    pub fn prepare_import(&mut self, array: &[Value], skip_duplicates: bool) -> Vec<Task> {
        let mut prepared: Vec<Task> = Vec::new();
        let mut skipped = 0;
        for value in array {
            let rec: ExchangeRecord = match serde_json::from_value(value.clone()) {
                Ok(rec) => rec,
                Err(e) => {
                    warn!(error = %e, "malformed import record skipped");
                    continue;
                }
            };
            if rec.title.trim().is_empty() {
                warn!("import record without title skipped");
                continue;
            }
            let Some(deadline) = db::parse_datetime(&rec.deadline) else {
                warn!(title = %rec.title, deadline = %rec.deadline, "import record with unreadable deadline skipped");
                continue;
            };

            let owner = self.user_for_import(&rec.owner);
            let project = self.project_for_import(&rec.project);

            let same = |t: &Task| t.title == rec.title && t.deadline == deadline && t.owner == owner;
            if skip_duplicates && (self.tasks.iter().any(same) || prepared.iter().any(same)) {
                skipped += 1;
                continue;
            }

            let mut task = Task::new(rec.title, deadline, Priority::from_localized(&rec.priority), owner)
                .with_description(rec.description)
                .with_project(project)
                .with_reminder_minutes(rec.reminder_minutes.max(MIN_REMINDER_MINUTES));
            task.completed = rec.completed;
            prepared.push(task);
        }
        debug!(prepared = prepared.len(), skipped, "import records resolved");
        prepared
    }

    fn user_for_import(&mut self, name: &str) -> Option<u64> {
        if name.is_empty() {
            return None;
        }
        if let Some(user) = self.users.find_by_name(name) {
            return Some(user.id);
        }
        debug!(name, "creating user for import");
        self.users.add(User::new(name))
    }

    fn project_for_import(&mut self, name: &str) -> Option<u64> {
        if name.is_empty() {
            return None;
        }
        if let Some(project) = self.projects.find_by_name(name) {
            return Some(project.id);
        }
        debug!(name, "creating project for import");
        self.projects.add(Project::new(name, ""))
    }

    /// Import an exchange file. The root must be a JSON array.
    pub fn import_tasks_from_file(&mut self, path: &Path, skip_duplicates: bool) -> Result<usize> {
        let items = db::read_json_array(path)?;
        Ok(self.import_tasks_from_json_array(&items, skip_duplicates))
    }

    /// Write every task to an exchange file. Returns how many were written.
    pub fn export_tasks_to_file(&self, path: &Path) -> Result<usize> {
        let array = self.export_tasks_to_json_array();
        let count = array.as_array().map(Vec::len).unwrap_or(0);
        db::write_json_atomic(path, &array)?;
        info!(count, path = %path.display(), "tasks exported");
        Ok(count)
    }

    // ---- files ----

    /// Save the snapshot to `path`, or to the configured data path.
    pub fn try_save_to_file(&self, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(&self.data_path);
        db::write_json_atomic(path, &self.to_json())?;
        info!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Like [`Self::try_save_to_file`], reporting failure as `false`.
    pub fn save_to_file(&self, path: Option<&Path>) -> bool {
        match self.try_save_to_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to save snapshot");
                false
            }
        }
    }

    /// Load a snapshot from `path`, or from the configured data path.
    /// State is left untouched on any failure.
    pub fn try_load_from_file(&mut self, path: Option<&Path>) -> Result<()> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(|| self.data_path.clone());
        let value = db::read_json(&path)?;
        self.from_json(&value)
    }

    /// Like [`Self::try_load_from_file`], reporting failure as `false`.
    /// A missing file is a normal first run and is not logged as a warning.
    pub fn load_from_file(&mut self, path: Option<&Path>) -> bool {
        match self.try_load_from_file(path) {
            Ok(()) => true,
            Err(SchedulerError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot file yet");
                false
            }
            Err(e) => {
                warn!(error = %e, "failed to load snapshot");
                false
            }
        }
    }

    /// Seed demo users and projects for a first run. Each collection is only
    /// seeded while empty, so repeated calls change nothing.
    pub fn initialize_default_data(&mut self) {
        if self.users.is_empty() {
            self.users.add(User::new("Ivan Ivanov"));
            self.users.add(User::new("Maria Petrova"));
        }
        if self.projects.is_empty() {
            self.projects.add(Project::new("Development", "Software development project"));
            self.projects.add(Project::new("Testing", "Testing project"));
        }
    }
}

fn checked_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SchedulerError::EmptyName);
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Timelike};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn service() -> TaskService {
        let mut s = TaskService::with_data_path("unused.json");
        s.initialize_default_data();
        s
    }

    fn details(title: &str, deadline: &str, priority: Priority, owner: u64) -> TaskDetails {
        TaskDetails {
            title: title.into(),
            description: String::new(),
            deadline: at(deadline),
            priority,
            owner: Some(owner),
            project: None,
            reminder_minutes: 30,
        }
    }

    fn titles(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn added_task_is_found_once() {
        let mut s = service();
        let id = s.create_task(details("Plan", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        assert_eq!(s.find_task(id).unwrap().title, "Plan");
        assert_eq!(s.get_all_tasks().iter().filter(|t| t.id == id).count(), 1);
        assert_eq!(s.tasks_of_user(1).len(), 1);
        assert!(s.tasks_of_user(2).is_empty());
    }

    #[test]
    fn invalid_details_are_rejected_without_mutation() {
        let mut s = service();
        let mut d = details("  ", "2025-05-01 10:00", Priority::High, 1);
        assert!(matches!(s.create_task(d.clone()), Err(SchedulerError::EmptyTitle)));
        d.title = "ok".into();
        d.owner = None;
        assert!(matches!(s.create_task(d.clone()), Err(SchedulerError::MissingOwner)));
        d.owner = Some(99);
        assert!(matches!(s.create_task(d.clone()), Err(SchedulerError::UnknownUser(99))));
        d.owner = Some(1);
        d.project = Some(42);
        assert!(matches!(s.create_task(d), Err(SchedulerError::UnknownProject(42))));
        assert!(s.get_all_tasks().is_empty());
    }

    #[test]
    fn default_data_is_idempotent() {
        let mut s = service();
        s.initialize_default_data();
        assert_eq!(s.get_all_users().len(), 2);
        assert_eq!(s.get_all_projects().len(), 2);
    }

    #[test]
    fn user_and_project_names_are_unique() {
        let mut s = service();
        assert!(matches!(s.create_user("Ivan Ivanov"), Err(SchedulerError::DuplicateName(_))));
        assert!(matches!(s.create_user("   "), Err(SchedulerError::EmptyName)));
        let id = s.create_user(" Olga ").unwrap();
        assert_eq!(s.find_user_by_name("Olga").map(|u| u.id), Some(id));
        assert!(s.rename_user(id, "Olga").is_ok());
        assert!(matches!(s.rename_user(id, "Maria Petrova"), Err(SchedulerError::DuplicateName(_))));
        assert!(matches!(s.create_project("Testing", ""), Err(SchedulerError::DuplicateName(_))));
        let pid = s.create_project("Ops", "infra").unwrap();
        s.update_project(pid, "Operations", "infra and deploys").unwrap();
        assert_eq!(s.find_project_by_id(pid).unwrap().name, "Operations");
    }

    #[test]
    fn deleting_referenced_user_or_project_is_rejected() {
        let mut s = service();
        let mut d = details("Plan", "2025-05-01 10:00", Priority::High, 1);
        d.project = Some(2);
        s.create_task(d).unwrap();
        let before = s.to_json();

        assert!(matches!(s.remove_user(1), Err(SchedulerError::UserHasTasks { count: 1, .. })));
        assert!(matches!(s.remove_project(2), Err(SchedulerError::ProjectHasTasks { count: 1, .. })));
        assert_eq!(s.to_json(), before);

        assert_eq!(s.remove_user(2).unwrap().map(|u| u.name), Some("Maria Petrova".to_string()));
        assert!(s.remove_project(1).unwrap().is_some());
        assert!(s.remove_user(2).unwrap().is_none());
    }

    #[test]
    fn filter_wrappers() {
        let mut s = service();
        s.create_task(details("High open", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        let done = s.create_task(details("High done", "2025-05-02 10:00", Priority::High, 2)).unwrap();
        s.create_task(details("Low open", "2025-05-01 23:00", Priority::Low, 1)).unwrap();
        s.set_completed(done, true);

        assert_eq!(titles(&s.filter_by_priority(Priority::High)), vec!["High open", "High done"]);
        assert_eq!(titles(&s.filter_completed(true)), vec!["High done"]);
        assert_eq!(
            titles(&s.filter_by_date(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())),
            vec!["High open", "Low open"]
        );
        assert_eq!(titles(&s.filter_by_user(Some(2))), vec!["High done"]);
        assert_eq!(titles(&s.search_by_title("open")), vec!["High open", "Low open"]);
        assert_eq!(
            titles(&s.filter_tasks(&[Filter::Priority(Priority::High), Filter::Completed(false)])),
            vec!["High open"]
        );
    }

    #[test]
    fn incomplete_tasks_sort_before_completed() {
        let mut s = service();
        let a = s.create_task(details("A", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        let b = s.create_task(details("B", "2025-05-01 09:00", Priority::Low, 1)).unwrap();
        s.set_completed(b, true);

        let sort = SortOptions { criterion: SortCriterion::Priority, ascending: true };
        let list = s.filtered_and_sorted_tasks(&FilterOptions::default(), &sort);
        assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, b]);

        let sort = SortOptions { criterion: SortCriterion::Date, ascending: true };
        let list = s.filtered_and_sorted_tasks(&FilterOptions::default(), &sort);
        assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn filtered_and_sorted_applies_every_option() {
        let mut s = service();
        let mut d = details("Report draft", "2025-05-01 10:00", Priority::High, 1);
        d.project = Some(1);
        s.create_task(d.clone()).unwrap();
        d.title = "Report final".into();
        d.deadline = at("2025-05-01 08:00");
        s.create_task(d.clone()).unwrap();
        d.title = "Report other day".into();
        d.deadline = at("2025-05-03 08:00");
        s.create_task(d.clone()).unwrap();
        d.title = "Report done".into();
        d.deadline = at("2025-05-01 07:00");
        let done = s.create_task(d.clone()).unwrap();
        s.set_completed(done, true);
        d.title = "Report low".into();
        d.priority = Priority::Low;
        s.create_task(d).unwrap();

        let filter = FilterOptions {
            search_text: " report ".into(),
            priority: Some(Priority::High),
            project: Some(1),
            user: Some(1),
            date: NaiveDate::from_ymd_opt(2025, 5, 1),
            show_completed: false,
        };
        let list = s.filtered_and_sorted_tasks(&filter, &SortOptions::default());
        assert_eq!(titles(&list), vec!["Report final", "Report draft"]);

        let filter = FilterOptions { show_completed: true, ..filter };
        let sort = SortOptions { criterion: SortCriterion::Title, ascending: false };
        let list = s.filtered_and_sorted_tasks(&filter, &sort);
        assert_eq!(titles(&list), vec!["Report final", "Report draft", "Report done"]);
    }

    #[test]
    fn statistics_track_completion() {
        let mut s = service();
        let a = s.create_task(details("A", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        s.create_task(details("B", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        s.set_completed(a, true);
        assert_eq!(s.statistics(), TaskStatistics { total: 2, completed: 1, active: 1 });
    }

    #[test]
    fn snapshot_round_trip_preserves_links() {
        let mut s = service();
        let mut d = details("Linked", "2025-05-01 10:15", Priority::Critical, 2);
        d.project = Some(2);
        d.description = "desc".into();
        let id = s.create_task(d).unwrap();
        s.set_completed(id, true);
        s.create_task(details("Plain", "2025-06-01 00:00", Priority::Low, 1)).unwrap();

        let snapshot = s.to_json();
        let mut restored = TaskService::with_data_path("unused.json");
        restored.from_json(&snapshot).unwrap();

        assert_eq!(restored.get_all_tasks(), s.get_all_tasks());
        assert_eq!(restored.get_all_users(), s.get_all_users());
        assert_eq!(restored.get_all_projects(), s.get_all_projects());
        let linked = restored.find_task(id).unwrap();
        assert_eq!(restored.find_user_by_id(linked.owner.unwrap()).unwrap().name, "Maria Petrova");
        assert_eq!(restored.find_project_by_id(linked.project.unwrap()).unwrap().name, "Testing");
        assert_eq!(linked.deadline.minute(), 15);
    }

    #[test]
    fn from_json_resyncs_id_counters() {
        let mut s = TaskService::with_data_path("unused.json");
        s.from_json(&json!({
            "users": [{"id": 5, "name": "Zed"}],
            "projects": [{"id": 9, "name": "P", "description": ""}],
            "tasks": [{"id": 12, "title": "T", "deadline": "2025-01-01T10:00:00",
                       "priority": "Высокий", "completed": false, "ownerId": 5,
                       "projectId": 3, "reminderMinutes": 15}]
        }))
        .unwrap();
        let t = s.find_task(12).unwrap();
        assert_eq!(t.owner, Some(5));
        assert_eq!(t.project, None);
        assert_eq!(t.priority, Priority::High);
        assert_eq!(s.create_user("New").unwrap(), 6);
        assert_eq!(s.create_project("Q", "").unwrap(), 10);
        assert_eq!(s.add_task(Task::new("Next", at("2025-01-01 10:00"), Priority::Low, None)), Some(13));
    }

    #[test]
    fn malformed_snapshot_leaves_state_unchanged() {
        let mut s = service();
        s.create_task(details("Keep", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        let before = s.to_json();
        assert!(s.from_json(&json!([1, 2, 3])).is_err());
        assert!(s.from_json(&json!({"users": "nope"})).is_err());
        assert_eq!(s.to_json(), before);
    }

    #[test]
    fn from_json_raises_cleared_then_added() {
        let mut s = service();
        s.create_task(details("Old", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        let snapshot = s.to_json();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        s.subscribe(move |e| {
            sink.borrow_mut().push(match e {
                TaskEvent::Added(_) => "added",
                TaskEvent::Removed(_) => "removed",
                TaskEvent::Changed { .. } => "changed",
                TaskEvent::Cleared => "cleared",
            })
        });
        s.from_json(&snapshot).unwrap();
        assert_eq!(*events.borrow(), vec!["cleared", "added"]);
    }

    #[test]
    fn import_creates_missing_users_and_projects() {
        let mut s = service();
        let records = vec![
            json!({"title": "Imported", "deadline": "2025-07-01T12:00:00", "priority": "Низкий",
                   "owner": "New Person", "project": "New Project", "reminderMinutes": 1}),
            json!({"title": "No project", "deadline": "2025-07-02T12:00:00",
                   "owner": "Ivan Ivanov", "project": ""}),
            json!({"title": "", "deadline": "2025-07-02T12:00:00"}),
            json!({"title": "Bad date", "deadline": "tomorrow"}),
        ];
        assert_eq!(s.import_tasks_from_json_array(&records, true), 2);
        let user = s.find_user_by_name("New Person").unwrap().id;
        let project = s.find_project_by_name("New Project").unwrap().id;
        let imported = &s.search_by_title("Imported")[0];
        assert_eq!(imported.owner, Some(user));
        assert_eq!(imported.project, Some(project));
        assert_eq!(imported.priority, Priority::Low);
        assert_eq!(imported.reminder_minutes, MIN_REMINDER_MINUTES);
        let plain = &s.search_by_title("No project")[0];
        assert_eq!(plain.project, None);
        assert_eq!(plain.reminder_minutes, 60);
        assert_eq!(plain.priority, Priority::Medium);
    }

    #[test]
    fn import_skips_duplicates_when_asked() {
        let mut s = service();
        let records = vec![json!({"title": "Same", "deadline": "2025-07-01T12:00:00", "owner": "Ivan Ivanov"})];
        assert_eq!(s.import_tasks_from_json_array(&records, true), 1);
        assert_eq!(s.import_tasks_from_json_array(&records, true), 0);
        assert_eq!(s.get_all_tasks().len(), 1);
        assert_eq!(s.import_tasks_from_json_array(&records, false), 1);
        assert_eq!(s.get_all_tasks().len(), 2);

        let other_owner = vec![json!({"title": "Same", "deadline": "2025-07-01T12:00:00", "owner": "Maria Petrova"})];
        assert_eq!(s.import_tasks_from_json_array(&other_owner, true), 1);
        assert_eq!(s.get_all_tasks().len(), 3);
    }

    #[test]
    fn export_uses_names() {
        let mut s = service();
        let mut d = details("Out", "2025-05-01 10:00", Priority::High, 2);
        d.project = Some(1);
        s.create_task(d).unwrap();
        s.add_task(Task::new("Orphan", at("2025-05-01 10:00"), Priority::Low, None));
        let array = s.export_tasks_to_json_array();
        assert_eq!(array[0]["owner"], json!("Maria Petrova"));
        assert_eq!(array[0]["project"], json!("Development"));
        assert_eq!(array[0]["priority"], json!("Высокий"));
        assert_eq!(array[1]["owner"], json!(""));
        assert_eq!(array[1]["project"], json!(""));
    }

    #[test]
    fn export_then_import_into_fresh_service() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let mut s = service();
        s.create_task(details("Move me", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        assert_eq!(s.export_tasks_to_file(&path).unwrap(), 1);

        let mut other = TaskService::with_data_path(dir.path().join("other.json"));
        assert_eq!(other.import_tasks_from_file(&path, true).unwrap(), 1);
        assert_eq!(other.get_all_users().len(), 1);
        assert_eq!(other.get_all_tasks()[0].title, "Move me");
    }

    #[test]
    fn import_file_must_be_an_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obj.json");
        std::fs::write(&path, "{}").unwrap();
        let mut s = service();
        assert!(matches!(s.import_tasks_from_file(&path, true), Err(SchedulerError::InvalidFormat(_))));
    }

    #[test]
    fn save_and_load_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let mut s = TaskService::with_data_path(&path);
        s.initialize_default_data();
        s.create_task(details("Persist", "2025-05-01 10:00", Priority::High, 1)).unwrap();
        assert!(s.save_to_file(None));

        let mut loaded = TaskService::with_data_path(&path);
        assert!(loaded.load_from_file(None));
        assert_eq!(loaded.get_all_tasks(), s.get_all_tasks());
    }

    #[test]
    fn load_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = service();
        let before = s.to_json();

        assert!(!s.load_from_file(Some(&dir.path().join("missing.json"))));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "{not json").unwrap();
        assert!(!s.load_from_file(Some(&garbage)));

        let array = dir.path().join("array.json");
        std::fs::write(&array, "[]").unwrap();
        assert!(!s.load_from_file(Some(&array)));

        assert_eq!(s.to_json(), before);
    }
}
