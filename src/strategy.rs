//! Filter and sort strategies over task lists.
//!
//! Filters are pure predicates that keep the input order. A list of filters
//! composes by sequential intersection: each one narrows the result of the
//! one before it. Sorts are stable, so equal keys keep their input order.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::fields::{Priority, SortCriterion};
use crate::project::Project;
use crate::repository::Repository;
use crate::task::Task;

/// A single task predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Exact priority match.
    Priority(Priority),
    /// Deadline falls on this calendar date, time ignored.
    Date(NaiveDate),
    /// Task belongs to this project (`None` = tasks without a project).
    Project(Option<u64>),
    /// Task is owned by this user (`None` = tasks without an owner).
    User(Option<u64>),
    /// Completion flag equals the value.
    Completed(bool),
    /// Title contains the keyword, ignoring case.
    TitleSearch(String),
}

impl Filter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Filter::Priority(p) => task.priority == *p,
            Filter::Date(d) => task.deadline_date() == *d,
            Filter::Project(p) => task.project == *p,
            Filter::User(u) => task.owner == *u,
            Filter::Completed(c) => task.completed == *c,
            Filter::TitleSearch(keyword) => task.title.to_lowercase().contains(&keyword.to_lowercase()),
        }
    }

    /// Keep the tasks that match, preserving order.
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks.into_iter().filter(|t| self.matches(t)).collect()
    }
}

/// Apply `filters` one after another (logical AND).
pub fn apply_filters(tasks: Vec<Task>, filters: &[Filter]) -> Vec<Task> {
    filters.iter().fold(tasks, |acc, f| f.apply(acc))
}

/// Ordering of a task list by one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortStrategy {
    pub criterion: SortCriterion,
    pub ascending: bool,
}

impl SortStrategy {
    pub fn new(criterion: SortCriterion, ascending: bool) -> Self {
        SortStrategy { criterion, ascending }
    }

    /// Compare two tasks by the criterion alone, ascending.
    ///
    /// Project names are looked up in `projects`; a task without a project
    /// sorts as the empty string.
    pub fn compare(&self, a: &Task, b: &Task, projects: &Repository<Project>) -> Ordering {
        match self.criterion {
            SortCriterion::Date => a.deadline.cmp(&b.deadline),
            SortCriterion::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortCriterion::Title => a.title.cmp(&b.title),
            SortCriterion::Project => project_name(a, projects).cmp(project_name(b, projects)),
        }
    }

    /// Stable in-place sort honoring the direction flag.
    pub fn sort(&self, tasks: &mut [Task], projects: &Repository<Project>) {
        tasks.sort_by(|a, b| {
            let ord = self.compare(a, b, projects);
            if self.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }
}

fn project_name<'a>(task: &Task, projects: &'a Repository<Project>) -> &'a str {
    task.project
        .and_then(|id| projects.find_by_id(id))
        .map(|p| p.name.as_str())
        .unwrap_or("")
}
