//! Enumerations and field types for task scheduling.
//!
//! This module defines the priority scale shared by tasks, filters and sorts,
//! the localized priority names used by the JSON formats, and the sort
//! criteria offered to callers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Default reminder lead time in minutes for new and imported tasks.
pub const DEFAULT_REMINDER_MINUTES: i64 = 60;

/// Smallest lead time a reminder is ever armed with.
pub const MIN_REMINDER_MINUTES: i64 = 2;

/// Task importance, ordered `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Integer rank used for ordering.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
            Priority::Critical => 3,
        }
    }

    /// Localized name written to the persisted and exported JSON.
    pub fn to_localized(self) -> &'static str {
        match self {
            Priority::Low => "Низкий",
            Priority::Medium => "Средний",
            Priority::High => "Высокий",
            Priority::Critical => "Критический",
        }
    }

    /// Parse a localized or English priority name.
    ///
    /// Unrecognized input falls back to `Medium` and is logged, so a damaged
    /// record still loads.
    pub fn from_localized(s: &str) -> Priority {
        match s.trim() {
            "Низкий" => return Priority::Low,
            "Средний" => return Priority::Medium,
            "Высокий" => return Priority::High,
            "Критический" => return Priority::Critical,
            _ => {}
        }
        match s.trim().to_lowercase().as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            "critical" => Priority::Critical,
            other => {
                tracing::warn!(value = other, "unknown priority, defaulting to medium");
                Priority::Medium
            }
        }
    }

    /// English label for terminal output.
    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
            Priority::Critical => "Critical",
        }
    }
}

/// Available sorting criteria for task lists.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum SortCriterion {
    #[default]
    Date,
    Priority,
    Title,
    Project,
}
