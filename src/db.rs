//! On-disk JSON formats and file helpers.
//!
//! Two formats exist:
//!
//! - the **snapshot** document (`{"users": [...], "projects": [...], "tasks": [...]}`)
//!   that references owners and projects by numeric id, with `-1` for none;
//! - the **exchange** array used by import/export, one object per task, that
//!   references owners and projects by name.
//!
//! Record fields are lenient: anything missing takes its default, so files
//! written by older versions still load.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchedulerError};
use crate::fields::DEFAULT_REMINDER_MINUTES;
use crate::project::Project;
use crate::task::Task;
use crate::user::User;

/// Format used when writing deadlines.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Sentinel for "no reference" in id fields.
pub const NO_ID: i64 = -1;

fn no_id() -> i64 {
    NO_ID
}

fn default_reminder() -> i64 {
    DEFAULT_REMINDER_MINUTES
}

/// Full snapshot of the service state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub projects: Vec<ProjectRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl Document {
    /// Decode a snapshot. The root must be a JSON object.
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(SchedulerError::InvalidFormat("snapshot root must be an object".into()));
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default = "no_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

impl From<&User> for UserRecord {
    fn from(u: &User) -> Self {
        UserRecord { id: u.id as i64, name: u.name.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    #[serde(default = "no_id")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl From<&Project> for ProjectRecord {
    fn from(p: &Project) -> Self {
        ProjectRecord {
            id: p.id as i64,
            name: p.name.clone(),
            description: p.description.clone(),
        }
    }
}

/// A task inside the snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default = "no_id")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default = "no_id")]
    pub owner_id: i64,
    #[serde(default = "no_id")]
    pub project_id: i64,
    #[serde(default = "default_reminder")]
    pub reminder_minutes: i64,
}

impl From<&Task> for TaskRecord {
    fn from(t: &Task) -> Self {
        TaskRecord {
            id: t.id as i64,
            title: t.title.clone(),
            description: t.description.clone(),
            deadline: format_datetime(t.deadline),
            priority: t.priority.to_localized().to_string(),
            completed: t.completed,
            owner_id: t.owner.map(|id| id as i64).unwrap_or(NO_ID),
            project_id: t.project.map(|id| id as i64).unwrap_or(NO_ID),
            reminder_minutes: t.reminder_minutes,
        }
    }
}

/// A task inside the import/export array, referencing by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub completed: bool,
    /// Owner name, empty for none.
    #[serde(default)]
    pub owner: String,
    /// Project name, empty for none.
    #[serde(default)]
    pub project: String,
    #[serde(default = "default_reminder")]
    pub reminder_minutes: i64,
}

/// Convert a stored id field into an optional reference.
pub fn id_ref(raw: i64) -> Option<u64> {
    if raw > 0 {
        Some(raw as u64)
    } else {
        None
    }
}

/// Format a deadline as ISO-8601 local time without offset.
pub fn format_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// Parse an ISO-8601 deadline.
///
/// Accepts local times with or without seconds and fractional seconds, and
/// RFC 3339 times with an offset (converted to local time).
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Time of day given to deadlines entered as a bare date.
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Parse a human-entered deadline relative to `now`.
///
/// Supports:
/// - "today", "tomorrow" (end of that day, 23:59)
/// - "in 30min", "in 2h", "in 3d", "in 1w" (space before the unit optional)
/// - "YYYY-MM-DD" (end of that day)
/// - anything [`parse_datetime`] accepts
pub fn parse_deadline_input(s: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let raw = s.trim();
    let s = raw.to_lowercase();
    let today = now.date();

    match s.as_str() {
        "today" => return Some(today.and_time(end_of_day())),
        "tomorrow" => return Some(today.succ_opt()?.and_time(end_of_day())),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (amount, unit) = rest.split_at(split);
        let amount: i64 = amount.parse().ok()?;
        let delta = match unit.trim() {
            "m" | "min" | "mins" | "minute" | "minutes" => Duration::try_minutes(amount),
            "h" | "hour" | "hours" => Duration::try_hours(amount),
            "d" | "day" | "days" => Duration::try_days(amount),
            "w" | "week" | "weeks" => Duration::try_weeks(amount),
            _ => None,
        }?;
        return now.checked_add_signed(delta);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        return Some(date.and_time(end_of_day()));
    }
    parse_datetime(raw)
}

/// Parse a day given on the command line: "today", "tomorrow" or "YYYY-MM-DD".
pub fn parse_date_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    }
}

/// Default snapshot location: `~/.scheduler/data.json`.
pub fn default_data_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".scheduler").join("data.json")
}

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let buf = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&buf)?)
}

/// Read an exchange file. The root must be a JSON array.
pub fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    match read_json(path)? {
        Value::Array(items) => Ok(items),
        _ => Err(SchedulerError::InvalidFormat("import file must contain a JSON array".into())),
    }
}

/// Write pretty JSON using an atomic write (temp file + rename), creating
/// the parent directory if needed.
pub fn write_json_atomic(path: &Path, value: &Value) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_string_pretty(value)?;
    let mut f = File::create(&tmp)?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}
