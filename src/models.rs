use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::interval::{TimeInterval, MINUTES_PER_DAY};

/// Fields shared by both task variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_min: u32,    // minute of day, 0..1440
    pub duration_min: u32, // 1..=1440
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTask {
    pub info: TaskInfo,
    pub date: NaiveDate,
    pub completed: bool,
}

/// Which dates a recurring task lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Daily,
    /// Weekday indices, 0 = Sunday .. 6 = Saturday.
    Weekly { weekdays: BTreeSet<u8> },
    /// Days of month, 1..=31.
    Monthly { month_days: BTreeSet<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringTask {
    pub info: TaskInfo,
    pub recurrence: Recurrence,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>, // inclusive, None = unbounded
    /// Completion is tracked per occurrence, keyed by its date.
    pub completed_dates: BTreeSet<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaskRecord", into = "TaskRecord")]
pub enum Task {
    Single(SingleTask),
    Recurring(RecurringTask),
}

impl Task {
    pub fn info(&self) -> &TaskInfo {
        match self {
            Task::Single(t) => &t.info,
            Task::Recurring(t) => &t.info,
        }
    }

    fn info_mut(&mut self) -> &mut TaskInfo {
        match self {
            Task::Single(t) => &mut t.info,
            Task::Recurring(t) => &mut t.info,
        }
    }

    pub fn id(&self) -> &str {
        &self.info().id
    }

    pub fn set_id(&mut self, id: String) {
        self.info_mut().id = id;
    }

    pub fn title(&self) -> &str {
        &self.info().title
    }
}

/// One concrete dated instance of a task. Derived on every query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub task_id: String,
    pub date: NaiveDate,
    #[serde(rename = "time", serialize_with = "serialize_hhmm")]
    pub start_min: u32,
    #[serde(rename = "duration")]
    pub duration_min: u32,
    pub title: String,
    pub is_recurring_instance: bool,
    pub completed: bool,
}

impl Occurrence {
    /// Busy interval on its own date, clipped at midnight.
    pub fn interval(&self) -> TimeInterval {
        let end = (self.start_min + self.duration_min).min(MINUTES_PER_DAY);
        TimeInterval::new(self.start_min, end)
    }
}

/// User settings. `theme` and `notifications` are carried for the UI only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub step: u32,        // UI time granularity, minutes
    pub daily_hours: u32, // hours per day reserved for non-schedulable activity
    pub theme: String,
    pub notifications: bool,
}

pub const STEP_CHOICES: [u32; 5] = [5, 10, 15, 30, 60];
pub const DAILY_HOURS_CHOICES: [u32; 5] = [0, 2, 4, 6, 8];

impl Default for Settings {
    fn default() -> Self {
        Self {
            step: 10,
            daily_hours: 8,
            theme: "light".to_string(),
            notifications: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !STEP_CHOICES.contains(&self.step) {
            return Err(ValidationError::InvalidStep(self.step));
        }
        if !DAILY_HOURS_CHOICES.contains(&self.daily_hours) {
            return Err(ValidationError::InvalidDailyHours(self.daily_hours));
        }
        Ok(())
    }

    pub fn reserved_minutes(&self) -> u32 {
        self.daily_hours * 60
    }
}

/// Free-text notes per month, keyed "YYYY-MM".
pub type MonthNotes = BTreeMap<String, String>;

/// Combined export / import document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub tasks: Vec<Task>,
    pub settings: Settings,
    #[serde(default)]
    pub notes: MonthNotes,
}

// -----------------------------
// Wire format
// -----------------------------

/// A number that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

/// `monthDays` arrives as a list or as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarList {
    Many(Vec<Scalar>),
    One(Scalar),
}

/// Loose JSON shape of a task as clients send it. Converted into a [`Task`]
/// only through validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Scalar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<ScalarList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month_days: Option<ScalarList>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_dates: Option<Vec<String>>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = ValidationError;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        let kind = r.kind.as_deref().ok_or(ValidationError::MissingField("type"))?;
        let title = r.title.ok_or(ValidationError::MissingField("title"))?;
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let time = r.time.as_deref().ok_or(ValidationError::MissingField("time"))?;
        let duration = r.duration.as_ref().ok_or(ValidationError::MissingField("duration"))?;

        let info = TaskInfo {
            id: r
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title,
            description: r.description.filter(|d| !d.is_empty()),
            start_min: parse_hhmm(time)?,
            duration_min: parse_duration(duration)?,
        };

        match kind {
            "single" => {
                let date = r.date.as_deref().ok_or(ValidationError::MissingField("date"))?;
                Ok(Task::Single(SingleTask {
                    info,
                    date: parse_date(date)?,
                    completed: r.completed.unwrap_or(false),
                }))
            }
            "recurring" => {
                let recurrence = match r.recurring_type.as_deref() {
                    None => return Err(ValidationError::MissingField("recurringType")),
                    Some("daily") => Recurrence::Daily,
                    Some("weekly") => {
                        let values = flatten_scalars(r.weekdays.as_ref(), ValidationError::InvalidWeekday)?;
                        let mut weekdays = BTreeSet::new();
                        for v in values {
                            match u8::try_from(v) {
                                Ok(d) if d <= 6 => weekdays.insert(d),
                                _ => return Err(ValidationError::InvalidWeekday(v.to_string())),
                            };
                        }
                        if weekdays.is_empty() {
                            return Err(ValidationError::EmptyWeekdays);
                        }
                        Recurrence::Weekly { weekdays }
                    }
                    Some("monthly") => {
                        let values = flatten_scalars(r.month_days.as_ref(), ValidationError::InvalidMonthDay)?;
                        let mut month_days = BTreeSet::new();
                        for v in values {
                            match u8::try_from(v) {
                                Ok(d) if (1..=31).contains(&d) => month_days.insert(d),
                                _ => return Err(ValidationError::InvalidMonthDay(v.to_string())),
                            };
                        }
                        if month_days.is_empty() {
                            return Err(ValidationError::EmptyMonthDays);
                        }
                        Recurrence::Monthly { month_days }
                    }
                    Some(other) => return Err(ValidationError::InvalidRecurringType(other.to_string())),
                };

                let start_date = r
                    .start_date
                    .as_deref()
                    .ok_or(ValidationError::MissingField("startDate"))
                    .and_then(parse_date)?;
                // Forms submit an empty string for "no end date".
                let end_date = match r.end_date.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(s) => Some(parse_date(s)?),
                };
                if let Some(end) = end_date {
                    if end < start_date {
                        return Err(ValidationError::EndBeforeStart {
                            start: start_date.to_string(),
                            end: end.to_string(),
                        });
                    }
                }

                let completed_dates = r
                    .completed_dates
                    .unwrap_or_default()
                    .iter()
                    .map(|d| parse_date(d))
                    .collect::<Result<BTreeSet<_>, _>>()?;

                Ok(Task::Recurring(RecurringTask {
                    info,
                    recurrence,
                    start_date,
                    end_date,
                    completed_dates,
                }))
            }
            other => Err(ValidationError::InvalidTaskType(other.to_string())),
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        fn base(info: TaskInfo, kind: &str) -> TaskRecord {
            TaskRecord {
                id: Some(info.id),
                kind: Some(kind.to_string()),
                title: Some(info.title),
                description: info.description,
                time: Some(format_hhmm(info.start_min)),
                duration: Some(Scalar::Int(i64::from(info.duration_min))),
                ..TaskRecord::default()
            }
        }
        fn ints(values: BTreeSet<u8>) -> ScalarList {
            ScalarList::Many(values.into_iter().map(|v| Scalar::Int(i64::from(v))).collect())
        }

        match task {
            Task::Single(t) => TaskRecord {
                date: Some(t.date.to_string()),
                completed: Some(t.completed),
                ..base(t.info, "single")
            },
            Task::Recurring(t) => {
                let (recurring_type, weekdays, month_days) = match t.recurrence {
                    Recurrence::Daily => ("daily", None, None),
                    Recurrence::Weekly { weekdays } => ("weekly", Some(ints(weekdays)), None),
                    Recurrence::Monthly { month_days } => ("monthly", None, Some(ints(month_days))),
                };
                let completed_dates = (!t.completed_dates.is_empty())
                    .then(|| t.completed_dates.iter().map(NaiveDate::to_string).collect());
                TaskRecord {
                    recurring_type: Some(recurring_type.to_string()),
                    start_date: Some(t.start_date.to_string()),
                    end_date: t.end_date.map(|d| d.to_string()),
                    weekdays,
                    month_days,
                    completed_dates,
                    ..base(t.info, "recurring")
                }
            }
        }
    }
}

fn scalar_to_int(s: &Scalar) -> Result<i64, String> {
    match s {
        Scalar::Int(n) => Ok(*n),
        Scalar::Text(t) => t.trim().parse::<i64>().map_err(|_| t.clone()),
    }
}

// Expands "1, 15" style strings into separate values.
fn flatten_scalars(
    list: Option<&ScalarList>,
    invalid: fn(String) -> ValidationError,
) -> Result<Vec<i64>, ValidationError> {
    let items: Vec<Scalar> = match list {
        None => Vec::new(),
        Some(ScalarList::Many(v)) => v.clone(),
        Some(ScalarList::One(s)) => vec![s.clone()],
    };
    let mut out = Vec::new();
    for item in items {
        match item {
            Scalar::Int(n) => out.push(n),
            Scalar::Text(t) => {
                for part in t.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let n = part
                        .parse::<i64>()
                        .map_err(|_| invalid(part.to_string()))?;
                    out.push(n);
                }
            }
        }
    }
    Ok(out)
}

fn parse_duration(s: &Scalar) -> Result<u32, ValidationError> {
    let n = scalar_to_int(s).map_err(ValidationError::InvalidDuration)?;
    match u32::try_from(n) {
        Ok(d) if (1..=MINUTES_PER_DAY).contains(&d) => Ok(d),
        _ => Err(ValidationError::InvalidDuration(n.to_string())),
    }
}

/// Parse "HH:MM" into a minute of day.
pub fn parse_hhmm(s: &str) -> Result<u32, ValidationError> {
    let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidTime(s.to_string()))?;
    Ok(t.hour() * 60 + t.minute())
}

/// Format a minute of day as "HH:MM". 1440 renders as "24:00".
pub fn format_hhmm(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

/// Parse "YYYY-MM-DD".
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

/// Key of a month note: "YYYY-MM".
pub fn month_key(year: i32, month: u32) -> Result<String, ValidationError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%Y-%m").to_string())
        .ok_or_else(|| ValidationError::InvalidMonth(format!("{year}-{month}")))
}

/// Check a stored "YYYY-MM" note key.
pub fn parse_month_key(key: &str) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidMonth(key.to_string());
    let (year, month) = key.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year = year.parse().map_err(|_| invalid())?;
    let month = month.parse().map_err(|_| invalid())?;
    month_key(year, month)
}

fn serialize_hhmm<S: Serializer>(minute: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_hhmm(*minute))
}
