/*
Recurrence expansion.
Turns a task definition plus an inclusive date range into concrete occurrences.
Pure and deterministic: output depends only on the task and the range bounds.
*/

use chrono::{Datelike, NaiveDate};

use crate::models::{Occurrence, Recurrence, RecurringTask, SingleTask, Task, TaskInfo};

/// Materialize a recurring task over `[range_start, range_end]`, ascending by date.
///
/// Rules:
/// - effective range = task's `[start_date, end_date]` ∩ requested range
/// - daily: every date
/// - weekly: dates whose weekday (0 = Sunday) is selected
/// - monthly: dates whose day-of-month is selected; days a month lacks are skipped
pub fn expand(task: &RecurringTask, range_start: NaiveDate, range_end: NaiveDate) -> Vec<Occurrence> {
    let from = range_start.max(task.start_date);
    let to = match task.end_date {
        Some(end) => range_end.min(end),
        None => range_end,
    };
    if from > to {
        return Vec::new();
    }

    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| matches(&task.recurrence, *d))
        .map(|d| occurrence(&task.info, d, true, task.completed_dates.contains(&d)))
        .collect()
}

/// Occurrences of any task within `[range_start, range_end]`.
pub fn occurrences_between(task: &Task, range_start: NaiveDate, range_end: NaiveDate) -> Vec<Occurrence> {
    match task {
        Task::Single(t) => single_in_range(t, range_start, range_end).into_iter().collect(),
        Task::Recurring(t) => expand(t, range_start, range_end),
    }
}

fn single_in_range(t: &SingleTask, range_start: NaiveDate, range_end: NaiveDate) -> Option<Occurrence> {
    (range_start <= t.date && t.date <= range_end).then(|| occurrence(&t.info, t.date, false, t.completed))
}

fn matches(recurrence: &Recurrence, date: NaiveDate) -> bool {
    match recurrence {
        Recurrence::Daily => true,
        Recurrence::Weekly { weekdays } => {
            weekdays.contains(&(date.weekday().num_days_from_sunday() as u8))
        }
        Recurrence::Monthly { month_days } => month_days.contains(&(date.day() as u8)),
    }
}

fn occurrence(info: &TaskInfo, date: NaiveDate, recurring: bool, completed: bool) -> Occurrence {
    Occurrence {
        task_id: info.id.clone(),
        date,
        start_min: info.start_min,
        duration_min: info.duration_min,
        title: info.title.clone(),
        is_recurring_instance: recurring,
        completed,
    }
}
