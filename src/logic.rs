/*
Day aggregation logic.
Module was independently written from HTTP / Axum for testing.
Everything here is recomputed from the task list on each call; nothing is cached.
*/

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::availability::{classify, AvailabilityLevel};
use crate::interval::{self, TimeInterval, MINUTES_PER_DAY};
use crate::models::{Occurrence, Settings, Task};
use crate::recurrence;

// Free time of one day after the non-schedulable allowance
//     reserved minutes are a capacity deduction, not a clock-time block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeTime {
    pub gaps: Vec<TimeInterval>, // uncovered intervals of the day, ordered
    pub reserved_min: u32,       // dailyHours * 60
}

impl FreeTime {
    // Minutes of the day available for tasks
    pub fn window_minutes(&self) -> u32 {
        MINUTES_PER_DAY.saturating_sub(self.reserved_min)
    }

    pub fn free_minutes(&self) -> u32 {
        interval::total_minutes(&self.gaps).saturating_sub(self.reserved_min)
    }

    pub fn level(&self) -> AvailabilityLevel {
        classify(self.free_minutes(), self.window_minutes())
    }
}

// Summary of one calendar day as the day panel shows it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub occurrences: Vec<Occurrence>,
    pub gaps: Vec<TimeInterval>,
    pub busy_minutes: u32,
    pub reserved_minutes: u32,
    pub window_minutes: u32,
    pub free_minutes: u32,
    pub free_hours: String, // "Xh" label, whole hours rounded down
    pub level: AvailabilityLevel,
}

// Compact per-day entry for month colour-coding
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOverview {
    pub date: NaiveDate,
    pub task_count: usize,
    pub free_minutes: u32,
    pub free_hours: String,
    pub level: AvailabilityLevel,
}

// Collect every occurrence on `date`.
//
// Rules:
// - Single tasks whose date equals `date`
// - Recurring tasks expanded over [date, date]
// - Sorted by start time; ties keep task-list order
pub fn occurrences_for_day(tasks: &[Task], date: NaiveDate) -> Vec<Occurrence> {
    let mut occ: Vec<Occurrence> = tasks
        .iter()
        .flat_map(|t| recurrence::occurrences_between(t, date, date))
        .collect();
    occ.sort_by_key(|o| o.start_min);
    occ
}

/// Free gaps of a day given its occurrences and the daily non-schedulable hours.
///
/// Busy intervals are each occurrence's `[time, time + duration)`, clipped at
/// midnight and merged. The reserved hours are subtracted from free capacity,
/// so the gaps themselves always cover the whole day.
pub fn gaps_for_day(occurrences: &[Occurrence], daily_hours: u32) -> FreeTime {
    let busy: Vec<TimeInterval> = occurrences.iter().map(Occurrence::interval).collect();
    let merged = interval::merge(&busy);

    FreeTime {
        gaps: interval::subtract(TimeInterval::full_day(), &merged),
        reserved_min: daily_hours * 60,
    }
}

// True if `candidate` overlaps any existing busy interval.
// Advisory only: the caller decides whether to proceed.
pub fn detect_conflict(candidate: &TimeInterval, existing: &[TimeInterval]) -> bool {
    existing.iter().any(|b| candidate.overlaps(b))
}

// Occurrences on `date` that `candidate` overlaps.
// `ignore_id` skips the task being edited so it does not conflict with itself.
pub fn conflicts_with(
    tasks: &[Task],
    date: NaiveDate,
    candidate: &TimeInterval,
    ignore_id: Option<&str>,
) -> Vec<Occurrence> {
    occurrences_for_day(tasks, date)
        .into_iter()
        .filter(|o| Some(o.task_id.as_str()) != ignore_id)
        .filter(|o| candidate.overlaps(&o.interval()))
        .collect()
}

pub fn day_summary(tasks: &[Task], date: NaiveDate, settings: &Settings) -> DaySummary {
    let occurrences = occurrences_for_day(tasks, date);
    let free = gaps_for_day(&occurrences, settings.daily_hours);
    let free_minutes = free.free_minutes();

    DaySummary {
        date,
        busy_minutes: MINUTES_PER_DAY - interval::total_minutes(&free.gaps),
        reserved_minutes: free.reserved_min,
        window_minutes: free.window_minutes(),
        free_minutes,
        free_hours: hours_label(free_minutes),
        level: free.level(),
        gaps: free.gaps,
        occurrences,
    }
}

// One overview per day of the month, or None for an invalid year/month.
pub fn month_overview(tasks: &[Task], year: i32, month: u32, settings: &Settings) -> Option<Vec<DayOverview>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;

    let days = first
        .iter_days()
        .take_while(|d| d.month() == month && d.year() == year)
        .map(|date| {
            let occurrences = occurrences_for_day(tasks, date);
            let free = gaps_for_day(&occurrences, settings.daily_hours);
            DayOverview {
                date,
                task_count: occurrences.len(),
                free_minutes: free.free_minutes(),
                free_hours: hours_label(free.free_minutes()),
                level: free.level(),
            }
        })
        .collect();
    Some(days)
}

// Percent of a running occurrence elapsed at `now`, None if not running.
pub fn occurrence_progress(occ: &Occurrence, now: NaiveDateTime) -> Option<u8> {
    if now.date() != occ.date {
        return None;
    }
    let minute = now.hour() * 60 + now.minute();
    let iv = occ.interval();
    if minute < iv.start || minute >= iv.end {
        return None;
    }
    let pct = (minute - iv.start) * 100 / occ.duration_min;
    Some(pct.min(100) as u8)
}

fn hours_label(minutes: u32) -> String {
    format!("{}h", minutes / 60)
}
