/*
Interval arithmetic on half-open time-of-day ranges within one day.
*/

use serde::Serialize;

use crate::models::format_hhmm;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// `[start, end)` in minutes from midnight, `start < end <= 1440`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeInterval {
    pub start: u32,
    pub end: u32,
}

impl TimeInterval {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start < end && end <= MINUTES_PER_DAY, "bad interval {start}..{end}");
        Self { start, end }
    }

    /// The whole day, `[0, 1440)`.
    pub fn full_day() -> Self {
        Self::new(0, MINUTES_PER_DAY)
    }

    pub fn minutes(&self) -> u32 {
        self.end - self.start
    }

    /// Touching intervals do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Serialize for TimeInterval {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("TimeInterval", 3)?;
        s.serialize_field("start", &format_hhmm(self.start))?;
        s.serialize_field("end", &format_hhmm(self.end))?;
        s.serialize_field("minutes", &self.minutes())?;
        s.end()
    }
}

pub fn overlaps(a: &TimeInterval, b: &TimeInterval) -> bool {
    a.overlaps(b)
}

/// Sort by start and coalesce overlapping or touching intervals.
pub fn merge(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match merged.last_mut() {
            Some(cur) if iv.start <= cur.end => cur.end = cur.end.max(iv.end),
            _ => merged.push(iv),
        }
    }
    merged
}

/// Gaps of `window` not covered by `busy` (merged, sorted by start).
/// Zero-length gaps are never reported.
pub fn subtract(window: TimeInterval, busy: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut gaps = Vec::new();
    let mut cursor = window.start;

    for b in busy {
        if b.end <= cursor {
            continue;
        }
        if b.start >= window.end {
            break;
        }
        if b.start > cursor {
            gaps.push(TimeInterval::new(cursor, b.start));
        }
        cursor = cursor.max(b.end);
        if cursor >= window.end {
            break;
        }
    }

    if cursor < window.end {
        gaps.push(TimeInterval::new(cursor, window.end));
    }
    gaps
}

pub fn total_minutes(intervals: &[TimeInterval]) -> u32 {
    intervals.iter().map(TimeInterval::minutes).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: u32, end: u32) -> TimeInterval {
        TimeInterval::new(start, end)
    }

    #[test]
    fn merge_empty() {
        assert!(merge(&[]).is_empty());
    }

    #[test]
    fn merge_overlapping_and_touching() {
        let merged = merge(&[iv(600, 720), iv(540, 600), iv(700, 760), iv(900, 960)]);
        assert_eq!(merged, vec![iv(540, 760), iv(900, 960)]);
    }

    #[test]
    fn merge_contained_interval() {
        assert_eq!(merge(&[iv(60, 600), iv(120, 180)]), vec![iv(60, 600)]);
    }

    #[test]
    fn subtract_no_busy_yields_window() {
        let window = iv(480, 1200);
        assert_eq!(subtract(window, &[]), vec![window]);
    }

    #[test]
    fn subtract_fully_covered_yields_nothing() {
        let busy = merge(&[iv(0, 700), iv(650, 1440)]);
        assert!(subtract(TimeInterval::full_day(), &busy).is_empty());
    }

    #[test]
    fn subtract_drops_zero_length_gaps() {
        let busy = merge(&[iv(0, 60), iv(60, 120)]);
        assert_eq!(subtract(iv(0, 180), &busy), vec![iv(120, 180)]);
    }

    #[test]
    fn subtract_clips_busy_outside_window() {
        let busy = vec![iv(0, 100), iv(300, 400), iv(1300, 1440)];
        assert_eq!(subtract(iv(200, 1320), &busy), vec![iv(200, 300), iv(400, 1300)]);
    }

    #[test]
    fn overlap_is_strict() {
        assert!(overlaps(&iv(600, 720), &iv(660, 720)));
        assert!(!overlaps(&iv(600, 720), &iv(720, 780)));
        assert!(!overlaps(&iv(720, 780), &iv(600, 720)));
    }

    #[test]
    fn interval_serializes_as_clock_times() {
        let v = serde_json::to_value(iv(540, 1440)).unwrap();
        assert_eq!(v["start"], "09:00");
        assert_eq!(v["end"], "24:00");
        assert_eq!(v["minutes"], 900);
    }
}
