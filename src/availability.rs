use serde::{Deserialize, Serialize};

/// Load level of a day, used for calendar colour-coding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityLevel {
    Low,
    Medium,
    Free,
}

// Thresholds as percentages of the schedulable window, inclusive.
const LOW_PERCENT: u64 = 25;
const MEDIUM_PERCENT: u64 = 60;

/// Map free minutes out of a schedulable window to a level.
///
/// - free <= 25% of window -> Low
/// - free <= 60% of window -> Medium
/// - otherwise             -> Free
pub fn classify(free_minutes: u32, window_minutes: u32) -> AvailabilityLevel {
    let free = u64::from(free_minutes) * 100;
    let window = u64::from(window_minutes);

    if free <= window * LOW_PERCENT {
        AvailabilityLevel::Low
    } else if free <= window * MEDIUM_PERCENT {
        AvailabilityLevel::Medium
    } else {
        AvailabilityLevel::Free
    }
}
