//! Time-of-use classification.
//!
//! Windows are half-open hour ranges in the interval's own wall clock:
//! hour 13 is peak, hour 21 is not.

use std::ops::Range;

use chrono::NaiveDate;

use crate::models::RateClass;
use crate::plans::RatePlan;
use crate::time_utils::IntervalTimestamp;

/// Critical-peak event days announced by the utility for the 2018 season.
pub const CRITICAL_PEAK_DAYS: [(i32, u32, u32); 10] = [
    (2018, 6, 1),
    (2018, 6, 15),
    (2018, 7, 6),
    (2018, 7, 18),
    (2018, 7, 24),
    (2018, 8, 3),
    (2018, 8, 20),
    (2018, 8, 30),
    (2018, 9, 4),
    (2018, 9, 19),
];

/// Weekday peak window.
pub const PEAK_HOURS: Range<u32> = 13..21;

/// Critical-peak window on event days.
pub const CRITICAL_PEAK_HOURS: Range<u32> = 12..20;

/// The TOU windows and event calendar a classifier works from.
#[derive(Debug, Clone, PartialEq)]
pub struct TouSchedule {
    pub peak_hours: Range<u32>,
    pub critical_peak_hours: Range<u32>,
    pub critical_peak_dates: Vec<NaiveDate>,
}

impl Default for TouSchedule {
    fn default() -> Self {
        let critical_peak_dates = CRITICAL_PEAK_DAYS
            .iter()
            .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .collect();
        Self {
            peak_hours: PEAK_HOURS,
            critical_peak_hours: CRITICAL_PEAK_HOURS,
            critical_peak_dates,
        }
    }
}

impl TouSchedule {
    /// Build a schedule with a custom event calendar and the standard windows.
    pub fn with_critical_peak_dates(dates: Vec<NaiveDate>) -> Self {
        Self {
            critical_peak_dates: dates,
            ..Self::default()
        }
    }

    pub fn is_critical_peak_day(&self, date: NaiveDate) -> bool {
        self.critical_peak_dates.contains(&date)
    }

    /// Classify `ts`.
    ///
    /// 1. Weekends are always off-peak.
    /// 2. With `critical_peak` enabled, event days inside the critical-peak
    ///    window are critical peak.
    /// 3. Weekdays inside the peak window are peak.
    /// 4. Everything else is off-peak.
    pub fn classify(&self, ts: &IntervalTimestamp, critical_peak: bool) -> RateClass {
        if ts.is_weekend() {
            return RateClass::OffPeak;
        }

        let hour = ts.hour();
        if critical_peak
            && self.is_critical_peak_day(ts.date())
            && self.critical_peak_hours.contains(&hour)
        {
            return RateClass::CritPeak;
        }

        if self.peak_hours.contains(&hour) {
            RateClass::Peak
        } else {
            RateClass::OffPeak
        }
    }

    /// Classify `ts` under `plan`; critical peak applies only to plans that
    /// price it.
    pub fn classify_for_plan(&self, ts: &IntervalTimestamp, plan: &RatePlan) -> RateClass {
        self.classify(ts, plan.has_critical_peak())
    }

    /// Classify a gateway sample. The gateway tariff has no critical peak.
    pub fn classify_gateway(&self, ts: &IntervalTimestamp) -> RateClass {
        self.classify(ts, false)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
