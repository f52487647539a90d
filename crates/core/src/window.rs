use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signed day offset from `candidate` to `charge` (positive = charge posted
/// after the candidate's date, the usual settlement lag).
pub fn day_delta(charge: NaiveDate, candidate: NaiveDate) -> i64 {
    (charge - candidate).num_days()
}

/// A symmetric ± window, in days, around an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow(pub u32);

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "±{}d", self.0)
    }
}

impl DateWindow {
    pub fn new(days: u32) -> Self {
        DateWindow(days)
    }

    pub fn days(self) -> u32 {
        self.0
    }

    pub fn contains(self, anchor: NaiveDate, other: NaiveDate) -> bool {
        day_delta(anchor, other).unsigned_abs() <= u64::from(self.0)
    }
}
