use chrono::{DateTime, NaiveDate, Timelike, Utc};

/// The part of each funding hour in which positions are maintained.
///
/// A window is entered at most once per (date, hour): the scheduler records
/// the time of its last run and compares hour slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingWindow {
    hours: Vec<u32>,
    start_minute: u32,
}

impl Default for FundingWindow {
    fn default() -> Self {
        Self::new(vec![7, 15, 23], 45)
    }
}

impl FundingWindow {
    pub fn new(hours: Vec<u32>, start_minute: u32) -> Self {
        Self {
            hours,
            start_minute,
        }
    }

    pub fn hours(&self) -> &[u32] {
        &self.hours
    }

    pub fn start_minute(&self) -> u32 {
        self.start_minute
    }

    /// Whether `now` falls inside a funding window.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.hours.contains(&now.hour()) && now.minute() >= self.start_minute
    }

    /// Whether a maintenance run should start at `now`, given the time of the
    /// previous run.
    pub fn should_trigger(&self, now: DateTime<Utc>, last_run: Option<DateTime<Utc>>) -> bool {
        self.is_open(now) && last_run.map_or(true, |last| hour_slot(last) != hour_slot(now))
    }
}

fn hour_slot(t: DateTime<Utc>) -> (NaiveDate, u32) {
    (t.date_naive(), t.hour())
}
