use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use super::{daily::DailyHours, weekday::Weekday};

/// A facility's opening hours, one entry per weekday.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyHours {
    timings: [DailyHours; 7],
}

/// The answer to "is it open right now", plus the badge text shown to visitors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    pub is_open: bool,
    pub label: String,
}

impl WeeklyHours {
    pub fn new(timings: [DailyHours; 7]) -> Self {
        Self { timings }
    }

    pub fn closed() -> Self {
        Self::new([DailyHours::new_closed(); 7])
    }

    pub fn get(&self, day: Weekday) -> DailyHours {
        self.timings[day.index()]
    }

    pub fn set(&mut self, day: Weekday, hours: DailyHours) {
        self.timings[day.index()] = hours;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, DailyHours)> + '_ {
        Weekday::ALL.into_iter().map(|day| (day, self.get(day)))
    }

    /// Evaluates the schedule at a civil wall-clock time in the facility's zone.
    ///
    /// Only the entry for `now`'s own weekday is consulted. An overnight window
    /// configured on Friday does not carry into Saturday's early hours; the
    /// Saturday entry decides those.
    pub fn evaluate<T: Datelike + Timelike>(&self, now: &T) -> EvaluationResult {
        let weekday = Weekday::from(now.weekday());
        let minutes = (now.hour() * 60 + now.minute()) as u16;
        let today = self.get(weekday);
        EvaluationResult {
            is_open: today.contains(minutes),
            label: Self::label(weekday, today),
        }
    }

    fn label(weekday: Weekday, hours: DailyHours) -> String {
        match hours {
            DailyHours::Closed => format!("{} · Closed", weekday.abbrev()),
            DailyHours::Open { open, close } => {
                format!("{} · {}–{}", weekday.abbrev(), open, close)
            }
        }
    }
}

impl Default for WeeklyHours {
    fn default() -> Self {
        Self::closed()
    }
}

/// Free-function form of [`WeeklyHours::evaluate`].
pub fn evaluate<T: Datelike + Timelike>(hours: &WeeklyHours, now: &T) -> EvaluationResult {
    hours.evaluate(now)
}
