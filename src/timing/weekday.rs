use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Day of the week, Sunday first.
///
/// `index()` is the one mapping to the 0..6 slot number used by `WeeklyHours`
/// and by the `weekday` column in the database.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn abbrev(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        // chrono counts from Sunday = 0 here, same as we do
        Self::ALL[day.num_days_from_sunday() as usize]
    }
}

impl FromStr for Weekday {
    type Err = ScheduleError;

    /// Accepts the abbreviation, the full name or the slot number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u8>() {
            return Self::from_index(index).ok_or_else(|| ScheduleError::InvalidWeekday(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|day| day.abbrev().eq_ignore_ascii_case(s) || day.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ScheduleError::InvalidWeekday(s.to_string()))
    }
}

impl Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.abbrev())
    }
}
