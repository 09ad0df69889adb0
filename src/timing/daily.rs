use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// A wall-clock time in the facility's zone, minute precision.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTimeValue(format!(
                "{}:{} is out of range",
                hour, minute
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Parses `HH:MM` or `HH:MM:SS`. Seconds are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTimeValue(format!("'{}' is not HH:MM", s));
        let mut parts = s.trim().split(':');
        let hour: u8 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        let minute: u8 = parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())?;
        if let Some(seconds) = parts.next() {
            let seconds: u8 = seconds.parse().map_err(|_| invalid())?;
            if seconds > 59 {
                return Err(invalid());
            }
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// One day's entry in a facility's weekly hours.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DailyHours {
    Closed,
    Open { open: TimeOfDay, close: TimeOfDay },
}

impl DailyHours {
    pub fn new_open(open: TimeOfDay, close: TimeOfDay) -> Self {
        Self::Open { open, close }
    }

    pub fn new_closed() -> Self {
        Self::Closed
    }

    /// Builds an entry from the two nullable columns. Half-set entries are closed.
    pub fn from_columns(open: Option<TimeOfDay>, close: Option<TimeOfDay>) -> Self {
        match (open, close) {
            (Some(open), Some(close)) => Self::Open { open, close },
            _ => Self::Closed,
        }
    }

    pub fn opening(&self) -> Option<TimeOfDay> {
        match self {
            Self::Open { open, .. } => Some(*open),
            Self::Closed => None,
        }
    }

    pub fn closing(&self) -> Option<TimeOfDay> {
        match self {
            Self::Open { close, .. } => Some(*close),
            Self::Closed => None,
        }
    }

    /// True when the window wraps past midnight.
    pub fn is_overnight(&self) -> bool {
        match self {
            Self::Open { open, close } => close.minutes() < open.minutes(),
            Self::Closed => false,
        }
    }

    /// Whether `minutes` since midnight falls inside this day's window.
    ///
    /// Same-day windows are half-open, `[open, close)`. Overnight windows are
    /// open from `open` to midnight and from midnight to `close`, both judged
    /// against this entry only.
    pub fn contains(&self, minutes: u16) -> bool {
        let Self::Open { open, close } = self else {
            return false;
        };
        let (open, close) = (open.minutes(), close.minutes());
        if close >= open {
            open <= minutes && minutes < close
        } else {
            minutes >= open || minutes < close
        }
    }
}
