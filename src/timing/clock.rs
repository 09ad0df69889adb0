use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::schedule::{EvaluationResult, WeeklyHours};

/// The current time on the facility's wall clock.
pub fn civil_now(timezone: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&timezone)
}

/// Converts an instant into the facility's zone before evaluating.
pub fn evaluate_at(hours: &WeeklyHours, instant: DateTime<Utc>, timezone: Tz) -> EvaluationResult {
    hours.evaluate(&instant.with_timezone(&timezone))
}
