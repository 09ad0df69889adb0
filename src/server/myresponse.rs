use serde::Serialize;

use crate::timing::{
    daily::DailyHours,
    schedule::{EvaluationResult, WeeklyHours},
    weekday::Weekday,
};

/// Body of /api/status, and one element of /api/facilities.
#[derive(Serialize, Clone, Debug)]
pub struct FacilityStatus {
    facility: i64,
    name: String,
    is_open: bool,
    label: String,
}

impl FacilityStatus {
    pub fn new(facility: i64, name: String, result: EvaluationResult) -> Self {
        Self {
            facility,
            name,
            is_open: result.is_open,
            label: result.label,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
struct DayEntry {
    day: &'static str,
    #[serde(flatten)]
    hours: DailyHours,
}

/// Body of /api/hours. Days are listed Sunday first.
#[derive(Serialize, Clone, Debug)]
pub struct FacilityHours {
    facility: i64,
    name: String,
    days: Vec<DayEntry>,
}

impl FacilityHours {
    pub fn new(facility: i64, name: String, hours: &WeeklyHours) -> Self {
        Self {
            facility,
            name,
            days: hours
                .iter()
                .map(|(day, hours): (Weekday, DailyHours)| DayEntry {
                    day: day.abbrev(),
                    hours,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct Created {
    pub id: i64,
}
