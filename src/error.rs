use thiserror::Error;

/// Errors raised while building or reading a facility's weekly hours.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Invalid time value: {0}")]
    InvalidTimeValue(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),
}

/// Errors coming out of the facility hours store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not get connection.\n{0}")]
    Pool(#[from] r2d2::Error),

    #[error("Database error.\n{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Stored hours are malformed. {0}")]
    Schedule(#[from] ScheduleError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {value}")]
    InvalidValue { key: &'static str, value: String },
}
