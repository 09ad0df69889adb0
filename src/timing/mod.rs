pub mod clock;
pub mod daily;
pub mod schedule;
pub mod weekday;
