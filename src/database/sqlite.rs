use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OptionalExtension;

use crate::{
    error::{ScheduleError, StoreError},
    timing::{
        daily::{DailyHours, TimeOfDay},
        schedule::WeeklyHours,
        weekday::Weekday,
    },
};

pub type Connection = PooledConnection<SqliteConnectionManager>;

pub struct SqliteDatabase {}

impl SqliteDatabase {
    /**
    Create the `facilities` and `facility_hours` tables if they are missing.

    `facility_hours` holds at most one row per facility and weekday. Either time
    column may be NULL, which reads back as a closed day.
    */
    pub fn create_tables(connection: &Connection) -> rusqlite::Result<()> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS facilities (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS facility_hours (
                facility_id INTEGER NOT NULL REFERENCES facilities(id),
                weekday INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 6),
                open_time TEXT,
                close_time TEXT,
                PRIMARY KEY (facility_id, weekday)
            );",
        )
    }

    /**
    Insert a facility and return its id.
    */
    pub fn insert_facility(connection: &Connection, name: &str) -> rusqlite::Result<i64> {
        connection.execute(
            "INSERT INTO facilities (name) VALUES (?1)",
            rusqlite::params![name],
        )?;
        Ok(connection.last_insert_rowid())
    }

    /**
    Get the name of a facility.

    Returns an `Ok(None)` if there is no facility with that id.
    */
    pub fn query_facility_name(connection: &Connection, id: i64) -> rusqlite::Result<Option<String>> {
        connection
            .query_row(
                "SELECT name FROM facilities WHERE id = ?1",
                rusqlite::params![id],
                |row| row.get(0),
            )
            .optional()
    }

    /**
    Get every facility as (id, name), ordered by id.
    */
    pub fn list_facilities(connection: &Connection) -> rusqlite::Result<Vec<(i64, String)>> {
        let mut statement = connection.prepare("SELECT id, name FROM facilities ORDER BY id")?;
        let rows = statement.query_map((), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut data: Vec<(i64, String)> = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }

    /**
    Get the weekly hours of a facility.

    Weekdays without a row are closed. A stored time that does not parse fails
    with `InvalidTimeValue` rather than being read as closed, so a bad row
    surfaces to whoever edits the hours.
    */
    pub fn query_weekly_hours(connection: &Connection, facility_id: i64) -> Result<WeeklyHours, StoreError> {
        let mut statement = connection.prepare(
            "SELECT weekday, open_time, close_time FROM facility_hours WHERE facility_id = ?1",
        )?;
        let rows = statement.query_map(rusqlite::params![facility_id], |row| {
            let weekday: u8 = row.get(0)?;
            let open: Option<String> = row.get(1)?;
            let close: Option<String> = row.get(2)?;
            Ok((weekday, open, close))
        })?;

        let mut hours = WeeklyHours::closed();
        for row in rows {
            let (weekday, open, close) = row?;
            let day = Weekday::from_index(weekday)
                .ok_or_else(|| ScheduleError::InvalidWeekday(weekday.to_string()))?;
            let open = open.map(|time| time.parse::<TimeOfDay>()).transpose()?;
            let close = close.map(|time| time.parse::<TimeOfDay>()).transpose()?;
            hours.set(day, DailyHours::from_columns(open, close));
        }
        Ok(hours)
    }

    /**
    Insert or replace one day of a facility's hours.
    */
    pub fn upsert_daily_hours(
        connection: &Connection,
        facility_id: i64,
        day: Weekday,
        hours: DailyHours,
    ) -> rusqlite::Result<()> {
        connection.execute(
            "INSERT INTO facility_hours (facility_id, weekday, open_time, close_time)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (facility_id, weekday)
             DO UPDATE SET open_time = excluded.open_time, close_time = excluded.close_time",
            rusqlite::params![
                facility_id,
                day.index() as u8,
                hours.opening().map(|time| time.to_string()),
                hours.closing().map(|time| time.to_string()),
            ],
        )?;
        Ok(())
    }
}
