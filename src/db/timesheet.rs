/// Timesheet database queries.
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::types::{EmployeeId, Timesheet, TimesheetId, TimesheetStatus};

const COLUMNS: &str =
    "timesheet_id, employee_id, week_start_date, week_end_date, total_hours, status";

/// Inserts a timesheet for the week unless one already exists.
///
/// Returns `None` when the (employee, week) key is taken; the caller then
/// re-reads the existing row instead of creating a duplicate.
pub fn create_timesheet(
    employee_id: EmployeeId,
    week_start_date: NaiveDate,
    week_end_date: NaiveDate,
    status: TimesheetStatus,
    total_hours: f64,
    conn: &Connection,
) -> rusqlite::Result<Option<TimesheetId>> {
    let inserted = conn.execute(
        "
        INSERT INTO timesheets (employee_id, week_start_date, week_end_date, total_hours, status)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (employee_id, week_start_date) DO NOTHING",
        rusqlite::params![employee_id, week_start_date, week_end_date, total_hours, status],
    )?;
    if inserted == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

pub fn query_timesheet_by_week(
    employee_id: EmployeeId,
    week_start_date: NaiveDate,
    conn: &Connection,
) -> rusqlite::Result<Option<Timesheet>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM timesheets WHERE employee_id = ?1 AND week_start_date = ?2"
        ),
        rusqlite::params![employee_id, week_start_date],
        timesheet_from_row,
    )
    .optional()
}

pub fn query_timesheet_by_id(
    id: TimesheetId,
    conn: &Connection,
) -> rusqlite::Result<Option<Timesheet>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM timesheets WHERE timesheet_id = ?1"),
        [id],
        timesheet_from_row,
    )
    .optional()
}

/// All timesheets of one employee, most recent week first.
pub fn query_timesheets_for_employee(
    employee_id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<Vec<Timesheet>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM timesheets WHERE employee_id = ?1 ORDER BY week_start_date DESC"
    ))?;
    let rows = stmt.query_map([employee_id], timesheet_from_row)?;
    let mut timesheets = Vec::new();
    for row in rows {
        timesheets.push(row?);
    }
    Ok(timesheets)
}

pub fn update_timesheet(
    id: TimesheetId,
    status: TimesheetStatus,
    total_hours: f64,
    conn: &Connection,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE timesheets SET status = ?1, total_hours = ?2 WHERE timesheet_id = ?3",
        rusqlite::params![status, total_hours, id],
    )?;
    Ok(())
}

/// Moves the timesheet to `to` only while it is still in `from`.
/// Returns whether the row changed.
pub fn update_timesheet_status_from(
    id: TimesheetId,
    from: TimesheetStatus,
    to: TimesheetStatus,
    conn: &Connection,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE timesheets SET status = ?1 WHERE timesheet_id = ?2 AND status = ?3",
        rusqlite::params![to, id, from],
    )?;
    Ok(changed > 0)
}

/// Recomputes `total_hours` from the entries stored under the timesheet and
/// returns the new value.
pub fn refresh_total_hours(id: TimesheetId, conn: &Connection) -> rusqlite::Result<f64> {
    conn.execute(
        "
        UPDATE timesheets
        SET total_hours = (
            SELECT COALESCE(SUM(mon_hours + tue_hours + wed_hours + thu_hours
                                + fri_hours + sat_hours + sun_hours), 0)
            FROM entries
            WHERE entries.timesheet_id = timesheets.timesheet_id
        )
        WHERE timesheet_id = ?1",
        [id],
    )?;
    conn.query_row(
        "SELECT total_hours FROM timesheets WHERE timesheet_id = ?1",
        [id],
        |row| row.get(0),
    )
}

fn timesheet_from_row(row: &Row<'_>) -> rusqlite::Result<Timesheet> {
    Ok(Timesheet {
        timesheet_id: row.get(0)?,
        employee_id: row.get(1)?,
        week_start_date: row.get(2)?,
        week_end_date: row.get(3)?,
        total_hours: row.get(4)?,
        status: row.get(5)?,
    })
}
