/// Time entry database queries.
use chrono::NaiveDate;
use rusqlite::{Connection, Row};

use crate::types::{Entry, ProjectId, TaskId, TimesheetId, WeekHours};

pub fn query_entries_by_timesheet(
    timesheet_id: TimesheetId,
    conn: &Connection,
) -> rusqlite::Result<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "
        SELECT entry_id, timesheet_id, project_id, task_id, week_start_date,
               mon_hours, tue_hours, wed_hours, thu_hours, fri_hours, sat_hours, sun_hours,
               comments
        FROM entries
        WHERE timesheet_id = ?1
        ORDER BY entry_id",
    )?;
    let rows = stmt.query_map([timesheet_id], entry_from_row)?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

/// Rewrites every field of the entry identified by its composite key.
pub fn update_entry(entry: &Entry, conn: &Connection) -> rusqlite::Result<usize> {
    let h = &entry.hours;
    conn.execute(
        "
        UPDATE entries
        SET mon_hours = ?1, tue_hours = ?2, wed_hours = ?3, thu_hours = ?4,
            fri_hours = ?5, sat_hours = ?6, sun_hours = ?7,
            comments = ?8, week_start_date = ?9
        WHERE timesheet_id = ?10 AND project_id = ?11 AND task_id = ?12",
        rusqlite::params![
            h.mon,
            h.tue,
            h.wed,
            h.thu,
            h.fri,
            h.sat,
            h.sun,
            entry.comments,
            entry.week_start_date,
            entry.timesheet_id,
            entry.project_id,
            entry.task_id,
        ],
    )
}

/// Inserts the entries with one prepared statement. Returns the row count.
pub fn insert_entries(entries: &[Entry], conn: &Connection) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "
        INSERT INTO entries (timesheet_id, project_id, task_id, week_start_date,
                             mon_hours, tue_hours, wed_hours, thu_hours, fri_hours,
                             sat_hours, sun_hours, comments)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;
    let mut inserted = 0;
    for entry in entries {
        let h = &entry.hours;
        inserted += stmt.execute(rusqlite::params![
            entry.timesheet_id,
            entry.project_id,
            entry.task_id,
            entry.week_start_date,
            h.mon,
            h.tue,
            h.wed,
            h.thu,
            h.fri,
            h.sat,
            h.sun,
            entry.comments,
        ])?;
    }
    Ok(inserted)
}

pub fn delete_entry(
    timesheet_id: TimesheetId,
    project_id: ProjectId,
    task_id: TaskId,
    week_start_date: NaiveDate,
    conn: &Connection,
) -> rusqlite::Result<usize> {
    conn.execute(
        "
        DELETE FROM entries
        WHERE timesheet_id = ?1 AND project_id = ?2 AND task_id = ?3 AND week_start_date = ?4",
        rusqlite::params![timesheet_id, project_id, task_id, week_start_date],
    )
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        entry_id: Some(row.get(0)?),
        timesheet_id: row.get(1)?,
        project_id: row.get(2)?,
        task_id: row.get(3)?,
        week_start_date: row.get(4)?,
        hours: WeekHours {
            mon: row.get(5)?,
            tue: row.get(6)?,
            wed: row.get(7)?,
            thu: row.get(8)?,
            fri: row.get(9)?,
            sat: row.get(10)?,
            sun: row.get(11)?,
        },
        comments: row.get(12)?,
    })
}
