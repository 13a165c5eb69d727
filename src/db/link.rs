/// Manager review links (`project_manager` table).
use rusqlite::Connection;

use crate::types::{EmployeeId, ManagerReviewLink, TimesheetId};

/// Inserts the links, skipping any that already exist. Returns how many
/// rows were actually created.
pub fn create_review_links(
    links: &[ManagerReviewLink],
    conn: &Connection,
) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare(
        "
        INSERT OR IGNORE INTO project_manager (timesheet_id, manager_id, project_id, employee_id)
        VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut created = 0;
    for link in links {
        created += stmt.execute((
            link.timesheet_id,
            link.manager_id,
            link.project_id,
            link.employee_id,
        ))?;
    }
    Ok(created)
}

pub fn check_review_link_exists(
    timesheet_id: TimesheetId,
    manager_id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<bool> {
    let mut stmt = conn
        .prepare("SELECT 1 FROM project_manager WHERE timesheet_id = ?1 AND manager_id = ?2")?;
    let mut rows = stmt.query((timesheet_id, manager_id))?;
    Ok(rows.next()?.is_some())
}

pub fn query_links_for_timesheet(
    timesheet_id: TimesheetId,
    conn: &Connection,
) -> rusqlite::Result<Vec<ManagerReviewLink>> {
    let mut stmt = conn.prepare(
        "
        SELECT timesheet_id, manager_id, project_id, employee_id
        FROM project_manager
        WHERE timesheet_id = ?1
        ORDER BY project_id",
    )?;
    let rows = stmt.query_map([timesheet_id], |row| {
        Ok(ManagerReviewLink {
            timesheet_id: row.get(0)?,
            manager_id: row.get(1)?,
            project_id: row.get(2)?,
            employee_id: row.get(3)?,
        })
    })?;
    let mut links = Vec::new();
    for row in rows {
        links.push(row?);
    }
    Ok(links)
}
