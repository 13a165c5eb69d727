/// Read models for the employee dashboard and the manager approval screens.
use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    EmployeeId, Entry, ProjectId, ReviewStatus, Timesheet, TimesheetId, TimesheetStatus,
    WeekHours,
};

/// A review on one of the employee's timesheets with the reviewer's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewWithManager {
    pub timesheet_id: TimesheetId,
    pub project_manager_id: EmployeeId,
    /// `None` when the manager's employee row no longer resolves.
    pub project_manager_name: Option<String>,
    pub status: ReviewStatus,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesheetOverview {
    #[serde(flatten)]
    pub timesheet: Timesheet,
    pub reviews: Vec<ReviewWithManager>,
}

/// One row of a manager's approval queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub timesheet_id: TimesheetId,
    pub employee_id: EmployeeId,
    pub employee_name: String,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub status: TimesheetStatus,
    pub total_hours: f64,
    /// The manager's projects this timesheet was routed through.
    pub project_ids: Vec<ProjectId>,
    /// Whether this manager already recorded a decision.
    pub reviewed: bool,
}

/// An entry joined with its project and task names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedEntry {
    #[serde(flatten)]
    pub entry: Entry,
    pub project_name: String,
    pub task_name: String,
}

/// Status lookup for one employee week.
pub fn timesheet_for_week(
    employee_id: EmployeeId,
    week_start_date: NaiveDate,
    conn: &Connection,
) -> WorkflowResult<Timesheet> {
    db::query_timesheet_by_week(employee_id, week_start_date, conn)?.ok_or_else(|| {
        WorkflowError::not_found(format!(
            "no timesheet for employee {employee_id} in week {week_start_date}"
        ))
    })
}

/// Reviews on the employee's timesheets.
///
/// Joins `performance_reviews.timesheet_id -> timesheets` (scoped to the
/// employee) and `performance_reviews.project_manager_id -> employees` for
/// the manager name.
pub fn employee_reviews(
    employee_id: EmployeeId,
    conn: &Connection,
) -> WorkflowResult<Vec<ReviewWithManager>> {
    let mut stmt = conn.prepare(
        "
        SELECT r.timesheet_id, r.project_manager_id, m.name, r.status, r.rating, r.feedback
        FROM performance_reviews r
        JOIN timesheets t ON t.timesheet_id = r.timesheet_id
        LEFT JOIN employees m ON m.employee_id = r.project_manager_id
        WHERE t.employee_id = ?1
        ORDER BY r.review_id",
    )?;
    let rows = stmt.query_map([employee_id], review_with_manager_from_row)?;
    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

/// Every timesheet of the employee with the reviews it received, newest week first.
pub fn employee_dashboard(
    employee_id: EmployeeId,
    conn: &Connection,
) -> WorkflowResult<Vec<TimesheetOverview>> {
    let timesheets = db::query_timesheets_for_employee(employee_id, conn)?;
    let mut by_timesheet: HashMap<TimesheetId, Vec<ReviewWithManager>> = HashMap::new();
    for review in employee_reviews(employee_id, conn)? {
        by_timesheet
            .entry(review.timesheet_id)
            .or_default()
            .push(review);
    }
    Ok(timesheets
        .into_iter()
        .map(|timesheet| TimesheetOverview {
            reviews: by_timesheet
                .remove(&timesheet.timesheet_id)
                .unwrap_or_default(),
            timesheet,
        })
        .collect())
}

/// Timesheets routed to the manager, one row per (employee, week).
///
/// Joins `project_manager -> timesheets -> employees`. A submission that
/// reached the manager through several projects collapses into one row
/// listing those projects.
pub fn approval_queue(manager_id: EmployeeId, conn: &Connection) -> WorkflowResult<Vec<QueueItem>> {
    let mut stmt = conn.prepare(
        "
        SELECT t.timesheet_id, t.employee_id, e.name, t.week_start_date, t.week_end_date,
               t.status, t.total_hours, pm.project_id,
               EXISTS (
                   SELECT 1 FROM performance_reviews r
                   WHERE r.timesheet_id = t.timesheet_id AND r.project_manager_id = pm.manager_id
               )
        FROM project_manager pm
        JOIN timesheets t ON t.timesheet_id = pm.timesheet_id
        JOIN employees e ON e.employee_id = t.employee_id
        WHERE pm.manager_id = ?1
        ORDER BY t.week_start_date DESC, t.employee_id, pm.project_id",
    )?;
    let rows = stmt.query_map([manager_id], |row| {
        Ok(QueueItem {
            timesheet_id: row.get(0)?,
            employee_id: row.get(1)?,
            employee_name: row.get(2)?,
            week_start_date: row.get(3)?,
            week_end_date: row.get(4)?,
            status: row.get(5)?,
            total_hours: row.get(6)?,
            project_ids: vec![row.get(7)?],
            reviewed: row.get(8)?,
        })
    })?;

    let mut queue: Vec<QueueItem> = Vec::new();
    let mut positions: HashMap<(EmployeeId, NaiveDate), usize> = HashMap::new();
    for row in rows {
        let item = row?;
        match positions.get(&(item.employee_id, item.week_start_date)) {
            Some(&at) => queue[at].project_ids.extend(item.project_ids),
            None => {
                positions.insert((item.employee_id, item.week_start_date), queue.len());
                queue.push(item);
            }
        }
    }
    Ok(queue)
}

/// Entries of a timesheet limited to projects the manager owns.
///
/// Joins `entries -> projects` (filtered on `project_manager_id`) and
/// `entries -> tasks` for names, so a manager never sees hours booked on
/// another manager's project.
pub fn manager_entry_view(
    timesheet_id: TimesheetId,
    manager_id: EmployeeId,
    conn: &Connection,
) -> WorkflowResult<Vec<ScopedEntry>> {
    let mut stmt = conn.prepare(
        "
        SELECT en.entry_id, en.timesheet_id, en.project_id, en.task_id, en.week_start_date,
               en.mon_hours, en.tue_hours, en.wed_hours, en.thu_hours, en.fri_hours,
               en.sat_hours, en.sun_hours, en.comments, p.project_name, t.task_name
        FROM entries en
        JOIN projects p ON p.project_id = en.project_id
        JOIN tasks t ON t.task_id = en.task_id
        WHERE en.timesheet_id = ?1 AND p.project_manager_id = ?2
        ORDER BY en.entry_id",
    )?;
    let rows = stmt.query_map((timesheet_id, manager_id), |row| {
        Ok(ScopedEntry {
            entry: Entry {
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
            },
            project_name: row.get(13)?,
            task_name: row.get(14)?,
        })
    })?;
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?);
    }
    Ok(entries)
}

fn review_with_manager_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewWithManager> {
    Ok(ReviewWithManager {
        timesheet_id: row.get(0)?,
        project_manager_id: row.get(1)?,
        project_manager_name: row.get(2)?,
        status: row.get(3)?,
        rating: row.get(4)?,
        feedback: row.get(5)?,
    })
}
