/// Routing of submitted timesheets into manager review queues.
use rusqlite::Connection;

use crate::db;
use crate::error::WorkflowResult;
use crate::types::{EmployeeId, ManagerReviewLink, TimesheetId};

/// Creates one review link per project the employee belongs to, pointing at
/// that project's manager.
///
/// Managers owning several of the employee's projects get one link per
/// project. Links that already exist are kept, so re-submitting is safe.
/// Returns the number of links created by this call.
pub fn fan_out_to_managers(
    timesheet_id: TimesheetId,
    employee_id: EmployeeId,
    conn: &Connection,
) -> WorkflowResult<usize> {
    let projects = db::query_projects_for_employee(employee_id, conn)?;
    let links: Vec<ManagerReviewLink> = projects
        .iter()
        .filter_map(|project| {
            Some(ManagerReviewLink {
                timesheet_id,
                manager_id: project.manager_id,
                project_id: project.id?,
                employee_id,
            })
        })
        .collect();

    let created = db::create_review_links(&links, conn)?;
    tracing::info!(
        timesheet_id,
        employee_id,
        projects = projects.len(),
        created,
        "timesheet routed to managers"
    );
    Ok(created)
}
