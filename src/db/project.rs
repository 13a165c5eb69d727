/// Project and project-team database queries.
use rusqlite::Connection;

use crate::types::{EmployeeId, Project, ProjectId};

pub fn create_project(arg: Project, conn: &Connection) -> rusqlite::Result<ProjectId> {
    conn.execute(
        "INSERT INTO projects (project_name, project_manager_id) VALUES (?1, ?2)",
        (&arg.name, arg.manager_id),
    )?;
    Ok(conn.last_insert_rowid())
}

/// Adds the employee to the project team. Adding an existing member is a no-op.
pub fn add_team_member(
    project_id: ProjectId,
    employee_id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO project_team (project_id, employee_id) VALUES (?1, ?2)",
        (project_id, employee_id),
    )?;
    Ok(())
}

/// Projects the employee belongs to, each with its manager.
pub fn query_projects_for_employee(
    employee_id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<Vec<Project>> {
    let mut stmt = conn.prepare(
        "
        SELECT p.project_id, p.project_name, p.project_manager_id
        FROM project_team pt
        JOIN projects p ON p.project_id = pt.project_id
        WHERE pt.employee_id = ?1
        ORDER BY p.project_id",
    )?;
    let rows = stmt.query_map([employee_id], |row| {
        Ok(Project {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            manager_id: row.get(2)?,
        })
    })?;
    let mut projects = Vec::new();
    for row in rows {
        projects.push(row?);
    }
    Ok(projects)
}
