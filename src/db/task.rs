/// Task database queries.
use rusqlite::Connection;

use crate::types::{ProjectId, Task, TaskId};

pub fn create_task(name: String, conn: &Connection) -> rusqlite::Result<TaskId> {
    conn.execute("INSERT INTO tasks (task_name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

pub fn link_project_task(
    project_id: ProjectId,
    task_id: TaskId,
    conn: &Connection,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO project_tasks (project_id, task_id) VALUES (?1, ?2)",
        (project_id, task_id),
    )?;
    Ok(())
}

pub fn query_tasks_for_project(
    project_id: ProjectId,
    conn: &Connection,
) -> rusqlite::Result<Vec<Task>> {
    let mut stmt = conn.prepare(
        "
        SELECT t.task_id, t.task_name
        FROM project_tasks pt
        JOIN tasks t ON t.task_id = pt.task_id
        WHERE pt.project_id = ?1
        ORDER BY t.task_id",
    )?;
    let rows = stmt.query_map([project_id], |row| {
        Ok(Task {
            id: Some(row.get(0)?),
            name: row.get(1)?,
        })
    })?;
    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(row?);
    }
    Ok(tasks)
}

pub fn check_task_in_project(
    project_id: ProjectId,
    task_id: TaskId,
    conn: &Connection,
) -> rusqlite::Result<bool> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM project_tasks WHERE project_id = ?1 AND task_id = ?2")?;
    let mut rows = stmt.query((project_id, task_id))?;
    Ok(rows.next()?.is_some())
}
