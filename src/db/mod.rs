/// Database module with employee, project, timesheet, entry and review queries.
mod employee;
mod entry;
mod link;
mod migrations;
mod project;
mod review;
mod task;
mod timesheet;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

// Re-export all public functions
pub use employee::{create_employee, query_employee_by_email, query_employee_by_id};
pub use entry::{delete_entry, insert_entries, query_entries_by_timesheet, update_entry};
pub use link::{check_review_link_exists, create_review_links, query_links_for_timesheet};
pub use project::{add_team_member, create_project, query_projects_for_employee};
pub use review::{check_review_exists, create_review, query_reviews};
pub use task::{check_task_in_project, create_task, link_project_task, query_tasks_for_project};
pub use timesheet::{
    create_timesheet, query_timesheet_by_id, query_timesheet_by_week,
    query_timesheets_for_employee, refresh_total_hours, update_timesheet,
    update_timesheet_status_from,
};

/// Opens (or creates) the SQLite database and runs migrations.
pub fn init(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database at {}", db_path.display()))?;
    prepare(&conn).context("running migrations")?;
    tracing::debug!(path = %db_path.display(), "database ready");
    Ok(conn)
}

/// Fresh in-memory database with the full schema.
#[cfg(test)]
pub fn init_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    migrations::run_migrations(conn)
}

/// Returns the default database path inside the user's data directory.
/// Falls back to `./sheetflow.db` when no data dir is found.
pub fn default_db_path() -> std::path::PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        let app_dir = data_dir.join("sheetflow");
        if let Err(e) = std::fs::create_dir_all(&app_dir) {
            tracing::warn!(error = %e, dir = %app_dir.display(), "cannot create data dir");
        }
        app_dir.join("sheetflow.db")
    } else {
        "sheetflow.db".into()
    }
}
