/// Database migrations and schema management.
use rusqlite::Connection;

/// Creates the schema if it doesn't exist yet.
///
/// Composite keys the workflow relies on are enforced with unique indexes so
/// that concurrent writers cannot create a second timesheet for the same
/// week or a second review by the same manager.
pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS employees (
            employee_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT    NOT NULL,
            email       TEXT    NOT NULL UNIQUE,
            password    TEXT    NOT NULL,
            role        TEXT    NOT NULL CHECK (role IN ('EMPLOYEE', 'PROJECT_MANAGER'))
        );

        CREATE TABLE IF NOT EXISTS projects (
            project_id         INTEGER PRIMARY KEY AUTOINCREMENT,
            project_name       TEXT    NOT NULL,
            project_manager_id INTEGER NOT NULL,
            FOREIGN KEY (project_manager_id) REFERENCES employees(employee_id)
        );

        CREATE TABLE IF NOT EXISTS project_team (
            project_id  INTEGER NOT NULL,
            employee_id INTEGER NOT NULL,
            PRIMARY KEY (project_id, employee_id),
            FOREIGN KEY (project_id) REFERENCES projects(project_id) ON DELETE CASCADE,
            FOREIGN KEY (employee_id) REFERENCES employees(employee_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS tasks (
            task_id   INTEGER PRIMARY KEY AUTOINCREMENT,
            task_name TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS project_tasks (
            project_id INTEGER NOT NULL,
            task_id    INTEGER NOT NULL,
            PRIMARY KEY (project_id, task_id),
            FOREIGN KEY (project_id) REFERENCES projects(project_id) ON DELETE CASCADE,
            FOREIGN KEY (task_id) REFERENCES tasks(task_id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS timesheets (
            timesheet_id    INTEGER PRIMARY KEY AUTOINCREMENT,
            employee_id     INTEGER NOT NULL,
            week_start_date TEXT    NOT NULL,
            week_end_date   TEXT    NOT NULL,
            total_hours     REAL    NOT NULL DEFAULT 0,
            status          TEXT    NOT NULL
                CHECK (status IN ('Saved', 'Submitted', 'Approved', 'Rejected')),
            FOREIGN KEY (employee_id) REFERENCES employees(employee_id)
        );

        CREATE TABLE IF NOT EXISTS entries (
            entry_id        INTEGER PRIMARY KEY AUTOINCREMENT,
            timesheet_id    INTEGER NOT NULL,
            project_id      INTEGER NOT NULL,
            task_id         INTEGER NOT NULL,
            week_start_date TEXT    NOT NULL,
            mon_hours       REAL    NOT NULL DEFAULT 0,
            tue_hours       REAL    NOT NULL DEFAULT 0,
            wed_hours       REAL    NOT NULL DEFAULT 0,
            thu_hours       REAL    NOT NULL DEFAULT 0,
            fri_hours       REAL    NOT NULL DEFAULT 0,
            sat_hours       REAL    NOT NULL DEFAULT 0,
            sun_hours       REAL    NOT NULL DEFAULT 0,
            comments        TEXT    NOT NULL DEFAULT '',
            FOREIGN KEY (timesheet_id) REFERENCES timesheets(timesheet_id) ON DELETE CASCADE,
            FOREIGN KEY (project_id) REFERENCES projects(project_id),
            FOREIGN KEY (task_id) REFERENCES tasks(task_id)
        );

        CREATE TABLE IF NOT EXISTS project_manager (
            timesheet_id INTEGER NOT NULL,
            manager_id   INTEGER NOT NULL,
            project_id   INTEGER NOT NULL,
            employee_id  INTEGER NOT NULL,
            FOREIGN KEY (timesheet_id) REFERENCES timesheets(timesheet_id) ON DELETE CASCADE,
            FOREIGN KEY (manager_id) REFERENCES employees(employee_id),
            FOREIGN KEY (project_id) REFERENCES projects(project_id),
            FOREIGN KEY (employee_id) REFERENCES employees(employee_id)
        );

        CREATE TABLE IF NOT EXISTS performance_reviews (
            review_id          INTEGER PRIMARY KEY AUTOINCREMENT,
            timesheet_id       INTEGER NOT NULL,
            project_manager_id INTEGER NOT NULL,
            rating             INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 5),
            feedback           TEXT,
            status             TEXT    NOT NULL CHECK (status IN ('Approved', 'Rejected')),
            FOREIGN KEY (timesheet_id) REFERENCES timesheets(timesheet_id) ON DELETE CASCADE,
            FOREIGN KEY (project_manager_id) REFERENCES employees(employee_id)
        );
        ",
    )?;
    create_unique_keys(conn)?;
    Ok(())
}

fn create_unique_keys(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE UNIQUE INDEX IF NOT EXISTS timesheets_employee_week
            ON timesheets (employee_id, week_start_date);
        CREATE UNIQUE INDEX IF NOT EXISTS entries_timesheet_project_task
            ON entries (timesheet_id, project_id, task_id);
        CREATE UNIQUE INDEX IF NOT EXISTS project_manager_link
            ON project_manager (timesheet_id, manager_id, project_id);
        CREATE UNIQUE INDEX IF NOT EXISTS performance_reviews_timesheet_manager
            ON performance_reviews (timesheet_id, project_manager_id);
        CREATE INDEX IF NOT EXISTS project_manager_by_manager
            ON project_manager (manager_id);
        ",
    )
}
