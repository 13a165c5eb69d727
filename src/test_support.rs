/// Seeded in-memory database shared by unit tests.
use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db;
use crate::types::{
    Employee, EmployeeId, EntryPayload, Project, ProjectId, Role, SaveTimesheet, TaskId,
    TimesheetId, TimesheetStatus, WeekHours,
};
use crate::workflow;

/// Two managers, one employee on projects 10 (manager A) and 20 (manager B).
/// Task 5 belongs to both projects, task 6 only to project 10.
pub struct Fixture {
    pub conn: Connection,
    pub employee: EmployeeId,
    pub manager_a: EmployeeId,
    pub manager_b: EmployeeId,
    pub project_a: ProjectId,
    pub project_b: ProjectId,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = db::init_in_memory().unwrap();
        let manager_a =
            insert_employee(&conn, "Ada Manager", "ada@example.com", Role::ProjectManager);
        let manager_b =
            insert_employee(&conn, "Bo Manager", "bo@example.com", Role::ProjectManager);
        let employee = insert_employee(&conn, "Eve Employee", "eve@example.com", Role::Employee);
        conn.execute(
            "INSERT INTO projects (project_id, project_name, project_manager_id)
             VALUES (10, 'Apollo', ?1), (20, 'Borealis', ?2)",
            (manager_a, manager_b),
        )
        .unwrap();
        conn.execute_batch(
            "INSERT INTO tasks (task_id, task_name) VALUES (5, 'Development'), (6, 'Testing');",
        )
        .unwrap();
        for (project, task) in [(10, 5), (20, 5), (10, 6)] {
            db::link_project_task(project, task, &conn).unwrap();
        }
        for project in [10, 20] {
            db::add_team_member(project, employee, &conn).unwrap();
        }
        Fixture {
            conn,
            employee,
            manager_a,
            manager_b,
            project_a: 10,
            project_b: 20,
        }
    }

    pub fn week(&self) -> NaiveDate {
        week()
    }

    pub fn employee_named(&self, name: &str, email: &str) -> EmployeeId {
        insert_employee(&self.conn, name, email, Role::Employee)
    }

    pub fn manager_named(&self, name: &str, email: &str) -> EmployeeId {
        insert_employee(&self.conn, name, email, Role::ProjectManager)
    }

    pub fn project_for(&self, manager: EmployeeId, name: &str) -> ProjectId {
        db::create_project(
            Project {
                id: None,
                name: name.to_string(),
                manager_id: manager,
            },
            &self.conn,
        )
        .unwrap()
    }

    pub fn join(&self, project: ProjectId, employee: EmployeeId) {
        db::add_team_member(project, employee, &self.conn).unwrap();
    }

    /// Empty `Saved` timesheet for the fixture week, written directly.
    pub fn timesheet_for(&self, employee: EmployeeId) -> TimesheetId {
        db::create_timesheet(
            employee,
            week(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            TimesheetStatus::Saved,
            0.0,
            &self.conn,
        )
        .unwrap()
        .unwrap()
    }

    pub fn saved_timesheet(&self) -> TimesheetId {
        self.timesheet_for(self.employee)
    }

    /// Submits 16 hours on project 10 / task 5 through the workflow.
    pub fn submitted_timesheet(&mut self) -> TimesheetId {
        let req = request(
            self.employee,
            TimesheetStatus::Submitted,
            vec![entry(10, 5, &[8.0, 8.0])],
        );
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        workflow::save_timesheet(&req, today, &mut self.conn)
            .unwrap()
            .timesheet_id
    }
}

pub fn week() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Entry payload with `hours` filled from Monday onwards.
pub fn entry(project_id: ProjectId, task_id: TaskId, hours: &[f64]) -> EntryPayload {
    let mut days = [0.0; 7];
    for (slot, h) in days.iter_mut().zip(hours) {
        *slot = *h;
    }
    let [mon, tue, wed, thu, fri, sat, sun] = days;
    EntryPayload {
        project_id,
        task_id,
        hours: WeekHours {
            mon,
            tue,
            wed,
            thu,
            fri,
            sat,
            sun,
        },
        comments: None,
    }
}

pub fn request(
    employee_id: EmployeeId,
    status: TimesheetStatus,
    entries: Vec<EntryPayload>,
) -> SaveTimesheet {
    SaveTimesheet {
        employee_id,
        week_start_date: week(),
        week_end_date: None,
        status,
        entries,
    }
}

fn insert_employee(conn: &Connection, name: &str, email: &str, role: Role) -> EmployeeId {
    db::create_employee(
        Employee {
            id: None,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role,
        },
        conn,
    )
    .unwrap()
}
