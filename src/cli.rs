/// CLI argument parsing and command handling.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::types::{
    Employee, EmployeeId, Project, ProjectId, ReviewQuery, Role, SaveTimesheet, TaskId,
    TimesheetId,
};
use crate::workflow::{ApproveRequest, DeleteEntry, RejectRequest};
use crate::{auth, db, queries, workflow};

#[derive(Parser)]
#[command(
    name = "sheetflow",
    version,
    about = "Sheetflow - weekly timesheet submission and approval"
)]
pub struct Cli {
    /// SQLite database file.
    #[arg(long, env = "SHEETFLOW_DB", global = true)]
    pub db: Option<PathBuf>,
    /// Debug logging unless RUST_LOG is set.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Employee {
        #[command(subcommand)]
        command: EmployeeCommand,
    },
    /// Verify credentials and print the session.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
    Timesheet {
        #[command(subcommand)]
        command: TimesheetCommand,
    },
    Entry {
        #[command(subcommand)]
        command: EntryCommand,
    },
    Review {
        #[command(subcommand)]
        command: ReviewCommand,
    },
    Approval {
        #[command(subcommand)]
        command: ApprovalCommand,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Employee,
    Manager,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Employee => Role::Employee,
            RoleArg::Manager => Role::ProjectManager,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum EmployeeCommand {
    Add {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value = "employee")]
        role: RoleArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    Add {
        name: String,
        #[arg(long)]
        manager: EmployeeId,
    },
    /// Put an employee on a project team.
    Member {
        project: ProjectId,
        employee: EmployeeId,
    },
    /// Projects an employee may log time against.
    List {
        #[arg(long)]
        employee: EmployeeId,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task, or link an existing one with --id, on a project.
    Add {
        name: Option<String>,
        #[arg(long)]
        project: ProjectId,
        #[arg(long, conflicts_with = "name")]
        id: Option<TaskId>,
    },
    List {
        #[arg(long)]
        project: ProjectId,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimesheetCommand {
    /// Save or submit a week from a JSON payload ("-" reads stdin).
    Save {
        #[arg(long)]
        file: PathBuf,
    },
    /// Timesheet of one employee week.
    Show {
        #[arg(long)]
        employee: EmployeeId,
        #[arg(long)]
        week: NaiveDate,
    },
    List {
        #[arg(long)]
        employee: EmployeeId,
    },
    /// Timesheets with the reviews each received.
    Dashboard {
        #[arg(long)]
        employee: EmployeeId,
    },
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    List {
        #[arg(long)]
        timesheet: TimesheetId,
    },
    Delete {
        #[arg(long)]
        employee: EmployeeId,
        #[arg(long)]
        project: ProjectId,
        #[arg(long)]
        task: TaskId,
        #[arg(long)]
        week: NaiveDate,
    },
}

#[derive(Subcommand, Debug)]
pub enum ReviewCommand {
    Approve {
        #[arg(long)]
        timesheet: TimesheetId,
        #[arg(long)]
        manager: EmployeeId,
        #[arg(long)]
        rating: Option<u8>,
        #[arg(long)]
        feedback: Option<String>,
    },
    Reject {
        #[arg(long)]
        timesheet: TimesheetId,
        #[arg(long)]
        manager: EmployeeId,
    },
    List {
        #[arg(long, conflicts_with_all = ["manager", "employee"])]
        timesheet: Option<TimesheetId>,
        #[arg(long, conflicts_with = "employee")]
        manager: Option<EmployeeId>,
        #[arg(long)]
        employee: Option<EmployeeId>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ApprovalCommand {
    /// Timesheets waiting in a manager's queue.
    Queue {
        #[arg(long)]
        manager: EmployeeId,
    },
    /// Entries of a timesheet on the manager's own projects.
    Entries {
        #[arg(long)]
        timesheet: TimesheetId,
        #[arg(long)]
        manager: EmployeeId,
    },
    /// Managers a submitted timesheet was routed to.
    Links {
        #[arg(long)]
        timesheet: TimesheetId,
    },
}

/// Execute a CLI command, printing its JSON result on stdout.
pub fn run(command: Command, conn: &mut Connection) -> Result<()> {
    match command {
        Command::Employee {
            command:
                EmployeeCommand::Add {
                    name,
                    email,
                    password,
                    role,
                },
        } => handle_employee_add(name, email, &password, role.into(), conn),
        Command::Login { email, password } => emit(&auth::login(&email, &password, conn)?),
        Command::Project { command } => handle_project(command, conn),
        Command::Task { command } => handle_task(command, conn),
        Command::Timesheet { command } => handle_timesheet(command, conn),
        Command::Entry { command } => handle_entry(command, conn),
        Command::Review { command } => handle_review(command, conn),
        Command::Approval {
            command: ApprovalCommand::Queue { manager },
        } => emit(&queries::approval_queue(manager, conn)?),
        Command::Approval {
            command: ApprovalCommand::Entries { timesheet, manager },
        } => emit(&queries::manager_entry_view(timesheet, manager, conn)?),
        Command::Approval {
            command: ApprovalCommand::Links { timesheet },
        } => emit(&db::query_links_for_timesheet(timesheet, conn)?),
    }
}

#[derive(Serialize)]
struct Created {
    id: i64,
}

#[derive(Serialize)]
struct Message {
    message: String,
}

fn handle_employee_add(
    name: String,
    email: String,
    password: &str,
    role: Role,
    conn: &Connection,
) -> Result<()> {
    if db::query_employee_by_email(&email, conn)?.is_some() {
        return Err(WorkflowError::conflict(format!("employee '{email}' already exists")).into());
    }
    let id = db::create_employee(
        Employee {
            id: None,
            name,
            email,
            password_hash: auth::hash_password(password)?,
            role,
        },
        conn,
    )?;
    tracing::info!(employee_id = id, role = %role, "employee created");
    emit(&Created { id })
}

fn handle_project(command: ProjectCommand, conn: &Connection) -> Result<()> {
    match command {
        ProjectCommand::Add { name, manager } => {
            let is_manager = db::query_employee_by_id(manager, conn)?
                .is_some_and(|e| e.role == Role::ProjectManager);
            if !is_manager {
                return Err(WorkflowError::validation(format!(
                    "employee {manager} is not a project manager"
                ))
                .into());
            }
            let id = db::create_project(
                Project {
                    id: None,
                    name,
                    manager_id: manager,
                },
                conn,
            )?;
            tracing::info!(project_id = id, manager_id = manager, "project created");
            emit(&Created { id })
        }
        ProjectCommand::Member { project, employee } => {
            db::add_team_member(project, employee, conn)?;
            tracing::info!(project_id = project, employee_id = employee, "team member added");
            emit(&Message {
                message: format!("employee {employee} added to project {project}"),
            })
        }
        ProjectCommand::List { employee } => emit(&db::query_projects_for_employee(employee, conn)?),
    }
}

fn handle_task(command: TaskCommand, conn: &Connection) -> Result<()> {
    match command {
        TaskCommand::Add { name, project, id } => {
            let task_id = match (id, name) {
                (Some(id), _) => id,
                (None, Some(name)) => db::create_task(name, conn)?,
                (None, None) => {
                    return Err(WorkflowError::validation("a task name or --id is required").into());
                }
            };
            db::link_project_task(project, task_id, conn)?;
            tracing::info!(task_id, project_id = project, "task linked to project");
            emit(&Created { id: task_id })
        }
        TaskCommand::List { project } => emit(&db::query_tasks_for_project(project, conn)?),
    }
}

fn handle_timesheet(command: TimesheetCommand, conn: &mut Connection) -> Result<()> {
    match command {
        TimesheetCommand::Save { file } => {
            let request = read_payload(&file)?;
            let today = Local::now().date_naive();
            emit(&workflow::save_timesheet(&request, today, conn)?)
        }
        TimesheetCommand::Show { employee, week } => {
            emit(&queries::timesheet_for_week(employee, week, conn)?)
        }
        TimesheetCommand::List { employee } => {
            emit(&db::query_timesheets_for_employee(employee, conn)?)
        }
        TimesheetCommand::Dashboard { employee } => {
            emit(&queries::employee_dashboard(employee, conn)?)
        }
    }
}

fn handle_entry(command: EntryCommand, conn: &mut Connection) -> Result<()> {
    match command {
        EntryCommand::List { timesheet } => {
            emit(&db::query_entries_by_timesheet(timesheet, conn)?)
        }
        EntryCommand::Delete {
            employee,
            project,
            task,
            week,
        } => emit(&workflow::delete_entry(
            &DeleteEntry {
                employee_id: employee,
                project_id: project,
                task_id: task,
                week_start_date: week,
            },
            conn,
        )?),
    }
}

fn handle_review(command: ReviewCommand, conn: &mut Connection) -> Result<()> {
    match command {
        ReviewCommand::Approve {
            timesheet,
            manager,
            rating,
            feedback,
        } => emit(&workflow::approve_timesheet(
            &ApproveRequest {
                timesheet_id: timesheet,
                manager_id: manager,
                rating,
                feedback,
            },
            conn,
        )?),
        ReviewCommand::Reject { timesheet, manager } => emit(&workflow::reject_timesheet(
            &RejectRequest {
                timesheet_id: timesheet,
                manager_id: manager,
            },
            conn,
        )?),
        ReviewCommand::List {
            timesheet: Some(timesheet),
            ..
        } => emit(&db::query_reviews(ReviewQuery::ByTimesheet(timesheet), conn)?),
        ReviewCommand::List {
            manager: Some(manager),
            ..
        } => emit(&db::query_reviews(ReviewQuery::ByManager(manager), conn)?),
        ReviewCommand::List {
            employee: Some(employee),
            ..
        } => emit(&queries::employee_reviews(employee, conn)?),
        ReviewCommand::List { .. } => Err(WorkflowError::validation(
            "one of --timesheet, --manager or --employee is required",
        )
        .into()),
    }
}

fn read_payload(path: &Path) -> Result<SaveTimesheet> {
    let raw = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("reading payload from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading payload {}", path.display()))?
    };
    serde_json::from_str(&raw)
        .map_err(|e| WorkflowError::validation(format!("invalid timesheet payload: {e}")).into())
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
