use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize};

pub type EmployeeId = i64;
pub type ProjectId = i64;
pub type TaskId = i64;
pub type TimesheetId = i64;
pub type EntryId = i64;
pub type ReviewId = i64;

/// Implements SQLite text storage for a plain string enum.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownVariant| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    ProjectManager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "EMPLOYEE",
            Role::ProjectManager => "PROJECT_MANAGER",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMPLOYEE" => Ok(Role::Employee),
            "PROJECT_MANAGER" => Ok(Role::ProjectManager),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

sql_text_enum!(Role);

/// Lifecycle of a weekly timesheet.
///
/// `Saved -> Submitted` happens through the save/submit flow, `Submitted ->
/// Approved | Rejected` through a manager review. Nothing leaves `Approved` or
/// `Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimesheetStatus {
    Saved,
    Submitted,
    Approved,
    Rejected,
}

impl TimesheetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimesheetStatus::Saved => "Saved",
            TimesheetStatus::Submitted => "Submitted",
            TimesheetStatus::Approved => "Approved",
            TimesheetStatus::Rejected => "Rejected",
        }
    }

    /// Status a stored timesheet ends up with after another save/submit.
    /// Only `Saved -> Submitted` advances; every other request keeps the
    /// current status so a later save never regresses a timesheet.
    pub fn after_save(self, requested: TimesheetStatus) -> TimesheetStatus {
        match (self, requested) {
            (TimesheetStatus::Saved, TimesheetStatus::Submitted) => TimesheetStatus::Submitted,
            (current, _) => current,
        }
    }

    pub fn is_decided(self) -> bool {
        matches!(self, TimesheetStatus::Approved | TimesheetStatus::Rejected)
    }
}

impl FromStr for TimesheetStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Saved" => Ok(TimesheetStatus::Saved),
            "Submitted" => Ok(TimesheetStatus::Submitted),
            "Approved" => Ok(TimesheetStatus::Approved),
            "Rejected" => Ok(TimesheetStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "timesheet status",
                value: other.to_string(),
            }),
        }
    }
}

sql_text_enum!(TimesheetStatus);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStatus::Approved => "Approved",
            ReviewStatus::Rejected => "Rejected",
        }
    }

    pub fn timesheet_status(self) -> TimesheetStatus {
        match self {
            ReviewStatus::Approved => TimesheetStatus::Approved,
            ReviewStatus::Rejected => TimesheetStatus::Rejected,
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Approved" => Ok(ReviewStatus::Approved),
            "Rejected" => Ok(ReviewStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "review status",
                value: other.to_string(),
            }),
        }
    }
}

sql_text_enum!(ReviewStatus);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Employee {
    pub id: Option<EmployeeId>,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: Option<ProjectId>,
    pub name: String,
    pub manager_id: EmployeeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Task {
    pub id: Option<TaskId>,
    pub name: String,
}

/// One employee's record for one calendar week.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Timesheet {
    pub timesheet_id: TimesheetId,
    pub employee_id: EmployeeId,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub total_hours: f64,
    pub status: TimesheetStatus,
}

/// Hours logged per weekday, Monday first.
///
/// Absent or `null` values in an incoming payload read as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekHours {
    #[serde(rename = "mon_hours", default, deserialize_with = "hours_or_zero")]
    pub mon: f64,
    #[serde(rename = "tue_hours", default, deserialize_with = "hours_or_zero")]
    pub tue: f64,
    #[serde(rename = "wed_hours", default, deserialize_with = "hours_or_zero")]
    pub wed: f64,
    #[serde(rename = "thu_hours", default, deserialize_with = "hours_or_zero")]
    pub thu: f64,
    #[serde(rename = "fri_hours", default, deserialize_with = "hours_or_zero")]
    pub fri: f64,
    #[serde(rename = "sat_hours", default, deserialize_with = "hours_or_zero")]
    pub sat: f64,
    #[serde(rename = "sun_hours", default, deserialize_with = "hours_or_zero")]
    pub sun: f64,
}

impl WeekHours {
    pub fn days(&self) -> [f64; 7] {
        [
            self.mon, self.tue, self.wed, self.thu, self.fri, self.sat, self.sun,
        ]
    }

    pub fn total(&self) -> f64 {
        self.days().iter().sum()
    }
}

fn hours_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored row of hours for one (timesheet, project, task).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Entry {
    pub entry_id: Option<EntryId>,
    pub timesheet_id: TimesheetId,
    pub project_id: ProjectId,
    pub task_id: TaskId,
    pub week_start_date: NaiveDate,
    #[serde(flatten)]
    pub hours: WeekHours,
    pub comments: String,
}

/// Hours for one project/task pair as submitted by the employee.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryPayload {
    pub project_id: ProjectId,
    pub task_id: TaskId,
    #[serde(flatten)]
    pub hours: WeekHours,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Body of a save or submit request for one week.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveTimesheet {
    pub employee_id: EmployeeId,
    pub week_start_date: NaiveDate,
    #[serde(default)]
    pub week_end_date: Option<NaiveDate>,
    pub status: TimesheetStatus,
    #[serde(default)]
    pub entries: Vec<EntryPayload>,
}

/// Obligation for a manager to review a submitted timesheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManagerReviewLink {
    pub timesheet_id: TimesheetId,
    pub manager_id: EmployeeId,
    pub project_id: ProjectId,
    pub employee_id: EmployeeId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PerformanceReview {
    pub review_id: Option<ReviewId>,
    pub timesheet_id: TimesheetId,
    pub project_manager_id: EmployeeId,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub status: ReviewStatus,
}

pub enum ReviewQuery {
    ByTimesheet(TimesheetId),
    ByManager(EmployeeId),
}
