/// Save/submit of a week of hours and explicit entry removal.
use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db;
use crate::error::{WorkflowError, WorkflowResult};
use crate::types::{
    EmployeeId, ProjectId, SaveTimesheet, TaskId, Timesheet, TimesheetId, TimesheetStatus,
};

use super::fanout::fan_out_to_managers;
use super::reconcile::reconcile_entries;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    pub message: &'static str,
    pub timesheet_id: TimesheetId,
    pub created: bool,
    pub status: TimesheetStatus,
    pub total_hours: f64,
    pub inserted: usize,
    pub updated: usize,
    pub links_created: usize,
}

/// Key of the entry removed by [`delete_entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    pub employee_id: EmployeeId,
    pub project_id: ProjectId,
    pub task_id: TaskId,
    pub week_start_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub message: &'static str,
    pub timesheet_id: TimesheetId,
    pub deleted: usize,
    pub total_hours: f64,
}

/// Saves or submits one week of hours for an employee.
///
/// Finds or creates the (employee, week) timesheet, applies the entry diff,
/// recomputes `total_hours` and, once the timesheet is `Submitted`, routes it
/// to the managers of the employee's projects. Everything runs in a single
/// immediate transaction.
pub fn save_timesheet(
    request: &SaveTimesheet,
    today: NaiveDate,
    conn: &mut Connection,
) -> WorkflowResult<SaveOutcome> {
    let week_end_date = validate_save(request, today)?;
    let incoming_total: f64 = request.entries.iter().map(|e| e.hours.total()).sum();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if db::query_employee_by_id(request.employee_id, &tx)?.is_none() {
        return Err(WorkflowError::not_found(format!(
            "employee {} not found",
            request.employee_id
        )));
    }
    check_entry_scope(request, &tx)?;

    let (timesheet, created) = resolve_timesheet(request, week_end_date, incoming_total, &tx)?;
    let timesheet_id = timesheet.timesheet_id;

    let stored = db::query_entries_by_timesheet(timesheet_id, &tx)?;
    let changes = reconcile_entries(
        timesheet_id,
        request.week_start_date,
        &request.entries,
        &stored,
    );
    if changes.is_empty() {
        tracing::debug!(timesheet_id, "entries unchanged");
    }
    for update in &changes.updates {
        db::update_entry(update, &tx)?;
    }
    let inserted = db::insert_entries(&changes.inserts, &tx)?;
    let total_hours = db::refresh_total_hours(timesheet_id, &tx)?;

    let links_created = if timesheet.status == TimesheetStatus::Submitted {
        fan_out_to_managers(timesheet_id, request.employee_id, &tx)?
    } else {
        0
    };
    tx.commit()?;

    tracing::info!(
        timesheet_id,
        employee_id = request.employee_id,
        week = %request.week_start_date,
        status = %timesheet.status,
        created,
        inserted,
        updated = changes.updates.len(),
        total_hours,
        "timesheet saved"
    );
    Ok(SaveOutcome {
        message: if created {
            "Timesheet created successfully"
        } else {
            "Timesheet updated successfully"
        },
        timesheet_id,
        created,
        status: timesheet.status,
        total_hours,
        inserted,
        updated: changes.updates.len(),
        links_created,
    })
}

/// Removes one entry, addressed by employee, week and project/task pair.
pub fn delete_entry(request: &DeleteEntry, conn: &mut Connection) -> WorkflowResult<DeleteOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let timesheet = db::query_timesheet_by_week(request.employee_id, request.week_start_date, &tx)?
        .ok_or_else(|| WorkflowError::not_found("Timesheet not found"))?;

    let deleted = db::delete_entry(
        timesheet.timesheet_id,
        request.project_id,
        request.task_id,
        request.week_start_date,
        &tx,
    )?;
    let total_hours = db::refresh_total_hours(timesheet.timesheet_id, &tx)?;
    tx.commit()?;

    tracing::info!(
        timesheet_id = timesheet.timesheet_id,
        project_id = request.project_id,
        task_id = request.task_id,
        deleted,
        "entry deleted"
    );
    Ok(DeleteOutcome {
        message: "Entry deleted successfully",
        timesheet_id: timesheet.timesheet_id,
        deleted,
        total_hours,
    })
}

/// Checks the request shape and returns the week's end date.
fn validate_save(request: &SaveTimesheet, today: NaiveDate) -> WorkflowResult<NaiveDate> {
    if request.status.is_decided() {
        return Err(WorkflowError::validation(format!(
            "status must be Saved or Submitted, got {}",
            request.status
        )));
    }
    if request.week_start_date > today {
        return Err(WorkflowError::validation(
            "cannot fill out a timesheet for a future week",
        ));
    }
    let week_end_date = request
        .week_start_date
        .checked_add_days(Days::new(6))
        .ok_or_else(|| WorkflowError::validation("week_start_date is out of range"))?;
    if let Some(given) = request.week_end_date {
        if given != week_end_date {
            return Err(WorkflowError::validation(format!(
                "week_end_date must be {week_end_date}, six days after week_start_date"
            )));
        }
    }

    let mut seen = HashSet::new();
    for entry in &request.entries {
        if entry.hours.days().iter().any(|h| !h.is_finite() || *h < 0.0) {
            return Err(WorkflowError::validation(format!(
                "hours for project {} task {} must be non-negative numbers",
                entry.project_id, entry.task_id
            )));
        }
        if !seen.insert((entry.project_id, entry.task_id)) {
            return Err(WorkflowError::validation(format!(
                "project {} task {} appears more than once",
                entry.project_id, entry.task_id
            )));
        }
    }
    Ok(week_end_date)
}

/// Every entry must target one of the employee's projects and a task of that project.
fn check_entry_scope(request: &SaveTimesheet, conn: &Connection) -> WorkflowResult<()> {
    let team: HashSet<ProjectId> = db::query_projects_for_employee(request.employee_id, conn)?
        .into_iter()
        .filter_map(|p| p.id)
        .collect();
    for entry in &request.entries {
        if !team.contains(&entry.project_id) {
            return Err(WorkflowError::validation(format!(
                "employee {} is not a member of project {}",
                request.employee_id, entry.project_id
            )));
        }
        if !db::check_task_in_project(entry.project_id, entry.task_id, conn)? {
            return Err(WorkflowError::validation(format!(
                "task {} does not belong to project {}",
                entry.task_id, entry.project_id
            )));
        }
    }
    Ok(())
}

/// Finds or creates the timesheet for the week and applies the status rule.
fn resolve_timesheet(
    request: &SaveTimesheet,
    week_end_date: NaiveDate,
    total_hours: f64,
    conn: &Connection,
) -> WorkflowResult<(Timesheet, bool)> {
    let created = db::create_timesheet(
        request.employee_id,
        request.week_start_date,
        week_end_date,
        request.status,
        total_hours,
        conn,
    )?;
    if let Some(timesheet_id) = created {
        let timesheet = Timesheet {
            timesheet_id,
            employee_id: request.employee_id,
            week_start_date: request.week_start_date,
            week_end_date,
            total_hours,
            status: request.status,
        };
        return Ok((timesheet, true));
    }
    // The (employee, week) key is taken: update that row instead.
    let existing = db::query_timesheet_by_week(request.employee_id, request.week_start_date, conn)?
        .ok_or_else(|| WorkflowError::Store(rusqlite::Error::QueryReturnedNoRows))?;

    let status = existing.status.after_save(request.status);
    if status != existing.status {
        tracing::info!(
            timesheet_id = existing.timesheet_id,
            from = %existing.status,
            to = %status,
            "timesheet status advanced"
        );
    } else if request.status != status {
        tracing::debug!(
            timesheet_id = existing.timesheet_id,
            requested = %request.status,
            kept = %status,
            "requested status ignored"
        );
    }
    db::update_timesheet(existing.timesheet_id, status, total_hours, conn)?;
    Ok((
        Timesheet {
            status,
            total_hours,
            ..existing
        },
        false,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, entry, request};
    use rstest::rstest;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn entries_sum(fx: &Fixture, id: TimesheetId) -> f64 {
        db::query_entries_by_timesheet(id, &fx.conn)
            .unwrap()
            .iter()
            .map(|e| e.hours.total())
            .sum()
    }

    #[test]
    fn first_save_creates_a_saved_timesheet() {
        let mut fx = Fixture::new();
        let req = request(fx.employee, TimesheetStatus::Saved, vec![entry(10, 5, &[8.0])]);

        let outcome = save_timesheet(&req, today(), &mut fx.conn).unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.status, TimesheetStatus::Saved);
        assert_eq!(outcome.total_hours, 8.0);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.links_created, 0);
        let sheet = db::query_timesheet_by_id(outcome.timesheet_id, &fx.conn)
            .unwrap()
            .unwrap();
        assert_eq!(sheet.status, TimesheetStatus::Saved);
        assert_eq!(sheet.total_hours, 8.0);
        assert_eq!(sheet.week_end_date, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(db::query_entries_by_timesheet(sheet.timesheet_id, &fx.conn).unwrap().len(), 1);
    }

    #[test]
    fn submit_after_save_updates_in_place_and_fans_out() {
        let mut fx = Fixture::new();
        let saved = request(fx.employee, TimesheetStatus::Saved, vec![entry(10, 5, &[8.0])]);
        let first = save_timesheet(&saved, today(), &mut fx.conn).unwrap();

        let submitted = request(
            fx.employee,
            TimesheetStatus::Submitted,
            vec![entry(10, 5, &[8.0, 8.0])],
        );
        let second = save_timesheet(&submitted, today(), &mut fx.conn).unwrap();

        assert!(!second.created);
        assert_eq!(second.timesheet_id, first.timesheet_id);
        assert_eq!(second.status, TimesheetStatus::Submitted);
        assert_eq!(second.total_hours, 16.0);
        assert_eq!((second.inserted, second.updated), (0, 1));
        assert_eq!(second.links_created, 2);

        let entries = db::query_entries_by_timesheet(first.timesheet_id, &fx.conn).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].hours.tue, 8.0);
        let links = db::query_links_for_timesheet(first.timesheet_id, &fx.conn).unwrap();
        let projects: Vec<_> = links.iter().map(|l| l.project_id).collect();
        assert_eq!(projects, vec![fx.project_a, fx.project_b]);
    }

    #[test]
    fn identical_resubmission_changes_nothing() {
        let mut fx = Fixture::new();
        let req = request(
            fx.employee,
            TimesheetStatus::Submitted,
            vec![entry(10, 5, &[8.0, 4.0]), entry(20, 5, &[0.0, 4.0])],
        );
        save_timesheet(&req, today(), &mut fx.conn).unwrap();
        let again = save_timesheet(&req, today(), &mut fx.conn).unwrap();

        assert_eq!((again.inserted, again.updated, again.links_created), (0, 0, 0));
        assert_eq!(again.total_hours, 16.0);
    }

    #[test]
    fn one_timesheet_per_employee_week() {
        let mut fx = Fixture::new();
        for status in [
            TimesheetStatus::Saved,
            TimesheetStatus::Saved,
            TimesheetStatus::Submitted,
            TimesheetStatus::Saved,
        ] {
            let req = request(fx.employee, status, vec![entry(10, 5, &[1.0])]);
            save_timesheet(&req, today(), &mut fx.conn).unwrap();
        }
        let sheets = db::query_timesheets_for_employee(fx.employee, &fx.conn).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].status, TimesheetStatus::Submitted);
    }

    #[test]
    fn existing_week_is_reused_when_the_insert_conflicts() {
        let mut fx = Fixture::new();
        let first = fx.saved_timesheet();

        let req = request(fx.employee, TimesheetStatus::Submitted, vec![entry(10, 5, &[4.0])]);
        let outcome = save_timesheet(&req, today(), &mut fx.conn).unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.timesheet_id, first);
        assert_eq!(outcome.status, TimesheetStatus::Submitted);
        assert_eq!(outcome.message, "Timesheet updated successfully");
    }

    #[test]
    fn total_matches_stored_entries_when_payload_omits_a_row() {
        let mut fx = Fixture::new();
        let both = request(
            fx.employee,
            TimesheetStatus::Saved,
            vec![entry(10, 5, &[8.0]), entry(10, 6, &[2.0])],
        );
        let outcome = save_timesheet(&both, today(), &mut fx.conn).unwrap();
        let only_one = request(fx.employee, TimesheetStatus::Saved, vec![entry(10, 5, &[6.0])]);
        let outcome2 = save_timesheet(&only_one, today(), &mut fx.conn).unwrap();

        assert_eq!(outcome2.total_hours, 8.0);
        assert_eq!(entries_sum(&fx, outcome.timesheet_id), 8.0);
        assert_eq!(
            db::query_entries_by_timesheet(outcome.timesheet_id, &fx.conn).unwrap().len(),
            2
        );
    }

    #[rstest]
    #[case(TimesheetStatus::Approved)]
    #[case(TimesheetStatus::Rejected)]
    fn decided_timesheets_keep_their_status(#[case] decided: TimesheetStatus) {
        let mut fx = Fixture::new();
        let req = request(fx.employee, TimesheetStatus::Submitted, vec![entry(10, 5, &[8.0])]);
        let outcome = save_timesheet(&req, today(), &mut fx.conn).unwrap();
        db::update_timesheet(outcome.timesheet_id, decided, 8.0, &fx.conn).unwrap();

        for status in [TimesheetStatus::Saved, TimesheetStatus::Submitted] {
            let req = request(fx.employee, status, vec![entry(10, 5, &[7.0])]);
            let again = save_timesheet(&req, today(), &mut fx.conn).unwrap();
            assert_eq!(again.status, decided);
            assert_eq!(again.links_created, 0);
        }
        let sheet = db::query_timesheet_by_id(outcome.timesheet_id, &fx.conn)
            .unwrap()
            .unwrap();
        assert_eq!(sheet.status, decided);
        assert_eq!(sheet.total_hours, 7.0);
    }

    #[test]
    fn submitted_is_not_reverted_by_a_save() {
        let mut fx = Fixture::new();
        let req = request(fx.employee, TimesheetStatus::Submitted, vec![entry(10, 5, &[8.0])]);
        save_timesheet(&req, today(), &mut fx.conn).unwrap();
        let resave = request(fx.employee, TimesheetStatus::Saved, vec![entry(10, 5, &[8.0])]);
        let outcome = save_timesheet(&resave, today(), &mut fx.conn).unwrap();
        assert_eq!(outcome.status, TimesheetStatus::Submitted);
    }

    #[rstest]
    #[case::decided_status(
        request(1, TimesheetStatus::Approved, vec![]),
        "status must be Saved or Submitted"
    )]
    #[case::negative_hours(
        request(1, TimesheetStatus::Saved, vec![entry(10, 5, &[-1.0])]),
        "non-negative"
    )]
    #[case::duplicate_pair(
        request(1, TimesheetStatus::Saved, vec![entry(10, 5, &[1.0]), entry(10, 5, &[2.0])]),
        "more than once"
    )]
    fn malformed_requests_are_rejected(#[case] req: SaveTimesheet, #[case] needle: &str) {
        match validate_save(&req, today()) {
            Err(WorkflowError::Validation(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn week_end_must_follow_week_start() {
        let mut req = request(1, TimesheetStatus::Saved, vec![]);
        req.week_end_date = NaiveDate::from_ymd_opt(2024, 1, 6);
        assert!(matches!(
            validate_save(&req, today()),
            Err(WorkflowError::Validation(_))
        ));
        req.week_end_date = NaiveDate::from_ymd_opt(2024, 1, 7);
        assert!(validate_save(&req, today()).is_ok());
    }

    #[test]
    fn future_weeks_are_refused() {
        let req = request(1, TimesheetStatus::Saved, vec![]);
        let before = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(matches!(
            validate_save(&req, before),
            Err(WorkflowError::Validation(_))
        ));
    }

    #[test]
    fn entries_outside_the_team_are_rejected_without_writes() {
        let mut fx = Fixture::new();
        let outsider = fx.project_for(fx.manager_b, "Outside");
        let req = request(fx.employee, TimesheetStatus::Saved, vec![entry(outsider, 5, &[1.0])]);
        let err = save_timesheet(&req, today(), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(db::query_timesheets_for_employee(fx.employee, &fx.conn)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn tasks_must_belong_to_the_project() {
        let mut fx = Fixture::new();
        let req = request(fx.employee, TimesheetStatus::Saved, vec![entry(20, 6, &[1.0])]);
        let err = save_timesheet(&req, today(), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(msg) if msg.contains("task 6")));
    }

    #[test]
    fn unknown_employee_is_not_found() {
        let mut fx = Fixture::new();
        let req = request(999, TimesheetStatus::Saved, vec![]);
        let err = save_timesheet(&req, today(), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn delete_without_timesheet_is_not_found_and_writes_nothing() {
        let mut fx = Fixture::new();
        let req = DeleteEntry {
            employee_id: fx.employee,
            project_id: 10,
            task_id: 5,
            week_start_date: fx.week(),
        };
        let err = delete_entry(&req, &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
        assert!(db::query_timesheets_for_employee(fx.employee, &fx.conn)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn delete_removes_the_row_and_refreshes_the_total() {
        let mut fx = Fixture::new();
        let req = request(
            fx.employee,
            TimesheetStatus::Saved,
            vec![entry(10, 5, &[8.0]), entry(10, 6, &[3.0])],
        );
        let saved = save_timesheet(&req, today(), &mut fx.conn).unwrap();

        let outcome = delete_entry(
            &DeleteEntry {
                employee_id: fx.employee,
                project_id: 10,
                task_id: 6,
                week_start_date: fx.week(),
            },
            &mut fx.conn,
        )
        .unwrap();

        assert_eq!(outcome.deleted, 1);
        assert_eq!(outcome.total_hours, 8.0);
        let left = db::query_entries_by_timesheet(saved.timesheet_id, &fx.conn).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].task_id, 5);
    }
}
