/// Manager decisions on submitted timesheets.
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::db;
use crate::error::{WorkflowError, WorkflowResult, is_constraint_violation};
use crate::types::{
    EmployeeId, PerformanceReview, ReviewId, ReviewStatus, TimesheetId, TimesheetStatus,
};

/// Ratings below this need written feedback.
const FEEDBACK_REQUIRED_BELOW: u8 = 3;
const REJECTION_FEEDBACK: &str = "Rejected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproveRequest {
    pub timesheet_id: TimesheetId,
    pub manager_id: EmployeeId,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectRequest {
    pub timesheet_id: TimesheetId,
    pub manager_id: EmployeeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewOutcome {
    pub message: &'static str,
    pub review: PerformanceReview,
    /// Timesheet status after the decision. Differs from the review status
    /// when another manager already decided the timesheet.
    pub timesheet_status: TimesheetStatus,
}

/// Records an approval with a 1-5 rating.
pub fn approve_timesheet(
    request: &ApproveRequest,
    conn: &mut Connection,
) -> WorkflowResult<ReviewOutcome> {
    let rating = validate_rating(request.rating, request.feedback.as_deref())?;
    let feedback = request
        .feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);
    record_review(
        PerformanceReview {
            review_id: None,
            timesheet_id: request.timesheet_id,
            project_manager_id: request.manager_id,
            rating: Some(rating),
            feedback,
            status: ReviewStatus::Approved,
        },
        conn,
    )
}

/// Records a rejection. Rejections carry no rating.
pub fn reject_timesheet(
    request: &RejectRequest,
    conn: &mut Connection,
) -> WorkflowResult<ReviewOutcome> {
    record_review(
        PerformanceReview {
            review_id: None,
            timesheet_id: request.timesheet_id,
            project_manager_id: request.manager_id,
            rating: None,
            feedback: Some(REJECTION_FEEDBACK.to_string()),
            status: ReviewStatus::Rejected,
        },
        conn,
    )
}

fn validate_rating(rating: Option<u8>, feedback: Option<&str>) -> WorkflowResult<u8> {
    let rating = rating.ok_or_else(|| WorkflowError::validation("rating is required"))?;
    if !(1..=5).contains(&rating) {
        return Err(WorkflowError::validation("rating must be between 1 and 5"));
    }
    let has_feedback = feedback.is_some_and(|f| !f.trim().is_empty());
    if rating < FEEDBACK_REQUIRED_BELOW && !has_feedback {
        return Err(WorkflowError::validation(format!(
            "feedback is required for a rating below {FEEDBACK_REQUIRED_BELOW}"
        )));
    }
    Ok(rating)
}

/// Inserts the review and reflects it on the timesheet in one transaction.
///
/// The timesheet status only moves while it is `Submitted`, so the first
/// manager to decide sets the outcome; later reviews are still recorded.
fn record_review(
    review: PerformanceReview,
    conn: &mut Connection,
) -> WorkflowResult<ReviewOutcome> {
    let timesheet_id = review.timesheet_id;
    let manager_id = review.project_manager_id;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let timesheet = db::query_timesheet_by_id(timesheet_id, &tx)?
        .ok_or_else(|| WorkflowError::not_found(format!("timesheet {timesheet_id} not found")))?;
    if timesheet.status == TimesheetStatus::Saved {
        return Err(WorkflowError::validation(format!(
            "timesheet {timesheet_id} has not been submitted"
        )));
    }
    if !db::check_review_link_exists(timesheet_id, manager_id, &tx)? {
        return Err(WorkflowError::not_found(format!(
            "timesheet {timesheet_id} is not in the review queue of manager {manager_id}"
        )));
    }
    ensure_not_reviewed(timesheet_id, manager_id, &tx)?;

    let review_id = insert_review(&review, &tx)?;
    let decided = review.status.timesheet_status();
    let moved = db::update_timesheet_status_from(
        timesheet_id,
        TimesheetStatus::Submitted,
        decided,
        &tx,
    )?;
    tx.commit()?;

    let timesheet_status = if moved { decided } else { timesheet.status };
    tracing::info!(
        timesheet_id,
        manager_id,
        review_id,
        decision = %review.status,
        timesheet_status = %timesheet_status,
        "review recorded"
    );
    if !moved {
        tracing::warn!(
            timesheet_id,
            manager_id,
            kept = %timesheet_status,
            "timesheet already decided by another manager"
        );
    }
    Ok(ReviewOutcome {
        message: "Performance review added successfully",
        review: PerformanceReview {
            review_id: Some(review_id),
            ..review
        },
        timesheet_status,
    })
}

/// Inserts the review row; the (timesheet, manager) unique key turns a
/// concurrent duplicate into a conflict.
fn insert_review(review: &PerformanceReview, conn: &Connection) -> WorkflowResult<ReviewId> {
    db::create_review(review, conn).map_err(|e| {
        if is_constraint_violation(&e) {
            already_reviewed(review.timesheet_id, review.project_manager_id)
        } else {
            e.into()
        }
    })
}

fn ensure_not_reviewed(
    timesheet_id: TimesheetId,
    manager_id: EmployeeId,
    conn: &Connection,
) -> WorkflowResult<()> {
    if db::check_review_exists(timesheet_id, manager_id, conn)? {
        return Err(already_reviewed(timesheet_id, manager_id));
    }
    Ok(())
}

fn already_reviewed(timesheet_id: TimesheetId, manager_id: EmployeeId) -> WorkflowError {
    WorkflowError::conflict(format!(
        "timesheet {timesheet_id} was already reviewed by manager {manager_id}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReviewQuery;
    use crate::test_support::{Fixture, entry, request};
    use crate::workflow;
    use rstest::rstest;

    fn approve(id: TimesheetId, manager: EmployeeId, rating: u8) -> ApproveRequest {
        ApproveRequest {
            timesheet_id: id,
            manager_id: manager,
            rating: Some(rating),
            feedback: None,
        }
    }

    fn status_of(fx: &Fixture, id: TimesheetId) -> TimesheetStatus {
        db::query_timesheet_by_id(id, &fx.conn).unwrap().unwrap().status
    }

    #[test]
    fn approval_records_rating_and_approves_the_timesheet() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();

        let outcome = approve_timesheet(&approve(sheet, fx.manager_a, 4), &mut fx.conn).unwrap();

        assert_eq!(outcome.review.status, ReviewStatus::Approved);
        assert_eq!(outcome.review.rating, Some(4));
        assert_eq!(outcome.review.feedback, None);
        assert_eq!(outcome.timesheet_status, TimesheetStatus::Approved);
        assert_eq!(status_of(&fx, sheet), TimesheetStatus::Approved);
        let reviews = db::query_reviews(ReviewQuery::ByTimesheet(sheet), &fx.conn).unwrap();
        assert_eq!(reviews.len(), 1);
    }

    #[rstest]
    #[case(TimesheetStatus::Saved)]
    #[case(TimesheetStatus::Submitted)]
    fn decided_timesheets_ignore_later_saves(#[case] requested: TimesheetStatus) {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        approve_timesheet(&approve(sheet, fx.manager_a, 4), &mut fx.conn).unwrap();

        let req = request(fx.employee, requested, vec![entry(10, 5, &[1.0])]);
        let today = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let outcome = workflow::save_timesheet(&req, today, &mut fx.conn).unwrap();

        assert_eq!(outcome.status, TimesheetStatus::Approved);
        assert_eq!(status_of(&fx, sheet), TimesheetStatus::Approved);
    }

    #[test]
    fn duplicate_review_insert_maps_to_conflict() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        let review = PerformanceReview {
            review_id: None,
            timesheet_id: sheet,
            project_manager_id: fx.manager_a,
            rating: Some(4),
            feedback: None,
            status: ReviewStatus::Approved,
        };
        insert_review(&review, &fx.conn).unwrap();

        let raw = db::create_review(&review, &fx.conn).unwrap_err();
        assert!(is_constraint_violation(&raw));
        let err = insert_review(&review, &fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict(_)));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn second_decision_by_the_same_manager_conflicts() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        approve_timesheet(&approve(sheet, fx.manager_a, 4), &mut fx.conn).unwrap();

        let again = approve_timesheet(&approve(sheet, fx.manager_a, 5), &mut fx.conn);
        assert!(matches!(again, Err(WorkflowError::Conflict(_))));
        let reject = reject_timesheet(
            &RejectRequest {
                timesheet_id: sheet,
                manager_id: fx.manager_a,
            },
            &mut fx.conn,
        );
        assert!(matches!(reject, Err(WorkflowError::Conflict(_))));
        assert_eq!(
            db::query_reviews(ReviewQuery::ByTimesheet(sheet), &fx.conn)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn low_rating_without_feedback_writes_nothing() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();

        let err = approve_timesheet(&approve(sheet, fx.manager_a, 2), &mut fx.conn).unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(db::query_reviews(ReviewQuery::ByTimesheet(sheet), &fx.conn)
            .unwrap()
            .is_empty());
        assert_eq!(status_of(&fx, sheet), TimesheetStatus::Submitted);
    }

    #[test]
    fn low_rating_with_feedback_is_accepted() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        let mut req = approve(sheet, fx.manager_a, 2);
        req.feedback = Some("  Missing task notes ".to_string());

        let outcome = approve_timesheet(&req, &mut fx.conn).unwrap();
        assert_eq!(outcome.review.feedback.as_deref(), Some("Missing task notes"));
    }

    #[rstest]
    #[case(None, None, "rating is required")]
    #[case(Some(0), None, "between 1 and 5")]
    #[case(Some(6), Some("great"), "between 1 and 5")]
    #[case(Some(1), Some("   "), "feedback is required")]
    fn rating_rules(
        #[case] rating: Option<u8>,
        #[case] feedback: Option<&str>,
        #[case] needle: &str,
    ) {
        match validate_rating(rating, feedback) {
            Err(WorkflowError::Validation(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[rstest]
    #[case(3, None)]
    #[case(5, None)]
    #[case(1, Some("late submission"))]
    fn accepted_ratings(#[case] rating: u8, #[case] feedback: Option<&str>) {
        assert_eq!(validate_rating(Some(rating), feedback).unwrap(), rating);
    }

    #[test]
    fn rejection_stores_fixed_feedback_without_rating() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        let outcome = reject_timesheet(
            &RejectRequest {
                timesheet_id: sheet,
                manager_id: fx.manager_b,
            },
            &mut fx.conn,
        )
        .unwrap();
        assert_eq!(outcome.review.rating, None);
        assert_eq!(outcome.review.feedback.as_deref(), Some("Rejected"));
        assert_eq!(status_of(&fx, sheet), TimesheetStatus::Rejected);
    }

    #[test]
    fn first_manager_decides_the_timesheet() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        reject_timesheet(
            &RejectRequest {
                timesheet_id: sheet,
                manager_id: fx.manager_b,
            },
            &mut fx.conn,
        )
        .unwrap();

        let late = approve_timesheet(&approve(sheet, fx.manager_a, 5), &mut fx.conn).unwrap();

        assert_eq!(late.review.status, ReviewStatus::Approved);
        assert_eq!(late.timesheet_status, TimesheetStatus::Rejected);
        assert_eq!(status_of(&fx, sheet), TimesheetStatus::Rejected);
        assert_eq!(
            db::query_reviews(ReviewQuery::ByTimesheet(sheet), &fx.conn)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn saved_timesheets_cannot_be_reviewed() {
        let mut fx = Fixture::new();
        let sheet = fx.saved_timesheet();
        let err = approve_timesheet(&approve(sheet, fx.manager_a, 4), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)));
    }

    #[test]
    fn managers_outside_the_queue_cannot_review() {
        let mut fx = Fixture::new();
        let sheet = fx.submitted_timesheet();
        let stranger = fx.manager_named("Stranger", "stranger@example.com");
        let err = approve_timesheet(&approve(sheet, stranger, 4), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }

    #[test]
    fn unknown_timesheet_is_not_found() {
        let mut fx = Fixture::new();
        let err = approve_timesheet(&approve(404, fx.manager_a, 4), &mut fx.conn).unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound(_)));
    }
}
