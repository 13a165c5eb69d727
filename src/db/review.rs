/// Performance review database queries.
use rusqlite::{Connection, Row};

use crate::types::{EmployeeId, PerformanceReview, ReviewId, ReviewQuery, TimesheetId};

pub fn create_review(review: &PerformanceReview, conn: &Connection) -> rusqlite::Result<ReviewId> {
    conn.execute(
        "
        INSERT INTO performance_reviews (timesheet_id, project_manager_id, rating, feedback, status)
        VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            review.timesheet_id,
            review.project_manager_id,
            review.rating,
            review.feedback,
            review.status,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn check_review_exists(
    timesheet_id: TimesheetId,
    manager_id: EmployeeId,
    conn: &Connection,
) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT 1 FROM performance_reviews WHERE timesheet_id = ?1 AND project_manager_id = ?2",
    )?;
    let mut rows = stmt.query((timesheet_id, manager_id))?;
    Ok(rows.next()?.is_some())
}

pub fn query_reviews(query: ReviewQuery, conn: &Connection) -> rusqlite::Result<Vec<PerformanceReview>> {
    let (filter, id) = match query {
        ReviewQuery::ByTimesheet(id) => ("timesheet_id", id),
        ReviewQuery::ByManager(id) => ("project_manager_id", id),
    };
    let mut stmt = conn.prepare(&format!(
        "
        SELECT review_id, timesheet_id, project_manager_id, rating, feedback, status
        FROM performance_reviews
        WHERE {filter} = ?1
        ORDER BY review_id"
    ))?;
    let rows = stmt.query_map([id], review_from_row)?;
    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<PerformanceReview> {
    Ok(PerformanceReview {
        review_id: Some(row.get(0)?),
        timesheet_id: row.get(1)?,
        project_manager_id: row.get(2)?,
        rating: row.get(3)?,
        feedback: row.get(4)?,
        status: row.get(5)?,
    })
}
