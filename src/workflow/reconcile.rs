/// Diffing of an incoming week of entries against the stored rows.
use std::collections::HashMap;

use chrono::NaiveDate;

use crate::types::{Entry, EntryPayload, ProjectId, TaskId, TimesheetId};

/// Writes needed to bring stored entries in line with a payload.
#[derive(Debug, Default, PartialEq)]
pub struct EntryChanges {
    /// Stored rows whose hours or comments differ, carrying every field.
    pub updates: Vec<Entry>,
    /// Project/task pairs with no stored row yet.
    pub inserts: Vec<Entry>,
}

impl EntryChanges {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }
}

/// Matches `incoming` against `stored` on (project_id, task_id).
///
/// Stored rows missing from the payload are left alone; removal goes through
/// the explicit delete operation.
pub fn reconcile_entries(
    timesheet_id: TimesheetId,
    week_start_date: NaiveDate,
    incoming: &[EntryPayload],
    stored: &[Entry],
) -> EntryChanges {
    let by_key: HashMap<(ProjectId, TaskId), &Entry> = stored
        .iter()
        .map(|entry| ((entry.project_id, entry.task_id), entry))
        .collect();

    let mut changes = EntryChanges::default();
    for payload in incoming {
        let candidate = Entry {
            entry_id: None,
            timesheet_id,
            project_id: payload.project_id,
            task_id: payload.task_id,
            week_start_date,
            hours: payload.hours,
            comments: payload.comments.clone().unwrap_or_default(),
        };
        match by_key.get(&(payload.project_id, payload.task_id)) {
            Some(existing) if differs(existing, &candidate) => changes.updates.push(Entry {
                entry_id: existing.entry_id,
                ..candidate
            }),
            Some(_) => {}
            None => changes.inserts.push(candidate),
        }
    }
    changes
}

fn differs(existing: &Entry, candidate: &Entry) -> bool {
    existing.hours.days() != candidate.hours.days() || existing.comments != candidate.comments
}
