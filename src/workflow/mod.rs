/// Timesheet reconciliation and approval: save/submit with entry diffing and
/// manager fanout, then approve or reject.
mod approval;
mod fanout;
mod reconcile;
mod upsert;

pub use approval::{ApproveRequest, RejectRequest, approve_timesheet, reject_timesheet};
pub use upsert::{DeleteEntry, delete_entry, save_timesheet};
