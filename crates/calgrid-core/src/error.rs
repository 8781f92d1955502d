//! Recoverable conditions reported by the calendar core.
//!
//! Every variant is local to the operation that produced it: the state the
//! operation would have touched is left exactly as it was.

use chrono::NaiveDate;
use thiserror::Error;

use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    /// `select_day` was called with a date outside the active range.
    #[error("cannot select {date}: active range is {start} to {end}")]
    InvalidSelection {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// A drag was started while another one is still in progress.
    #[error("drag of {requested} rejected: {active} is already being dragged")]
    ConcurrentDragRejected { active: TaskId, requested: TaskId },

    /// The task is not part of the rendered days or the backlog.
    #[error("task {0} is not rendered in the current view")]
    TaskNotFound(TaskId),

    #[error("no drag is in progress")]
    NoActiveDrag,

    #[error("duplicate task id {0}")]
    DuplicateTaskId(TaskId),

    #[error("backlog task {0} has a date; backlog entries must be unscheduled")]
    DatedBacklogTask(TaskId),
}
