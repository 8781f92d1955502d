use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CalendarError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,

    #[serde(default)]
    pub date: Option<NaiveDate>,

    #[serde(default)]
    pub title: String,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, date: Option<NaiveDate>) -> Self {
        Self {
            id: id.into(),
            date,
            title: title.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.date.is_some()
    }
}

/// The live task collection: scheduled tasks in caller order plus the
/// ordered backlog of unscheduled ones.
///
/// A task id appears at most once across both sequences; scheduled tasks
/// always carry a date and backlog tasks never do.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskSet {
    #[serde(rename = "tasks")]
    scheduled: Vec<Task>,
    backlog: Vec<Task>,
}

impl TaskSet {
    /// Builds a set from explicit scheduled and backlog sequences. Undated
    /// entries of `tasks` are appended to the backlog in order.
    pub fn new(tasks: Vec<Task>, backlog: Vec<Task>) -> Result<Self, CalendarError> {
        let mut seen = HashSet::with_capacity(tasks.len() + backlog.len());
        for task in tasks.iter().chain(backlog.iter()) {
            if !seen.insert(task.id.clone()) {
                return Err(CalendarError::DuplicateTaskId(task.id.clone()));
            }
        }

        if let Some(dated) = backlog.iter().find(|task| task.is_scheduled()) {
            return Err(CalendarError::DatedBacklogTask(dated.id.clone()));
        }

        let (scheduled, undated): (Vec<Task>, Vec<Task>) =
            tasks.into_iter().partition(Task::is_scheduled);

        let mut backlog = backlog;
        backlog.extend(undated);

        Ok(Self { scheduled, backlog })
    }

    /// Partitions one flat collection by date presence.
    pub fn from_collection(tasks: Vec<Task>) -> Result<Self, CalendarError> {
        Self::new(tasks, Vec::new())
    }

    pub fn scheduled(&self) -> &[Task] {
        &self.scheduled
    }

    pub fn backlog(&self) -> &[Task] {
        &self.backlog
    }

    pub fn len(&self) -> usize {
        self.scheduled.len() + self.backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty() && self.backlog.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.scheduled
            .iter()
            .chain(self.backlog.iter())
            .find(|task| &task.id == id)
    }

    pub fn backlog_position(&self, id: &TaskId) -> Option<usize> {
        self.backlog.iter().position(|task| &task.id == id)
    }

    /// Date and rank of a scheduled task among the tasks sharing its date.
    pub fn day_position(&self, id: &TaskId) -> Option<(NaiveDate, usize)> {
        let task = self.scheduled.iter().find(|task| &task.id == id)?;
        let date = task.date?;
        let position = self
            .scheduled
            .iter()
            .filter(|t| t.date == Some(date))
            .position(|t| &t.id == id)?;
        Some((date, position))
    }

    /// Removes a task from whichever sequence holds it.
    pub(crate) fn take(&mut self, id: &TaskId) -> Option<Task> {
        if let Some(idx) = self.scheduled.iter().position(|task| &task.id == id) {
            return Some(self.scheduled.remove(idx));
        }
        self.backlog_position(id)
            .map(|idx| self.backlog.remove(idx))
    }

    /// Inserts a dated task so that it lands at `position` among the tasks
    /// sharing its date. Tasks on other dates keep their relative order.
    pub(crate) fn insert_scheduled(&mut self, task: Task, position: usize) {
        let Some(date) = task.date else {
            self.insert_backlog(task, None);
            return;
        };

        let slots: Vec<usize> = self
            .scheduled
            .iter()
            .enumerate()
            .filter(|(_, t)| t.date == Some(date))
            .map(|(idx, _)| idx)
            .collect();

        let at = match (slots.get(position), slots.last()) {
            (Some(&slot), _) => slot,
            (None, Some(&last)) => last + 1,
            (None, None) => self.scheduled.len(),
        };
        self.scheduled.insert(at, task);
    }

    /// Inserts an undated task into the backlog, appending when no position
    /// is given. Positions past the end are clamped.
    pub(crate) fn insert_backlog(&mut self, mut task: Task, position: Option<usize>) {
        task.date = None;
        let at = position
            .unwrap_or(self.backlog.len())
            .min(self.backlog.len());
        self.backlog.insert(at, task);
    }

    pub(crate) fn count_on(&self, date: NaiveDate) -> usize {
        self.scheduled
            .iter()
            .filter(|task| task.date == Some(date))
            .count()
    }
}
