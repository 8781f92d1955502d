//! Partitions the task collection into per-day buckets for a date range.
//!
//! Buckets are derived data: they are rebuilt from scratch on every pass and
//! never edited in place. The render keys mirror the coordinates, so they are
//! only stable for as long as the arrangement is.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::date_range::DateRange;
use crate::task::{Task, TaskId};

/// Ephemeral `(day_index, position)` of a bucketed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Coordinate {
    pub day_index: usize,
    pub position: usize,
}

impl Coordinate {
    pub fn new(day_index: usize, position: usize) -> Self {
        Self {
            day_index,
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinnedTask {
    pub id: TaskId,
    pub coordinate: Coordinate,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub key: String,
    pub tasks: Vec<BinnedTask>,
}

impl CalendarDay {
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.tasks.iter().map(|binned| &binned.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BacklogEntry {
    pub id: TaskId,
    pub position: usize,
    pub key: String,
}

#[tracing::instrument(skip_all, fields(start = %range.start(), days = range.len(), tasks = tasks.len()))]
pub fn bin_tasks(range: &DateRange, tasks: &[Task]) -> Vec<CalendarDay> {
    let index_by_date: HashMap<NaiveDate, usize> = range
        .iter()
        .enumerate()
        .map(|(idx, date)| (date, idx))
        .collect();

    let mut days: Vec<CalendarDay> = range
        .iter()
        .enumerate()
        .map(|(idx, date)| CalendarDay {
            date,
            key: format!("day-{idx}"),
            tasks: Vec::new(),
        })
        .collect();

    let mut skipped = 0usize;
    for task in tasks {
        let Some(day_index) = task.date.and_then(|date| index_by_date.get(&date).copied())
        else {
            skipped += 1;
            continue;
        };

        let bucket = &mut days[day_index];
        let position = bucket.tasks.len();
        bucket.tasks.push(BinnedTask {
            id: task.id.clone(),
            coordinate: Coordinate::new(day_index, position),
            key: format!("day-{day_index}-task-{position}"),
        });
    }

    tracing::trace!(skipped, "binned tasks");
    days
}

pub fn backlog_entries(backlog: &[Task]) -> Vec<BacklogEntry> {
    backlog
        .iter()
        .enumerate()
        .map(|(position, task)| BacklogEntry {
            id: task.id.clone(),
            position,
            key: format!("footer-task-{position}"),
        })
        .collect()
}

pub fn locate(days: &[CalendarDay], id: &TaskId) -> Option<Coordinate> {
    days.iter()
        .flat_map(|day| day.tasks.iter())
        .find(|binned| &binned.id == id)
        .map(|binned| binned.coordinate)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::date_range::week_range;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
    }

    fn sample_tasks() -> Vec<Task> {
        vec![
            Task::new("t1", "standup", Some(date(6))),
            Task::new("t2", "review", Some(date(4))),
            Task::new("t3", "unscheduled", None),
            Task::new("t4", "next week", Some(date(11))),
            Task::new("t5", "retro", Some(date(6))),
            Task::new("t6", "last week", Some(date(3))),
        ]
    }

    #[test]
    fn midweek_task_lands_on_day_two() {
        let range = week_range(date(6));
        let days = bin_tasks(&range, &[Task::new("t1", "t1", Some(date(6)))]);

        assert_eq!(days.len(), 7);
        assert_eq!(days[2].date, date(6));
        assert_eq!(days[2].tasks.len(), 1);
        assert_eq!(days[2].tasks[0].coordinate, Coordinate::new(2, 0));
        assert_eq!(days[2].tasks[0].key, "day-2-task-0");
        assert_eq!(days[2].key, "day-2");
    }

    #[test]
    fn buckets_partition_in_range_tasks_exactly_once() {
        let range = week_range(date(6));
        let tasks = sample_tasks();
        let days = bin_tasks(&range, &tasks);

        let binned: Vec<&TaskId> = days.iter().flat_map(|d| d.task_ids()).collect();
        let unique: HashSet<&TaskId> = binned.iter().copied().collect();
        assert_eq!(binned.len(), unique.len());

        let expected: HashSet<&TaskId> = tasks
            .iter()
            .filter(|t| t.date.is_some_and(|d| range.contains(d)))
            .map(|t| &t.id)
            .collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn bucket_order_follows_collection_order() {
        let range = week_range(date(6));
        let days = bin_tasks(&range, &sample_tasks());

        let wednesday: Vec<&str> = days[2].task_ids().map(TaskId::as_str).collect();
        assert_eq!(wednesday, vec!["t1", "t5"]);
        assert_eq!(days[2].tasks[1].coordinate, Coordinate::new(2, 1));
        assert_eq!(days[0].tasks[0].id.as_str(), "t2");
    }

    #[test]
    fn binning_is_idempotent() {
        let range = week_range(date(6));
        let tasks = sample_tasks();

        assert_eq!(bin_tasks(&range, &tasks), bin_tasks(&range, &tasks));
    }

    #[test]
    fn locate_and_backlog_keys() {
        let range = week_range(date(6));
        let tasks = sample_tasks();
        let days = bin_tasks(&range, &tasks);

        assert_eq!(locate(&days, &TaskId::from("t5")), Some(Coordinate::new(2, 1)));
        assert_eq!(locate(&days, &TaskId::from("t4")), None);

        let backlog = backlog_entries(&[Task::new("b0", "x", None), Task::new("b1", "y", None)]);
        assert_eq!(backlog[1].key, "footer-task-1");
        assert_eq!(backlog[1].position, 1);
    }
}
