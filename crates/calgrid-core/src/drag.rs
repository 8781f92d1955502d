//! Drag-and-drop reassignment of tasks between day cells and the backlog.
//!
//! The engine only ever mutates the [`TaskSet`]; buckets are rebuilt by the
//! caller afterwards. Day targets resolve against the days rendered when
//! the drop happens, so a drag may span navigation. Position indices are read after the dragged task has been removed from
//! its source and are clamped to the destination length.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::binner::{CalendarDay, Coordinate, locate};
use crate::error::CalendarError;
use crate::task::{Task, TaskId, TaskSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DropTarget {
    Day { day_index: usize, position: usize },
    Backlog { position: Option<usize> },
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day {
                day_index,
                position,
            } => write!(f, "day:{day_index}:{position}"),
            Self::Backlog { position: Some(p) } => write!(f, "backlog:{p}"),
            Self::Backlog { position: None } => f.write_str("backlog"),
        }
    }
}

impl FromStr for DropTarget {
    type Err = anyhow::Error;

    /// Accepts `day:I:J`, `backlog` and `backlog:J`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        match parts.next() {
            Some("day") => {
                let day_index = parts
                    .next()
                    .ok_or_else(|| anyhow!("expected day:INDEX:POSITION, got: {s}"))?
                    .parse()
                    .context("invalid day index")?;
                let position = parts
                    .next()
                    .map(str::parse)
                    .transpose()
                    .context("invalid position")?
                    .unwrap_or(0);
                Ok(Self::Day {
                    day_index,
                    position,
                })
            }
            Some("backlog") => {
                let position = parts
                    .next()
                    .map(str::parse)
                    .transpose()
                    .context("invalid backlog position")?;
                Ok(Self::Backlog { position })
            }
            _ => Err(anyhow!("unknown drop target: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DragSource {
    Day(Coordinate),
    Backlog(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MoveKind {
    WithinDay,
    BetweenDays,
    ToBacklog,
    FromBacklog,
    WithinBacklog,
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WithinDay => "within-day",
            Self::BetweenDays => "between-days",
            Self::ToBacklog => "to-backlog",
            Self::FromBacklog => "from-backlog",
            Self::WithinBacklog => "within-backlog",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Moved { task: TaskId, kind: MoveKind },
    /// Dropped where it already was; nothing changed.
    NoOp,
    /// Aborted, released outside a target, or not committed.
    Cancelled,
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    task: TaskId,
    source: DragSource,
    target: Option<DropTarget>,
}

#[derive(Debug, Clone, Default)]
pub struct DragReorderEngine {
    active: Option<ActiveDrag>,
}

impl DragReorderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_task(&self) -> Option<&TaskId> {
        self.active.as_ref().map(|drag| &drag.task)
    }

    pub fn hovered_target(&self) -> Option<DropTarget> {
        self.active.as_ref().and_then(|drag| drag.target)
    }

    #[tracing::instrument(skip(self, task, days, backlog), fields(task = %task))]
    pub fn drag_start(
        &mut self,
        task: &TaskId,
        days: &[CalendarDay],
        backlog: &[Task],
    ) -> Result<DragSource, CalendarError> {
        if let Some(active) = &self.active {
            warn!(active = %active.task, "rejecting concurrent drag");
            return Err(CalendarError::ConcurrentDragRejected {
                active: active.task.clone(),
                requested: task.clone(),
            });
        }

        let source = if let Some(coordinate) = locate(days, task) {
            DragSource::Day(coordinate)
        } else if let Some(position) = backlog.iter().position(|t| &t.id == task) {
            DragSource::Backlog(position)
        } else {
            return Err(CalendarError::TaskNotFound(task.clone()));
        };

        debug!(?source, "drag started");
        self.active = Some(ActiveDrag {
            task: task.clone(),
            source,
            target: None,
        });
        Ok(source)
    }

    /// Records the hovered target; `None` means the pointer is over nothing
    /// droppable. Ignored when no drag is active.
    pub fn drag_over(&mut self, target: Option<DropTarget>) {
        if let Some(active) = self.active.as_mut()
            && active.target != target
        {
            debug!(task = %active.task, target = ?target, "drag over");
            active.target = target;
        }
    }

    /// Abandons the active drag, if any. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.active.take();
        if let Some(drag) = &cancelled {
            debug!(task = %drag.task, "drag cancelled");
        }
        cancelled.is_some()
    }

    /// Commits or abandons the active drag. `days` is what is rendered at
    /// the moment of the drop.
    #[tracing::instrument(skip(self, days, tasks))]
    pub fn drag_end(
        &mut self,
        commit: bool,
        days: &[CalendarDay],
        tasks: &mut TaskSet,
    ) -> Result<DragOutcome, CalendarError> {
        let drag = self.active.take().ok_or(CalendarError::NoActiveDrag)?;

        if !commit {
            debug!(task = %drag.task, "drag ended without commit");
            return Ok(DragOutcome::Cancelled);
        }

        let Some(target) = drag.target else {
            debug!(task = %drag.task, "dropped outside any target");
            return Ok(DragOutcome::Cancelled);
        };

        match target {
            DropTarget::Day {
                day_index,
                position,
            } => {
                let Some(date) = days.get(day_index).map(|day| day.date) else {
                    warn!(task = %drag.task, day_index, "drop target outside rendered range");
                    return Ok(DragOutcome::Cancelled);
                };
                drop_on_day(&drag, date, position, tasks)
            }
            DropTarget::Backlog { position } => drop_on_backlog(&drag, position, tasks),
        }
    }
}

fn drop_on_day(
    drag: &ActiveDrag,
    date: NaiveDate,
    position: usize,
    tasks: &mut TaskSet,
) -> Result<DragOutcome, CalendarError> {
    let kind = match drag.source {
        DragSource::Day(_) => {
            let (current_date, current_position) = tasks
                .day_position(&drag.task)
                .ok_or_else(|| CalendarError::TaskNotFound(drag.task.clone()))?;

            if current_date == date {
                let last = tasks.count_on(date).saturating_sub(1);
                if position.min(last) == current_position {
                    debug!(task = %drag.task, "drop on current position");
                    return Ok(DragOutcome::NoOp);
                }
                MoveKind::WithinDay
            } else {
                MoveKind::BetweenDays
            }
        }
        DragSource::Backlog(_) => MoveKind::FromBacklog,
    };

    let mut task = tasks
        .take(&drag.task)
        .ok_or_else(|| CalendarError::TaskNotFound(drag.task.clone()))?;
    task.date = Some(date);
    tasks.insert_scheduled(task, position);

    info!(task = %drag.task, %date, position, ?kind, "moved task");
    Ok(DragOutcome::Moved {
        task: drag.task.clone(),
        kind,
    })
}

fn drop_on_backlog(
    drag: &ActiveDrag,
    position: Option<usize>,
    tasks: &mut TaskSet,
) -> Result<DragOutcome, CalendarError> {
    let kind = match drag.source {
        DragSource::Backlog(_) => {
            let current = tasks
                .backlog_position(&drag.task)
                .ok_or_else(|| CalendarError::TaskNotFound(drag.task.clone()))?;
            let last = tasks.backlog().len().saturating_sub(1);
            if position.unwrap_or(last).min(last) == current {
                debug!(task = %drag.task, "drop on current backlog position");
                return Ok(DragOutcome::NoOp);
            }
            MoveKind::WithinBacklog
        }
        DragSource::Day(_) => MoveKind::ToBacklog,
    };

    let task = tasks
        .take(&drag.task)
        .ok_or_else(|| CalendarError::TaskNotFound(drag.task.clone()))?;
    tasks.insert_backlog(task, position);

    info!(task = %drag.task, position = ?position, ?kind, "moved task");
    Ok(DragOutcome::Moved {
        task: drag.task.clone(),
        kind,
    })
}

/// The pointer-gesture lifecycle any drag transport drives.
pub trait DragLifecycle {
    fn drag_start(&mut self, task: &TaskId) -> Result<(), CalendarError>;

    fn drag_over(&mut self, target: Option<DropTarget>);

    fn drag_end(&mut self, commit: bool) -> Result<DragOutcome, CalendarError>;

    fn cancel_drag(&mut self);
}

/// Transport-neutral drag events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Start(TaskId),
    Over(Option<DropTarget>),
    End { commit: bool },
    Cancel,
}

/// Feeds one event into a lifecycle. Only `End` produces an outcome.
pub fn dispatch_drag_event<L>(
    lifecycle: &mut L,
    event: DragEvent,
) -> Result<Option<DragOutcome>, CalendarError>
where
    L: DragLifecycle + ?Sized,
{
    match event {
        DragEvent::Start(task) => lifecycle.drag_start(&task).map(|()| None),
        DragEvent::Over(target) => {
            lifecycle.drag_over(target);
            Ok(None)
        }
        DragEvent::End { commit } => lifecycle.drag_end(commit).map(Some),
        DragEvent::Cancel => {
            lifecycle.cancel_drag();
            Ok(None)
        }
    }
}
