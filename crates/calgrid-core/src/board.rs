//! `CalendarTasks` ties navigation, binning and dragging together behind the
//! callback surface a calendar view consumes.
//!
//! Every operation recomputes the day buckets before it returns, so a
//! renderer never sees buckets from before a transition or commit.

use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};

use crate::binner::{BacklogEntry, CalendarDay, Coordinate, backlog_entries, bin_tasks};
use crate::drag::{DragLifecycle, DragOutcome, DragReorderEngine, DropTarget};
use crate::error::CalendarError;
use crate::navigation::{CalendarView, NavigationController, NavigationOptions, NavigationState};
use crate::task::{Task, TaskId, TaskSet};

type ChangeCallback = Box<dyn FnMut(&TaskSet)>;

pub struct CalendarTasks {
    tasks: TaskSet,
    navigation: NavigationController,
    engine: DragReorderEngine,
    days: Vec<CalendarDay>,
    backlog: Vec<BacklogEntry>,
    on_change: Option<ChangeCallback>,
}

impl fmt::Debug for CalendarTasks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalendarTasks")
            .field("tasks", &self.tasks)
            .field("navigation", &self.navigation)
            .field("engine", &self.engine)
            .field("days", &self.days.len())
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl CalendarTasks {
    pub fn new(tasks: TaskSet, today: NaiveDate, options: NavigationOptions) -> Self {
        let mut board = Self {
            tasks,
            navigation: NavigationController::new(today, options),
            engine: DragReorderEngine::new(),
            days: Vec::new(),
            backlog: Vec::new(),
            on_change: None,
        };
        board.refresh();
        board
    }

    /// Registers the callback that receives the new arrangement after each
    /// committed move.
    pub fn set_on_change(&mut self, callback: impl FnMut(&TaskSet) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    pub fn into_tasks(self) -> TaskSet {
        self.tasks
    }

    pub fn navigation(&self) -> &NavigationState {
        self.navigation.state()
    }

    pub fn controller(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn engine(&self) -> &DragReorderEngine {
        &self.engine
    }

    pub fn days(&self) -> &[CalendarDay] {
        &self.days
    }

    pub fn backlog(&self) -> &[BacklogEntry] {
        &self.backlog
    }

    pub fn on_next_week(&mut self) {
        self.navigation.next_week();
        self.refresh();
    }

    pub fn on_prev_week(&mut self) {
        self.navigation.prev_week();
        self.refresh();
    }

    pub fn on_next_month(&mut self) {
        self.navigation.next_month();
        self.refresh();
    }

    pub fn on_prev_month(&mut self) {
        self.navigation.prev_month();
        self.refresh();
    }

    pub fn on_today(&mut self, today: NaiveDate) {
        self.navigation.go_to(today);
        self.refresh();
    }

    pub fn on_click_day(&mut self, date: NaiveDate) -> Result<(), CalendarError> {
        self.navigation.select_day(date)
    }

    pub fn clear_selection(&mut self) {
        self.navigation.clear_selection();
    }

    pub fn set_view(&mut self, view: CalendarView) {
        self.navigation.set_view(view);
        self.refresh();
    }

    pub fn snapshot(&self) -> CalendarSnapshot {
        let by_id: HashMap<&TaskId, &Task> = self
            .tasks
            .scheduled()
            .iter()
            .chain(self.tasks.backlog().iter())
            .map(|task| (&task.id, task))
            .collect();
        let title_of = |id: &TaskId| {
            by_id
                .get(id)
                .map(|task| task.title.clone())
                .unwrap_or_default()
        };

        let state = self.navigation.state();
        let header = HeaderSnapshot {
            title: self.navigation.title(),
            view: state.active_view,
            current_month: state.current_month,
            current_week: state.current_week,
            week_number: self.navigation.week_number(),
            selected_date: state.selected_date,
        };

        let days = self
            .days
            .iter()
            .map(|day| DaySnapshot {
                key: day.key.clone(),
                date: day.date,
                weekday: day.date.weekday().to_string(),
                selected: state.selected_date == Some(day.date),
                tasks: day
                    .tasks
                    .iter()
                    .map(|binned| TaskCard {
                        key: binned.key.clone(),
                        id: binned.id.clone(),
                        title: title_of(&binned.id),
                        coordinate: binned.coordinate,
                    })
                    .collect(),
            })
            .collect();

        let backlog = self
            .backlog
            .iter()
            .map(|entry| BacklogCard {
                key: entry.key.clone(),
                id: entry.id.clone(),
                title: title_of(&entry.id),
                position: entry.position,
            })
            .collect();

        CalendarSnapshot {
            header,
            days,
            backlog,
            dragging: self.engine.active_task().cloned(),
            hovering: self.engine.hovered_target(),
        }
    }

    fn refresh(&mut self) {
        let range = self.navigation.active_range();
        self.days = bin_tasks(&range, self.tasks.scheduled());
        self.backlog = backlog_entries(self.tasks.backlog());
        debug!(
            start = %range.start(),
            end = %range.end(),
            backlog = self.backlog.len(),
            "recomputed buckets"
        );
    }
}

impl DragLifecycle for CalendarTasks {
    fn drag_start(&mut self, task: &TaskId) -> Result<(), CalendarError> {
        self.engine
            .drag_start(task, &self.days, self.tasks.backlog())
            .map(|_| ())
    }

    fn drag_over(&mut self, target: Option<DropTarget>) {
        self.engine.drag_over(target);
    }

    fn drag_end(&mut self, commit: bool) -> Result<DragOutcome, CalendarError> {
        let outcome = self.engine.drag_end(commit, &self.days, &mut self.tasks)?;
        if let DragOutcome::Moved { task, kind } = &outcome {
            self.refresh();
            info!(task = %task, ?kind, "committed drag");
            if let Some(callback) = self.on_change.as_mut() {
                callback(&self.tasks);
            }
        }
        Ok(outcome)
    }

    fn cancel_drag(&mut self) {
        self.engine.cancel();
    }
}

/// Everything a rendering delegate receives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarSnapshot {
    pub header: HeaderSnapshot,
    pub days: Vec<DaySnapshot>,
    pub backlog: Vec<BacklogCard>,
    pub dragging: Option<TaskId>,
    pub hovering: Option<DropTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderSnapshot {
    pub title: String,
    pub view: CalendarView,
    pub current_month: NaiveDate,
    pub current_week: NaiveDate,
    pub week_number: u32,
    pub selected_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySnapshot {
    pub key: String,
    pub date: NaiveDate,
    pub weekday: String,
    pub selected: bool,
    pub tasks: Vec<TaskCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskCard {
    pub key: String,
    pub id: TaskId,
    pub title: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacklogCard {
    pub key: String,
    pub id: TaskId,
    pub title: String,
    pub position: usize,
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::drag::{DragEvent, dispatch_drag_event};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
    }

    fn board() -> CalendarTasks {
        let tasks = TaskSet::new(
            vec![
                Task::new("t1", "standup", Some(date(6))),
                Task::new("t2", "review", Some(date(13))),
            ],
            vec![Task::new("b1", "carry over", None)],
        )
        .expect("valid set");
        CalendarTasks::new(tasks, date(6), NavigationOptions::default())
    }

    #[test]
    fn navigation_rebins_the_visible_week() {
        let mut board = board();
        assert_eq!(board.days()[2].tasks[0].id.as_str(), "t1");
        assert!(board.days().iter().all(|d| d.task_ids().all(|id| id.as_str() != "t2")));

        board.on_next_week();
        assert_eq!(board.days()[2].date, date(13));
        assert_eq!(board.days()[2].tasks[0].id.as_str(), "t2");

        board.on_prev_week();
        board.on_next_month();
        assert_eq!(board.days().len(), 35);
        assert_eq!(board.navigation().active_view, CalendarView::Month);
    }

    #[test]
    fn drag_to_backlog_through_the_event_transport() {
        let mut board = board();
        let changes = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&changes);
        board.set_on_change(move |_| *seen.borrow_mut() += 1);

        for event in [
            DragEvent::Start(TaskId::from("t1")),
            DragEvent::Over(Some(DropTarget::Backlog { position: None })),
        ] {
            assert_eq!(dispatch_drag_event(&mut board, event).expect("event"), None);
        }
        let snapshot = board.snapshot();
        assert_eq!(snapshot.dragging, Some(TaskId::from("t1")));
        assert_eq!(snapshot.hovering, Some(DropTarget::Backlog { position: None }));

        let outcome = dispatch_drag_event(&mut board, DragEvent::End { commit: true })
            .expect("drop");
        assert!(matches!(outcome, Some(DragOutcome::Moved { .. })));

        assert!(board.days()[2].tasks.is_empty());
        let backlog: Vec<&str> = board.backlog().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(backlog, vec!["b1", "t1"]);
        assert_eq!(board.tasks().get(&TaskId::from("t1")).and_then(|t| t.date), None);
        assert_eq!(*changes.borrow(), 1);
    }

    #[test]
    fn no_op_and_cancel_do_not_notify() {
        let mut board = board();
        let changes = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&changes);
        board.set_on_change(move |_| *seen.borrow_mut() += 1);
        let before = board.snapshot();

        board.drag_start(&TaskId::from("t1")).expect("start");
        board.drag_over(Some(DropTarget::Day {
            day_index: 2,
            position: 0,
        }));
        assert_eq!(board.drag_end(true).expect("end"), DragOutcome::NoOp);

        dispatch_drag_event(&mut board, DragEvent::Start(TaskId::from("b1"))).expect("start");
        dispatch_drag_event(&mut board, DragEvent::Cancel).expect("cancel");

        assert_eq!(board.snapshot(), before);
        assert_eq!(*changes.borrow(), 0);
    }

    #[test]
    fn drag_spanning_navigation_drops_on_the_visible_day() {
        let mut board = board();
        board.drag_start(&TaskId::from("t1")).expect("start");
        board.on_next_week();
        board.drag_over(Some(DropTarget::Day {
            day_index: 0,
            position: 0,
        }));
        assert!(matches!(
            board.drag_end(true).expect("end"),
            DragOutcome::Moved { .. }
        ));
        assert_eq!(
            board.tasks().get(&TaskId::from("t1")).and_then(|t| t.date),
            Some(date(11))
        );
        assert_eq!(board.days()[0].tasks[0].id.as_str(), "t1");

        board.drag_start(&TaskId::from("t1")).expect("start");
        board.set_view(CalendarView::Month);
        board.on_next_month();
        let target = board.days()[20].date;
        board.drag_over(Some(DropTarget::Day {
            day_index: 20,
            position: 0,
        }));
        assert!(matches!(
            board.drag_end(true).expect("end"),
            DragOutcome::Moved { .. }
        ));
        assert_eq!(
            board.tasks().get(&TaskId::from("t1")).and_then(|t| t.date),
            Some(target)
        );
        assert_eq!(board.days()[20].tasks[0].id.as_str(), "t1");
    }

    #[test]
    fn click_day_validates_against_active_range() {
        let mut board = board();
        board.on_click_day(date(8)).expect("in range");
        assert!(matches!(
            board.on_click_day(date(20)),
            Err(CalendarError::InvalidSelection { .. })
        ));

        let snapshot = board.snapshot();
        assert_eq!(snapshot.header.selected_date, Some(date(8)));
        assert!(snapshot.days[4].selected);
        assert_eq!(snapshot.days[4].weekday, "Fri");
        assert_eq!(snapshot.header.week_number, 10);

        board.clear_selection();
        assert!(board.snapshot().days.iter().all(|day| !day.selected));
    }

    #[test]
    fn snapshot_carries_titles_and_keys() {
        let board = board();
        let snapshot = board.snapshot();

        let card = &snapshot.days[2].tasks[0];
        assert_eq!(card.title, "standup");
        assert_eq!(card.key, "day-2-task-0");
        assert_eq!(card.coordinate, Coordinate::new(2, 0));
        assert_eq!(snapshot.backlog[0].title, "carry over");
        assert_eq!(snapshot.backlog[0].key, "footer-task-0");
        assert_eq!(snapshot.header.title, "Week 2024-03-04 - 2024-03-10");

        let json = serde_json::to_value(&snapshot).expect("serializable");
        assert_eq!(json["header"]["view"], "week");
        assert_eq!(json["days"][2]["date"], "2024-03-06");
    }
}
