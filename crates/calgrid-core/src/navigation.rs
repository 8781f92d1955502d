use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::date_range::{DateRange, add_days, month_range, shift_months, week_range};
use crate::error::CalendarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CalendarView {
    #[default]
    Week,
    Month,
}

impl CalendarView {
    pub fn as_key(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

/// How the month view turns its anchor into a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthBanding {
    /// Every week that intersects the anchor's month.
    #[default]
    FullMonth,
    /// Only the week containing the month anchor.
    AnchorWeek,
}

/// What happens to the selected day when navigation moves the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    #[default]
    Clear,
    /// Shift the selection by the same step as the anchor.
    Remap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationOptions {
    pub default_view: CalendarView,
    pub month_banding: MonthBanding,
    pub selection_policy: SelectionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub current_month: NaiveDate,
    pub current_week: NaiveDate,
    pub selected_date: Option<NaiveDate>,
    pub active_view: CalendarView,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Days(i64),
    Months(i32),
}

#[derive(Debug, Clone)]
pub struct NavigationController {
    state: NavigationState,
    options: NavigationOptions,
}

impl NavigationController {
    pub fn new(today: NaiveDate, options: NavigationOptions) -> Self {
        Self {
            state: NavigationState {
                current_month: today,
                current_week: today,
                selected_date: None,
                active_view: options.default_view,
            },
            options,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn options(&self) -> &NavigationOptions {
        &self.options
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.selected_date
    }

    pub fn active_view(&self) -> CalendarView {
        self.state.active_view
    }

    /// The date range the active view renders.
    pub fn active_range(&self) -> DateRange {
        match self.state.active_view {
            CalendarView::Week => week_range(self.state.current_week),
            CalendarView::Month => match self.options.month_banding {
                MonthBanding::FullMonth => month_range(self.state.current_month),
                MonthBanding::AnchorWeek => week_range(self.state.current_month),
            },
        }
    }

    pub fn next_week(&mut self) {
        self.shift_week(7);
    }

    pub fn prev_week(&mut self) {
        self.shift_week(-7);
    }

    pub fn next_month(&mut self) {
        self.shift_month(1);
    }

    pub fn prev_month(&mut self) {
        self.shift_month(-1);
    }

    /// Jumps both anchors to `date` (the "today" button).
    pub fn go_to(&mut self, date: NaiveDate) {
        self.state.current_week = date;
        self.state.current_month = date;
        debug!(%date, "navigated to date");
        self.reconcile_selection(None);
    }

    pub fn set_view(&mut self, view: CalendarView) {
        if self.state.active_view == view {
            return;
        }
        self.state.active_view = view;
        debug!(view = view.as_key(), "switched view");
        self.reconcile_selection(None);
    }

    pub fn select_day(&mut self, date: NaiveDate) -> Result<(), CalendarError> {
        let range = self.active_range();
        if !range.contains(date) {
            return Err(CalendarError::InvalidSelection {
                date,
                start: range.start(),
                end: range.end(),
            });
        }
        self.state.selected_date = Some(date);
        debug!(%date, "selected day");
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_date = None;
    }

    /// ISO week number of the week anchor.
    pub fn week_number(&self) -> u32 {
        self.state.current_week.iso_week().week()
    }

    pub fn title(&self) -> String {
        match self.state.active_view {
            CalendarView::Week => {
                let range = self.active_range();
                format!(
                    "Week {} - {}",
                    range.start().format("%Y-%m-%d"),
                    range.end().format("%Y-%m-%d")
                )
            }
            CalendarView::Month => self.state.current_month.format("%B %Y").to_string(),
        }
    }

    fn shift_week(&mut self, days: i64) {
        self.state.current_week = add_days(self.state.current_week, days);
        self.state.active_view = CalendarView::Week;
        debug!(current_week = %self.state.current_week, "moved week anchor");
        self.reconcile_selection(Some(Step::Days(days)));
    }

    fn shift_month(&mut self, months: i32) {
        self.state.current_month = shift_months(self.state.current_month, months);
        self.state.active_view = CalendarView::Month;
        debug!(current_month = %self.state.current_month, "moved month anchor");
        self.reconcile_selection(Some(Step::Months(months)));
    }

    fn reconcile_selection(&mut self, step: Option<Step>) {
        let Some(selected) = self.state.selected_date else {
            return;
        };
        let range = self.active_range();
        if range.contains(selected) {
            return;
        }

        let remapped = match (self.options.selection_policy, step) {
            (SelectionPolicy::Remap, Some(Step::Days(days))) => Some(add_days(selected, days)),
            (SelectionPolicy::Remap, Some(Step::Months(months))) => {
                Some(shift_months(selected, months))
            }
            _ => None,
        }
        .filter(|date| range.contains(*date));

        debug!(
            previous = %selected,
            remapped = ?remapped,
            "selection left the active range"
        );
        self.state.selected_date = remapped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn controller(today: NaiveDate) -> NavigationController {
        NavigationController::new(today, NavigationOptions::default())
    }

    #[test]
    fn week_navigation_moves_by_seven_days() {
        let mut nav = controller(date(2024, 3, 6));
        nav.next_week();
        assert_eq!(nav.state().current_week, date(2024, 3, 13));
        nav.prev_week();
        nav.prev_week();
        assert_eq!(nav.state().current_week, date(2024, 2, 28));
        assert_eq!(nav.active_range().start(), date(2024, 2, 26));
    }

    #[test]
    fn month_navigation_clamps_and_switches_view() {
        let mut nav = controller(date(2024, 1, 31));
        nav.next_month();
        assert_eq!(nav.active_view(), CalendarView::Month);
        assert_eq!(nav.state().current_month, date(2024, 2, 29));
        assert_eq!(nav.state().current_week, date(2024, 1, 31));
        assert_eq!(nav.title(), "February 2024");
        nav.prev_month();
        assert_eq!(nav.state().current_month, date(2024, 1, 29));
    }

    #[test]
    fn select_day_outside_range_is_rejected() {
        let mut nav = controller(date(2024, 3, 6));
        nav.select_day(date(2024, 3, 8)).expect("in range");

        let err = nav
            .select_day(date(2024, 3, 20))
            .expect_err("outside active week");
        assert_eq!(
            err,
            CalendarError::InvalidSelection {
                date: date(2024, 3, 20),
                start: date(2024, 3, 4),
                end: date(2024, 3, 10),
            }
        );
        assert_eq!(nav.selected_date(), Some(date(2024, 3, 8)));

        nav.clear_selection();
        assert_eq!(nav.selected_date(), None);
    }

    #[test]
    fn clear_policy_drops_selection_when_range_moves() {
        let mut nav = controller(date(2024, 3, 6));
        nav.select_day(date(2024, 3, 6)).expect("in range");
        nav.next_week();
        assert_eq!(nav.selected_date(), None);
    }

    #[test]
    fn remap_policy_shifts_selection_with_anchor() {
        let mut nav = NavigationController::new(
            date(2024, 3, 6),
            NavigationOptions {
                selection_policy: SelectionPolicy::Remap,
                ..NavigationOptions::default()
            },
        );
        nav.select_day(date(2024, 3, 8)).expect("in range");
        nav.next_week();
        assert_eq!(nav.selected_date(), Some(date(2024, 3, 15)));

        nav.next_month();
        assert_eq!(nav.selected_date(), Some(date(2024, 4, 15)));
    }

    #[test]
    fn selection_survives_when_still_in_range() {
        let mut nav = controller(date(2024, 3, 6));
        nav.set_view(CalendarView::Month);
        nav.select_day(date(2024, 3, 20)).expect("in month grid");
        nav.set_view(CalendarView::Week);
        assert_eq!(nav.selected_date(), None);

        nav.select_day(date(2024, 3, 5)).expect("in week");
        nav.set_view(CalendarView::Month);
        assert_eq!(nav.selected_date(), Some(date(2024, 3, 5)));
    }

    #[test]
    fn anchor_week_banding_renders_a_single_week_for_month_view() {
        let mut nav = NavigationController::new(
            date(2024, 3, 6),
            NavigationOptions {
                month_banding: MonthBanding::AnchorWeek,
                ..NavigationOptions::default()
            },
        );
        nav.set_view(CalendarView::Month);
        assert_eq!(nav.active_range().len(), 7);
        nav.set_view(CalendarView::Week);
        nav.next_month();
        assert_eq!(nav.active_range().start(), date(2024, 4, 1));
    }

    #[test]
    fn header_details() {
        let nav = controller(date(2024, 3, 6));
        assert_eq!(nav.week_number(), 10);
        assert_eq!(nav.title(), "Week 2024-03-04 - 2024-03-10");
    }
}
