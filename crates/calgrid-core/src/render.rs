use std::io::{self, IsTerminal, Write};

use chrono::{Datelike, NaiveDate};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::board::{CalendarSnapshot, DaySnapshot};
use crate::config::DisplayConfig;
use crate::navigation::CalendarView;

const BACKLOG_HEADING: &str = "Past Weeks:";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    show_week_numbers: bool,
    max_title_width: usize,
}

impl Renderer {
    pub fn new(display: &DisplayConfig) -> Self {
        Self {
            color: display.color && io::stdout().is_terminal(),
            show_week_numbers: display.show_week_numbers,
            max_title_width: display.max_title_width.max(1),
        }
    }

    /// Writes the header, one table per rendered week and the backlog footer.
    /// Week numbers follow the rendered weeks: in the header for week view,
    /// above each table for month view.
    #[tracing::instrument(skip(self, out, snapshot))]
    pub fn render<W: Write>(
        &self,
        out: &mut W,
        snapshot: &CalendarSnapshot,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let header = &snapshot.header;
        let mut line = self.paint(&header.title, "1");
        let month_view = header.view == CalendarView::Month;
        if self.show_week_numbers && !month_view {
            line.push_str(&format!("  W{:02}", header.week_number));
        }
        if let Some(selected) = header.selected_date {
            line.push_str(&format!("  selected {}", selected.format("%Y-%m-%d")));
        }
        writeln!(out, "{line}")?;
        if let Some(task) = &snapshot.dragging {
            let over = snapshot
                .hovering
                .map(|target| format!(" over {target}"))
                .unwrap_or_default();
            writeln!(out, "{}", self.paint(&format!("dragging {task}{over}"), "35"))?;
        }
        writeln!(out)?;

        for week in snapshot.days.chunks(7) {
            if self.show_week_numbers
                && month_view
                && let Some(first) = week.first()
            {
                writeln!(out, "W{:02}", first.date.iso_week().week())?;
            }
            self.write_week(out, week, today)?;
            writeln!(out)?;
        }

        writeln!(out, "{}", self.paint(BACKLOG_HEADING, "1"))?;
        if snapshot.backlog.is_empty() {
            writeln!(out, "  (empty)")?;
        }
        for card in &snapshot.backlog {
            writeln!(
                out,
                "  {} {} {}",
                self.paint(&format!("{:>2}.", card.position), "33"),
                self.truncate(display_title(&card.title, card.id.as_str())),
                self.paint(&format!("[{}]", card.id), "2"),
            )?;
        }

        Ok(())
    }

    fn write_week<W: Write>(
        &self,
        out: &mut W,
        week: &[DaySnapshot],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = week
            .iter()
            .map(|day| {
                let label = format!("{} {}", day.weekday, day.date.format("%m-%d"));
                let label = if day.selected {
                    format!("{label}*")
                } else {
                    label
                };
                if day.date == today {
                    self.paint(&label, "36")
                } else if day.selected {
                    self.paint(&label, "33")
                } else {
                    label
                }
            })
            .collect::<Vec<_>>();

        let depth = week.iter().map(|day| day.tasks.len()).max().unwrap_or(0);
        let mut rows = Vec::with_capacity(depth);
        for position in 0..depth {
            let row = week
                .iter()
                .map(|day| {
                    day.tasks
                        .get(position)
                        .map(|card| self.truncate(display_title(&card.title, card.id.as_str())))
                        .unwrap_or_default()
                })
                .collect::<Vec<_>>();
            rows.push(row);
        }

        write_table(out, headers, rows)
    }

    fn truncate(&self, text: &str) -> String {
        if UnicodeWidthStr::width(text) <= self.max_title_width {
            return text.to_string();
        }

        let budget = self.max_title_width.saturating_sub(1);
        let mut used = 0;
        let mut out = String::new();
        for ch in text.chars() {
            let width = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + width > budget {
                break;
            }
            used += width;
            out.push(ch);
        }
        out.push('…');
        out
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn display_title<'a>(title: &'a str, id: &'a str) -> &'a str {
    if title.trim().is_empty() { id } else { title }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(visible_width(header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(visible_width(cell));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write_cell(&mut writer, header, widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            write_cell(&mut writer, cell, widths[idx])?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn write_cell<W: Write>(writer: &mut W, cell: &str, width: usize) -> anyhow::Result<()> {
    let padding = width.saturating_sub(visible_width(cell));
    write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    Ok(())
}

/// Terminal columns `cell` occupies, skipping SGR colour sequences.
fn visible_width(cell: &str) -> usize {
    let mut chars = cell.chars();
    let mut width = 0;
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            chars.by_ref().find(|c| *c == 'm');
            continue;
        }
        width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }
    width
}
