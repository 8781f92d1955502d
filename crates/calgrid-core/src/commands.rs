use std::io::Write;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::board::CalendarTasks;
use crate::cli::Command;
use crate::datetime::parse_date_arg;
use crate::drag::{DragEvent, DragOutcome, DropTarget, dispatch_drag_event};
use crate::error::CalendarError;
use crate::navigation::CalendarView;
use crate::render::Renderer;
use crate::task::TaskId;
use crate::taskfile::write_json;

/// One step of a `replay` script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    NextWeek,
    PrevWeek,
    NextMonth,
    PrevMonth,
    Today,
    Select(String),
    Deselect,
    Start(TaskId),
    Over(Option<DropTarget>),
    Drop,
    Cancel,
    Move(TaskId, DropTarget),
    Export,
    Show,
}

impl FromStr for ReplayStep {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("empty replay step"))?
            .to_ascii_lowercase();
        let args: Vec<&str> = words.collect();

        let step = match (verb.as_str(), args.as_slice()) {
            ("next-week", []) => Self::NextWeek,
            ("prev-week", []) => Self::PrevWeek,
            ("next-month", []) => Self::NextMonth,
            ("prev-month", []) => Self::PrevMonth,
            ("today", []) => Self::Today,
            ("select", [date]) => Self::Select((*date).to_string()),
            ("deselect", []) => Self::Deselect,
            ("start", [id]) => Self::Start(TaskId::from(*id)),
            ("over", ["none"]) => Self::Over(None),
            ("over", [target]) => Self::Over(Some(target.parse()?)),
            ("drop", []) => Self::Drop,
            ("cancel", []) => Self::Cancel,
            ("move", [id, target]) => Self::Move(TaskId::from(*id), target.parse()?),
            ("export", []) => Self::Export,
            ("show", []) => Self::Show,
            _ => return Err(anyhow!("unrecognized replay step: {s}")),
        };
        Ok(step)
    }
}

#[instrument(skip(board, renderer, out, diag))]
pub fn dispatch<O: Write, E: Write>(
    board: &mut CalendarTasks,
    renderer: &Renderer,
    command: &Command,
    today: NaiveDate,
    out: &mut O,
    diag: &mut E,
) -> anyhow::Result<()> {
    match command {
        Command::Show { month } => cmd_show(board, renderer, *month, today, out),
        Command::Export => cmd_export(board, out),
        Command::Snapshot => cmd_snapshot(board, out),
        Command::Replay { steps } => cmd_replay(board, renderer, steps, today, out, diag),
    }
}

fn cmd_show<O: Write>(
    board: &mut CalendarTasks,
    renderer: &Renderer,
    month: bool,
    today: NaiveDate,
    out: &mut O,
) -> anyhow::Result<()> {
    if month {
        board.set_view(CalendarView::Month);
    }
    renderer.render(out, &board.snapshot(), today)
}

fn cmd_export<O: Write>(board: &CalendarTasks, out: &mut O) -> anyhow::Result<()> {
    write_json(out, board.tasks())
}

fn cmd_snapshot<O: Write>(board: &CalendarTasks, out: &mut O) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, &board.snapshot())?;
    writeln!(out)?;
    Ok(())
}

#[instrument(skip(board, renderer, steps, out, diag), fields(steps = steps.len()))]
fn cmd_replay<O: Write, E: Write>(
    board: &mut CalendarTasks,
    renderer: &Renderer,
    steps: &[String],
    today: NaiveDate,
    out: &mut O,
    diag: &mut E,
) -> anyhow::Result<()> {
    let steps = steps
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            raw.parse::<ReplayStep>()
                .with_context(|| format!("replay step {} is invalid", idx + 1))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for (idx, step) in steps.iter().enumerate() {
        debug!(step = idx + 1, ?step, "applying replay step");
        match apply_step(board, renderer, step, today, out, diag) {
            Ok(()) => {}
            Err(err) => match err.downcast_ref::<CalendarError>() {
                Some(rejected) => {
                    warn!(step = idx + 1, error = %rejected, "replay step rejected");
                    writeln!(diag, "warning: step {}: {rejected}", idx + 1)?;
                }
                None => return Err(err),
            },
        }
    }

    info!(steps = steps.len(), "replay finished");
    renderer.render(out, &board.snapshot(), today)
}

fn apply_step<O: Write, E: Write>(
    board: &mut CalendarTasks,
    renderer: &Renderer,
    step: &ReplayStep,
    today: NaiveDate,
    out: &mut O,
    diag: &mut E,
) -> anyhow::Result<()> {
    match step {
        ReplayStep::NextWeek => board.on_next_week(),
        ReplayStep::PrevWeek => board.on_prev_week(),
        ReplayStep::NextMonth => board.on_next_month(),
        ReplayStep::PrevMonth => board.on_prev_month(),
        ReplayStep::Today => board.on_today(today),
        ReplayStep::Select(raw) => {
            let date = parse_date_arg(raw, today)?;
            board.on_click_day(date)?;
        }
        ReplayStep::Deselect => board.clear_selection(),
        ReplayStep::Start(task) => {
            dispatch_drag_event(board, DragEvent::Start(task.clone()))?;
        }
        ReplayStep::Over(target) => {
            dispatch_drag_event(board, DragEvent::Over(*target))?;
        }
        ReplayStep::Drop => {
            let outcome = dispatch_drag_event(board, DragEvent::End { commit: true })?;
            report_outcome(diag, outcome)?;
        }
        ReplayStep::Cancel => {
            dispatch_drag_event(board, DragEvent::Cancel)?;
        }
        ReplayStep::Move(task, target) => {
            dispatch_drag_event(board, DragEvent::Start(task.clone()))?;
            dispatch_drag_event(board, DragEvent::Over(Some(*target)))?;
            let outcome = dispatch_drag_event(board, DragEvent::End { commit: true })?;
            report_outcome(diag, outcome)?;
        }
        ReplayStep::Export => cmd_export(board, out)?,
        ReplayStep::Show => renderer.render(out, &board.snapshot(), today)?,
    }
    Ok(())
}

fn report_outcome<E: Write>(diag: &mut E, outcome: Option<DragOutcome>) -> anyhow::Result<()> {
    match outcome {
        Some(DragOutcome::Moved { task, kind }) => {
            writeln!(diag, "moved {task} ({kind})")?;
        }
        Some(DragOutcome::NoOp) => writeln!(diag, "drop left the arrangement unchanged")?,
        Some(DragOutcome::Cancelled) | None => writeln!(diag, "drag cancelled")?,
    }
    Ok(())
}
