pub mod binner;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod date_range;
pub mod datetime;
pub mod drag;
pub mod error;
pub mod navigation;
pub mod render;
pub mod task;
pub mod taskfile;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::board::{
  CalendarSnapshot,
  CalendarTasks
};
pub use crate::error::CalendarError;
pub use crate::task::{
  Task,
  TaskId,
  TaskSet
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting calgrid"
  );

  let mut cfg =
    config::CalendarConfig::load(
      cli.config.as_deref()
    )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(cli::ConfigOverride::into_pair)
  )?;

  let tz = datetime::resolve_timezone(
    cfg.timezone.as_deref()
  );
  let today = datetime::today_in(tz);
  let anchor = match cli.anchor.as_deref()
  {
    | Some(raw) => {
      datetime::parse_date_arg(raw, today)
        .context("invalid --anchor")?
    }
    | None => today
  };
  debug!(%tz, %today, %anchor, "resolved anchor");

  let scheduled =
    taskfile::load_tasks(&cli.tasks, tz)?;
  let backlog = match cli.backlog.as_deref()
  {
    | Some(path) => {
      taskfile::load_tasks(path, tz)?
    }
    | None => Vec::new()
  };
  let tasks =
    TaskSet::new(scheduled, backlog)
      .context(
        "failed to build task collection"
      )?;

  let mut board = CalendarTasks::new(
    tasks,
    anchor,
    cfg.navigation
  );
  let renderer =
    render::Renderer::new(&cfg.display);

  let stdout = io::stdout();
  let mut out = stdout.lock();
  let stderr = io::stderr();
  let mut diag = stderr.lock();

  commands::dispatch(
    &mut board,
    &renderer,
    &cli.command,
    today,
    &mut out,
    &mut diag
  )?;
  out.flush()?;

  info!("done");
  Ok(())
}
