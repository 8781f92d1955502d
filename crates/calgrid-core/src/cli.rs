use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// A `--set section.key=value` config override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: String,
    pub value: String,
}

impl ConfigOverride {
    pub fn into_pair(self) -> (String, String) {
        (self.key, self.value)
    }
}

impl std::str::FromStr for ConfigOverride {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((key, value)) = s.split_once('=') else {
            return Err(anyhow!("expected section.key=value, got: {s}"));
        };
        let key = key.trim().to_ascii_lowercase();
        if key.is_empty() {
            return Err(anyhow!("missing config key in override: {s}"));
        }
        Ok(Self {
            key,
            value: value.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "calgrid",
    version,
    about = "Week and month task calendar with drag-and-drop reordering",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file; overrides $CALGRID_CONFIG and the default location.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    #[arg(
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<ConfigOverride>()),
        action = ArgAction::Append
    )]
    pub overrides: Vec<ConfigOverride>,

    /// Task records as a JSON array or JSON lines.
    #[arg(long = "tasks")]
    pub tasks: PathBuf,

    /// Undated tasks shown in the backlog footer.
    #[arg(long = "backlog")]
    pub backlog: Option<PathBuf>,

    /// Date the calendar opens on: today, +Nd, -Nw, +Nm or YYYY-MM-DD.
    #[arg(long = "anchor")]
    pub anchor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Render the calendar.
    Show {
        #[arg(long = "month")]
        month: bool,
    },
    /// Print the task collection as JSON.
    Export,
    /// Print the full view snapshot as JSON.
    Snapshot,
    /// Apply navigation and drag steps in order, then print the result.
    Replay {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        steps: Vec<String>,
    },
}

/// Log level used when `RUST_LOG` is unset. Quiet flags win.
pub fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Installs the stderr subscriber; stdout carries command output only.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = default_log_level(verbose, quiet);
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| anyhow!("invalid log level {level}: {e}"))?,
    };

    let stderr_is_tty = std::io::stderr().is_terminal();
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_ansi(stderr_is_tty)
        .try_init()
    {
        debug!(error = %err, "subscriber already installed");
    }

    Ok(())
}
