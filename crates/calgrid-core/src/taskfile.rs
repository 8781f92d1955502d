use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::datetime::parse_task_date;
use crate::task::{Task, TaskId, TaskSet};

/// A task as written by callers: id and date are optional and the date may
/// be any format `parse_task_date` understands.
#[derive(Debug, Clone, Deserialize)]
struct TaskRecord {
    #[serde(default)]
    id: Option<TaskId>,

    #[serde(default)]
    date: Option<String>,

    #[serde(default)]
    title: String,

    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

impl TaskRecord {
    fn into_task(self, tz: Tz) -> anyhow::Result<Task> {
        let id = self.id.unwrap_or_else(|| {
            let generated = TaskId::generate();
            debug!(id = %generated, title = %self.title, "assigned id to task record");
            generated
        });

        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_task_date(raw, tz).with_context(|| format!("task {id} has a bad date"))?,
            ),
        };

        Ok(Task {
            id,
            date,
            title: self.title,
            extra: self.extra,
        })
    }
}

/// Loads tasks from a JSON array or a JSON-lines file.
#[tracing::instrument(skip(tz), fields(file = %path.display()))]
pub fn load_tasks(path: &Path, tz: Tz) -> anyhow::Result<Vec<Task>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_tasks(&text, tz).with_context(|| format!("failed to load {}", path.display()))
}

pub fn parse_tasks(text: &str, tz: Tz) -> anyhow::Result<Vec<Task>> {
    let records: Vec<TaskRecord> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).context("failed parsing JSON array")?
    } else {
        let mut out = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record = serde_json::from_str(trimmed)
                .with_context(|| format!("failed parsing line {}", idx + 1))?;
            out.push(record);
        }
        out
    };

    let tasks = records
        .into_iter()
        .map(|record| record.into_task(tz))
        .collect::<anyhow::Result<Vec<_>>>()?;
    debug!(count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

pub fn write_json<W: Write>(mut writer: W, tasks: &TaskSet) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, tasks)?;
    writeln!(writer)?;
    Ok(())
}
