//! Headless runs of an ordered action list.
//!
//! `jumplink FILE --batch toc,sources,references,link,apply` runs the same
//! session actions as the terminal UI, stops at the first failure and writes
//! the result only when every action succeeded.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::{info, warn};

use crate::perf::ActionOrigin;
use crate::session::{Action, Outcome, Session, Settings};

/// Where the processed document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// `-` means stdout, anything else is a file path.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Self::Stdout
        } else {
            Self::File(arg.to_path_buf())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Batch name of the action (`toc`, `sources`, ...).
    pub action: String,
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub input: PathBuf,
    /// Written file, `None` for stdout or when nothing was written.
    pub output: Option<PathBuf>,
    pub written: bool,
    pub settings: Settings,
    pub steps: Vec<StepReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|step| step.ok)
    }

    /// One line per step followed by the output line.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for step in &self.steps {
            let status = if step.ok { "ok" } else { "error" };
            let _ = writeln!(text, "[{status}] {}: {}", step.action, step.message);
        }
        match (&self.output, self.written) {
            (Some(path), true) => {
                let _ = writeln!(text, "Wrote {}", path.display());
            }
            (None, true) => {}
            (_, false) => text.push_str("Nothing written.\n"),
        }
        text
    }

    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize batch report")
    }
}

/// Batch name of an action, as accepted by `--batch`.
pub fn action_name(action: Action) -> String {
    action
        .to_possible_value()
        .map_or_else(|| format!("{action:?}"), |value| value.get_name().to_string())
}

/// Run `actions` in order on `session`. Stops after the first failing
/// action, whose error is the last step.
pub fn run_actions(session: &mut Session, actions: &[Action]) -> Vec<StepReport> {
    let mut steps = Vec::with_capacity(actions.len());
    for &action in actions {
        let name = action_name(action);
        let _scope = crate::perf::scope("batch.action").with_detail(name.clone());
        match session.run(action) {
            Ok(outcome) => {
                let message = outcome.to_string();
                info!(action = %name, "{message}");
                crate::perf::log_action(ActionOrigin::Batch, &name, Ok(&message));
                steps.push(StepReport {
                    action: name,
                    ok: true,
                    message,
                    outcome: Some(outcome),
                });
            }
            Err(err) => {
                let message = err.to_string();
                warn!(action = %name, error = %message, "batch action failed");
                crate::perf::log_action(ActionOrigin::Batch, &name, Err(&message));
                steps.push(StepReport {
                    action: name,
                    ok: false,
                    message,
                    outcome: None,
                });
                break;
            }
        }
    }
    steps
}

/// Process `content` read from `input` and write the result to `output`.
///
/// The report is returned even when an action fails; only I/O problems are
/// errors.
///
/// # Errors
///
/// Fails when the output cannot be written.
pub fn run_batch(
    input: &Path,
    content: String,
    settings: Settings,
    actions: &[Action],
    output: &OutputTarget,
) -> Result<BatchReport> {
    let mut session = Session::new(content, settings);
    let steps = run_actions(&mut session, actions);
    let mut report = BatchReport {
        input: input.to_path_buf(),
        output: match output {
            OutputTarget::Stdout => None,
            OutputTarget::File(path) => Some(path.clone()),
        },
        written: false,
        settings: session.settings().clone(),
        steps,
    };
    if !report.succeeded() {
        return Ok(report);
    }

    match output {
        OutputTarget::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(session.content().as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")?;
        }
        OutputTarget::File(path) => {
            std::fs::write(path, session.content())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "batch output written");
        }
    }
    report.written = true;
    Ok(report)
}
