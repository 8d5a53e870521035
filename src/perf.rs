//! Timing scopes and the render debug log.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: LazyLock<Mutex<DebugLog>> = LazyLock::new(|| Mutex::new(DebugLog::new()));

/// Reports its lifetime when dropped, if timing is enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    detail: Option<String>,
    start: Instant,
}

impl Scope {
    /// Tag the timing with what was being processed, e.g. an action name.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        let detail = self.detail.as_deref().unwrap_or_default();
        tracing::info!(target: "jumplink::perf", scope = self.name, detail, elapsed_ms, "timing");
        match &self.detail {
            Some(detail) => log_event(self.name, format!("{detail} {elapsed_ms:.2} ms")),
            None => log_event(self.name, format!("{elapsed_ms:.2} ms")),
        }
    }
}

/// Where an action was triggered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOrigin {
    Ui,
    Batch,
}

impl ActionOrigin {
    const fn label(self) -> &'static str {
        match self {
            Self::Ui => "ui",
            Self::Batch => "batch",
        }
    }
}

#[derive(Debug)]
struct DebugLog {
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl DebugLog {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            writer: None,
        }
    }
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        detail: None,
        start: Instant::now(),
    }
}

/// Start writing render events to `path`, or stop with `None`.
///
/// # Errors
///
/// Fails when the log file cannot be created.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut log = DEBUG_LOG.lock().expect("debug log lock poisoned");
    log.writer = None;
    if let Some(path) = path {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "jumplink render debug log start")?;
        writer.flush()?;
        log.start = Instant::now();
        log.writer = Some(writer);
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    DEBUG_LOG
        .lock()
        .expect("debug log lock poisoned")
        .writer
        .is_some()
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut log = DEBUG_LOG.lock().expect("debug log lock poisoned");
    let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
    if let Some(writer) = log.writer.as_mut() {
        let _ = writeln!(writer, "[{elapsed_ms:>10.3} ms] {name}: {}", detail.as_ref());
        let _ = writer.flush();
    }
}

/// Record a document action and its alert text in the debug log.
pub fn log_action(origin: ActionOrigin, action: &str, outcome: Result<&str, &str>) {
    let (status, message) = match outcome {
        Ok(message) => ("ok", message),
        Err(message) => ("error", message),
    };
    log_event(
        "session.action",
        format!("origin={} action={action} status={status} {message}", origin.label()),
    );
}

/// Record a content change with its size, so reloads and edits line up with
/// the renders that follow.
pub fn log_content(kind: &str, bytes: usize, modified: bool) {
    log_event("session.content", format!("kind={kind} bytes={bytes} modified={modified}"));
}
