//! Debounced change notification for the loaded document.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Watches one file through its parent directory, since editors often
/// replace files instead of writing them in place.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    debounce: Duration,
    pending_since: Option<Instant>,
}

impl FileWatcher {
    /// # Errors
    ///
    /// Fails when the platform watcher cannot be created or the parent
    /// directory cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths are canonical, so ours must be too.
        let path = path.as_ref();
        let target_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;
        debug!(path = %target_path.display(), "watching");

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            debounce,
            pending_since: None,
        })
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Drain pending events. Returns true once a change to the target has
    /// been quiet for the debounce interval.
    pub fn take_change_ready(&mut self) -> bool {
        let mut relevant = 0u32;
        let mut total = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total += 1;
            match event {
                Ok(event) if self.is_relevant(&event) => relevant += 1,
                Ok(event) => crate::perf::log_event(
                    "watcher.irrelevant",
                    format!("kind={:?} paths={:?}", event.kind, event.paths),
                ),
                Err(err) => warn!(error = %err, "file watcher error"),
            }
        }
        if total > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!("total={total} relevant={relevant} target={}", self.target_path.display()),
            );
        }
        if relevant > 0 {
            self.pending_since = Some(Instant::now());
        }

        match self.pending_since {
            Some(since) if since.elapsed() >= self.debounce => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name() == Some(name.as_os_str()))
        })
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use tempfile::tempdir;

    fn event(paths: Vec<PathBuf>) -> Event {
        Event {
            kind: EventKind::Any,
            paths,
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_relevance_of_event_paths() {
        let dir = tempdir().unwrap();
        let canonical_dir = dir.path().canonicalize().unwrap();
        let path = dir.path().join("bericht.html");
        std::fs::write(&path, "<p>x</p>").unwrap();
        let watcher = FileWatcher::new(&path, Duration::from_millis(10)).unwrap();

        assert!(watcher.is_relevant(&event(vec![canonical_dir.clone()])));
        assert!(watcher.is_relevant(&event(vec![canonical_dir.join("bericht.html")])));
        assert!(!watcher.is_relevant(&event(vec![canonical_dir.join("other.html")])));
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        assert_eq!(watch_root_for(Path::new("bericht.html")), PathBuf::from("."));
    }

    #[test]
    fn test_real_file_modification_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().canonicalize().unwrap().join("watched.html");
        std::fs::write(&path, "<p>original</p>").unwrap();
        let mut watcher = FileWatcher::new(&path, Duration::from_millis(200)).unwrap();

        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, "<p>modified</p>").unwrap();

        // Poll at the event loop's cadence.
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut detected = false;
        while Instant::now() < deadline {
            if watcher.take_change_ready() {
                detected = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(250));
        }
        assert!(detected, "modification should be reported within 5 seconds");
    }
}
