use std::path::Path;
use std::time::Duration;

use crate::app::{App, Message, Model, ToastLevel};
use crate::watcher::FileWatcher;

impl App {
    pub(super) fn make_file_watcher(path: &Path) -> notify::Result<FileWatcher> {
        FileWatcher::new(path, Duration::from_millis(200))
    }

    /// File system work that follows a state transition.
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        file_watcher: &mut Option<FileWatcher>,
        msg: &Message,
    ) {
        match msg {
            Message::ToggleWatch => Self::apply_watch_toggle(model, file_watcher),
            // Unsaved changes win over the disk copy.
            Message::FileChanged if model.is_modified() => model.show_toast(
                ToastLevel::Warning,
                "File changed on disk. Press r to reload and discard changes",
            ),
            Message::FileChanged if model.editor_mode() => {
                model.show_toast(ToastLevel::Warning, "File changed on disk");
            }
            Message::FileChanged => Self::reload(model, false),
            Message::ForceReload => Self::reload(model, true),
            Message::Download => Self::download(model),
            _ => {}
        }
    }

    fn apply_watch_toggle(model: &mut Model, file_watcher: &mut Option<FileWatcher>) {
        if !model.watch_enabled {
            *file_watcher = None;
            model.show_toast(ToastLevel::Info, "Watch disabled");
            return;
        }
        match Self::make_file_watcher(&model.file_path) {
            Ok(watcher) => {
                *file_watcher = Some(watcher);
                model.show_toast(ToastLevel::Info, "Watching file changes");
            }
            Err(err) => {
                tracing::warn!(path = %model.file_path.display(), error = %err, "cannot watch file");
                model.watch_enabled = false;
                *file_watcher = None;
                model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
            }
        }
    }

    fn reload(model: &mut Model, announce: bool) {
        match model.reload_from_disk() {
            Ok(()) if announce => model.show_toast(ToastLevel::Info, "Reloaded"),
            Ok(()) => {}
            Err(err) => {
                tracing::warn!(path = %model.file_path.display(), error = %err, "reload failed");
                model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
            }
        }
    }

    fn download(model: &mut Model) {
        match model.download() {
            Ok(()) => {
                tracing::info!(path = %model.output_path.display(), "document downloaded");
                let message = format!("Saved {}", model.output_path.display());
                model.show_toast(ToastLevel::Info, message);
            }
            Err(err) => {
                tracing::warn!(error = %err, "download failed");
                model.show_toast(ToastLevel::Error, format!("{err:#}"));
            }
        }
    }
}
