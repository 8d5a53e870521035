//! Interactive terminal session.
//!
//! Built on The Elm Architecture:
//! - [`Model`]: the complete application state
//! - [`Message`]: every event and action
//! - [`update`]: state transitions
//! - [`App::run`]: terminal setup and the event loop

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{
    default_output_path, read_document, Alert, Model, Prompt, PromptKind, ToastLevel, ViewMode,
    DEFAULT_OUTPUT_NAME,
};
pub use update::{update, Message};

use std::path::PathBuf;

use crate::session::Settings;

/// Owns the startup options and runs the terminal session.
pub struct App {
    file_path: PathBuf,
    output_path: Option<PathBuf>,
    settings: Settings,
    watch_enabled: bool,
    outline_visible: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            output_path: None,
            settings: Settings::default(),
            watch_enabled: false,
            outline_visible: false,
            config_global_path: None,
            config_local_path: None,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Write downloads here instead of `modified.html` next to the input.
    pub fn with_output_path(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    pub fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    /// Start with the outline sidebar open and focused.
    pub fn with_outline_visible(mut self, visible: bool) -> Self {
        self.outline_visible = visible;
        self
    }

    /// Config paths listed in the help overlay.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

#[cfg(test)]
mod tests;
