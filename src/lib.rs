// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. session::Session)
    clippy::module_name_repetitions
)]

//! # Jumplink
//!
//! A terminal tool that adds a table of contents and reference jump links to
//! HTML documents.
//!
//! Jumplink loads an HTML file and offers:
//! - A table of contents built from selected heading tags
//! - Source selection by CSS selector or by picking elements in the outline
//! - Reference markers like `(1)` linked to their sources
//! - Renumbering and highlighting of the linked references
//! - One-step undo and a download of the modified document
//!
//! ## Architecture
//!
//! The terminal UI uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`html`]: Markup parsing, selectors and serialization
//! - [`session`]: The document actions and undo
//! - [`preview`]: Rendering the document to terminal lines
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`editor`]: Markup editing buffer
//! - [`batch`]: Headless action runs
//! - [`highlight`]: Syntax highlighting
//! - [`watcher`]: File watching

pub mod app;
pub mod batch;
pub mod config;
pub mod editor;
pub mod highlight;
pub mod html;
pub mod perf;
pub mod preview;
pub mod session;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::html::Document;
    pub use crate::session::{Action, Session, Settings};
    pub use crate::ui::viewport::Viewport;
}
