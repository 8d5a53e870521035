//! Terminal UI.
//!
//! - [`viewport`]: scroll position and visible range
//! - [`style`]: colors for preview lines, inline spans and gutter badges

pub mod style;
pub mod viewport;

mod overlays;
mod render;
mod status;

pub use overlays::centered_popup_rect;
pub use render::{document_content_width, footer_rows, line_number_width, render, split_main_columns};

pub const DOCUMENT_LEFT_PADDING: u16 = 1;
/// Badge column plus its separating space.
pub const GUTTER_WIDTH: u16 = 4;
pub const OUTLINE_WIDTH_PERCENT: u16 = 35;
pub const DOC_WIDTH_PERCENT: u16 = 65;
