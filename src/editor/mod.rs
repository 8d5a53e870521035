//! Markup editor for in-place changes to the document.

mod buffer;

pub use buffer::{Cursor, Direction, EditorBuffer};
