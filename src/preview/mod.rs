//! Terminal rendering of an HTML document.
//!
//! The preview turns a parsed [`Document`](crate::html::Document) into
//! wrapped, styled lines plus an outline of block elements that the sidebar
//! uses as an element picker.

mod render;
mod wrap;

use std::collections::{HashMap, HashSet};

use crate::html::NodeId;

pub use render::render_document;
pub use wrap::wrap_spans;

/// What the preview should call out besides the markup itself.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    /// Selected source elements and their 1-based numbers.
    pub sources: HashMap<NodeId, usize>,
    /// Byte ranges of found reference markers per text node.
    pub references: HashMap<NodeId, Vec<(usize, usize)>>,
    /// Elements picked in the outline.
    pub picked: HashSet<NodeId>,
    /// The element the table of contents is inserted before.
    pub anchor: Option<NodeId>,
}

/// Left gutter badge of a rendered line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gutter {
    #[default]
    None,
    Source(usize),
    Picked,
    Anchor,
}

/// RGB color for inline styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl InlineColor {
    /// Parse `#rgb` or `#rrggbb`.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Some(Self {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            _ => None,
        }
    }

    pub fn luma(self) -> f32 {
        (0.2126 * f32::from(self.r)) + (0.7152 * f32::from(self.g)) + (0.0722 * f32::from(self.b))
    }
}

/// Inline style flags for a text span.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub emphasis: bool,
    pub strong: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub link: bool,
    /// A found reference marker.
    pub marker: bool,
    pub fg: Option<InlineColor>,
    pub bg: Option<InlineColor>,
}

/// A styled inline span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    text: String,
    style: InlineStyle,
}

impl InlineSpan {
    pub const fn new(text: String, style: InlineStyle) -> Self {
        Self { text, style }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn style(&self) -> InlineStyle {
        self.style
    }
}

/// Type of a rendered line, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Paragraph,
    Heading(u8),
    ListItem,
    Quote,
    Preformatted,
    Table,
    Rule,
    Empty,
}

/// A single rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    content: String,
    line_type: LineType,
    spans: Vec<InlineSpan>,
    /// Block element the line was produced by.
    node: Option<NodeId>,
    gutter: Gutter,
}

impl RenderedLine {
    pub const fn new(content: String, line_type: LineType) -> Self {
        Self {
            content,
            line_type,
            spans: Vec::new(),
            node: None,
            gutter: Gutter::None,
        }
    }

    pub fn with_spans(line_type: LineType, spans: Vec<InlineSpan>) -> Self {
        let content = spans.iter().map(InlineSpan::text).collect();
        Self {
            content,
            line_type,
            spans,
            node: None,
            gutter: Gutter::None,
        }
    }

    #[must_use]
    pub const fn with_node(mut self, node: Option<NodeId>, gutter: Gutter) -> Self {
        self.node = node;
        self.gutter = gutter;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub const fn line_type(&self) -> LineType {
        self.line_type
    }

    /// Inline spans, if the line has styled content.
    pub fn spans(&self) -> Option<&[InlineSpan]> {
        if self.spans.is_empty() {
            None
        } else {
            Some(&self.spans)
        }
    }

    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub const fn gutter(&self) -> Gutter {
        self.gutter
    }
}

/// A block element listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub node: NodeId,
    pub depth: usize,
    /// `tag#id.class` selector of the element.
    pub selector: String,
    /// Short text preview.
    pub text: String,
    /// First rendered line of the element.
    pub line: usize,
    pub heading_level: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Preview {
    lines: Vec<RenderedLine>,
    outline: Vec<OutlineEntry>,
}

impl Preview {
    pub(crate) const fn from_parts(lines: Vec<RenderedLine>, outline: Vec<OutlineEntry>) -> Self {
        Self { lines, outline }
    }

    /// Raw text shown line by line, used when the markup does not parse.
    pub fn from_plain_text(source: &str) -> Self {
        let lines = source
            .lines()
            .map(|line| RenderedLine::new(line.to_string(), LineType::Preformatted))
            .collect();
        Self {
            lines,
            outline: Vec::new(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_at(&self, index: usize) -> Option<&RenderedLine> {
        self.lines.get(index)
    }

    /// Lines from `offset` to `offset + count`.
    pub fn visible_lines(&self, offset: usize, count: usize) -> Vec<&RenderedLine> {
        self.lines.iter().skip(offset).take(count).collect()
    }

    pub fn outline(&self) -> &[OutlineEntry] {
        &self.outline
    }

    pub fn line_for_node(&self, node: NodeId) -> Option<usize> {
        self.outline
            .iter()
            .find(|entry| entry.node == node)
            .map(|entry| entry.line)
    }

    /// Index of the last outline entry starting at or before `line`.
    pub fn outline_index_for_line(&self, line: usize) -> Option<usize> {
        self.outline
            .iter()
            .rposition(|entry| entry.line <= line)
    }
}
