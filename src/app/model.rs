use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::warn;

use crate::editor::EditorBuffer;
use crate::highlight::highlight_html;
use crate::html::{Document, NodeId, SelectorList};
use crate::preview::{render_document, InlineSpan, Marks, Preview};
use crate::session::{Session, Settings};
use crate::ui::viewport::Viewport;

/// Name of the download written next to the input by default.
pub const DEFAULT_OUTPUT_NAME: &str = "modified.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Blocking message box shown after an action. Any key dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Rendered document.
    Preview,
    /// Highlighted markup.
    Source,
}

/// Setting edited through the one-line prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Style,
    Sources,
    Anchor,
    TocTitle,
}

impl PromptKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Style => "Source style",
            Self::Sources => "Sources selector",
            Self::Anchor => "TOC anchor selector",
            Self::TocTitle => "TOC title",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// The complete application state.
pub struct Model {
    pub session: Session,
    pub file_path: PathBuf,
    /// Where downloads are written.
    pub output_path: PathBuf,
    pub preview: Preview,
    /// Highlighted markup, one entry per source line.
    pub source_lines: Vec<Vec<InlineSpan>>,
    /// Parse error of the current content, shown instead of the preview.
    pub parse_error: Option<String>,
    pub view_mode: ViewMode,
    pub viewport: Viewport,
    pub outline_visible: bool,
    pub outline_focused: bool,
    pub outline_selected: Option<usize>,
    pub outline_scroll_offset: usize,
    /// Elements picked in the outline as future sources.
    pub picks: Vec<NodeId>,
    pub prompt: Option<Prompt>,
    pub alert: Option<Alert>,
    toast: Option<Toast>,
    pub help_visible: bool,
    pub help_scroll_offset: usize,
    pub watch_enabled: bool,
    pub config_global_path: Option<PathBuf>,
    pub config_local_path: Option<PathBuf>,
    /// Present while edit mode is active.
    pub editor_buffer: Option<EditorBuffer>,
    pub editor_scroll_offset: usize,
    /// Content fingerprint at the last load or download.
    pub saved_fingerprint: u64,
    /// Set after a first quit attempt with unsaved changes.
    pub quit_confirmed: bool,
    /// Set after a first Esc with unsaved editor changes.
    pub exit_confirmed: bool,
    pub should_quit: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("view_mode", &self.view_mode)
            .field("outline_visible", &self.outline_visible)
            .field("editor_mode", &self.editor_mode())
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model for `content` read from `file_path`.
    pub fn new(
        file_path: PathBuf,
        content: String,
        settings: Settings,
        terminal_size: (u16, u16),
    ) -> Self {
        let output_path = default_output_path(&file_path);
        let session = Session::new(content, settings);
        let saved_fingerprint = session.fingerprint();
        let mut model = Self {
            session,
            file_path,
            output_path,
            viewport: Viewport::new(terminal_size.0, terminal_size.1.saturating_sub(1), 0),
            saved_fingerprint,
            ..Self::default()
        };
        model.refresh_document();
        model
    }

    pub const fn editor_mode(&self) -> bool {
        self.editor_buffer.is_some()
    }

    pub fn editor_is_dirty(&self) -> bool {
        self.editor_buffer
            .as_ref()
            .is_some_and(EditorBuffer::is_dirty)
    }

    /// Whether the content differs from what was loaded or last downloaded.
    pub fn is_modified(&self) -> bool {
        self.session.fingerprint() != self.saved_fingerprint
    }

    /// Lines in the current view mode.
    pub fn line_count(&self) -> usize {
        match self.view_mode {
            ViewMode::Preview => self.preview.line_count(),
            ViewMode::Source => self.source_lines.len(),
        }
    }

    /// Width available to the rendered document.
    pub(super) fn layout_width(&self) -> u16 {
        crate::ui::document_content_width(self.viewport.width(), self.outline_visible)
    }

    /// Re-render the preview and source view from the session content.
    pub(super) fn refresh_document(&mut self) {
        let _scope = crate::perf::scope("app.refresh_document");
        let width = usize::from(self.layout_width());
        match self.session.parse() {
            Ok(doc) => {
                self.picks.retain(|node| doc.element(*node).is_some());
                let marks = self.marks(&doc);
                self.preview = render_document(&doc, width, &marks);
                self.parse_error = None;
            }
            Err(err) => {
                warn!(error = %err, "content does not parse, showing raw text");
                self.preview = Preview::from_plain_text(self.session.content());
                self.parse_error = Some(err.to_string());
            }
        }
        self.source_lines = highlight_html(self.session.content());
        crate::perf::log_event(
            "document.refresh",
            format!(
                "width={width} preview_lines={} source_lines={}",
                self.preview.line_count(),
                self.source_lines.len()
            ),
        );
        self.viewport.set_total_lines(self.line_count());
        let outline_len = self.preview.outline().len();
        self.outline_selected = match self.outline_selected {
            _ if outline_len == 0 => None,
            Some(selected) => Some(selected.min(outline_len - 1)),
            None if self.outline_visible => Some(0),
            None => None,
        };
        self.outline_scroll_offset = self.outline_scroll_offset.min(self.max_outline_scroll_offset());
    }

    fn marks(&self, doc: &Document) -> Marks {
        let mut marks = Marks::default();
        if let Some(sources) = self.session.sources() {
            marks.sources = sources
                .iter()
                .enumerate()
                .map(|(index, source)| (source.node, index + 1))
                .collect();
        }
        if let Some(references) = self.session.references() {
            for reference in references {
                marks
                    .references
                    .entry(reference.node)
                    .or_default()
                    .push((reference.start, reference.end));
            }
        }
        marks.picked = self.picks.iter().copied().collect();
        marks.anchor = self
            .session
            .settings()
            .toc_anchor
            .as_deref()
            .and_then(|selector| SelectorList::parse(selector).ok())
            .and_then(|selector| doc.select_first(&selector));
        marks
    }

    /// Replace the content with the file on disk. Clears undo and
    /// selections.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read.
    pub fn reload_from_disk(&mut self) -> Result<()> {
        let content = read_document(&self.file_path)?;
        self.session.load(content);
        self.saved_fingerprint = self.session.fingerprint();
        crate::perf::log_content("reload", self.session.content().len(), false);
        self.picks.clear();
        self.refresh_document();
        Ok(())
    }

    /// Write the content to the output path.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn download(&mut self) -> Result<()> {
        std::fs::write(&self.output_path, self.session.content())
            .with_context(|| format!("Failed to write {}", self.output_path.display()))?;
        self.saved_fingerprint = self.session.fingerprint();
        crate::perf::log_content("download", self.session.content().len(), false);
        Ok(())
    }

    pub(super) const fn outline_visible_rows(&self) -> usize {
        self.viewport.height().saturating_sub(2) as usize
    }

    pub(super) fn max_outline_scroll_offset(&self) -> usize {
        self.preview
            .outline()
            .len()
            .saturating_sub(self.outline_visible_rows())
    }

    /// Keep the selected outline entry inside the sidebar.
    pub(super) fn scroll_outline_to_selection(&mut self) {
        let Some(selected) = self.outline_selected else {
            return;
        };
        let rows = self.outline_visible_rows().max(1);
        if selected < self.outline_scroll_offset {
            self.outline_scroll_offset = selected;
        } else if selected >= self.outline_scroll_offset + rows {
            self.outline_scroll_offset = selected + 1 - rows;
        }
    }

    /// Select the outline entry for the line at the top of the viewport.
    pub(super) fn sync_outline_to_viewport(&mut self) {
        if self.view_mode != ViewMode::Preview {
            return;
        }
        if let Some(index) = self.preview.outline_index_for_line(self.viewport.offset()) {
            self.outline_selected = Some(index);
            self.scroll_outline_to_selection();
        }
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    pub(super) fn show_alert(&mut self, message: impl Into<String>, is_error: bool) {
        self.alert = Some(Alert {
            message: message.into(),
            is_error,
        });
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            session: Session::default(),
            file_path: PathBuf::new(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_NAME),
            preview: Preview::default(),
            source_lines: Vec::new(),
            parse_error: None,
            view_mode: ViewMode::Preview,
            viewport: Viewport::new(80, 24, 0),
            outline_visible: false,
            outline_focused: false,
            outline_selected: None,
            outline_scroll_offset: 0,
            picks: Vec::new(),
            prompt: None,
            alert: None,
            toast: None,
            help_visible: false,
            help_scroll_offset: 0,
            watch_enabled: false,
            config_global_path: None,
            config_local_path: None,
            editor_buffer: None,
            editor_scroll_offset: 0,
            saved_fingerprint: 0,
            quit_confirmed: false,
            exit_confirmed: false,
            should_quit: false,
        }
    }
}

/// `modified.html` in the directory of `input`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(
            || PathBuf::from(DEFAULT_OUTPUT_NAME),
            |dir| dir.join(DEFAULT_OUTPUT_NAME),
        )
}

/// Read an HTML file as text. Invalid UTF-8 is replaced with a warning.
///
/// # Errors
///
/// Fails when the file cannot be read.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    })
}
