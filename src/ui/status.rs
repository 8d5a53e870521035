use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel, ViewMode};

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let settings = model.session.settings();
    let filename = file_name(model);
    let view = match model.view_mode {
        ViewMode::Preview if model.parse_error.is_some() => "raw",
        ViewMode::Preview => "preview",
        ViewMode::Source => "source",
    };
    let tags = if settings.tags.is_empty() {
        "-".to_string()
    } else {
        settings
            .tags
            .iter()
            .map(|tag| tag.name())
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut status = format!(
        " {filename}  [{}%]  {view}  tags:{tags}  style:{}",
        model.viewport.scroll_percent(),
        settings.style
    );
    if let Some(sources) = model.session.sources() {
        status.push_str(&format!("  sources:{}", sources.len()));
    }
    if let Some(references) = model.session.references() {
        status.push_str(&format!("  refs:{}", references.len()));
    }
    if model.is_modified() {
        status.push_str("  [modified]");
    }
    if model.session.can_undo() {
        status.push_str(" [undo]");
    }
    if model.watch_enabled {
        status.push_str(" [watching]");
    }
    status.push_str("  ?:help");

    let bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_editor_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let dirty = if model.editor_is_dirty() {
        " [edited]"
    } else {
        ""
    };
    let cursor = model.editor_buffer.as_ref().map_or_else(String::new, |buffer| {
        let cursor = buffer.cursor();
        format!("  Ln {}, Col {}", cursor.line + 1, cursor.col + 1)
    });
    let status = format!(
        " EDIT  {}{dirty}{cursor}  Esc:view  Ctrl+S:apply",
        file_name(model)
    );
    let bar = Paragraph::new(status).style(Style::default().bg(Color::Magenta).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_prompt_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(prompt) = &model.prompt else {
        return;
    };
    let text = format!(
        "{}: {}\u{2588}  Enter: apply  Esc: cancel",
        prompt.kind.label(),
        prompt.input
    );
    let bar = Paragraph::new(text).style(Style::default().bg(Color::Blue).fg(Color::White));
    frame.render_widget(bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    frame.render_widget(Paragraph::new(format!("{prefix} {message}")).style(style), area);
}

fn file_name(model: &Model) -> String {
    model.file_path.file_name().map_or_else(
        || "untitled".to_string(),
        |name| name.to_string_lossy().to_string(),
    )
}
