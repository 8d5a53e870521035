use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::{Model, ViewMode};
use crate::preview::{InlineSpan, LineType};

use super::style::{gutter_badge, style_for_inline, style_for_line_type};
use super::{
    DOC_WIDTH_PERCENT, DOCUMENT_LEFT_PADDING, GUTTER_WIDTH, OUTLINE_WIDTH_PERCENT, overlays,
    status,
};

pub fn split_main_columns(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(OUTLINE_WIDTH_PERCENT),
            Constraint::Percentage(DOC_WIDTH_PERCENT),
        ])
        .split(area)
}

/// Columns left for document text once the sidebar and gutter are placed.
pub fn document_content_width(total_width: u16, outline_visible: bool) -> u16 {
    let area = Rect::new(0, 0, total_width, 1);
    let doc_width = if outline_visible {
        split_main_columns(area)[1].width
    } else {
        total_width
    };
    doc_width
        .saturating_sub(DOCUMENT_LEFT_PADDING + GUTTER_WIDTH)
        .max(1)
}

/// Rows taken by the bars below the document.
pub fn footer_rows(model: &Model) -> u16 {
    1 + u16::from(model.active_toast().is_some()) + u16::from(model.prompt.is_some())
}

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();

    if model.editor_mode() {
        render_editor(model, frame, area);
    } else if model.outline_visible {
        let chunks = split_main_columns(area);
        render_outline(model, frame, chunks[0]);
        render_document(model, frame, chunks[1]);
    } else {
        render_document(model, frame, area);
    }

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    } else if model.alert.is_some() {
        overlays::render_alert_overlay(model, frame, area);
    }
}

fn render_outline(model: &Model, frame: &mut Frame, area: Rect) {
    let entries = model.preview.outline();
    let visible_rows = usize::from(area.height.saturating_sub(2));
    let start = model
        .outline_scroll_offset
        .min(entries.len().saturating_sub(visible_rows));
    let end = (start + visible_rows).min(entries.len());

    let items: Vec<Line> = entries[start..end]
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let index = start + offset;
            let selected = model.outline_selected == Some(index);
            let picked = model.picks.contains(&entry.node);
            let marker = match (selected, picked) {
                (true, _) => '>',
                (false, true) => '+',
                (false, false) => ' ',
            };
            let indent = "  ".repeat(entry.depth);
            let base = entry
                .heading_level
                .map_or_else(Style::default, |level| style_for_line_type(LineType::Heading(level)));
            let base = if picked {
                base.fg(Color::Yellow)
            } else {
                base
            };
            let style = if selected { base.reversed() } else { base };
            let mut spans = vec![Span::styled(
                format!("{marker}{indent}{}", entry.selector),
                style,
            )];
            if !entry.text.is_empty() {
                spans.push(Span::styled(
                    format!(" {}", entry.text),
                    Style::default().fg(Color::Indexed(245)),
                ));
            }
            Line::from(spans)
        })
        .collect();

    let title = if model.picks.is_empty() {
        "Outline".to_string()
    } else {
        format!("Outline ({} picked)", model.picks.len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if model.outline_focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    frame.render_widget(Paragraph::new(items).block(block), area);
}

fn render_document(model: &Model, frame: &mut Frame, area: Rect) {
    let toast_active = model.active_toast().is_some();
    let prompt_active = model.prompt.is_some();
    let doc_area = Rect {
        height: area.height.saturating_sub(footer_rows(model)),
        ..area
    };
    let bar = |from_bottom: u16| Rect {
        y: area.y + area.height.saturating_sub(from_bottom),
        height: 1,
        ..area
    };
    let status_area = bar(1);
    let toast_area = bar(2);
    let prompt_area = bar(2 + u16::from(toast_active));

    let offset = model.viewport.offset();
    let height = usize::from(model.viewport.height());
    let content: Vec<Line> = match model.view_mode {
        ViewMode::Preview => model
            .preview
            .visible_lines(offset, height)
            .into_iter()
            .map(|line| {
                let (badge, badge_style) = gutter_badge(line.gutter());
                let line_style = style_for_line_type(line.line_type());
                let mut spans = vec![
                    Span::raw(" ".repeat(usize::from(DOCUMENT_LEFT_PADDING))),
                    Span::styled(format!("{badge:<3}"), badge_style),
                    Span::raw(" "),
                ];
                match line.spans() {
                    Some(inline) => spans.extend(styled_spans(inline, line_style)),
                    None => spans.push(Span::styled(line.content().to_string(), line_style)),
                }
                Line::from(spans)
            })
            .collect(),
        ViewMode::Source => {
            let number_width = usize::from(line_number_width(model.source_lines.len()));
            model
                .source_lines
                .iter()
                .enumerate()
                .skip(offset)
                .take(height)
                .map(|(index, spans)| {
                    let mut line = vec![Span::styled(
                        format!("{:>number_width$} ", index + 1),
                        Style::default().fg(Color::DarkGray),
                    )];
                    line.extend(styled_spans(spans, Style::default()));
                    Line::from(line)
                })
                .collect()
        }
    };

    frame.render_widget(Clear, doc_area);
    frame.render_widget(Paragraph::new(content), doc_area);

    if prompt_active {
        status::render_prompt_bar(model, frame, prompt_area);
    }
    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, frame, status_area);
}

fn styled_spans(spans: &[InlineSpan], base: Style) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|span| Span::styled(span.text().to_string(), style_for_inline(base, span.style())))
        .collect()
}

fn render_editor(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(buffer) = &model.editor_buffer else {
        return;
    };

    let toast_active = model.active_toast().is_some();
    let editor_area = Rect {
        height: area.height.saturating_sub(1 + u16::from(toast_active)),
        ..area
    };
    let toast_area = Rect {
        y: area.y + area.height.saturating_sub(2),
        height: 1,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1,
        ..area
    };

    let total_lines = buffer.line_count();
    let number_width = usize::from(line_number_width(total_lines));
    let start = model.editor_scroll_offset;
    let end = (start + usize::from(editor_area.height)).min(total_lines);
    let cursor = buffer.cursor();

    let mut content: Vec<Line> = Vec::new();
    for index in start..end {
        let text = buffer.line_at(index).unwrap_or_default();
        let mut spans = vec![Span::styled(
            format!("{:>number_width$} ", index + 1),
            Style::default().fg(Color::DarkGray),
        )];
        if index == cursor.line {
            let col = cursor.col.min(text.len());
            let (before, rest) = text.split_at(col);
            let mut chars = rest.chars();
            let under_cursor = chars.next().map_or_else(|| " ".to_string(), String::from);
            let after = chars.as_str();
            if !before.is_empty() {
                spans.push(Span::raw(before.to_string()));
            }
            spans.push(Span::styled(
                under_cursor,
                Style::default().bg(Color::White).fg(Color::Black),
            ));
            if !after.is_empty() {
                spans.push(Span::raw(after.to_string()));
            }
        } else {
            spans.push(Span::raw(text));
        }
        content.push(Line::from(spans));
    }

    frame.render_widget(Clear, editor_area);
    frame.render_widget(Paragraph::new(content), editor_area);

    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_editor_status_bar(model, frame, status_area);
}

/// Digits needed for the largest line number.
pub const fn line_number_width(total_lines: usize) -> u16 {
    let mut width = 1;
    let mut rest = total_lines / 10;
    while rest > 0 {
        width += 1;
        rest /= 10;
    }
    width
}
