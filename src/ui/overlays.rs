use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};

use crate::app::Model;

/// Blocking result message of the last action.
pub fn render_alert_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(alert) = &model.alert else {
        return;
    };
    let popup_width = area.width.saturating_sub(16).clamp(30, 72);
    let inner_width = usize::from(popup_width.saturating_sub(4)).max(1);
    #[allow(clippy::cast_possible_truncation)]
    let text_rows = alert
        .message
        .lines()
        .map(|line| line.chars().count().div_ceil(inner_width).max(1))
        .sum::<usize>()
        .min(usize::from(u16::MAX)) as u16;
    let popup = centered_popup_rect(popup_width, text_rows + 6, area);

    let (title, border) = if alert.is_error {
        ("Error", Color::Red)
    } else {
        ("Done", Color::Green)
    };
    let lines = vec![
        Line::raw(alert.message.clone()),
        Line::raw(""),
        Line::styled(
            "Press any key to continue",
            Style::default().fg(Color::Indexed(245)),
        ),
    ];
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup_height = area.height.saturating_sub(6).max(12);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(Color::Indexed(245));
    let settings = model.session.settings();

    let mut all_lines: Vec<Line> = Vec::new();
    let mut section = |title: &'static str, rows: &[&str]| {
        all_lines.push(Line::styled(title, section_style));
        all_lines.extend(rows.iter().map(|row| Line::raw(format!("  {row}"))));
        all_lines.push(Line::raw(""));
    };

    section(
        "Actions",
        &[
            "t                   Generate table of contents",
            "l                   Select source elements",
            "f                   Find references",
            "L                   Link references to sources",
            "a                   Apply changes (renumber, highlight)",
            "u                   Undo last change",
            "d / Ctrl-s          Download to output file",
        ],
    );
    section(
        "Settings",
        &[
            "1-6                 Toggle heading tag h1-h6",
            "s / S               Cycle / enter source style",
            "p                   Enter sources selector",
            "P                   Enter TOC anchor selector",
            "T                   Enter TOC title",
        ],
    );
    section(
        "Navigation",
        &[
            "j/k or Up/Down      Scroll",
            "Space/PageDown      Page down",
            "b/PageUp            Page up",
            "Ctrl-d / Ctrl-u     Half page",
            "g / G               Top / bottom",
            "v                   Preview / markup view",
        ],
    );
    section(
        "Outline",
        &[
            "o                   Toggle outline",
            "O                   Toggle + focus outline",
            "Tab                 Switch focus",
            "Enter               Jump to element",
            "Space               Pick element as source",
            "c                   Use picks as sources selector",
            "a                   Insert TOC before element",
        ],
    );
    section(
        "Editor",
        &[
            "e                   Edit markup",
            "Ctrl-s              Apply edits (undoable)",
            "Esc                 Back to preview",
            ">                   Close the open tag",
        ],
    );
    section(
        "Other",
        &[
            "w                   Toggle watch",
            "r                   Reload file",
            "q / Ctrl-c          Quit",
            "? / F1              Toggle help",
        ],
    );

    all_lines.push(Line::styled("Current", section_style));
    all_lines.push(Line::raw(format!("  Output: {}", model.output_path.display())));
    all_lines.push(Line::raw(format!(
        "  Sources selector: {}",
        if settings.sources_selector.is_empty() {
            "<none>"
        } else {
            settings.sources_selector.as_str()
        }
    )));
    all_lines.push(Line::raw(format!(
        "  TOC anchor: {}",
        settings.toc_anchor.as_deref().unwrap_or("<start of body>")
    )));
    all_lines.push(Line::raw(format!("  TOC title: {}", settings.toc_title)));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Config", section_style));
    all_lines.push(Line::raw(format!("  Global: {global_cfg}")));
    all_lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(block, popup);

    // Border and padding take two cells on each side.
    let inner = Rect::new(
        popup.x + 2,
        popup.y + 2,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(4),
    );

    let content_height_u16 = inner.height.saturating_sub(1);
    let content_height = usize::from(content_height_u16);
    let max_scroll = all_lines.len().saturating_sub(content_height);
    let scroll = model.help_scroll_offset.min(max_scroll);
    let end = (scroll + content_height).min(all_lines.len());
    let visible: Vec<Line> = all_lines[scroll..end].to_vec();

    let content_area = Rect::new(inner.x, inner.y, inner.width, content_height_u16);
    frame.render_widget(Paragraph::new(visible), content_area);

    let footer_area = Rect::new(inner.x, inner.y + content_height_u16, inner.width, 1);
    let footer = Line::styled("j/k scroll \u{2502} any other key closes", dim_style);
    frame.render_widget(Paragraph::new(footer), footer_area);
}

pub fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
