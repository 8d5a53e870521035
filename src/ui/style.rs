//! Colors for the rendered preview.
//!
//! Named ANSI colors follow the terminal palette; light backgrounds get
//! darker xterm-256 shades.

use ratatui::style::{Color, Modifier, Style};

use crate::preview::{Gutter, InlineColor, InlineStyle, LineType};

pub fn style_for_line_type(line_type: LineType) -> Style {
    let light_bg = crate::highlight::is_light_background();
    let pick = |light: u8, dark: Color| {
        if light_bg {
            Color::Indexed(light)
        } else {
            dark
        }
    };
    match line_type {
        LineType::Heading(1) => Style::default()
            .fg(pick(24, Color::Cyan))
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        LineType::Heading(2) => Style::default()
            .fg(pick(22, Color::Green))
            .add_modifier(Modifier::BOLD),
        LineType::Heading(3) => Style::default()
            .fg(pick(58, Color::Yellow))
            .add_modifier(Modifier::BOLD),
        LineType::Heading(4) => Style::default()
            .fg(pick(24, Color::Blue))
            .add_modifier(Modifier::BOLD),
        LineType::Heading(5) => Style::default()
            .fg(pick(54, Color::Magenta))
            .add_modifier(Modifier::BOLD),
        LineType::Heading(_) => Style::default()
            .fg(pick(24, Color::Cyan))
            .add_modifier(Modifier::BOLD),
        LineType::Preformatted => Style::default().fg(pick(238, Color::Indexed(245))),
        LineType::Quote => Style::default()
            .fg(pick(24, Color::Blue))
            .add_modifier(Modifier::ITALIC),
        LineType::Rule => Style::default()
            .fg(pick(241, Color::Indexed(240)))
            .add_modifier(Modifier::DIM),
        LineType::ListItem | LineType::Table | LineType::Paragraph | LineType::Empty => {
            Style::default()
        }
    }
}

/// Merge an inline span's flags into the style of its line.
pub fn style_for_inline(base: Style, inline: InlineStyle) -> Style {
    let light_bg = crate::highlight::is_light_background();
    let mut style = base;

    if let Some(fg) = inline.fg {
        style = style
            .fg(color_for_terminal(fg))
            .remove_modifier(Modifier::DIM);
    }
    if let Some(bg) = inline.bg {
        style = style.bg(color_for_terminal(bg));
        if inline.fg.is_none() {
            // Text follows the brightness of the background.
            let fg = if bg.luma() > 140.0 {
                Color::Black
            } else {
                Color::White
            };
            style = style.fg(fg);
        }
    }
    if inline.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if inline.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if inline.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if inline.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if inline.link {
        style = style.add_modifier(Modifier::UNDERLINED);
        if inline.fg.is_none() {
            style = style.fg(if light_bg {
                Color::Blue
            } else {
                Color::LightBlue
            });
        }
    }
    if inline.code && inline.fg.is_none() {
        style = style.fg(if light_bg {
            Color::Indexed(88)
        } else {
            Color::Red
        });
    }
    if inline.marker {
        style = style
            .bg(if light_bg {
                Color::Indexed(222)
            } else {
                Color::Indexed(94)
            })
            .fg(if light_bg { Color::Black } else { Color::White })
            .add_modifier(Modifier::BOLD);
    }
    style
}

/// Badge text and style for the gutter column.
pub fn gutter_badge(gutter: Gutter) -> (String, Style) {
    match gutter {
        Gutter::None => (String::new(), Style::default()),
        Gutter::Source(number) => (
            format!("{number:>3}"),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        Gutter::Picked => (
            "  +".to_string(),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Gutter::Anchor => (
            "TOC".to_string(),
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
        ),
    }
}

fn color_for_terminal(color: InlineColor) -> Color {
    if supports_truecolor() {
        Color::Rgb(color.r, color.g, color.b)
    } else {
        Color::Indexed(rgb_to_xterm_256(color.r, color.g, color.b))
    }
}

fn supports_truecolor() -> bool {
    if let Ok(force) = std::env::var("JUMPLINK_TRUECOLOR") {
        let value = force.to_ascii_lowercase();
        return matches!(value.as_str(), "1" | "true" | "yes" | "on");
    }
    supports_truecolor_from_env(
        std::env::var("COLORTERM").ok().as_deref(),
        std::env::var("TERM").ok().as_deref(),
    )
}

fn supports_truecolor_from_env(colorterm: Option<&str>, term: Option<&str>) -> bool {
    let has = |value: Option<&str>, needles: &[&str]| {
        value.is_some_and(|v| {
            let lower = v.to_ascii_lowercase();
            needles.iter().any(|needle| lower.contains(needle))
        })
    };
    has(colorterm, &["truecolor", "24bit"]) || has(term, &["direct", "truecolor"])
}

fn rgb_to_xterm_256(r: u8, g: u8, b: u8) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let to_cube = |v: u8| ((u16::from(v) * 5) / 255) as u8;
    16 + (36 * to_cube(r)) + (6 * to_cube(g)) + to_cube(b)
}
