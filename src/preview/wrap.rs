use unicode_width::UnicodeWidthStr;

use super::{InlineSpan, InlineStyle};

/// Word-wrap styled spans to `width` display columns.
///
/// `prefix_first` starts the first line and `prefix_next` every following
/// one; both count towards the width. Whitespace at the start of a wrapped
/// line is dropped. A single word longer than the width gets a line of its
/// own rather than being split.
pub fn wrap_spans(
    spans: &[InlineSpan],
    width: usize,
    prefix_first: &str,
    prefix_next: &str,
) -> Vec<Vec<InlineSpan>> {
    let tokens: Vec<InlineSpan> = spans.iter().flat_map(split_inline_tokens).collect();

    let mut lines: Vec<Vec<InlineSpan>> = Vec::new();
    let mut current: Vec<InlineSpan> = Vec::new();
    let mut current_width = 0usize;
    let mut has_word = false;

    let start_line = |prefix: &str, current: &mut Vec<InlineSpan>, current_width: &mut usize| {
        current.clear();
        *current_width = prefix.width();
        if !prefix.is_empty() {
            current.push(InlineSpan::new(prefix.to_string(), InlineStyle::default()));
        }
    };

    start_line(prefix_first, &mut current, &mut current_width);

    for token in tokens {
        let token_width = token.text().width();
        let token_is_ws = token.text().chars().all(char::is_whitespace);

        if has_word && current_width + token_width > width {
            lines.push(std::mem::take(&mut current));
            start_line(prefix_next, &mut current, &mut current_width);
            has_word = false;
        }

        if token_is_ws && !has_word {
            continue;
        }

        current_width += token_width;
        current.push(token);
        has_word = true;
    }

    lines.push(current);
    lines
}

fn split_inline_tokens(span: &InlineSpan) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut ws_state: Option<bool> = None;

    for ch in span.text().chars() {
        let is_ws = ch.is_whitespace();
        if ws_state.is_some_and(|state| state != is_ws) {
            out.push(InlineSpan::new(std::mem::take(&mut buf), span.style()));
        }
        ws_state = Some(is_ws);
        buf.push(ch);
    }
    if !buf.is_empty() {
        out.push(InlineSpan::new(buf, span.style()));
    }
    out
}
