use ropey::Rope;

const INDENT: &str = "  ";

/// Cursor position in the editor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub line: usize,
    /// Byte offset within the line.
    pub col: usize,
    /// Column kept across vertical moves over shorter lines.
    col_memory: usize,
}

impl Cursor {
    pub const fn at(line: usize, col: usize) -> Self {
        Self {
            line,
            col,
            col_memory: col,
        }
    }

    const fn set_col(&mut self, col: usize) {
        self.col = col;
        self.col_memory = col;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Rope-backed markup buffer with a single cursor.
pub struct EditorBuffer {
    rope: Rope,
    cursor: Cursor,
    dirty: bool,
}

impl EditorBuffer {
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: Cursor::default(),
            dirty: false,
        }
    }

    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Whether the text differs from what the buffer was created with.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Line content without the line break.
    pub fn line_at(&self, index: usize) -> Option<String> {
        if index >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(index).to_string();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }

    pub fn line_len(&self, index: usize) -> usize {
        self.line_at(index).map_or(0, |line| line.len())
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.cursor_char_idx();
        self.rope.insert_char(at, ch);
        self.cursor.set_col(self.cursor.col + ch.len_utf8());
        self.dirty = true;
    }

    pub fn insert_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let at = self.cursor_char_idx();
        self.rope.insert(at, text);
        match text.rsplit_once('\n') {
            Some((head, tail)) => {
                self.cursor.line += head.matches('\n').count() + 1;
                self.cursor.set_col(tail.len());
            }
            None => self.cursor.set_col(self.cursor.col + text.len()),
        }
        self.dirty = true;
    }

    /// Indent with spaces; markup is edited without tab characters.
    pub fn insert_indent(&mut self) {
        self.insert_str(INDENT);
    }

    /// Break the line at the cursor, carrying over the current indentation.
    /// After an opening tag the new line is indented one level deeper.
    pub fn split_line(&mut self) {
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let before = &line[..self.cursor.col.min(line.len())];
        let mut indent: String = before
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        if ends_with_open_tag(before) {
            indent.push_str(INDENT);
        }
        self.insert_str(&format!("\n{indent}"));
    }

    /// Insert `>` and, when it completes an opening tag, the matching end tag
    /// after the cursor.
    pub fn close_tag(&mut self) {
        self.insert_char('>');
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let before = &line[..self.cursor.col.min(line.len())];
        if let Some(name) = open_tag_name(before) {
            let at = self.cursor_char_idx();
            self.rope.insert(at, &format!("</{name}>"));
        }
    }

    /// Delete the character before the cursor. Returns whether anything
    /// was deleted.
    pub fn delete_back(&mut self) -> bool {
        if self.cursor.col == 0 && self.cursor.line == 0 {
            return false;
        }
        let at = self.cursor_char_idx();
        if self.cursor.col == 0 {
            let prev_len = self.line_len(self.cursor.line - 1);
            // Remove a CRLF pair as one break.
            let start = if at >= 2 && self.rope.char(at - 2) == '\r' {
                at - 2
            } else {
                at - 1
            };
            self.rope.remove(start..at);
            self.cursor.line -= 1;
            self.cursor.set_col(prev_len);
        } else {
            let line = self.line_at(self.cursor.line).unwrap_or_default();
            let width = line[..self.cursor.col]
                .chars()
                .next_back()
                .map_or(1, char::len_utf8);
            self.rope.remove(at - 1..at);
            self.cursor.set_col(self.cursor.col - width);
        }
        self.dirty = true;
        true
    }

    /// Delete the character under the cursor.
    pub fn delete_forward(&mut self) -> bool {
        let at = self.cursor_char_idx();
        if at >= self.rope.len_chars() {
            return false;
        }
        let end = if self.rope.char(at) == '\r'
            && at + 1 < self.rope.len_chars()
            && self.rope.char(at + 1) == '\n'
        {
            at + 2
        } else {
            at + 1
        };
        self.rope.remove(at..end);
        self.dirty = true;
        true
    }

    pub fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => {
                if self.cursor.col > 0 {
                    let line = self.line_at(self.cursor.line).unwrap_or_default();
                    let width = line[..self.cursor.col]
                        .chars()
                        .next_back()
                        .map_or(1, char::len_utf8);
                    self.cursor.set_col(self.cursor.col - width);
                } else if self.cursor.line > 0 {
                    self.cursor.line -= 1;
                    self.cursor.set_col(self.line_len(self.cursor.line));
                }
            }
            Direction::Right => {
                let line = self.line_at(self.cursor.line).unwrap_or_default();
                if let Some(ch) = line[self.cursor.col.min(line.len())..].chars().next() {
                    self.cursor.set_col(self.cursor.col + ch.len_utf8());
                } else if self.cursor.line + 1 < self.line_count() {
                    self.cursor.line += 1;
                    self.cursor.set_col(0);
                }
            }
            Direction::Up if self.cursor.line > 0 => self.move_vertically(self.cursor.line - 1),
            Direction::Down if self.cursor.line + 1 < self.line_count() => {
                self.move_vertically(self.cursor.line + 1);
            }
            Direction::Up | Direction::Down => {}
        }
    }

    pub const fn move_home(&mut self) {
        self.cursor.set_col(0);
    }

    pub fn move_end(&mut self) {
        self.cursor.set_col(self.line_len(self.cursor.line));
    }

    /// Move `lines` lines up or down, keeping the column.
    pub fn move_page(&mut self, lines: usize, down: bool) {
        let last = self.line_count().saturating_sub(1);
        let target = if down {
            (self.cursor.line + lines).min(last)
        } else {
            self.cursor.line.saturating_sub(lines)
        };
        self.move_vertically(target);
    }

    /// Place the cursor, clamped to the buffer.
    pub fn move_to(&mut self, line: usize, col: usize) {
        self.cursor.line = line.min(self.line_count().saturating_sub(1));
        let text = self.line_at(self.cursor.line).unwrap_or_default();
        let mut col = col.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.set_col(col);
    }

    fn move_vertically(&mut self, line: usize) {
        self.cursor.line = line;
        let text = self.line_at(line).unwrap_or_default();
        let mut col = self.cursor.col_memory.min(text.len());
        while !text.is_char_boundary(col) {
            col -= 1;
        }
        self.cursor.col = col;
    }

    fn cursor_char_idx(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.line);
        let line = self.line_at(self.cursor.line).unwrap_or_default();
        let col = self.cursor.col.min(line.len());
        line_start + line[..col].chars().count()
    }
}

impl std::fmt::Debug for EditorBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorBuffer")
            .field("lines", &self.rope.len_lines())
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Name of the opening tag that `text` ends with, if any.
fn open_tag_name(text: &str) -> Option<&str> {
    let inner = text.strip_suffix('>')?;
    let start = inner.rfind('<')?;
    let tag = &inner[start + 1..];
    if tag.ends_with('/') || tag.contains('>') {
        return None;
    }
    let end = tag
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(tag.len());
    let name = &tag[..end];
    let starts_with_letter = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !starts_with_letter || crate::html::is_void_element(&name.to_ascii_lowercase()) {
        return None;
    }
    Some(name)
}

fn ends_with_open_tag(text: &str) -> bool {
    open_tag_name(text.trim_end()).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str, line: usize, col: usize) -> EditorBuffer {
        let mut buf = EditorBuffer::from_text(text);
        buf.move_to(line, col);
        buf
    }

    #[test]
    fn test_from_text_lines() {
        let buf = EditorBuffer::from_text("<p>\n</p>\n");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line_at(0).as_deref(), Some("<p>"));
        assert_eq!(buf.line_at(2).as_deref(), Some(""));
        assert_eq!(buf.line_at(3), None);
        assert!(!buf.is_dirty());
    }

    #[test]
    fn test_insert_and_delete_multibyte() {
        let mut buf = at("Quelle", 0, 6);
        buf.insert_char('ü');
        assert_eq!(buf.text(), "Quelleü");
        assert_eq!(buf.cursor().col, 8);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "Quelle");
        assert!(buf.is_dirty());
    }

    #[test]
    fn test_split_line_keeps_indent() {
        let mut buf = at("    <li>x</li>", 0, 14);
        buf.split_line();
        assert_eq!(buf.text(), "    <li>x</li>\n    ");
        assert_eq!(buf.cursor(), Cursor::at(1, 4));
    }

    #[test]
    fn test_split_after_open_tag_indents() {
        let mut buf = at("<ul>", 0, 4);
        buf.split_line();
        assert_eq!(buf.text(), "<ul>\n  ");
        let mut buf = at("<br>", 0, 4);
        buf.split_line();
        assert_eq!(buf.text(), "<br>\n");
    }

    #[test]
    fn test_close_tag_inserts_end_tag() {
        let mut buf = at(r#"<a href="x""#, 0, 11);
        buf.close_tag();
        assert_eq!(buf.text(), r#"<a href="x"></a>"#);
        assert_eq!(buf.cursor().col, 12);

        let mut buf = at("<img", 0, 4);
        buf.close_tag();
        assert_eq!(buf.text(), "<img>");
        let mut buf = at("</p", 0, 3);
        buf.close_tag();
        assert_eq!(buf.text(), "</p>");
    }

    #[test]
    fn test_delete_back_joins_lines() {
        let mut buf = at("ab\ncd", 1, 0);
        assert!(buf.delete_back());
        assert_eq!(buf.text(), "abcd");
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
        let mut buf = at("ab", 0, 0);
        assert!(!buf.delete_back());
    }

    #[test]
    fn test_delete_forward_joins_crlf() {
        let mut buf = at("ab\r\ncd", 0, 2);
        assert!(buf.delete_forward());
        assert_eq!(buf.text(), "abcd");
        let mut buf = at("ab", 0, 2);
        assert!(!buf.delete_forward());
    }

    #[test]
    fn test_vertical_moves_remember_column() {
        let mut buf = at("long line\nx\nanother line", 0, 7);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 1);
        buf.move_cursor(Direction::Down);
        assert_eq!(buf.cursor().col, 7);
        buf.move_page(10, false);
        assert_eq!(buf.cursor().line, 0);
    }

    #[test]
    fn test_horizontal_moves_wrap_lines() {
        let mut buf = at("ä\nb", 0, 0);
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.cursor().col, 2);
        buf.move_cursor(Direction::Right);
        assert_eq!(buf.cursor(), Cursor::at(1, 0));
        buf.move_cursor(Direction::Left);
        assert_eq!(buf.cursor(), Cursor::at(0, 2));
    }

    #[test]
    fn test_move_to_clamps_into_char_boundary() {
        let buf = at("äb", 0, 1);
        assert_eq!(buf.cursor().col, 0);
        let buf = at("x", 9, 9);
        assert_eq!(buf.cursor(), Cursor::at(0, 1));
    }

    #[test]
    fn test_insert_indent_uses_spaces() {
        let mut buf = at("<p>", 0, 0);
        buf.insert_indent();
        assert_eq!(buf.text(), "  <p>");
    }
}
