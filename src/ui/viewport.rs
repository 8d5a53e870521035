//! Scroll state of the document pane.

use std::ops::Range;

/// The visible window over the lines of the current view.
///
/// ```
/// use jumplink::ui::viewport::Viewport;
///
/// let mut vp = Viewport::new(80, 20, 100);
/// vp.scroll_down(15);
/// assert_eq!(vp.visible_range(), 15..35);
/// vp.reveal_line(90);
/// assert_eq!(vp.offset(), 80);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    width: u16,
    height: u16,
    offset: usize,
    total_lines: usize,
}

impl Viewport {
    /// `height` counts document rows only, without the status bar.
    pub const fn new(width: u16, height: u16, total_lines: usize) -> Self {
        Self {
            width,
            height,
            offset: 0,
            total_lines,
        }
    }

    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn width(&self) -> u16 {
        self.width
    }

    pub const fn height(&self) -> u16 {
        self.height
    }

    pub const fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn visible_range(&self) -> Range<usize> {
        let end = (self.offset + self.height as usize).min(self.total_lines);
        self.offset.min(end)..end
    }

    /// Position through the document, 0 to 100.
    pub fn scroll_percent(&self) -> u8 {
        let max_offset = self.max_offset();
        if max_offset == 0 {
            return 100;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        {
            ((self.offset as f64 / max_offset as f64) * 100.0).round() as u8
        }
    }

    pub const fn scroll_up(&mut self, n: usize) {
        self.offset = self.offset.saturating_sub(n);
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.max_offset());
    }

    pub const fn page_up(&mut self) {
        self.scroll_up(self.height as usize);
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height as usize);
    }

    pub const fn half_page_up(&mut self) {
        self.scroll_up(self.height as usize / 2);
    }

    pub fn half_page_down(&mut self) {
        self.scroll_down(self.height as usize / 2);
    }

    pub const fn go_to_top(&mut self) {
        self.offset = 0;
    }

    pub const fn go_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    /// Put `line` at the top of the pane, as far as the document allows.
    pub fn go_to_line(&mut self, line: usize) {
        self.offset = line.min(self.max_offset());
    }

    /// Scroll the least amount that makes `line` visible.
    pub fn reveal_line(&mut self, line: usize) {
        let height = (self.height as usize).max(1);
        if line < self.offset {
            self.offset = line;
        } else if line >= self.offset + height {
            self.offset = (line + 1 - height).min(self.max_offset());
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn set_total_lines(&mut self, total: usize) {
        self.total_lines = total;
        self.offset = self.offset.min(self.max_offset());
    }

    const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_down_clamps_to_last_page() {
        let mut vp = Viewport::new(80, 24, 100);
        vp.scroll_down(1000);
        assert_eq!(vp.offset(), 76);
        assert_eq!(vp.visible_range(), 76..100);
    }

    #[test]
    fn test_page_and_half_page_moves() {
        let mut vp = Viewport::new(80, 24, 100);
        vp.page_down();
        assert_eq!(vp.offset(), 24);
        vp.half_page_down();
        assert_eq!(vp.offset(), 36);
        vp.half_page_up();
        vp.page_up();
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn test_short_document_fits() {
        let mut vp = Viewport::new(80, 24, 10);
        vp.page_down();
        assert_eq!(vp.offset(), 0);
        assert_eq!(vp.visible_range(), 0..10);
        assert_eq!(vp.scroll_percent(), 100);
    }

    #[test]
    fn test_reveal_line_scrolls_minimally() {
        let mut vp = Viewport::new(80, 10, 100);
        vp.reveal_line(5);
        assert_eq!(vp.offset(), 0);
        vp.reveal_line(14);
        assert_eq!(vp.offset(), 5);
        vp.reveal_line(2);
        assert_eq!(vp.offset(), 2);
    }

    #[test]
    fn test_go_to_line_clamps() {
        let mut vp = Viewport::new(80, 24, 100);
        vp.go_to_line(50);
        assert_eq!(vp.offset(), 50);
        vp.go_to_line(1000);
        assert_eq!(vp.offset(), 76);
    }

    #[test]
    fn test_shrinking_document_keeps_offset_valid() {
        let mut vp = Viewport::new(80, 24, 100);
        vp.scroll_down(80);
        vp.set_total_lines(50);
        assert_eq!(vp.offset(), 26);
        vp.resize(80, 60);
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn test_scroll_percent_midway() {
        let mut vp = Viewport::new(80, 24, 100);
        vp.go_to_line(38);
        assert_eq!(vp.scroll_percent(), 50);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn offset_never_exceeds_last_page(
                total_lines in 0..10000usize,
                height in 1..100u16,
                amount in 0..10000usize,
            ) {
                let mut vp = Viewport::new(80, height, total_lines);
                vp.scroll_down(amount);
                prop_assert!(vp.offset() <= total_lines.saturating_sub(height as usize));
                let range = vp.visible_range();
                prop_assert!(range.start <= range.end);
                prop_assert!(range.end <= total_lines);
                prop_assert!(vp.scroll_percent() <= 100);
            }

            #[test]
            fn revealed_line_is_visible(
                total_lines in 1..5000usize,
                height in 1..100u16,
                start in 0..5000usize,
                line in 0..5000usize,
            ) {
                let line = line % total_lines;
                let mut vp = Viewport::new(80, height, total_lines);
                vp.go_to_line(start);
                vp.reveal_line(line);
                prop_assert!(vp.visible_range().contains(&line));
            }
        }
    }
}
