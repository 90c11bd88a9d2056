//! Line-based scroll window over rendered output.
//!
//! The host measures its rendered content in lines; [`Viewport`] keeps the
//! top visible line within `[0, total_lines - height]` whatever the caller
//! asks for.

use std::ops::Range;

/// Visible slice of a document measured in lines.
///
/// # Example
///
/// ```
/// use markview::viewport::Viewport;
///
/// let mut vp = Viewport::new(20, 100);
/// vp.center_on(50, 1);
/// assert_eq!(vp.visible_range(), 40..60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    height: usize,
    offset: usize,
    total_lines: usize,
}

impl Viewport {
    pub const fn new(height: usize, total_lines: usize) -> Self {
        Self {
            height,
            offset: 0,
            total_lines,
        }
    }

    /// First visible line.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn total_lines(&self) -> usize {
        self.total_lines
    }

    /// Largest offset that still fills the window.
    pub const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.height)
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.offset..(self.offset + self.height).min(self.total_lines)
    }

    pub fn is_visible(&self, line: usize) -> bool {
        self.visible_range().contains(&line)
    }

    /// Put `line` at the top of the window, or as close as the bounds allow.
    pub fn go_to_line(&mut self, line: usize) {
        self.offset = line.min(self.max_offset());
    }

    /// Center the `span` lines starting at `top` in the window.
    pub fn center_on(&mut self, top: usize, span: usize) {
        self.offset =
            crate::search::centered_offset(top, span.max(1), self.height, self.total_lines);
    }
}
