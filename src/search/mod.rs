//! Search over rendered text.
//!
//! Provides:
//! - Case-insensitive, non-overlapping match finding
//! - A current-match cursor with wrapping navigation
//! - Match highlighting over styled runs
//! - Centered scroll targets for the current match
//!
//! Offsets are character offsets into the rendered plain text. A new query
//! or new content always recomputes matches from scratch.

mod highlight;

pub use highlight::apply_highlights;

use crate::document::block_index_for_offset;
use crate::render::RenderedDocument;
use crate::viewport::Viewport;

/// One occurrence of the query in the searched text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    /// Character offset of the first matched character
    pub offset: usize,
    /// Length in characters
    pub len: usize,
    /// Block containing the match, when searching a rendered document
    pub block: Option<usize>,
    pub is_current: bool,
}

impl SearchMatch {
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Find every case-insensitive occurrence of `query` in `text`.
///
/// Matches never overlap: each one consumes its full length before the scan
/// resumes. An empty query finds nothing.
pub fn find_matches(text: &str, query: &str) -> Vec<SearchMatch> {
    let needle = fold(query);
    if needle.is_empty() {
        return Vec::new();
    }
    let haystack = fold(text);
    let mut matches = Vec::new();
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()] == needle[..] {
            matches.push(SearchMatch {
                offset: i,
                len: needle.len(),
                block: None,
                is_current: false,
            });
            i += needle.len();
        } else {
            i += 1;
        }
    }
    tracing::trace!(query, count = matches.len(), "search scan finished");
    matches
}

/// Lowercase one character at a time so offsets stay one-to-one with the
/// original text. Characters whose lowercase form expands keep their case.
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l,
                _ => c,
            }
        })
        .collect()
}

/// Zero-based line containing a character offset.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    text.chars().take(offset).filter(|&c| c == '\n').count()
}

/// Scroll offset that centers a span of lines in the viewport.
///
/// Clamped to `[0, content_height - viewport_height]`.
pub const fn centered_offset(
    match_top: usize,
    match_height: usize,
    viewport_height: usize,
    content_height: usize,
) -> usize {
    let center = match_top + match_height / 2;
    let target = center.saturating_sub(viewport_height / 2);
    let max = content_height.saturating_sub(viewport_height);
    if target > max { max } else { target }
}

/// Active search: query, matches and the current-match cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    query: String,
    matches: Vec<SearchMatch>,
    current: usize,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Search plain text, replacing any previous results.
    ///
    /// Returns the number of matches; the cursor starts at the first one.
    pub fn search(&mut self, text: &str, query: &str) -> usize {
        let _scope = crate::perf::scope("search.find");
        self.query = query.to_string();
        self.matches = find_matches(text, query);
        self.current = 0;
        self.mark_current();
        crate::perf::log_event(
            "search.find",
            format!("query={query:?} matches={}", self.matches.len()),
        );
        self.matches.len()
    }

    /// Search a rendered document and record which block each match is in.
    pub fn search_document(&mut self, document: &RenderedDocument, query: &str) -> usize {
        let count = self.search(document.plain_text(), query);
        let ranges = document.block_ranges();
        for m in &mut self.matches {
            m.block = block_index_for_offset(ranges, m.offset);
        }
        count
    }

    /// Forget the query and all matches.
    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = 0;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn count(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub const fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.matches.get(self.current)
    }

    /// Advance to the next match, wrapping to the first.
    pub fn next(&mut self) -> Option<&SearchMatch> {
        if !self.matches.is_empty() {
            self.current = (self.current + 1) % self.matches.len();
            self.mark_current();
        }
        self.current_match()
    }

    /// Step back to the previous match, wrapping to the last.
    pub fn previous(&mut self) -> Option<&SearchMatch> {
        if !self.matches.is_empty() {
            self.current = (self.current + self.matches.len() - 1) % self.matches.len();
            self.mark_current();
        }
        self.current_match()
    }

    /// Jump to a match index, clamped to the valid range.
    pub fn set_current(&mut self, index: usize) {
        self.current = index.min(self.matches.len().saturating_sub(1));
        self.mark_current();
    }

    /// Scroll `viewport` so the current match sits in the middle.
    ///
    /// `text` must be the text the matches were computed on. Returns false
    /// when there is no current match.
    pub fn scroll_to_current(&self, text: &str, viewport: &mut Viewport) -> bool {
        let Some(m) = self.current_match() else {
            return false;
        };
        let top = line_of_offset(text, m.offset);
        let bottom = line_of_offset(text, m.end().saturating_sub(1).max(m.offset));
        viewport.center_on(top, bottom - top + 1);
        true
    }

    fn mark_current(&mut self) {
        let current = self.current;
        for (i, m) in self.matches.iter_mut().enumerate() {
            m.is_current = i == current;
        }
    }
}
