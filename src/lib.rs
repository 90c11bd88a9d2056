// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. render::RenderedDocument)
    clippy::module_name_repetitions
)]

//! # Markview
//!
//! The rendering and text-intelligence core of a markdown viewer.
//!
//! Markview turns markdown source into styled output with:
//! - A line-scanning block parser for a practical markdown subset
//! - Inline emphasis, code, links and math
//! - Regex-based syntax highlighting for code blocks
//! - Case-insensitive search with match navigation
//! - Fuzzy matching for quick-open style pickers
//!
//! ## Pipeline
//!
//! Source text is parsed into a [`document::Document`] of blocks. A
//! [`render::RenderContext`] formats each block (inline formatter for text,
//! highlighter for code, cached images for diagrams and math) into a
//! [`render::RenderedDocument`], which [`search::SearchState`] scans for
//! matches. Nothing is incremental: every change reparses and re-renders.
//!
//! ```
//! use markview::prelude::*;
//!
//! let doc = Document::parse("# Notes\n\nThe *cat* sat.");
//! let mut ctx = RenderContext::default();
//! let rendered = ctx.render(&doc);
//! assert_eq!(rendered.plain_text(), "Notes\nThe cat sat.");
//!
//! let mut search = SearchState::new();
//! assert_eq!(search.search_document(&rendered, "at"), 2);
//! ```
//!
//! ## Modules
//!
//! - [`document`]: Block model, parser and markdown writer
//! - [`inline`]: Inline formatting into styled runs
//! - [`highlight`]: Syntax highlighting
//! - [`search`]: Match finding, navigation and highlighting
//! - [`fuzzy`]: Fuzzy matching and ranking
//! - [`render`]: Rendering session and diagram/math image cache
//! - [`viewport`]: Scroll window
//! - [`style`]: Styles, colors and settings
//! - [`config`]: Saved flag defaults

pub mod config;
pub mod document;
pub mod fuzzy;
pub mod highlight;
pub mod inline;
pub mod perf;
pub mod render;
pub mod search;
pub mod style;
pub mod viewport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::document::{Block, Document};
    pub use crate::fuzzy::{FuzzyMatchResult, fuzzy_match};
    pub use crate::highlight::{Highlighter, highlight_code};
    pub use crate::inline::format_inline;
    pub use crate::render::{RenderContext, RenderedDocument};
    pub use crate::search::{SearchState, find_matches};
    pub use crate::style::{Settings, Style, StyledRun};
    pub use crate::viewport::Viewport;
}
