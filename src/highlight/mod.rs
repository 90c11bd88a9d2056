//! Syntax highlighting for code blocks.
//!
//! Regex-based: each language has a table of keyword and structural rules
//! (see [`languages`]). Every rule colors the bytes it matches, in table
//! order, so a later rule wins where two overlap. This is a flat
//! last-write-wins model, not a token stream.
//!
//! Code that looks like a directory listing (see [`is_tree_output`]) gets
//! tree coloring instead when the block is untagged or tagged as shell.

mod cache;
mod languages;
mod tree;

pub use cache::PatternCache;
pub use languages::{Language, TokenKind, language_for_extension};
pub use tree::is_tree_output;

use crate::style::{Background, Color, Style, StyledRun, adjust_fg_for_background, coalesce_runs};

/// Highlighter with its own compiled-pattern cache.
///
/// Owned by a rendering session; patterns compile on first use and stay
/// cached until the highlighter is dropped.
#[derive(Debug, Default)]
pub struct Highlighter {
    cache: PatternCache,
    background: Background,
}

impl Highlighter {
    pub fn new(background: Background) -> Self {
        Self {
            cache: PatternCache::new(),
            background,
        }
    }

    pub const fn background(&self) -> Background {
        self.background
    }

    pub const fn cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Highlight with a default monospaced base style.
    pub fn highlight(&mut self, code: &str, language: Option<&str>) -> Vec<StyledRun> {
        self.highlight_with_base(code, language, &Style::default().code())
    }

    /// Highlight `code` on top of `base`.
    ///
    /// Never fails: without a recognized language the whole input comes back
    /// as a single monospaced run.
    pub fn highlight_with_base(
        &mut self,
        code: &str,
        language: Option<&str>,
        base: &Style,
    ) -> Vec<StyledRun> {
        let _scope = crate::perf::scope("highlight.code");
        let base = base.code();
        if code.is_empty() {
            return Vec::new();
        }
        let Some(language) = resolve_language(code, language) else {
            return vec![StyledRun::new(code, base)];
        };

        let mut kinds: Vec<Option<TokenKind>> = vec![None; code.len()];
        for rule in language.rules() {
            let Some(re) = self.cache.get(rule) else {
                continue;
            };
            for caps in re.captures_iter(code) {
                if let Some(m) = caps.get(rule.group) {
                    kinds[m.range()].fill(Some(rule.kind));
                }
            }
        }
        tracing::trace!(?language, bytes = code.len(), "highlighted code block");

        let mut runs = Vec::new();
        let mut start = 0;
        let mut current = kinds[0];
        for (byte, _) in code.char_indices().skip(1) {
            if kinds[byte] != current {
                runs.push(self.styled(&code[start..byte], current, &base));
                start = byte;
                current = kinds[byte];
            }
        }
        runs.push(self.styled(&code[start..], current, &base));
        coalesce_runs(runs)
    }

    fn styled(&self, text: &str, kind: Option<TokenKind>, base: &Style) -> StyledRun {
        let Some(kind) = kind else {
            return StyledRun::new(text, base.clone());
        };
        let mut style = base
            .clone()
            .with_fg(adjust_fg_for_background(token_color(kind), self.background));
        match kind {
            TokenKind::Comment => style = style.italic(),
            TokenKind::TreeLabel => style = style.bold(),
            _ => {}
        }
        StyledRun::new(text, style)
    }
}

/// Highlight with a throwaway highlighter (dark background).
pub fn highlight_code(code: &str, language: Option<&str>) -> Vec<StyledRun> {
    Highlighter::default().highlight(code, language)
}

/// Pick the rule table for a block, or `None` for plain monospaced output.
///
/// Tree detection wins for untagged and shell-tagged blocks; explicit
/// `tree`/`directory`/`output` tags always get tree coloring.
pub fn resolve_language(code: &str, tag: Option<&str>) -> Option<Language> {
    let tag = tag.map(str::trim).filter(|t| !t.is_empty());
    match tag.map(Language::from_tag) {
        None => is_tree_output(code).then_some(Language::Tree),
        Some(Language::Shell) if is_tree_output(code) => Some(Language::Tree),
        Some(language) => Some(language),
    }
}

/// Base (dark background) color for a token kind.
pub const fn token_color(kind: TokenKind) -> Color {
    match kind {
        TokenKind::Keyword => Color::rgb(249, 38, 114),
        TokenKind::String | TokenKind::JsonValue | TokenKind::AttributeValue => {
            Color::rgb(230, 219, 116)
        }
        TokenKind::Comment | TokenKind::TreeBranch => Color::rgb(117, 113, 94),
        TokenKind::Number | TokenKind::Literal | TokenKind::TreeVersion => {
            Color::rgb(174, 129, 255)
        }
        TokenKind::Variable | TokenKind::TreeArrow => Color::rgb(253, 151, 31),
        TokenKind::JsonKey | TokenKind::TreeFile => Color::rgb(102, 217, 239),
        TokenKind::Tag => Color::rgb(249, 38, 114),
        TokenKind::Attribute | TokenKind::TreeLabel | TokenKind::TreeSuccess => {
            Color::rgb(166, 226, 46)
        }
        TokenKind::TreeFailure => Color::rgb(255, 85, 85),
    }
}
