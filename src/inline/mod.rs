//! Inline formatting.
//!
//! Resolves emphasis, strikethrough, code spans, links and inline math inside
//! a block's text. Each construct is handled by one pass, in a fixed order:
//! bold, italic, strikethrough, code, link, math. A pass scans the current
//! plain text without modifying it, collects the spans it found, and then
//! rebuilds the character list once with the delimiters removed and the
//! inner characters marked. Bold runs before italic so that `**` is never
//! read as two single `*` delimiters.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::style::{FontWeight, Palette, Slant, Style, StyledRun, coalesce_runs};

static BOLD: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\*\*(.+?)\*\*"));
static ITALIC: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"\*([^*\n]+?)\*"));
static STRIKE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"~~(.+?)~~"));
static CODE: LazyLock<Option<Regex>> = LazyLock::new(|| compile(r"`([^`\n]+)`"));
static LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"\[([^\]\n]+)\]\(([^)\s]+)\)"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(%pattern, %err, "inline pattern failed to compile");
            None
        }
    }
}

/// Per-character formatting marks accumulated across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Marks {
    bold: bool,
    italic: bool,
    strike: bool,
    code: bool,
    math: bool,
    /// Index into the collected link targets
    link: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Bold,
    Italic,
    Strike,
    Code,
    Link(usize),
    Math,
}

impl Marks {
    const fn apply(&mut self, mark: Mark) {
        match mark {
            Mark::Bold => self.bold = true,
            Mark::Italic => self.italic = true,
            Mark::Strike => self.strike = true,
            Mark::Code => self.code = true,
            Mark::Link(idx) => self.link = Some(idx),
            Mark::Math => self.math = true,
        }
    }
}

/// A span found by one pass, in character indices of the current text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Annotation {
    outer: Range<usize>,
    inner: Range<usize>,
    mark: Mark,
}

#[derive(Debug, Default)]
struct InlineText {
    chars: Vec<(char, Marks)>,
    links: Vec<String>,
}

impl InlineText {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().map(|c| (c, Marks::default())).collect(),
            links: Vec::new(),
        }
    }

    fn plain(&self) -> String {
        self.chars.iter().map(|(c, _)| *c).collect()
    }

    /// Run a delimiter regex over the current text. Group 1 is the inner
    /// text; when `target_group` is set, that group is stored as a link target.
    fn scan_regex(&mut self, re: &Regex, mark: Mark, target_group: Option<usize>) -> Vec<Annotation> {
        let plain = self.plain();
        let char_index = byte_to_char_index(&plain);
        let mut found = Vec::new();
        for caps in re.captures_iter(&plain) {
            let (Some(outer), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let mark = match (mark, target_group.and_then(|g| caps.get(g))) {
                (Mark::Link(_), Some(target)) => {
                    self.links.push(target.as_str().to_string());
                    Mark::Link(self.links.len() - 1)
                }
                (mark, _) => mark,
            };
            found.push(Annotation {
                outer: char_index[outer.start()]..char_index[outer.end()],
                inner: char_index[inner.start()]..char_index[inner.end()],
                mark,
            });
        }
        found
    }

    /// `$...$` spans whose delimiters are not part of `$$`.
    fn scan_math(&self) -> Vec<Annotation> {
        let chars: Vec<char> = self.chars.iter().map(|(c, _)| *c).collect();
        let is_single_dollar = |i: usize| {
            chars[i] == '$'
                && (i == 0 || chars[i - 1] != '$')
                && chars.get(i + 1).is_none_or(|c| *c != '$')
        };

        let mut found = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if !is_single_dollar(i) {
                i += 1;
                continue;
            }
            let close = (i + 1..chars.len()).find(|&j| is_single_dollar(j));
            let Some(close) = close else {
                break;
            };
            let inner = &chars[i + 1..close];
            let padded = inner.first().is_none_or(|c| c.is_whitespace())
                || inner.last().is_none_or(|c| c.is_whitespace());
            if padded || inner.contains(&'\n') {
                // Not math; the closing `$` may still open a later span.
                i = close;
                continue;
            }
            found.push(Annotation {
                outer: i..close + 1,
                inner: i + 1..close,
                mark: Mark::Math,
            });
            i = close + 1;
        }
        found
    }

    /// Rebuild the character list: drop delimiters, mark inner characters.
    fn materialize(&mut self, annotations: &[Annotation]) {
        if annotations.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.chars.len());
        let mut pending = annotations.iter().peekable();
        for (idx, (ch, mut marks)) in self.chars.iter().copied().enumerate() {
            while pending.peek().is_some_and(|a| a.outer.end <= idx) {
                pending.next();
            }
            match pending.peek() {
                Some(a) if a.outer.contains(&idx) => {
                    if a.inner.contains(&idx) {
                        marks.apply(a.mark);
                        out.push((ch, marks));
                    }
                }
                _ => out.push((ch, marks)),
            }
        }
        self.chars = out;
    }

    fn into_runs(self, base: &Style, palette: &Palette) -> Vec<StyledRun> {
        let mut runs: Vec<StyledRun> = Vec::new();
        let mut current: Option<(Marks, String)> = None;
        for (ch, marks) in self.chars {
            match current.as_mut() {
                Some((m, text)) if *m == marks => text.push(ch),
                _ => {
                    if let Some((m, text)) = current.take() {
                        runs.push(StyledRun::new(text, style_for(base, m, &self.links, palette)));
                    }
                    current = Some((marks, ch.to_string()));
                }
            }
        }
        if let Some((m, text)) = current {
            runs.push(StyledRun::new(text, style_for(base, m, &self.links, palette)));
        }
        coalesce_runs(runs)
    }
}

fn byte_to_char_index(text: &str) -> Vec<usize> {
    let mut index = vec![0; text.len() + 1];
    let mut count = 0;
    for (byte, ch) in text.char_indices() {
        for slot in &mut index[byte..byte + ch.len_utf8()] {
            *slot = count;
        }
        count += 1;
    }
    index[text.len()] = count;
    index
}

fn style_for(base: &Style, marks: Marks, links: &[String], palette: &Palette) -> Style {
    let mut style = base.clone();
    if marks.bold {
        style.weight = FontWeight::Bold;
    }
    if marks.italic {
        style.slant = Slant::Italic;
    }
    if marks.strike {
        style.strikethrough = true;
    }
    if marks.code {
        style = style.code().with_bg(palette.code_bg);
    }
    if let Some(target) = marks.link.and_then(|idx| links.get(idx)) {
        style.fg = Some(palette.link);
        style.underline = true;
        style.link = Some(target.clone());
    }
    if marks.math {
        style = style.code().with_fg(palette.math);
        style.math = true;
    }
    style
}

/// Format inline markdown with the default (dark) palette.
pub fn format_inline(text: &str, base: &Style) -> Vec<StyledRun> {
    format_inline_with(text, base, &Palette::default())
}

/// Format inline markdown into styled runs.
///
/// Never fails: unmatched delimiters stay in the text as literal characters.
/// Inline math comes back as runs with [`Style::math`] set and the LaTeX
/// source as text; resolving it to an image is up to the caller.
pub fn format_inline_with(text: &str, base: &Style, palette: &Palette) -> Vec<StyledRun> {
    let mut inline = InlineText::new(text);
    let passes = [
        (&BOLD, Mark::Bold, None),
        (&ITALIC, Mark::Italic, None),
        (&STRIKE, Mark::Strike, None),
        (&CODE, Mark::Code, None),
        (&LINK, Mark::Link(0), Some(2)),
    ];
    for (re, mark, target_group) in passes {
        let Some(re) = (**re).as_ref() else {
            continue;
        };
        let found = inline.scan_regex(re, mark, target_group);
        inline.materialize(&found);
    }
    let math = inline.scan_math();
    inline.materialize(&math);
    inline.into_runs(base, palette)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::runs_to_string;

    fn fmt(text: &str) -> Vec<StyledRun> {
        format_inline(text, &Style::default())
    }

    #[test]
    fn test_plain_text_keeps_base_style() {
        let base = Style::default().italic();
        let runs = format_inline("nothing special here", &base);
        assert_eq!(runs, vec![StyledRun::new("nothing special here", base)]);
    }

    #[test]
    fn test_empty_text_has_no_runs() {
        assert!(fmt("").is_empty());
    }

    #[test]
    fn test_bold() {
        let runs = fmt("a **bold** b");
        assert_eq!(runs_to_string(&runs), "a bold b");
        assert_eq!(runs[1].text, "bold");
        assert_eq!(runs[1].style.weight, FontWeight::Bold);
        assert_eq!(runs[0].style.weight, FontWeight::Regular);
    }

    #[test]
    fn test_italic() {
        let runs = fmt("an *italic* word");
        assert_eq!(runs_to_string(&runs), "an italic word");
        assert_eq!(runs[1].style.slant, Slant::Italic);
    }

    #[test]
    fn test_bold_matched_before_italic() {
        let runs = fmt("**strong** and *soft*");
        assert_eq!(runs_to_string(&runs), "strong and soft");
        assert_eq!(runs[0].style.weight, FontWeight::Bold);
        assert_eq!(runs[0].style.slant, Slant::Upright);
        assert_eq!(runs[2].style.slant, Slant::Italic);
        assert_eq!(runs[2].style.weight, FontWeight::Regular);
    }

    #[test]
    fn test_triple_star_is_bold_italic() {
        let runs = fmt("***both***");
        assert_eq!(runs_to_string(&runs), "both");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].style.weight, FontWeight::Bold);
        assert_eq!(runs[0].style.slant, Slant::Italic);
    }

    #[test]
    fn test_strikethrough() {
        let runs = fmt("~~gone~~ here");
        assert_eq!(runs[0].text, "gone");
        assert!(runs[0].style.strikethrough);
        assert!(!runs[1].style.strikethrough);
    }

    #[test]
    fn test_inline_code_is_monospace_with_background() {
        let palette = Palette::dark();
        let runs = format_inline_with("run `cargo test` now", &Style::default(), &palette);
        assert_eq!(runs_to_string(&runs), "run cargo test now");
        assert!(runs[1].style.monospace);
        assert_eq!(runs[1].style.bg, Some(palette.code_bg));
    }

    #[test]
    fn test_link_carries_target() {
        let palette = Palette::light();
        let runs = format_inline_with("see [docs](https://x.dev) now", &Style::default(), &palette);
        assert_eq!(runs_to_string(&runs), "see docs now");
        assert_eq!(runs[1].style.link.as_deref(), Some("https://x.dev"));
        assert!(runs[1].style.underline);
        assert_eq!(runs[1].style.fg, Some(palette.link));
    }

    #[test]
    fn test_link_text_keeps_earlier_emphasis() {
        let runs = fmt("[**big** deal](u)");
        assert_eq!(runs_to_string(&runs), "big deal");
        assert_eq!(runs[0].style.weight, FontWeight::Bold);
        assert_eq!(runs[0].style.link.as_deref(), Some("u"));
        assert_eq!(runs[1].style.link.as_deref(), Some("u"));
    }

    #[test]
    fn test_two_links_keep_their_own_targets() {
        let runs = fmt("[a](one) [b](two)");
        assert_eq!(runs[0].style.link.as_deref(), Some("one"));
        assert_eq!(runs[2].style.link.as_deref(), Some("two"));
    }

    #[test]
    fn test_inline_math() {
        let runs = fmt("energy $E=mc^2$ holds");
        assert_eq!(runs_to_string(&runs), "energy E=mc^2 holds");
        assert!(runs[1].style.math);
        assert!(runs[1].style.monospace);
        assert_eq!(runs[1].text, "E=mc^2");
    }

    #[test]
    fn test_double_dollar_is_not_inline_math() {
        let runs = fmt("$$x$$");
        assert_eq!(runs_to_string(&runs), "$$x$$");
        assert!(runs.iter().all(|r| !r.style.math));
    }

    #[test]
    fn test_prices_are_not_math() {
        let runs = fmt("costs $5 or $10 today");
        assert_eq!(runs_to_string(&runs), "costs $5 or $10 today");
        assert!(runs.iter().all(|r| !r.style.math));
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        for text in ["**open", "*half", "~~strike", "`tick", "[text](", "$x"] {
            let runs = fmt(text);
            assert_eq!(runs_to_string(&runs), text);
            assert_eq!(runs.len(), 1, "{text}");
            assert_eq!(runs[0].style, Style::default(), "{text}");
        }
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let runs = fmt("héllo **wörld** ✓");
        assert_eq!(runs_to_string(&runs), "héllo wörld ✓");
        assert_eq!(runs[1].text, "wörld");
    }

    #[test]
    fn test_byte_to_char_index() {
        let idx = byte_to_char_index("aé");
        assert_eq!(idx, vec![0, 1, 1, 2]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn text_without_markers_is_unchanged(text in "[a-zA-Z0-9 .,;:!?'-]{0,80}") {
                let base = Style::default();
                let runs = format_inline(&text, &base);
                prop_assert_eq!(runs_to_string(&runs), text.clone());
                prop_assert!(runs.iter().all(|r| r.style == base));
            }

            #[test]
            fn formatting_never_adds_characters(text in "[a-z*~`$\\[\\]() ]{0,60}") {
                let runs = format_inline(&text, &Style::default());
                prop_assert!(runs_to_string(&runs).chars().count() <= text.chars().count());
            }
        }
    }
}
