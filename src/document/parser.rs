//! Line-scanning block parser.
//!
//! The parser walks the document once, line by line, with a little lookahead
//! for fenced constructs (code, display math, frontmatter) and accumulation
//! for multi-line constructs (lists, tables, blockquotes). It never fails:
//! anything it does not recognize becomes a paragraph.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Block, Checkbox, Document, FrontmatterEntry, ListItem, ListMarker};

static IMAGE_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"^!\[([^\]]*)\]\(([^)]*)\)$"));
static LIST_ITEM: LazyLock<Option<Regex>> =
    LazyLock::new(|| compile(r"^([ \t]*)([-*+]|[0-9]+\.) (.*)$"));

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(%pattern, %err, "block pattern failed to compile");
            None
        }
    }
}

/// Parse markdown source into a [`Document`].
///
/// # Example
///
/// ```
/// use markview::document::{Block, Document};
///
/// let doc = Document::parse("# Title\n## Sub");
/// assert_eq!(doc.blocks()[0], Block::Heading { level: 1, text: "Title".into() });
/// ```
impl Document {
    pub fn parse(source: &str) -> Self {
        Self::from_blocks(source.to_string(), parse_blocks(source))
    }
}

/// Parse markdown source into an ordered block sequence.
pub fn parse_blocks(source: &str) -> Vec<Block> {
    let _scope = crate::perf::scope("document.parse_blocks");
    let lines: Vec<&str> = source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let mut parser = BlockParser::new(&lines);
    parser.run();
    tracing::debug!(
        lines = lines.len(),
        blocks = parser.blocks.len(),
        "parsed markdown blocks"
    );
    crate::perf::log_event(
        "document.parse_blocks",
        format!("{} lines -> {} blocks", lines.len(), parser.blocks.len()),
    );
    parser.blocks
}

struct BlockParser<'a> {
    lines: &'a [&'a str],
    pos: usize,
    blocks: Vec<Block>,
    pending_list: Vec<ListItem>,
}

impl<'a> BlockParser<'a> {
    const fn new(lines: &'a [&'a str]) -> Self {
        Self {
            lines,
            pos: 0,
            blocks: Vec::new(),
            pending_list: Vec::new(),
        }
    }

    fn run(&mut self) {
        self.parse_frontmatter();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            if let Some(item) = parse_list_item(line) {
                self.pending_list.push(item);
                self.pos += 1;
                continue;
            }
            self.flush_list();
            self.parse_line(line);
        }
        self.flush_list();
    }

    /// Consume a leading `---` section if it is closed; otherwise leave the
    /// position untouched so the opening line parses as ordinary content.
    fn parse_frontmatter(&mut self) {
        if self.lines.first().map(|line| line.trim_end()) != Some("---") {
            return;
        }
        let Some(close) = self
            .lines
            .iter()
            .skip(1)
            .position(|line| line.trim() == "---")
            .map(|idx| idx + 1)
        else {
            return;
        };

        let entries = self.lines[1..close]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| match line.split_once(':') {
                Some((key, value)) => FrontmatterEntry::Pair {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                },
                None => FrontmatterEntry::Raw(line.trim().to_string()),
            })
            .collect();
        self.blocks.push(Block::Frontmatter { entries });
        self.pos = close + 1;
    }

    fn parse_line(&mut self, line: &str) {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            self.pos += 1;
        } else if let Some(info) = trimmed.strip_prefix("```") {
            self.parse_code_fence(info.trim());
        } else if trimmed == "$$" {
            self.parse_display_math();
        } else if let Some((level, text)) = parse_heading(line) {
            self.blocks.push(Block::Heading {
                level,
                text: text.to_string(),
            });
            self.pos += 1;
        } else if is_horizontal_rule(trimmed) {
            self.blocks.push(Block::HorizontalRule);
            self.pos += 1;
        } else if is_table_line(trimmed) {
            self.parse_table();
        } else if line.starts_with("> ") {
            self.parse_blockquote();
        } else if let Some((alt, path)) = parse_image(trimmed) {
            self.blocks.push(Block::Image { alt, path });
            self.pos += 1;
        } else {
            self.blocks.push(Block::Paragraph {
                text: unescape_paragraph(trimmed).to_string(),
            });
            self.pos += 1;
        }
    }

    /// Fenced code; an unterminated fence runs to the end of input.
    fn parse_code_fence(&mut self, info: &str) {
        self.pos += 1;
        let mut body = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if line.trim_start().starts_with("```") {
                break;
            }
            body.push(line);
        }
        let code = body.join("\n");

        if info.eq_ignore_ascii_case("mermaid") {
            self.blocks.push(Block::MermaidBlock { code });
        } else {
            let language = (!info.is_empty()).then(|| info.to_string());
            self.blocks.push(Block::CodeBlock { code, language });
        }
    }

    fn parse_display_math(&mut self) {
        self.pos += 1;
        let mut body = Vec::new();
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos];
            self.pos += 1;
            if line.trim() == "$$" {
                break;
            }
            body.push(line);
        }
        self.blocks.push(Block::DisplayMath {
            latex: body.join("\n"),
        });
    }

    fn parse_table(&mut self) {
        let mut rows = Vec::new();
        while self.pos < self.lines.len() {
            let trimmed = self.lines[self.pos].trim();
            if !is_table_line(trimmed) {
                break;
            }
            self.pos += 1;
            if is_separator_row(trimmed) {
                continue;
            }
            rows.push(split_table_row(trimmed));
        }
        if rows.is_empty() {
            return;
        }
        self.blocks.push(Block::Table { rows });
    }

    fn parse_blockquote(&mut self) {
        let mut body = Vec::new();
        while self.pos < self.lines.len() {
            let Some(rest) = self.lines[self.pos].strip_prefix("> ") else {
                break;
            };
            body.push(rest);
            self.pos += 1;
        }
        self.blocks.push(Block::Blockquote {
            text: body.join("\n"),
        });
    }

    fn flush_list(&mut self) {
        if self.pending_list.is_empty() {
            return;
        }
        let items = std::mem::take(&mut self.pending_list);
        self.blocks.push(Block::List { items });
    }
}

/// `#` x 1-4 followed by a space. Five or more hashes are not a heading.
fn parse_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if !(1..=4).contains(&hashes) {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    let level = u8::try_from(hashes).ok()?;
    Some((level, rest.trim()))
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '_' | '*')
        && trimmed.chars().count() >= 3
        && chars.all(|c| c == first)
}

fn is_table_line(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn is_separator_row(trimmed: &str) -> bool {
    trimmed
        .chars()
        .all(|c| matches!(c, '|' | '-' | ':') || c.is_whitespace())
}

/// Drop a leading `\` that keeps a line from reading as another block
/// kind (or that escapes another backslash).
fn unescape_paragraph(trimmed: &str) -> &str {
    trimmed
        .strip_prefix('\\')
        .filter(|rest| rest.starts_with('\\') || !is_plain_paragraph(rest))
        .unwrap_or(trimmed)
}

/// True when `text` on a line of its own parses as exactly that paragraph.
pub(super) fn is_plain_paragraph(text: &str) -> bool {
    let lines = [text];
    let mut parser = BlockParser::new(&lines);
    parser.run();
    matches!(parser.blocks.as_slice(), [Block::Paragraph { text: t }] if t == text)
}

fn split_table_row(trimmed: &str) -> Vec<String> {
    let mut cells: Vec<String> = trimmed.split('|').map(|c| c.trim().to_string()).collect();
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    cells
}

fn parse_image(trimmed: &str) -> Option<(String, String)> {
    let caps = (*IMAGE_LINE).as_ref()?.captures(trimmed)?;
    Some((caps[1].to_string(), caps[2].trim().to_string()))
}

fn parse_list_item(line: &str) -> Option<ListItem> {
    let caps = (*LIST_ITEM).as_ref()?.captures(line)?;
    let marker_text = &caps[2];
    let marker = match marker_text.chars().next() {
        Some(c @ ('-' | '*' | '+')) => ListMarker::Bullet(c),
        // Numbers too large for u64 saturate; the line is still a list item.
        _ => ListMarker::Ordered(marker_text.trim_end_matches('.').parse().unwrap_or(u64::MAX)),
    };
    let (checkbox, text) = split_checkbox(&caps[3]);
    Some(ListItem {
        level: indent_level(&caps[1]),
        marker,
        checkbox,
        text: text.trim().to_string(),
    })
}

/// Two columns of indentation per level; tabs count as four columns.
fn indent_level(indent: &str) -> usize {
    let width: usize = indent.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum();
    width / 2
}

fn split_checkbox(text: &str) -> (Option<Checkbox>, &str) {
    let state = match text.get(..3) {
        Some("[ ]") => Checkbox::Unchecked,
        Some("[x]" | "[X]") => Checkbox::Checked,
        _ => return (None, text),
    };
    let rest = &text[3..];
    if rest.is_empty() {
        return (Some(state), rest);
    }
    match rest.strip_prefix(' ') {
        Some(rest) => (Some(state), rest),
        None => (None, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> Block {
        Block::Paragraph {
            text: text.to_string(),
        }
    }

    fn item(level: usize, marker: ListMarker, text: &str) -> ListItem {
        ListItem {
            level,
            marker,
            checkbox: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_headings_levels_one_to_four() {
        let blocks = parse_blocks("# One\n## Two\n### Three\n#### Four");
        let levels: Vec<u8> = blocks
            .iter()
            .map(|b| match b {
                Block::Heading { level, .. } => *level,
                other => panic!("unexpected block {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_five_hashes_is_paragraph() {
        assert_eq!(parse_blocks("##### Deep"), vec![para("##### Deep")]);
    }

    #[test]
    fn test_hash_without_space_is_paragraph() {
        assert_eq!(parse_blocks("#hashtag"), vec![para("#hashtag")]);
    }

    #[test]
    fn test_each_line_is_its_own_paragraph() {
        assert_eq!(
            parse_blocks("first line\nsecond line\n\nthird"),
            vec![para("first line"), para("second line"), para("third")]
        );
    }

    #[test]
    fn test_list_accumulates_consecutive_items() {
        let blocks = parse_blocks("- a\n* b\n+ c\n1. d");
        assert_eq!(
            blocks,
            vec![Block::List {
                items: vec![
                    item(0, ListMarker::Bullet('-'), "a"),
                    item(0, ListMarker::Bullet('*'), "b"),
                    item(0, ListMarker::Bullet('+'), "c"),
                    item(0, ListMarker::Ordered(1), "d"),
                ]
            }]
        );
    }

    #[test]
    fn test_list_nesting_from_indentation() {
        let blocks = parse_blocks("- a\n  - b\n    - c\n\t- d\n   - e");
        let Block::List { items } = &blocks[0] else {
            panic!("expected list, got {blocks:?}");
        };
        let levels: Vec<usize> = items.iter().map(|i| i.level).collect();
        assert_eq!(levels, vec![0, 1, 2, 2, 1]);
    }

    #[test]
    fn test_blank_line_splits_lists() {
        let blocks = parse_blocks("- a\n\n- b");
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| matches!(b, Block::List { .. })));
    }

    #[test]
    fn test_non_list_line_flushes_list_first() {
        let blocks = parse_blocks("- a\n# Head\n- b");
        assert!(matches!(blocks[0], Block::List { .. }));
        assert!(matches!(blocks[1], Block::Heading { .. }));
        assert!(matches!(blocks[2], Block::List { .. }));
    }

    #[test]
    fn test_task_items_record_checkbox_state() {
        let blocks = parse_blocks("- [ ] todo\n- [x] done\n- [X] also\n- [y] not a box");
        let Block::List { items } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items[0].checkbox, Some(Checkbox::Unchecked));
        assert_eq!(items[0].text, "todo");
        assert_eq!(items[1].checkbox, Some(Checkbox::Checked));
        assert_eq!(items[2].checkbox, Some(Checkbox::Checked));
        assert_eq!(items[3].checkbox, None);
        assert_eq!(items[3].text, "[y] not a box");
    }

    #[test]
    fn test_emphasis_line_is_not_a_list() {
        assert_eq!(parse_blocks("*not a list*"), vec![para("*not a list*")]);
    }

    #[test]
    fn test_table_drops_separator_row() {
        let blocks = parse_blocks("| A | B |\n|---|---|\n| 1 | 2 |");
        assert_eq!(
            blocks,
            vec![Block::Table {
                rows: vec![
                    vec!["A".to_string(), "B".to_string()],
                    vec!["1".to_string(), "2".to_string()],
                ]
            }]
        );
    }

    #[test]
    fn test_table_alignment_separator_is_dropped() {
        let blocks = parse_blocks("| L | C |\n|:--|:-:|\n| x | y |");
        let Block::Table { rows } = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["L", "C"]);
    }

    #[test]
    fn test_table_keeps_interior_empty_cells() {
        let blocks = parse_blocks("| a |  | c |");
        assert_eq!(
            blocks,
            vec![Block::Table {
                rows: vec![vec!["a".to_string(), String::new(), "c".to_string()]]
            }]
        );
    }

    #[test]
    fn test_code_fence_with_language() {
        let blocks = parse_blocks("```rust\nfn main() {}\n```\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::CodeBlock {
                    code: "fn main() {}".to_string(),
                    language: Some("rust".to_string()),
                },
                para("after"),
            ]
        );
    }

    #[test]
    fn test_code_fence_without_language() {
        let blocks = parse_blocks("```\nplain\n```");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                code: "plain".to_string(),
                language: None,
            }]
        );
    }

    #[test]
    fn test_unterminated_fence_consumes_to_eof() {
        let blocks = parse_blocks("```py\nx = 1\n# not a heading");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                code: "x = 1\n# not a heading".to_string(),
                language: Some("py".to_string()),
            }]
        );
    }

    #[test]
    fn test_code_fence_preserves_blank_lines_and_indentation() {
        let blocks = parse_blocks("```\n  a\n\n  b\n```");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                code: "  a\n\n  b".to_string(),
                language: None,
            }]
        );
    }

    #[test]
    fn test_mermaid_fence_is_case_insensitive() {
        let blocks = parse_blocks("```Mermaid\ngraph TD\n```");
        assert_eq!(
            blocks,
            vec![Block::MermaidBlock {
                code: "graph TD".to_string()
            }]
        );
    }

    #[test]
    fn test_display_math() {
        let blocks = parse_blocks("$$\nE = mc^2\n$$\ntext");
        assert_eq!(
            blocks,
            vec![
                Block::DisplayMath {
                    latex: "E = mc^2".to_string()
                },
                para("text"),
            ]
        );
    }

    #[test]
    fn test_unterminated_display_math_runs_to_eof() {
        let blocks = parse_blocks("$$\na\nb");
        assert_eq!(
            blocks,
            vec![Block::DisplayMath {
                latex: "a\nb".to_string()
            }]
        );
    }

    #[test]
    fn test_blockquote_accumulates_lines() {
        let blocks = parse_blocks("> one\n> two\nthree");
        assert_eq!(
            blocks,
            vec![
                Block::Blockquote {
                    text: "one\ntwo".to_string()
                },
                para("three"),
            ]
        );
    }

    #[test]
    fn test_horizontal_rules() {
        for rule in ["---", "***", "___", "-----", "  ---  "] {
            assert_eq!(parse_blocks(rule), vec![Block::HorizontalRule], "{rule}");
        }
        assert_eq!(parse_blocks("-_-"), vec![para("-_-")]);
        assert_eq!(parse_blocks("--"), vec![para("--")]);
    }

    #[test]
    fn test_image_line() {
        let blocks = parse_blocks("![Logo](img/logo.png)");
        assert_eq!(
            blocks,
            vec![Block::Image {
                alt: "Logo".to_string(),
                path: "img/logo.png".to_string(),
            }]
        );
    }

    #[test]
    fn test_image_with_trailing_text_is_paragraph() {
        let blocks = parse_blocks("![Logo](logo.png) and more");
        assert_eq!(blocks, vec![para("![Logo](logo.png) and more")]);
    }

    #[test]
    fn test_frontmatter_pairs_and_raw_lines() {
        let blocks = parse_blocks("---\ntitle: Notes\ntags: a, b\njust text\n---\n# Body");
        assert_eq!(
            blocks,
            vec![
                Block::Frontmatter {
                    entries: vec![
                        FrontmatterEntry::Pair {
                            key: "title".to_string(),
                            value: "Notes".to_string(),
                        },
                        FrontmatterEntry::Pair {
                            key: "tags".to_string(),
                            value: "a, b".to_string(),
                        },
                        FrontmatterEntry::Raw("just text".to_string()),
                    ]
                },
                Block::Heading {
                    level: 1,
                    text: "Body".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_frontmatter_value_keeps_later_colons() {
        let blocks = parse_blocks("---\nurl: https://example.com\n---");
        assert_eq!(
            blocks,
            vec![Block::Frontmatter {
                entries: vec![FrontmatterEntry::Pair {
                    key: "url".to_string(),
                    value: "https://example.com".to_string(),
                }]
            }]
        );
    }

    #[test]
    fn test_unterminated_frontmatter_restarts_as_content() {
        let blocks = parse_blocks("---\ntitle: Notes\nbody");
        assert_eq!(
            blocks,
            vec![Block::HorizontalRule, para("title: Notes"), para("body")]
        );
    }

    #[test]
    fn test_frontmatter_only_at_document_start() {
        let blocks = parse_blocks("intro\n---\nkey: value\n---");
        assert_eq!(
            blocks,
            vec![
                para("intro"),
                Block::HorizontalRule,
                para("key: value"),
                Block::HorizontalRule,
            ]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let blocks = parse_blocks("# Title\r\n- a\r\n- b\r\n");
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                text: "Title".to_string()
            }
        );
    }

    #[test]
    fn test_empty_input_has_no_blocks() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("\n\n   \n").is_empty());
    }

    #[test]
    fn test_oversized_ordered_marker_is_still_a_list() {
        let blocks = parse_blocks("99999999999999999999. item");
        assert_eq!(
            blocks,
            vec![Block::List {
                items: vec![item(0, ListMarker::Ordered(u64::MAX), "item")]
            }]
        );
    }

    #[test]
    fn test_backslash_escapes_block_syntax() {
        assert_eq!(
            parse_blocks("\\# not a heading\n\\> not a quote\n\\\\x"),
            vec![para("# not a heading"), para("> not a quote"), para("\\x")]
        );
    }

    #[test]
    fn test_backslash_before_plain_text_is_kept() {
        assert_eq!(parse_blocks("\\alpha + \\beta"), vec![para("\\alpha + \\beta")]);
    }

    #[test]
    fn test_trailing_list_is_flushed() {
        let blocks = parse_blocks("para\n- last");
        assert!(matches!(blocks.last(), Some(Block::List { .. })));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(source in "[-#*|>`$!\\[\\]()a-z0-9 \t\n]{0,200}") {
                let _ = parse_blocks(&source);
            }

            #[test]
            fn plain_words_keep_reading_order(
                words in proptest::collection::vec("[a-z]{1,8}", 1..20)
            ) {
                let source = words.join("\n");
                let blocks = parse_blocks(&source);
                let texts: Vec<String> = blocks.iter().map(Block::text_content).collect();
                prop_assert_eq!(texts, words);
            }
        }
    }
}
