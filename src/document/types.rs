//! Core document types.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Checkbox state of a task list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Checkbox {
    Unchecked,
    Checked,
}

/// Marker that introduced a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListMarker {
    /// `-`, `*` or `+`
    Bullet(char),
    /// `<n>.`
    Ordered(u64),
}

/// One item of a [`Block::List`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// Nesting level, 0 for top-level items
    pub level: usize,
    pub marker: ListMarker,
    pub checkbox: Option<Checkbox>,
    pub text: String,
}

/// One line of a frontmatter section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrontmatterEntry {
    Pair { key: String, value: String },
    /// A line without a colon, kept verbatim
    Raw(String),
}

/// One structural unit of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        items: Vec<ListItem>,
    },
    CodeBlock {
        code: String,
        language: Option<String>,
    },
    MermaidBlock {
        code: String,
    },
    DisplayMath {
        latex: String,
    },
    /// Row 0 is the header row.
    Table {
        rows: Vec<Vec<String>>,
    },
    Image {
        alt: String,
        path: String,
    },
    Blockquote {
        text: String,
    },
    HorizontalRule,
    Frontmatter {
        entries: Vec<FrontmatterEntry>,
    },
}

impl Block {
    /// Plain text of the block used for offset mapping.
    ///
    /// Multi-part blocks join their parts with newlines (list items, table
    /// rows, frontmatter lines) and tabs (table cells).
    pub fn text_content(&self) -> String {
        match self {
            Self::Heading { text, .. } | Self::Paragraph { text } | Self::Blockquote { text } => {
                text.clone()
            }
            Self::List { items } => items
                .iter()
                .map(|item| item.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Self::CodeBlock { code, .. } | Self::MermaidBlock { code } => code.clone(),
            Self::DisplayMath { latex } => latex.clone(),
            Self::Table { rows } => rows
                .iter()
                .map(|row| row.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Image { alt, .. } => alt.clone(),
            Self::HorizontalRule => String::new(),
            Self::Frontmatter { entries } => entries
                .iter()
                .map(|entry| match entry {
                    FrontmatterEntry::Pair { key, value } => format!("{key}: {value}"),
                    FrontmatterEntry::Raw(raw) => raw.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Short name of the variant, for diagnostics and CLI output.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Paragraph { .. } => "paragraph",
            Self::List { .. } => "list",
            Self::CodeBlock { .. } => "code",
            Self::MermaidBlock { .. } => "mermaid",
            Self::DisplayMath { .. } => "math",
            Self::Table { .. } => "table",
            Self::Image { .. } => "image",
            Self::Blockquote { .. } => "blockquote",
            Self::HorizontalRule => "rule",
            Self::Frontmatter { .. } => "frontmatter",
        }
    }
}

/// Reference to a heading in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingRef {
    /// Heading level (1-4)
    pub level: u8,
    /// Heading text (raw, inline markers included)
    pub text: String,
    /// Index of the heading block
    pub block_index: usize,
    /// Anchor id, unique within the document
    pub id: String,
}

/// A parsed markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Original source text
    source: String,
    blocks: Vec<Block>,
}

impl Document {
    /// Create an empty document.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) const fn from_blocks(source: String, blocks: Vec<Block>) -> Self {
        Self { source, blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Join every block's text content with single newlines.
    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Character ranges of each block inside [`Self::text_content`].
    pub fn block_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.blocks.len());
        let mut start = 0;
        for block in &self.blocks {
            let len = block.text_content().chars().count();
            ranges.push(start..start + len);
            start += len + 1;
        }
        ranges
    }

    /// Index of the block containing a character offset of [`Self::text_content`].
    pub fn block_at_offset(&self, offset: usize) -> Option<usize> {
        block_index_for_offset(&self.block_ranges(), offset)
    }

    /// Headings with unique anchor ids, in document order.
    pub fn headings(&self) -> Vec<HeadingRef> {
        let mut ids = AnchorIds::default();
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(block_index, block)| match block {
                Block::Heading { level, text } => Some(HeadingRef {
                    level: *level,
                    text: text.clone(),
                    block_index,
                    id: ids.next_id(text),
                }),
                _ => None,
            })
            .collect()
    }

    /// Find the heading block an internal `#anchor` points at.
    pub fn resolve_anchor(&self, anchor: &str) -> Option<usize> {
        let target = anchor.trim().trim_start_matches('#');
        if target.is_empty() {
            return None;
        }
        let headings = self.headings();
        if let Some(heading) = headings.iter().find(|h| h.id == target) {
            return Some(heading.block_index);
        }
        let normalized = normalize_anchor(target);
        headings
            .iter()
            .find(|h| normalize_anchor(&h.text) == normalized)
            .map(|h| h.block_index)
    }
}

/// Locate the range containing `offset`; offsets on a separator belong to
/// the preceding block.
pub fn block_index_for_offset(ranges: &[Range<usize>], offset: usize) -> Option<usize> {
    let idx = ranges.partition_point(|range| range.end < offset);
    ranges
        .get(idx)
        .filter(|range| range.start <= offset)
        .map(|_| idx)
}

/// Generates unique heading ids within one document.
#[derive(Debug, Default)]
pub(crate) struct AnchorIds {
    seen: std::collections::HashMap<String, usize>,
}

impl AnchorIds {
    pub(crate) fn next_id(&mut self, text: &str) -> String {
        let mut base = normalize_anchor(&strip_inline_markers(text));
        if base.is_empty() {
            base = "section".to_string();
        }
        let count = self.seen.entry(base.clone()).or_insert(0);
        let id = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        id
    }
}

pub(crate) fn normalize_anchor(s: &str) -> String {
    let mut out = String::new();
    let mut last_dash = false;
    for lower in s.chars().flat_map(char::to_lowercase) {
        if lower.is_alphanumeric() {
            out.push(lower);
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}

fn strip_inline_markers(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '*' | '_' | '~' | '`' | '$'))
        .collect()
}
