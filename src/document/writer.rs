//! Markdown serialization of a block sequence.
//!
//! Output is semantically equivalent to what was parsed, not byte-identical:
//! whitespace is normalized and blocks are separated by blank lines.

use super::parser::is_plain_paragraph;
use super::types::{Block, Checkbox, FrontmatterEntry, ListItem, ListMarker};

/// Serialize blocks back to markdown.
pub fn to_markdown(blocks: &[Block]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(blocks.len());
    for (idx, block) in blocks.iter().enumerate() {
        match block {
            // Frontmatter only round-trips as the first block.
            Block::Frontmatter { entries } if idx == 0 => parts.push(write_frontmatter(entries)),
            Block::Frontmatter { entries } => parts.extend(entries.iter().map(|e| match e {
                FrontmatterEntry::Pair { key, value } => format!("{key}: {value}"),
                FrontmatterEntry::Raw(raw) => raw.clone(),
            })),
            other => parts.push(write_block(other)),
        }
    }
    let mut out = parts.join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn write_block(block: &Block) -> String {
    match block {
        Block::Heading { level, text } => {
            format!("{} {text}", "#".repeat(usize::from(*level)))
        }
        // Indented lines like `  # x` parse as paragraphs; escape them so
        // they stay paragraphs when read back.
        Block::Paragraph { text } if text.starts_with('\\') || !is_plain_paragraph(text) => {
            format!("\\{text}")
        }
        Block::Paragraph { text } => text.clone(),
        Block::List { items } => items.iter().map(write_list_item).collect::<Vec<_>>().join("\n"),
        Block::CodeBlock { code, language } => {
            format!("```{}\n{code}\n```", language.as_deref().unwrap_or(""))
        }
        Block::MermaidBlock { code } => format!("```mermaid\n{code}\n```"),
        Block::DisplayMath { latex } => format!("$$\n{latex}\n$$"),
        Block::Table { rows } => write_table(rows),
        Block::Image { alt, path } => format!("![{alt}]({path})"),
        Block::Blockquote { text } => text
            .split('\n')
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::HorizontalRule => "---".to_string(),
        Block::Frontmatter { entries } => write_frontmatter(entries),
    }
}

fn write_list_item(item: &ListItem) -> String {
    let indent = "  ".repeat(item.level);
    let marker = match item.marker {
        ListMarker::Bullet(c) => c.to_string(),
        ListMarker::Ordered(n) => format!("{n}."),
    };
    let checkbox = match item.checkbox {
        None => "",
        Some(Checkbox::Unchecked) => "[ ] ",
        Some(Checkbox::Checked) => "[x] ",
    };
    format!("{indent}{marker} {checkbox}{}", item.text)
}

fn write_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<&str> = (0..columns)
            .map(|col| row.get(col).map_or("", String::as_str))
            .collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if idx == 0 {
            lines.push(format!("|{}|", vec!["---"; columns].join("|")));
        }
    }
    lines.join("\n")
}

fn write_frontmatter(entries: &[FrontmatterEntry]) -> String {
    let mut lines = vec!["---".to_string()];
    for entry in entries {
        lines.push(match entry {
            FrontmatterEntry::Pair { key, value } => format!("{key}: {value}"),
            FrontmatterEntry::Raw(raw) => raw.clone(),
        });
    }
    lines.push("---".to_string());
    lines.join("\n")
}
