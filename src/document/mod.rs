//! Markdown document parsing.
//!
//! This module handles:
//! - Splitting raw text into typed [`Block`]s
//! - Heading outline and anchor resolution
//! - Writing blocks back out as markdown

mod parser;
mod types;
mod writer;

pub use parser::parse_blocks;
pub use types::{
    Block, Checkbox, Document, FrontmatterEntry, HeadingRef, ListItem, ListMarker,
    block_index_for_offset,
};
pub(crate) use types::AnchorIds;
pub use writer::to_markdown;

/// Image file extensions that should be rendered inline.
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tiff", "tif", "ico", "svg", "avif",
];

/// Prepare file content for parsing based on its extension.
///
/// Source files the highlighter knows are wrapped in a fenced code block,
/// image files become a single image line, and everything else passes
/// through unchanged.
pub fn prepare_content(file_path: &std::path::Path, content: String) -> String {
    if is_image_file(file_path) {
        return image_markdown(file_path);
    }
    let Some(language) = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(crate::highlight::language_for_extension)
    else {
        return content;
    };
    format!("```{language}\n{content}\n```")
}

/// Returns true if the file extension is a recognized image format.
pub fn is_image_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Markdown that displays an image file as a single image block.
pub fn image_markdown(path: &std::path::Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("![{name}]({name})")
}
