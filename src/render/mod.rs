//! Rendering session.
//!
//! [`RenderContext`] turns a parsed [`Document`] into styled inline content:
//! - Text blocks go through the inline formatter
//! - Code blocks go through the syntax highlighter
//! - Mermaid diagrams and math resolve to cached images, or to monospaced
//!   placeholder text while the image service works on them
//!
//! The context owns every cache the pipeline uses (compiled highlight
//! patterns, finished images, in-flight requests), so two contexts never
//! share state. Completed requests surface through [`RenderContext::poll`]
//! as [`Invalidated`] events telling the host to render again.

mod images;

pub use images::{
    ContentKey, ImageCache, ImageKind, ImageRenderError, ImageService, PendingImage,
    RenderRequest, RenderResult, RenderedImage, ThreadedService,
};

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use unicode_width::UnicodeWidthStr;

use crate::document::{AnchorIds, Block, Checkbox, Document, FrontmatterEntry, ListItem, ListMarker};
use crate::highlight::Highlighter;
use crate::inline::format_inline_with;
use crate::search::{SearchMatch, apply_highlights, line_of_offset};
use crate::style::{Palette, Settings, Style, StyledRun, runs_to_string};

/// Heading sizes relative to body text, levels 1-4.
const HEADING_SCALES: [f32; 4] = [2.0, 1.6, 1.3, 1.15];

/// One piece of rendered block content.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(StyledRun),
    /// Diagram or math image from the cache; `alt` is its searchable text
    Image { key: ContentKey, alt: String },
    /// Image referenced by path or URL; loading it is the host's job
    External { alt: String, path: String },
    Rule,
}

impl Inline {
    /// Text this piece contributes to the rendered plain text.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(run) => &run.text,
            Self::Image { alt, .. } => alt,
            Self::External { alt, path } => {
                if alt.is_empty() {
                    path
                } else {
                    alt
                }
            }
            Self::Rule => "",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub block_index: usize,
    pub kind: &'static str,
    pub content: Vec<Inline>,
}

impl RenderedBlock {
    pub fn text(&self) -> String {
        self.content.iter().map(Inline::text).collect()
    }
}

/// Heading with its anchor id and character range in the plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedHeading {
    pub id: String,
    pub level: u8,
    pub text: String,
    pub block_index: usize,
    pub range: Range<usize>,
}

/// Output of one render pass.
///
/// The plain text is every block's text joined with newlines; block ranges
/// and heading ranges are character offsets into it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    blocks: Vec<RenderedBlock>,
    plain_text: String,
    block_ranges: Vec<Range<usize>>,
    headings: Vec<RenderedHeading>,
    placeholders: usize,
}

impl RenderedDocument {
    /// `headings` holds `(id, level, text, block_index)` in document order.
    fn new(
        blocks: Vec<RenderedBlock>,
        headings: Vec<(String, u8, String, usize)>,
        placeholders: usize,
    ) -> Self {
        let mut plain_text = String::new();
        let mut block_ranges = Vec::with_capacity(blocks.len());
        let mut start = 0;
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                plain_text.push('\n');
                start += 1;
            }
            let text = block.text();
            let len = text.chars().count();
            plain_text.push_str(&text);
            block_ranges.push(start..start + len);
            start += len;
        }
        let headings = headings
            .into_iter()
            .map(|(id, level, text, block_index)| RenderedHeading {
                range: block_ranges[block_index].clone(),
                id,
                level,
                text,
                block_index,
            })
            .collect();
        Self {
            blocks,
            plain_text,
            block_ranges,
            headings,
            placeholders,
        }
    }

    pub fn blocks(&self) -> &[RenderedBlock] {
        &self.blocks
    }

    pub fn plain_text(&self) -> &str {
        &self.plain_text
    }

    pub fn block_ranges(&self) -> &[Range<usize>] {
        &self.block_ranges
    }

    pub fn headings(&self) -> &[RenderedHeading] {
        &self.headings
    }

    /// Diagram/math blocks and spans still shown as placeholder text.
    pub const fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Character range of the heading with anchor `id`.
    pub fn anchor_range(&self, id: &str) -> Option<Range<usize>> {
        let id = id.trim_start_matches('#');
        self.headings
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.range.clone())
    }

    /// Line of the plain text where the heading with anchor `id` starts.
    pub fn anchor_line(&self, id: &str) -> Option<usize> {
        self.anchor_range(id)
            .map(|range| line_of_offset(&self.plain_text, range.start))
    }

    /// Lines of the plain text, counting a trailing empty block.
    pub fn line_count(&self) -> usize {
        if self.blocks.is_empty() {
            0
        } else {
            self.plain_text.matches('\n').count() + 1
        }
    }

    /// Copy of the document with search matches recolored.
    ///
    /// `matches` must come from a search over [`Self::plain_text`].
    #[must_use]
    pub fn with_search_highlights(&self, matches: &[SearchMatch], palette: &Palette) -> Self {
        let mut out = self.clone();
        if matches.is_empty() {
            return out;
        }
        for (block, range) in out.blocks.iter_mut().zip(&self.block_ranges) {
            let mut offset = range.start;
            let mut content = Vec::with_capacity(block.content.len());
            for inline in block.content.drain(..) {
                let len = inline.text().chars().count();
                match inline {
                    Inline::Text(run) => content.extend(
                        apply_highlights(std::slice::from_ref(&run), offset, matches, palette)
                            .into_iter()
                            .map(Inline::Text),
                    ),
                    other => content.push(other),
                }
                offset += len;
            }
            block.content = content;
        }
        out
    }
}

/// Signal that content with this key changed and the document should be
/// rendered again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidated {
    pub key: ContentKey,
}

/// Long-lived rendering session.
pub struct RenderContext {
    settings: Settings,
    palette: Palette,
    highlighter: Highlighter,
    images: ImageCache,
    pending: HashMap<ContentKey, PendingImage>,
    failed: HashSet<ContentKey>,
    referenced: HashSet<ContentKey>,
    service: Option<Box<dyn ImageService>>,
    images_enabled: bool,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("settings", &self.settings)
            .field("images", &self.images.len())
            .field("pending", &self.pending.len())
            .field("failed", &self.failed.len())
            .field("has_service", &self.service.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl RenderContext {
    /// Session without an image service: diagrams and math stay placeholders.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            palette: Palette::for_background(settings.background),
            highlighter: Highlighter::new(settings.background),
            images: ImageCache::new(),
            pending: HashMap::new(),
            failed: HashSet::new(),
            referenced: HashSet::new(),
            service: None,
            images_enabled: true,
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: Box<dyn ImageService>) -> Self {
        self.service = Some(service);
        self
    }

    /// With images disabled every diagram and math span renders as
    /// placeholder text and nothing is requested.
    pub const fn set_images_enabled(&mut self, enabled: bool) {
        self.images_enabled = enabled;
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn palette(&self) -> &Palette {
        &self.palette
    }

    pub const fn image_cache(&self) -> &ImageCache {
        &self.images
    }

    pub const fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_failed(&self, key: &ContentKey) -> bool {
        self.failed.contains(key)
    }

    /// Change font, zoom or background. Caches survive; a background change
    /// swaps the palette and highlight colors.
    pub fn set_settings(&mut self, settings: Settings) {
        if settings.background != self.settings.background {
            self.palette = Palette::for_background(settings.background);
            self.highlighter = Highlighter::new(settings.background);
        }
        self.settings = settings;
    }

    /// Render every block of `document`.
    ///
    /// Diagram and math content missing from the cache is requested once per
    /// key and shown as placeholder text until [`Self::poll`] reports it.
    pub fn render(&mut self, document: &Document) -> RenderedDocument {
        let _scope = crate::perf::scope("render.document");
        self.referenced.clear();
        let mut builder = BlockRenderer {
            ctx: self,
            placeholders: 0,
        };
        let mut anchors = AnchorIds::default();
        let mut headings = Vec::new();
        let blocks: Vec<RenderedBlock> = document
            .blocks()
            .iter()
            .enumerate()
            .map(|(block_index, block)| {
                if let Block::Heading { level, text } = block {
                    headings.push((anchors.next_id(text), *level, text.clone(), block_index));
                }
                RenderedBlock {
                    block_index,
                    kind: block.kind_name(),
                    content: builder.render_block(block),
                }
            })
            .collect();
        let placeholders = builder.placeholders;
        let rendered = RenderedDocument::new(blocks, headings, placeholders);
        tracing::debug!(
            blocks = rendered.blocks.len(),
            placeholders,
            pending = self.pending.len(),
            "rendered document"
        );
        crate::perf::log_event(
            "render.document",
            format!(
                "blocks={} placeholders={placeholders} pending={}",
                rendered.blocks.len(),
                self.pending.len()
            ),
        );
        rendered
    }

    /// Collect finished image requests.
    ///
    /// Successful images go into the cache. Only keys used by the latest
    /// [`Self::render`] produce an [`Invalidated`] event; late answers for
    /// content no longer on screen are cached silently. Failures are logged
    /// and remembered so the placeholder stays and the key is not retried.
    pub fn poll(&mut self) -> Vec<Invalidated> {
        let mut finished = Vec::new();
        for (key, pending) in &self.pending {
            if let Some(result) = pending.try_take() {
                finished.push((key.clone(), result));
            }
        }

        let mut events = Vec::new();
        for (key, result) in finished {
            self.pending.remove(&key);
            match result {
                Ok(image) => {
                    crate::perf::log_event(
                        "render.image.ready",
                        format!("key={key} size={}x{}", image.width, image.height),
                    );
                    self.images.insert(key.clone(), image);
                    if self.referenced.contains(&key) {
                        events.push(Invalidated { key });
                    }
                }
                Err(err) => {
                    tracing::warn!(%key, %err, "diagram/math render failed");
                    crate::perf::log_event("render.image.error", format!("key={key} err={err}"));
                    self.failed.insert(key);
                }
            }
        }
        events
    }

    /// Cached image for `kind`/`source`, or `None` after issuing a request
    /// if one is not already in flight.
    fn resolve_image(&mut self, kind: ImageKind, source: &str) -> Option<ContentKey> {
        if !self.images_enabled {
            return None;
        }
        let key = ContentKey::new(kind, source);
        self.referenced.insert(key.clone());
        if self.images.contains(&key) {
            return Some(key);
        }
        if self.failed.contains(&key) || self.pending.contains_key(&key) {
            return None;
        }
        let Some(service) = self.service.as_mut() else {
            return None;
        };
        tracing::trace!(%key, ?kind, "requesting image render");
        crate::perf::log_event("render.image.request", format!("key={key} kind={kind:?}"));
        let pending = service.request(RenderRequest {
            key: key.clone(),
            kind,
            source: source.to_string(),
        });
        self.pending.insert(key, pending);
        None
    }
}

/// Per-render state while walking the blocks.
struct BlockRenderer<'a> {
    ctx: &'a mut RenderContext,
    placeholders: usize,
}

impl BlockRenderer<'_> {
    fn body(&self) -> Style {
        Style::body(&self.ctx.settings).with_fg(self.ctx.palette.text)
    }

    fn render_block(&mut self, block: &Block) -> Vec<Inline> {
        let palette = self.ctx.palette;
        match block {
            Block::Heading { level, text } => {
                let scale = HEADING_SCALES[usize::from((*level).clamp(1, 4)) - 1];
                let style = self.body().scaled(scale).bold().with_fg(palette.heading);
                self.inline_text(text, &style)
            }
            Block::Paragraph { text } => {
                let body = self.body();
                self.inline_text(text, &body)
            }
            Block::List { items } => self.render_list(items),
            Block::CodeBlock { code, language } => {
                let base = self.body().with_bg(palette.code_bg);
                self.ctx
                    .highlighter
                    .highlight_with_base(code, language.as_deref(), &base)
                    .into_iter()
                    .map(Inline::Text)
                    .collect()
            }
            Block::MermaidBlock { code } => self.image_or_placeholder(ImageKind::Diagram, code),
            Block::DisplayMath { latex } => self.image_or_placeholder(ImageKind::DisplayMath, latex),
            Block::Table { rows } => self.render_table(rows),
            Block::Image { alt, path } => vec![Inline::External {
                alt: alt.clone(),
                path: path.clone(),
            }],
            Block::Blockquote { text } => self.render_blockquote(text),
            Block::HorizontalRule => vec![Inline::Rule],
            Block::Frontmatter { entries } => self.render_frontmatter(entries),
        }
    }

    /// Inline-format `text`, resolving math spans to images where cached.
    fn inline_text(&mut self, text: &str, base: &Style) -> Vec<Inline> {
        let palette = self.ctx.palette;
        format_inline_with(text, base, &palette)
            .into_iter()
            .map(|run| {
                if !run.style.math {
                    return Inline::Text(run);
                }
                match self.ctx.resolve_image(ImageKind::InlineMath, &run.text) {
                    Some(key) => Inline::Image { key, alt: run.text },
                    None => {
                        self.placeholders += 1;
                        Inline::Text(run)
                    }
                }
            })
            .collect()
    }

    /// The image keeps its source as alt text so plain-text offsets do not
    /// move when a placeholder is swapped for the image.
    fn image_or_placeholder(&mut self, kind: ImageKind, source: &str) -> Vec<Inline> {
        if let Some(key) = self.ctx.resolve_image(kind, source) {
            return vec![Inline::Image {
                key,
                alt: source.to_string(),
            }];
        }
        self.placeholders += 1;
        let style = self.body().code().with_fg(self.ctx.palette.placeholder);
        vec![Inline::Text(StyledRun::new(source, style))]
    }

    fn render_list(&mut self, items: &[ListItem]) -> Vec<Inline> {
        let marker_style = self.body().with_fg(self.ctx.palette.rule);
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push(Inline::Text(StyledRun::new("\n", self.body())));
            }
            let mut prefix = "  ".repeat(item.level);
            match item.marker {
                ListMarker::Bullet(_) => prefix.push_str(bullet_for_level(item.level)),
                ListMarker::Ordered(n) => prefix.push_str(&format!("{n}.")),
            }
            prefix.push(' ');
            match item.checkbox {
                Some(Checkbox::Checked) => prefix.push_str("☑ "),
                Some(Checkbox::Unchecked) => prefix.push_str("☐ "),
                None => {}
            }
            out.push(Inline::Text(StyledRun::new(prefix, marker_style.clone())));
            let mut text_style = self.body();
            if item.checkbox == Some(Checkbox::Checked) {
                text_style.strikethrough = true;
            }
            out.extend(self.inline_text(&item.text, &text_style));
        }
        out
    }

    /// Columns padded to their widest cell, separated by `│`.
    fn render_table(&mut self, rows: &[Vec<String>]) -> Vec<Inline> {
        let body = self.body();
        let header = body.clone().bold();
        let border = body.clone().with_fg(self.ctx.palette.rule);

        let formatted: Vec<Vec<Vec<Inline>>> = rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let style = if r == 0 { &header } else { &body };
                row.iter().map(|cell| self.inline_text(cell, style)).collect()
            })
            .collect();

        let columns = formatted.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0usize; columns];
        for row in &formatted {
            for (c, cell) in row.iter().enumerate() {
                widths[c] = widths[c].max(display_width(cell));
            }
        }

        let mut out = Vec::new();
        for (r, row) in formatted.into_iter().enumerate() {
            if r > 0 {
                out.push(Inline::Text(StyledRun::new("\n", body.clone())));
            }
            for (c, width) in widths.iter().enumerate() {
                if c > 0 {
                    out.push(Inline::Text(StyledRun::new(" │ ", border.clone())));
                }
                let (cell, used) = match row.get(c) {
                    Some(cell) => (cell.clone(), display_width(cell)),
                    None => (Vec::new(), 0),
                };
                out.extend(cell);
                if c + 1 < columns && *width > used {
                    out.push(Inline::Text(StyledRun::new(" ".repeat(width - used), body.clone())));
                }
            }
        }
        out
    }

    fn render_blockquote(&mut self, text: &str) -> Vec<Inline> {
        let palette = self.ctx.palette;
        let bar = self.body().with_fg(palette.quote);
        let style = self.body().italic().with_fg(palette.quote);
        let mut out = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push(Inline::Text(StyledRun::new("\n", style.clone())));
            }
            out.push(Inline::Text(StyledRun::new("│ ", bar.clone())));
            out.extend(self.inline_text(line, &style));
        }
        out
    }

    fn render_frontmatter(&self, entries: &[FrontmatterEntry]) -> Vec<Inline> {
        let muted = self.body().code().with_fg(self.ctx.palette.placeholder);
        let key_style = muted.clone().bold();
        let mut out = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                out.push(Inline::Text(StyledRun::new("\n", muted.clone())));
            }
            match entry {
                FrontmatterEntry::Pair { key, value } => {
                    out.push(Inline::Text(StyledRun::new(format!("{key}:"), key_style.clone())));
                    out.push(Inline::Text(StyledRun::new(format!(" {value}"), muted.clone())));
                }
                FrontmatterEntry::Raw(raw) => {
                    out.push(Inline::Text(StyledRun::new(raw.clone(), muted.clone())));
                }
            }
        }
        out
    }
}

const fn bullet_for_level(level: usize) -> &'static str {
    match level % 3 {
        0 => "•",
        1 => "◦",
        _ => "▪",
    }
}

fn display_width(content: &[Inline]) -> usize {
    content.iter().map(|inline| UnicodeWidthStr::width(inline.text())).sum()
}

/// Flatten rendered content to runs, dropping images and rules.
pub fn text_runs(content: &[Inline]) -> Vec<StyledRun> {
    content
        .iter()
        .filter_map(|inline| match inline {
            Inline::Text(run) => Some(run.clone()),
            _ => None,
        })
        .collect()
}

/// Plain text of rendered content, images contributing their alt text.
pub fn content_text(content: &[Inline]) -> String {
    let runs: Vec<StyledRun> = content
        .iter()
        .map(|inline| match inline {
            Inline::Text(run) => run.clone(),
            other => StyledRun::new(other.text(), Style::default()),
        })
        .collect();
    runs_to_string(&runs)
}
