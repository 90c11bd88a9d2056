//! Markview - command-line front end for the markdown rendering core.
//!
//! # Usage
//!
//! ```bash
//! markview render README.md
//! markview render --search todo README.md
//! markview render --anchor installation --lines 20 README.md
//! markview blocks README.md
//! markview outline README.md
//! markview highlight --lang rust src/main.rs
//! markview search README.md "install"
//! ls | markview fuzzy cfg
//! ```

use std::io::{BufRead, IsTerminal, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use markview::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, normalize_zoom, save_config_flags,
};
use markview::document::{Document, prepare_content};
use markview::fuzzy::rank;
use markview::highlight::Highlighter;
use markview::perf;
use markview::render::{Inline, RenderContext, RenderedDocument};
use markview::search::{SearchState, line_of_offset};
use markview::style::{FontFamily, FontWeight, Slant, Style, StyledRun};
use markview::viewport::Viewport;

/// Render, inspect and search markdown from the command line
#[derive(Parser, Debug)]
#[command(name = "markview", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Font family for styled output
    #[arg(long, global = true, value_enum)]
    font: Option<FontFamily>,

    /// Zoom factor (0.5 to 3.0)
    #[arg(long, global = true)]
    zoom: Option<f32>,

    /// Force color theme background (light or dark)
    #[arg(long, global = true, value_enum)]
    theme: Option<ThemeMode>,

    /// Never request diagram or math images. The CLI has no image renderer
    /// and always shows diagram/math source; the flag is saved with the
    /// other defaults for hosts that embed a renderer
    #[arg(long, global = true)]
    no_images: bool,

    /// Print timing for each pipeline stage
    #[arg(long, global = true)]
    perf: bool,

    /// Write detailed render/image debug events to a file
    #[arg(long, global = true, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parsed block sequence as JSON
    Blocks {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List headings with their anchor ids
    Outline {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a document to the terminal
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Highlight matches of this query
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,

        /// Start the window at the heading with this anchor id
        #[arg(long, value_name = "ID")]
        anchor: Option<String>,

        /// Print only this many lines, around the anchor or first match
        #[arg(long, value_name = "N")]
        lines: Option<usize>,
    },
    /// Syntax-highlight a source file
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Language tag (defaults to the file extension)
        #[arg(long)]
        lang: Option<String>,
    },
    /// List search matches with their blocks and lines
    Search {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        query: String,
    },
    /// Rank candidates (arguments, or stdin lines) against a query
    Fuzzy {
        query: String,
        candidates: Vec<String>,

        /// Show at most this many results
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let effective = effective_flags(&cli)?;

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("MARKVIEW_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = %render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            %err,
            "failed to initialize render debug log"
        );
    }

    let colorfgbg = std::env::var("COLORFGBG").ok();
    let settings = effective.settings(colorfgbg.as_deref());
    let color = std::io::stdout().is_terminal();

    match cli.command {
        Command::Blocks { file } => {
            let doc = load_document(&file)?;
            let json = serde_json::to_string_pretty(doc.blocks())
                .context("Failed to serialize blocks")?;
            println!("{json}");
        }
        Command::Outline { file } => {
            let doc = load_document(&file)?;
            for heading in doc.headings() {
                let indent = "  ".repeat(usize::from(heading.level.saturating_sub(1)));
                println!("{indent}{} #{}", heading.text, heading.id);
            }
        }
        Command::Render {
            file,
            search,
            anchor,
            lines,
        } => {
            let doc = load_document(&file)?;
            let mut ctx = RenderContext::new(settings);
            ctx.set_images_enabled(!effective.no_images);
            let mut rendered = ctx.render(&doc);
            let total = rendered.line_count();
            let mut viewport = Viewport::new(lines.unwrap_or(total), total);
            let anchored = anchor.is_some();
            if let Some(id) = anchor {
                let Some(line) = rendered.anchor_line(&id) else {
                    bail!("No heading with anchor {id:?}");
                };
                viewport.go_to_line(line);
            }
            if let Some(query) = search {
                let mut state = SearchState::new();
                let count = state.search_document(&rendered, &query);
                eprintln!("{count} match(es) for {query:?}");
                if !anchored {
                    state.scroll_to_current(rendered.plain_text(), &mut viewport);
                }
                rendered = rendered.with_search_highlights(state.matches(), ctx.palette());
            }
            print_rendered(&rendered, color, viewport.visible_range())?;
        }
        Command::Highlight { file, lang } => {
            let code = read_file(&file)?;
            let lang = lang.or_else(|| {
                file.extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(markview::highlight::language_for_extension)
                    .map(ToString::to_string)
            });
            let mut highlighter = Highlighter::new(settings.background);
            let base = Style::body(&settings);
            let runs = highlighter.highlight_with_base(&code, lang.as_deref(), &base);
            print_runs(&runs, color)?;
        }
        Command::Search { file, query } => {
            let doc = load_document(&file)?;
            let mut ctx = RenderContext::new(settings);
            let rendered = ctx.render(&doc);
            let mut state = SearchState::new();
            state.search_document(&rendered, &query);
            let text = rendered.plain_text();
            for m in state.matches() {
                let line = line_of_offset(text, m.offset);
                let context = text.lines().nth(line).unwrap_or_default();
                let block = m
                    .block
                    .and_then(|b| rendered.blocks().get(b))
                    .map_or("-", |b| b.kind);
                println!("{:>6}  line {:>4}  {block:<10} {}", m.offset, line + 1, context.trim());
            }
            eprintln!("{} match(es)", state.count());
        }
        Command::Fuzzy {
            query,
            candidates,
            limit,
        } => {
            let candidates = if candidates.is_empty() {
                std::io::stdin()
                    .lock()
                    .lines()
                    .collect::<std::io::Result<Vec<_>>>()
                    .context("Failed to read candidates from stdin")?
            } else {
                candidates
            };
            for hit in rank(&query, &candidates).into_iter().take(limit) {
                println!("{:>4}  {}", hit.result.score, hit.item);
            }
        }
    }
    Ok(())
}

/// Merge saved defaults with this invocation's flags, handling --save/--clear.
fn effective_flags(cli: &Cli) -> Result<ConfigFlags> {
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = ConfigFlags {
        font: cli.font,
        zoom: cli.zoom.and_then(normalize_zoom),
        theme: cli.theme,
        no_images: cli.no_images,
        perf: cli.perf,
        render_debug_log: cli.render_debug_log.clone(),
    };

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    Ok(file_flags.union(&cli_flags))
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_document(path: &Path) -> Result<Document> {
    let content = if markview::document::is_image_file(path) {
        String::new()
    } else {
        read_file(path)?
    };
    Ok(Document::parse(&prepare_content(path, content)))
}

/// Print the lines of `rendered` that fall in `window`.
///
/// Every inline keeps the line structure of the plain text, so line numbers
/// from search and anchors index the printed output directly.
fn print_rendered(rendered: &RenderedDocument, color: bool, window: Range<usize>) -> Result<()> {
    let mut buf = Vec::new();
    for (i, block) in rendered.blocks().iter().enumerate() {
        if i > 0 {
            writeln!(buf)?;
        }
        for inline in &block.content {
            match inline {
                Inline::Text(run) => write_run(&mut buf, run, color)?,
                Inline::Image { alt, .. } => write!(buf, "[{alt}]")?,
                Inline::External { .. } => write!(buf, "[Image: {}]", inline.text())?,
                Inline::Rule => write!(buf, "{}", "─".repeat(40))?,
            }
        }
    }
    let text = String::from_utf8_lossy(&buf);
    let mut out = std::io::stdout().lock();
    for line in text.split('\n').skip(window.start).take(window.len()) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn print_runs(runs: &[StyledRun], color: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for run in runs {
        write_run(&mut out, run, color)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Write a run with 24-bit ANSI styling, or as plain text.
///
/// Styling is applied per line so a run never carries escapes across a
/// newline.
fn write_run(out: &mut impl Write, run: &StyledRun, color: bool) -> std::io::Result<()> {
    if !color {
        return write!(out, "{}", run.text);
    }
    for (i, segment) in run.text.split('\n').enumerate() {
        if i > 0 {
            writeln!(out)?;
        }
        write_styled(out, segment, &run.style)?;
    }
    Ok(())
}

fn write_styled(out: &mut impl Write, text: &str, style: &Style) -> std::io::Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let mut codes: Vec<String> = Vec::new();
    if style.weight == FontWeight::Bold {
        codes.push("1".into());
    }
    if style.slant == Slant::Italic {
        codes.push("3".into());
    }
    if style.underline {
        codes.push("4".into());
    }
    if style.strikethrough {
        codes.push("9".into());
    }
    if let Some(fg) = style.fg {
        codes.push(format!("38;2;{};{};{}", fg.r, fg.g, fg.b));
    }
    if let Some(bg) = style.bg {
        codes.push(format!("48;2;{};{};{}", bg.r, bg.g, bg.b));
    }
    if codes.is_empty() {
        return write!(out, "{}", text);
    }
    write!(out, "\x1b[{}m{}\x1b[0m", codes.join(";"), text)
}
