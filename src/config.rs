//! Saved command-line defaults.
//!
//! Config files hold the same flags the CLI accepts, whitespace separated,
//! with `#` comment lines. A global file under the user config directory is
//! overridden by a local `.markviewrc`, and both by the actual command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::style::{Background, FontFamily, Settings};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;

const LOCAL_FILE: &str = ".markviewrc";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigFlags {
    pub font: Option<FontFamily>,
    pub zoom: Option<f32>,
    pub theme: Option<ThemeMode>,
    pub no_images: bool,
    pub perf: bool,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence for options; booleans OR.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            font: other.font.or(self.font),
            zoom: other.zoom.or(self.zoom),
            theme: other.theme.or(self.theme),
            no_images: self.no_images || other.no_images,
            perf: self.perf || other.perf,
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    /// Rendering settings for these flags.
    ///
    /// `colorfgbg` is the terminal's `COLORFGBG` value, consulted only for
    /// the `auto` theme.
    pub fn settings(&self, colorfgbg: Option<&str>) -> Settings {
        let background = match self.theme.unwrap_or(ThemeMode::Auto) {
            ThemeMode::Auto => Background::from_colorfgbg(colorfgbg),
            ThemeMode::Light => Background::Light,
            ThemeMode::Dark => Background::Dark,
        };
        Settings {
            font: self.font.unwrap_or_default(),
            zoom: self.zoom.unwrap_or(1.0),
            background,
        }
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("markview").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("markview")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("markview").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join("markview").join("config");
        }
    }

    PathBuf::from(LOCAL_FILE)
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_FILE)
}

/// Read flags from `path`; a missing file means no flags.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    let flags = parse_flag_tokens(&tokens);
    tracing::debug!(path = %path.display(), ?flags, "loaded config flags");
    Ok(flags)
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# markview defaults (saved with --save)".to_string()];
    if let Some(font) = flags.font {
        lines.push(format!("--font {}", font_name(font)));
    }
    if let Some(zoom) = flags.zoom {
        lines.push(format!("--zoom {zoom}"));
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if flags.no_images {
        lines.push("--no-images".to_string());
    }
    if flags.perf {
        lines.push("--perf".to_string());
    }
    if let Some(log) = &flags.render_debug_log {
        lines.push(format!("--render-debug-log {}", log.display()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of a token list, ignoring everything else.
///
/// Options accept both `--name value` and `--name=value`. Invalid values are
/// dropped; zoom is clamped to [`MIN_ZOOM`]..=[`MAX_ZOOM`].
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        match token {
            "--no-images" => flags.no_images = true,
            "--perf" => flags.perf = true,
            _ => {
                if let Some(value) = option_value(tokens, &mut i, "--font") {
                    flags.font = parse_font(value);
                } else if let Some(value) = option_value(tokens, &mut i, "--zoom") {
                    flags.zoom = parse_zoom(value);
                } else if let Some(value) = option_value(tokens, &mut i, "--theme") {
                    flags.theme = parse_theme(value);
                } else if let Some(value) = option_value(tokens, &mut i, "--render-debug-log") {
                    flags.render_debug_log = Some(PathBuf::from(value));
                }
            }
        }
        i += 1;
    }
    flags
}

/// Value of option `name` at `tokens[*i]`, advancing past a separate value.
fn option_value<'a>(tokens: &'a [String], i: &mut usize, name: &str) -> Option<&'a str> {
    let token = tokens[*i].as_str();
    if token == name {
        let value = tokens.get(*i + 1)?;
        *i += 1;
        return Some(value.as_str());
    }
    token.strip_prefix(name)?.strip_prefix('=')
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "auto" => Some(ThemeMode::Auto),
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

fn parse_font(s: &str) -> Option<FontFamily> {
    match s {
        "system" => Some(FontFamily::System),
        "serif" => Some(FontFamily::Serif),
        "monospace" | "mono" => Some(FontFamily::Monospace),
        _ => None,
    }
}

const fn font_name(font: FontFamily) -> &'static str {
    match font {
        FontFamily::System => "system",
        FontFamily::Serif => "serif",
        FontFamily::Monospace => "monospace",
    }
}

fn parse_zoom(s: &str) -> Option<f32> {
    normalize_zoom(s.parse().ok()?)
}

/// Clamp a zoom factor into range; non-finite values are rejected.
pub fn normalize_zoom(zoom: f32) -> Option<f32> {
    zoom.is_finite().then_some(zoom.clamp(MIN_ZOOM, MAX_ZOOM))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let args = tokens(&[
            "markview",
            "render",
            "--font",
            "serif",
            "--zoom=1.5",
            "--no-images",
            "--theme",
            "dark",
            "--render-debug-log=render.log",
            "README.md",
        ]);
        let flags = parse_flag_tokens(&args);
        assert_eq!(flags.font, Some(FontFamily::Serif));
        assert_eq!(flags.zoom, Some(1.5));
        assert!(flags.no_images);
        assert!(!flags.perf);
        assert_eq!(flags.theme, Some(ThemeMode::Dark));
        assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
    }

    #[test]
    fn test_zoom_is_clamped_and_validated() {
        assert_eq!(parse_flag_tokens(&tokens(&["--zoom", "10"])).zoom, Some(MAX_ZOOM));
        assert_eq!(parse_flag_tokens(&tokens(&["--zoom", "0.1"])).zoom, Some(MIN_ZOOM));
        assert_eq!(parse_flag_tokens(&tokens(&["--zoom", "big"])).zoom, None);
        assert_eq!(parse_flag_tokens(&tokens(&["--zoom", "NaN"])).zoom, None);
    }

    #[test]
    fn test_option_without_value_is_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--perf", "--theme"]));
        assert!(flags.perf);
        assert_eq!(flags.theme, None);
    }

    #[test]
    fn test_similar_prefixes_are_not_options() {
        let flags = parse_flag_tokens(&tokens(&["--fontsize=3", "--zoomed"]));
        assert_eq!(flags, ConfigFlags::default());
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            perf: true,
            theme: Some(ThemeMode::Light),
            zoom: Some(2.0),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            no_images: true,
            theme: Some(ThemeMode::Dark),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.perf);
        assert!(merged.no_images);
        assert_eq!(merged.theme, Some(ThemeMode::Dark));
        assert_eq!(merged.zoom, Some(2.0));
    }

    #[test]
    fn test_settings_from_flags() {
        let flags = ConfigFlags {
            font: Some(FontFamily::Monospace),
            zoom: Some(1.25),
            ..ConfigFlags::default()
        };
        let settings = flags.settings(Some("0;15"));
        assert_eq!(settings.font, FontFamily::Monospace);
        assert!((settings.zoom - 1.25).abs() < f32::EPSILON);
        assert_eq!(settings.background, Background::Light);

        let forced = ConfigFlags {
            theme: Some(ThemeMode::Dark),
            ..ConfigFlags::default()
        };
        assert_eq!(forced.settings(Some("0;15")).background, Background::Dark);
        assert_eq!(ConfigFlags::default().settings(None), Settings::default());
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(".markviewrc");
        let flags = ConfigFlags {
            font: Some(FontFamily::Serif),
            zoom: Some(1.5),
            theme: Some(ThemeMode::Dark),
            no_images: true,
            perf: true,
            render_debug_log: Some(PathBuf::from("render.log")),
        };

        save_config_flags(&path, &flags).unwrap();
        let loaded = load_config_flags(&path).unwrap();
        assert_eq!(loaded, flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }
}
