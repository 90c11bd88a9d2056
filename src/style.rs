//! Style descriptors and color palettes.
//!
//! This module defines the visual vocabulary shared by every stage of the
//! pipeline: inline formatting, syntax highlighting and search highlighting
//! all produce [`StyledRun`]s carrying a [`Style`].

use serde::{Deserialize, Serialize};

/// Base font size in points before zoom is applied.
pub const BASE_FONT_SIZE: f32 = 14.0;

/// RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceived brightness (Rec. 709 luma), 0.0..=255.0.
    pub fn luma(self) -> f32 {
        (0.2126 * f32::from(self.r)) + (0.7152 * f32::from(self.g)) + (0.0722 * f32::from(self.b))
    }
}

/// Font family choice from user settings.
#[derive(
    clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    System,
    Serif,
    Monospace,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slant {
    #[default]
    Upright,
    Italic,
}

/// Terminal/window background brightness, used to pick a palette.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Background {
    #[default]
    Dark,
    Light,
}

impl Background {
    /// Interpret a `COLORFGBG` value (`"fg;bg"`); dark when absent or unparsable.
    pub fn from_colorfgbg(colorfgbg: Option<&str>) -> Self {
        let Some(value) = colorfgbg else {
            return Self::Dark;
        };
        let bg_str = value.rsplit(';').next().unwrap_or(value);
        let Ok(bg) = bg_str.parse::<u8>() else {
            return Self::Dark;
        };

        if bg >= 7 { Self::Light } else { Self::Dark }
    }
}

/// Resolved visual style of a text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub font: FontFamily,
    pub size: f32,
    pub weight: FontWeight,
    pub slant: Slant,
    pub monospace: bool,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub strikethrough: bool,
    pub underline: bool,
    pub link: Option<String>,
    pub math: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            font: FontFamily::System,
            size: BASE_FONT_SIZE,
            weight: FontWeight::Regular,
            slant: Slant::Upright,
            monospace: false,
            fg: None,
            bg: None,
            strikethrough: false,
            underline: false,
            link: None,
            math: false,
        }
    }
}

impl Style {
    /// Body text style for the given settings.
    pub fn body(settings: &Settings) -> Self {
        Self {
            font: settings.font,
            size: BASE_FONT_SIZE * settings.zoom,
            monospace: settings.font == FontFamily::Monospace,
            ..Self::default()
        }
    }

    /// Monospaced style used for code and placeholders.
    #[must_use]
    pub fn code(&self) -> Self {
        Self {
            font: FontFamily::Monospace,
            monospace: true,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    #[must_use]
    pub fn italic(mut self) -> Self {
        self.slant = Slant::Italic;
        self
    }

    #[must_use]
    pub const fn with_fg(mut self, color: Color) -> Self {
        self.fg = Some(color);
        self
    }

    #[must_use]
    pub const fn with_bg(mut self, color: Color) -> Self {
        self.bg = Some(color);
        self
    }

    #[must_use]
    pub fn scaled(mut self, factor: f32) -> Self {
        self.size *= factor;
        self
    }
}

/// A contiguous span of text carrying one style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    pub style: Style,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// Concatenate the text of a run sequence.
pub fn runs_to_string(runs: &[StyledRun]) -> String {
    let mut out = String::new();
    for run in runs {
        out.push_str(&run.text);
    }
    out
}

/// Merge adjacent runs that share a style.
pub fn coalesce_runs(runs: Vec<StyledRun>) -> Vec<StyledRun> {
    let mut out: Vec<StyledRun> = Vec::with_capacity(runs.len());
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.style == run.style => last.text.push_str(&run.text),
            _ => out.push(run),
        }
    }
    out
}

/// Colors used for document chrome and inline elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Background,
    pub text: Color,
    pub heading: Color,
    pub link: Color,
    pub code_bg: Color,
    pub math: Color,
    pub quote: Color,
    pub rule: Color,
    pub placeholder: Color,
    pub search_current_bg: Color,
    pub search_other_bg: Color,
    pub search_fg: Color,
}

impl Palette {
    pub const fn dark() -> Self {
        Self {
            background: Background::Dark,
            text: Color::rgb(220, 220, 220),
            heading: Color::rgb(102, 217, 239),
            link: Color::rgb(97, 175, 239),
            code_bg: Color::rgb(48, 50, 56),
            math: Color::rgb(198, 120, 221),
            quote: Color::rgb(130, 150, 190),
            rule: Color::rgb(90, 90, 90),
            placeholder: Color::rgb(150, 150, 150),
            search_current_bg: Color::rgb(255, 150, 0),
            search_other_bg: Color::rgb(120, 110, 40),
            search_fg: Color::rgb(0, 0, 0),
        }
    }

    pub const fn light() -> Self {
        Self {
            background: Background::Light,
            text: Color::rgb(30, 30, 30),
            heading: Color::rgb(20, 70, 120),
            link: Color::rgb(3, 102, 214),
            code_bg: Color::rgb(238, 238, 240),
            math: Color::rgb(111, 66, 193),
            quote: Color::rgb(88, 96, 105),
            rule: Color::rgb(200, 200, 200),
            placeholder: Color::rgb(110, 110, 110),
            search_current_bg: Color::rgb(255, 140, 0),
            search_other_bg: Color::rgb(255, 235, 130),
            search_fg: Color::rgb(0, 0, 0),
        }
    }

    pub const fn for_background(background: Background) -> Self {
        match background {
            Background::Dark => Self::dark(),
            Background::Light => Self::light(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::dark()
    }
}

/// User-facing rendering settings.
///
/// Only parameterizes font selection and colors; persistence lives in
/// [`crate::config`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    pub font: FontFamily,
    pub zoom: f32,
    pub background: Background,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font: FontFamily::System,
            zoom: 1.0,
            background: Background::Dark,
        }
    }
}

/// Dim colors that would be unreadable on a light background.
pub fn adjust_fg_for_background(color: Color, background: Background) -> Color {
    match background {
        Background::Dark => color,
        Background::Light => {
            if color.luma() < 155.0 {
                return color;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let scale = |c: u8| (f32::from(c) * 0.42).round() as u8;
            Color {
                r: scale(color.r),
                g: scale(color.g),
                b: scale(color.b),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorfgbg_dark_background() {
        assert_eq!(Background::from_colorfgbg(Some("15;0")), Background::Dark);
    }

    #[test]
    fn test_colorfgbg_light_background() {
        assert_eq!(Background::from_colorfgbg(Some("0;15")), Background::Light);
    }

    #[test]
    fn test_colorfgbg_missing_defaults_to_dark() {
        assert_eq!(Background::from_colorfgbg(None), Background::Dark);
        assert_eq!(Background::from_colorfgbg(Some("garbage")), Background::Dark);
    }

    #[test]
    fn test_light_mode_darkens_bright_fg() {
        let bright = Color::rgb(240, 230, 120);
        let adjusted = adjust_fg_for_background(bright, Background::Light);
        assert!(adjusted.r < bright.r);
        assert!(adjusted.g < bright.g);
        assert!(adjusted.b < bright.b);
        assert!(adjusted.luma() < 120.0, "still too bright: {}", adjusted.luma());
    }

    #[test]
    fn test_dark_mode_keeps_fg() {
        let bright = Color::rgb(240, 230, 120);
        assert_eq!(adjust_fg_for_background(bright, Background::Dark), bright);
    }

    #[test]
    fn test_body_style_applies_zoom_and_font() {
        let settings = Settings {
            font: FontFamily::Monospace,
            zoom: 2.0,
            background: Background::Dark,
        };
        let style = Style::body(&settings);
        assert!((style.size - 28.0).abs() < f32::EPSILON);
        assert!(style.monospace);
        assert_eq!(style.font, FontFamily::Monospace);
    }

    #[test]
    fn test_coalesce_runs_merges_equal_styles() {
        let plain = Style::default();
        let runs = vec![
            StyledRun::new("ab", plain.clone()),
            StyledRun::new("", plain.clone().bold()),
            StyledRun::new("cd", plain.clone()),
            StyledRun::new("ef", plain.bold()),
        ];
        let merged = coalesce_runs(runs);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "abcd");
        assert_eq!(merged[1].text, "ef");
    }
}
