use std::{fs::read_to_string, path::Path};

use eyre::{Context, Result, bail};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

/// Seaborn's "deep" palette
const DEFAULT_PALETTE: &[&str] = &[
    "#4c72b0", "#dd8452", "#55a868", "#c44e52", "#8172b3", "#937860", "#da8bc3", "#8c8c8c",
    "#ccb974", "#64b5cd",
];

/// Rendering options handed to every chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub font_family: String,
    pub title_font_size: u32,
    pub label_font_size: u32,
    pub tick_font_size: u32,
    pub palette: Vec<String>,
    /// Opacity of the line plot deviation band
    pub band_alpha: f64,
    /// Fraction of each category slot covered by its bar cluster
    pub bar_group_width: f64,
    pub grid: bool,
    pub clip_band_at_zero: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
            margin: 15,
            font_family: "sans-serif".to_owned(),
            title_font_size: 24,
            label_font_size: 18,
            tick_font_size: 14,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            band_alpha: 0.25,
            bar_group_width: 0.8,
            grid: true,
            clip_band_at_zero: false,
        }
    }
}

impl Style {
    /// Reads a YAML style file, any key left out keeps its default
    pub fn load(path: &Path) -> Result<Self> {
        let data = read_to_string(path).context(format!("Read style {}", path.display()))?;
        let style: Style = serde_yml::from_str(&data).context("Parse style")?;
        style.validate()?;
        Ok(style)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("Figure size must be non-zero, got {}x{}", self.width, self.height);
        }
        if self.palette.is_empty() {
            bail!("Palette must have at least one color");
        }
        for color in &self.palette {
            parse_color(color).context(format!("Palette color {color}"))?;
        }
        if !(0.0..=1.0).contains(&self.band_alpha) {
            bail!("band_alpha must be within [0, 1], got {}", self.band_alpha);
        }
        if !(self.bar_group_width > 0.0 && self.bar_group_width <= 1.0) {
            bail!("bar_group_width must be within (0, 1], got {}", self.bar_group_width);
        }
        Ok(())
    }

    /// Palette color for the `idx`th series, cycling when the palette runs out
    pub fn color(&self, idx: usize) -> RGBColor {
        self.palette
            .get(idx % self.palette.len().max(1))
            .and_then(|c| parse_color(c).ok())
            .unwrap_or(RGBColor(0x4c, 0x72, 0xb0))
    }
}

/// Parses `#rrggbb` or `rrggbb`
pub fn parse_color(hex: &str) -> Result<RGBColor> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        bail!("Expected #rrggbb, got {hex}");
    }
    let channel = |i: usize| {
        u8::from_str_radix(&digits[i..i + 2], 16).context(format!("Parse color {hex}"))
    };
    Ok(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}
