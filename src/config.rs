//! Configuration surface: page format, image encoding, colors and loading

use crate::geometry::{Margins, PageGeometry};
use crate::{Error, ExportConfig, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Named physical paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    A5,
    Letter,
}

impl PageFormat {
    /// Portrait (width, height) in millimetres
    pub fn size_mm(self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (210.0, 297.0),
            PageFormat::A5 => (148.0, 210.0),
            PageFormat::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page image encoding.
///
/// `Png` stores pixels losslessly (Flate-compressed RGB), which keeps thin
/// diagram strokes and small text sharp at the cost of larger files. `Jpeg`
/// is lossy at `jpegQuality` and yields much smaller documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

/// Opaque RGB color, written as `#rgb` or `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| Error::ConfigError(format!("color '{}' must start with '#'", s)))?;
        let digit = |c: char| {
            c.to_digit(16)
                .map(|d| d as u8)
                .ok_or_else(|| Error::ConfigError(format!("color '{}' has a non-hex digit", s)))
        };
        let chars: Vec<char> = hex.chars().collect();
        match chars.len() {
            3 => {
                let r = digit(chars[0])?;
                let g = digit(chars[1])?;
                let b = digit(chars[2])?;
                Ok(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => {
                let pair = |i: usize| -> Result<u8> { Ok(digit(chars[i])? * 16 + digit(chars[i + 1])?) };
                Ok(Self::rgb(pair(0)?, pair(2)?, pair(4)?))
            }
            _ => Err(Error::ConfigError(format!("color '{}' must be #rgb or #rrggbb", s))),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Color::parse(&value)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl ExportConfig {
    /// Parse a JSON configuration document. Missing keys take their defaults;
    /// unknown keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ExportConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn margins(&self) -> Margins {
        Margins {
            top: self.margin_top_mm,
            bottom: self.margin_bottom_mm,
            left: self.margin_left_mm,
            right: self.margin_right_mm,
        }
    }

    /// Build the validated page geometry described by this configuration
    pub fn page_geometry(&self) -> Result<PageGeometry> {
        PageGeometry::from_format(self.page_format, self.orientation, self.margins())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::ConfigError(format!("scale must be a positive number, got {}", self.scale)));
        }
        if !(0.0..=1.0).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpegQuality must be within 0..1, got {}",
                self.jpeg_quality
            )));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport dimensions must be non-zero".into()));
        }
        if self.target_id.trim().is_empty() {
            return Err(Error::ConfigError("targetId must not be empty".into()));
        }
        self.page_geometry()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_colors() {
        assert_eq!(Color::parse("#fff").unwrap(), Color::WHITE);
        assert_eq!(Color::parse("#EA580C").unwrap(), Color::rgb(0xea, 0x58, 0x0c));
        assert!(Color::parse("ffffff").is_err());
        assert!(Color::parse("#ggg").is_err());
        assert!(Color::parse("#ffff").is_err());
    }

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = ExportConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg, ExportConfig::default());
    }

    #[test]
    fn json_overrides_selected_keys() {
        let cfg = ExportConfig::from_json_str(
            r##"{"scale": 3, "imageFormat": "jpeg", "jpegQuality": 0.8, "marginTopMm": 20, "backgroundColor": "#fafafa"}"##,
        )
        .unwrap();
        assert_eq!(cfg.scale, 3.0);
        assert_eq!(cfg.image_format, ImageFormat::Jpeg);
        assert_eq!(cfg.margin_top_mm, 20.0);
        assert_eq!(cfg.margin_bottom_mm, 15.0);
        assert_eq!(cfg.background_color, Color::rgb(0xfa, 0xfa, 0xfa));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        assert!(matches!(ExportConfig::from_json_str(r#"{"dpi": 300}"#), Err(Error::Json(_))));
        assert!(matches!(ExportConfig::from_json_str(r#"{"scale": 0}"#), Err(Error::ConfigError(_))));
        assert!(matches!(ExportConfig::from_json_str(r#"{"jpegQuality": 1.5}"#), Err(Error::ConfigError(_))));
        assert!(matches!(
            ExportConfig::from_json_str(r#"{"marginTopMm": 200, "marginBottomMm": 100}"#),
            Err(Error::SliceGeometryError(_))
        ));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = ExportConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"backgroundColor\":\"#ffffff\""));
        assert_eq!(ExportConfig::from_json_str(&json).unwrap(), cfg);
    }
}
