//! Physical page geometry and unit conversions

use crate::config::{Orientation, PageFormat};
use crate::{Error, Result};

pub const MM_PER_INCH: f64 = 25.4;
pub const PT_PER_INCH: f64 = 72.0;
/// CSS reference pixel density
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// Convert millimetres to PDF points
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * PT_PER_INCH / MM_PER_INCH
}

/// Convert CSS pixels to millimetres at 96 dpi
pub fn css_px_to_mm(px: f64) -> f64 {
    px * MM_PER_INCH / CSS_PX_PER_INCH
}

/// Convert millimetres to CSS pixels at 96 dpi
pub fn mm_to_css_px(mm: f64) -> f64 {
    mm * CSS_PX_PER_INCH / MM_PER_INCH
}

/// Margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 15.0,
            bottom: 15.0,
            left: 10.0,
            right: 10.0,
        }
    }
}

/// Physical page size plus margins.
///
/// Construction validates that the content area (page minus margins) is
/// strictly positive in both directions; nothing is clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    width_mm: f64,
    height_mm: f64,
    margins: Margins,
}

impl PageGeometry {
    pub fn new(width_mm: f64, height_mm: f64, margins: Margins) -> Result<Self> {
        let geometry = Self {
            width_mm,
            height_mm,
            margins,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// A4 portrait with 15/15/10/10 mm margins
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margins: Margins::default(),
        }
    }

    pub fn from_format(format: PageFormat, orientation: Orientation, margins: Margins) -> Result<Self> {
        let (w, h) = format.size_mm();
        let (w, h) = match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        };
        Self::new(w, h, margins)
    }

    fn validate(&self) -> Result<()> {
        let values = [
            ("page width", self.width_mm),
            ("page height", self.height_mm),
            ("top margin", self.margins.top),
            ("bottom margin", self.margins.bottom),
            ("left margin", self.margins.left),
            ("right margin", self.margins.right),
        ];
        for (name, v) in values {
            if !v.is_finite() {
                return Err(Error::SliceGeometryError(format!("{} is not finite", name)));
            }
            if v < 0.0 {
                return Err(Error::SliceGeometryError(format!("{} is negative ({} mm)", name, v)));
            }
        }
        if self.content_width_mm() <= 0.0 {
            return Err(Error::SliceGeometryError(format!(
                "content width {} mm is not positive (page {} mm, margins {}+{} mm)",
                self.content_width_mm(),
                self.width_mm,
                self.margins.left,
                self.margins.right
            )));
        }
        if self.content_height_mm() <= 0.0 {
            return Err(Error::SliceGeometryError(format!(
                "content height {} mm is not positive (page {} mm, margins {}+{} mm)",
                self.content_height_mm(),
                self.height_mm,
                self.margins.top,
                self.margins.bottom
            )));
        }
        Ok(())
    }

    pub fn width_mm(&self) -> f64 {
        self.width_mm
    }

    pub fn height_mm(&self) -> f64 {
        self.height_mm
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn content_width_mm(&self) -> f64 {
        self.width_mm - self.margins.left - self.margins.right
    }

    pub fn content_height_mm(&self) -> f64 {
        self.height_mm - self.margins.top - self.margins.bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}
