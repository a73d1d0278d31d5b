//! Page slicer: cuts a tall bitmap into page-sized, gap-free row ranges.
//!
//! The bitmap is scaled uniformly so its width fills the content width of the
//! page; its height in millimetres follows from that single factor. Pages are
//! then filled top to bottom with at most one content height each.
//!
//! Source rows are derived from one pixel-per-millimetre factor,
//! `pixel_width / content_width_mm` (equal to `pixel_height / image_height_mm`
//! by construction). Every slice boundary is computed once as
//! `round(consumed_mm * px_per_mm)` and shared by the slice that ends there
//! and the slice that starts there, and the last boundary is pinned to the
//! bitmap height. Slice heights therefore telescope to exactly
//! `pixel_height`: no row is lost or duplicated. A final slice that rounds
//! to zero rows takes the last row of the page before it.
//!
//! Content is not inspected: a table row or diagram may straddle a page
//! boundary.

use crate::bitmap::SourceBitmap;
use crate::geometry::PageGeometry;
use crate::{Error, Result};
use log::debug;

/// Remaining heights at or below this are treated as zero
pub const HEIGHT_EPSILON_MM: f64 = 1e-6;

/// One page worth of source rows and where they land on the page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    /// Zero-based page the slice is placed on
    pub page_index: usize,
    /// First source row (inclusive)
    pub source_y: u32,
    /// Number of source rows
    pub source_height: u32,
    /// Distance from the top of the page to the top of the image
    pub dest_y_mm: f64,
    /// Placed image height, never more than the content height
    pub dest_height_mm: f64,
}

impl Slice {
    /// One past the last source row
    pub fn source_end(&self) -> u32 {
        self.source_y + self.source_height
    }
}

/// Computes slice plans for a fixed page geometry
#[derive(Debug, Clone, Copy)]
pub struct PageSlicer {
    geometry: PageGeometry,
}

impl PageSlicer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self { geometry }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Height of the whole bitmap once scaled to the content width
    pub fn image_height_mm(&self, pixel_width: u32, pixel_height: u32) -> f64 {
        pixel_height as f64 * self.geometry.content_width_mm() / pixel_width as f64
    }

    /// Plan the slices for `bitmap`
    pub fn slice(&self, bitmap: &SourceBitmap) -> Result<Vec<Slice>> {
        self.plan(bitmap.pixel_width(), bitmap.pixel_height())
    }

    /// Plan the slices for a bitmap of the given pixel size.
    ///
    /// Fails with `SliceGeometryError` when the bitmap is empty or one page
    /// of content would cover less than one source row.
    pub fn plan(&self, pixel_width: u32, pixel_height: u32) -> Result<Vec<Slice>> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(Error::SliceGeometryError(format!(
                "cannot slice an empty {}x{} bitmap",
                pixel_width, pixel_height
            )));
        }

        let content_width = self.geometry.content_width_mm();
        let content_height = self.geometry.content_height_mm();
        let px_per_mm = pixel_width as f64 / content_width;
        if content_height * px_per_mm < 1.0 {
            return Err(Error::SliceGeometryError(format!(
                "content height {} mm covers less than one source row at {:.4} px/mm",
                content_height, px_per_mm
            )));
        }

        let image_height = self.image_height_mm(pixel_width, pixel_height);
        let dest_y = self.geometry.margins().top;

        let mut slices: Vec<Slice> = Vec::with_capacity((image_height / content_height).ceil() as usize);
        let mut remaining = image_height;
        let mut consumed = 0.0;
        let mut start_px = 0u32;

        while remaining > HEIGHT_EPSILON_MM {
            let fit = remaining.min(content_height);
            consumed += fit;
            remaining -= fit;

            let end_px = if remaining > HEIGHT_EPSILON_MM {
                ((consumed * px_per_mm).round() as u32).min(pixel_height)
            } else {
                pixel_height
            };

            if end_px == start_px {
                // Less than half a row left over after rounding: the
                // previous page hands over its last row
                match slices.last_mut() {
                    Some(prev) if prev.source_height > 1 => {
                        prev.source_height -= 1;
                        start_px -= 1;
                    }
                    _ => {
                        debug!("dropping {:.6} mm terminal slice with no source rows", fit);
                        break;
                    }
                }
            }

            let slice = Slice {
                page_index: slices.len(),
                source_y: start_px,
                source_height: end_px - start_px,
                dest_y_mm: dest_y,
                dest_height_mm: fit,
            };
            debug!(
                "slice {}: rows {}..{} -> {:.3} mm",
                slice.page_index,
                slice.source_y,
                slice.source_end(),
                slice.dest_height_mm
            );
            slices.push(slice);
            start_px = end_px;
        }

        Ok(slices)
    }
}
