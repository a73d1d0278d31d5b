//! Captured source bitmap and pixel-row cropping

use crate::config::Color;
use crate::slicer::Slice;
use crate::{Error, Result};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Full-resolution raster capture of a rendered subtree.
///
/// Immutable once captured; every pixel is opaque.
#[derive(Debug, Clone)]
pub struct SourceBitmap {
    image: RgbImage,
    origin: String,
}

impl SourceBitmap {
    /// Wrap an RGBA capture, compositing any translucent pixel onto `background`
    pub fn from_rgba(image: &RgbaImage, background: Color, origin: impl Into<String>) -> Result<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::CaptureError(format!("captured bitmap is empty ({}x{})", w, h)));
        }
        Ok(Self {
            image: flatten(image, background),
            origin: origin.into(),
        })
    }

    pub fn from_rgb(image: RgbImage, origin: impl Into<String>) -> Result<Self> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::CaptureError(format!("captured bitmap is empty ({}x{})", w, h)));
        }
        Ok(Self {
            image,
            origin: origin.into(),
        })
    }

    /// Decode an encoded capture (PNG/JPEG) and flatten it onto `background`
    pub fn decode(bytes: &[u8], background: Color, origin: impl Into<String>) -> Result<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| Error::CaptureError(format!("cannot decode captured image: {}", e)))?;
        Self::from_rgba(&decoded.to_rgba8(), background, origin)
    }

    pub fn pixel_width(&self) -> u32 {
        self.image.width()
    }

    pub fn pixel_height(&self) -> u32 {
        self.image.height()
    }

    /// Element id the bitmap was captured from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Copy the full-width rows covered by `slice`
    pub fn crop(&self, slice: &Slice) -> Result<RgbImage> {
        let end = slice.source_y.checked_add(slice.source_height);
        match end {
            Some(end) if slice.source_height > 0 && end <= self.pixel_height() => Ok(image::imageops::crop_imm(
                &self.image,
                0,
                slice.source_y,
                self.pixel_width(),
                slice.source_height,
            )
            .to_image()),
            _ => Err(Error::AssemblyError(format!(
                "slice {} rows {}+{} fall outside a {}-row bitmap",
                slice.page_index,
                slice.source_y,
                slice.source_height,
                self.pixel_height()
            ))),
        }
    }
}

/// Composite each pixel over an opaque background (source-over)
pub fn flatten(image: &RgbaImage, background: Color) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in image.enumerate_pixels() {
        out.put_pixel(x, y, blend(*px, background));
    }
    out
}

fn blend(px: Rgba<u8>, bg: Color) -> Rgb<u8> {
    let [r, g, b, a] = px.0;
    if a == 255 {
        return Rgb([r, g, b]);
    }
    let a = a as u32;
    let mix = |fg: u8, bg: u8| ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8;
    Rgb([mix(r, bg.r), mix(g, bg.g), mix(b, bg.b)])
}
