//! Quotepress
//!
//! Turns a rendered quotation preview into a print-ready, paginated PDF:
//! the preview subtree is rasterized once at a magnification factor, the
//! bitmap is cut into page-sized slices that exactly cover it, and each slice
//! is placed on its own A4 page inside the margins.
//!
//! # Features
//!
//! - **HTML backend** (default): pure-Rust layout and rasterization of a
//!   preview document, no browser required
//! - **CDP backend**: element screenshots via headless Chrome
//! - **API client**: fetches quotations from the CRUD service with an
//!   injected token store
//!
//! # Example
//!
//! ```no_run
//! use quotepress::{ExportConfig, ExportRequest, Exporter, FileDelivery};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExportConfig::default();
//! let mut capturer = quotepress::new_capturer(&config)?;
//! capturer.load_html(&std::fs::read_to_string("preview.html")?)?;
//!
//! let exporter = Exporter::new(capturer, FileDelivery::new("out"), config)?;
//! let report = exporter.export(&ExportRequest::new("Q-2024-001", "Acme Builders"))?;
//! println!("{} ({} pages)", report.file_name, report.page_count);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, ExportError, Result, Stage};

pub mod assembler;
pub mod bitmap;
pub mod config;
pub mod delivery;
pub mod export;
pub mod geometry;
pub mod invoice;
pub mod preview;
pub mod slicer;

// Pure-Rust capture backend: block layout + rasterizer
#[cfg(feature = "html")]
pub mod rendering;

#[cfg(feature = "html")]
pub mod html;

#[cfg(feature = "cdp")]
pub mod cdp;

#[cfg(feature = "api")]
pub mod api;

// Async-friendly export API (worker-thread backed)
pub mod async_api;

pub use assembler::{AssembledDocument, PageImage, PdfAssembler};
pub use bitmap::SourceBitmap;
pub use config::{Color, ImageFormat, Orientation, PageFormat};
pub use delivery::{Delivery, FileDelivery, MemoryDelivery};
pub use export::{derive_file_name, ExportReport, ExportRequest, Exporter};
pub use geometry::{Margins, PageGeometry};
pub use slicer::{PageSlicer, Slice};

/// Configuration for an export.
///
/// Field names serialize in camelCase so a JSON configuration file reads
/// `{"scale": 2, "marginTopMm": 15, "imageFormat": "png", ...}`. The defaults
/// reproduce the production setup: 2x capture, A4 portrait, 15/15/10/10 mm
/// margins, lossless page images on a white background.
///
/// # Examples
///
/// ```
/// let cfg = quotepress::ExportConfig::default();
/// assert_eq!(cfg.scale, 2.0);
/// assert_eq!(cfg.target_id, "invoice-preview");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct ExportConfig {
    /// Capture resolution multiplier (bitmap px per CSS px)
    pub scale: f64,
    pub page_format: PageFormat,
    pub orientation: Orientation,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    /// Encoding used for page images
    pub image_format: ImageFormat,
    /// JPEG quality in `0..=1`, only used with `ImageFormat::Jpeg`
    pub jpeg_quality: f64,
    /// Fill for regions without content; translucent paint is composited onto it
    pub background_color: Color,
    /// Layout viewport in CSS pixels
    pub viewport: Viewport,
    /// Element id of the preview root
    pub target_id: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            page_format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margin_top_mm: 15.0,
            margin_bottom_mm: 15.0,
            margin_left_mm: 10.0,
            margin_right_mm: 10.0,
            image_format: ImageFormat::Png,
            jpeg_quality: 0.92,
            background_color: Color::WHITE,
            viewport: Viewport::default(),
            target_id: "invoice-preview".to_string(),
        }
    }
}

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    /// A4 at 96 dpi
    fn default() -> Self {
        Self {
            width: 794,
            height: 1123,
        }
    }
}

/// Parameters for a single rasterization
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    /// Element id of the subtree to capture
    pub target_id: String,
    /// Bitmap pixels per CSS pixel, must be > 0
    pub scale: f64,
    pub background: Color,
    pub viewport: Viewport,
}

impl CaptureRequest {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            target_id: config.target_id.clone(),
            scale: config.scale,
            background: config.background_color,
            viewport: config.viewport,
        }
    }
}

/// Core trait for capture backends.
///
/// A backend holds one laid-out document and rasterizes subtrees of it on
/// request. The document must not change while a capture is in flight.
pub trait Capture {
    /// Replace the current document with the given HTML
    fn load_html(&mut self, html: &str) -> Result<()>;

    /// Rasterize the element identified by `request.target_id`.
    ///
    /// The returned bitmap is fully opaque and measures the element's layout
    /// size multiplied by `request.scale`. Fails with `Error::CaptureError`
    /// when no document is loaded or the element does not exist.
    fn capture(&self, request: &CaptureRequest) -> Result<SourceBitmap>;

    /// Release backend resources
    fn close(self) -> Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

impl<T: Capture + ?Sized> Capture for Box<T> {
    fn load_html(&mut self, html: &str) -> Result<()> {
        (**self).load_html(html)
    }

    fn capture(&self, request: &CaptureRequest) -> Result<SourceBitmap> {
        (**self).capture(request)
    }
}

/// Create a capturer with the preferred available backend.
///
/// The pure-Rust HTML backend is used when the `html` feature is enabled
/// (default); otherwise headless Chrome via `cdp`. Without either backend
/// every call fails with `CaptureError`.
#[cfg(feature = "html")]
pub fn new_capturer(_config: &ExportConfig) -> Result<Box<dyn Capture + Send>> {
    Ok(Box::new(html::HtmlCapture::new()))
}

#[cfg(all(not(feature = "html"), feature = "cdp"))]
pub fn new_capturer(config: &ExportConfig) -> Result<Box<dyn Capture + Send>> {
    Ok(Box::new(cdp::CdpCapture::new(config)?))
}

#[cfg(not(any(feature = "html", feature = "cdp")))]
pub fn new_capturer(_config: &ExportConfig) -> Result<Box<dyn Capture + Send>> {
    Err(Error::CaptureError(
        "no capture backend enabled; build with the `html` or `cdp` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(any(feature = "html", feature = "cdp")))]
    #[test]
    fn missing_backend_is_capture_error() {
        let err = new_capturer(&ExportConfig::default()).err();
        assert!(matches!(err, Some(Error::CaptureError(ref m)) if m.contains("html")));
    }

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.viewport.width, 794);
        assert_eq!(config.margin_left_mm, 10.0);
        assert_eq!(config.image_format, ImageFormat::Png);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn capture_request_mirrors_config() {
        let config = ExportConfig {
            scale: 3.0,
            viewport: Viewport { width: 800, height: 600 },
            ..Default::default()
        };
        let req = CaptureRequest::from_config(&config);
        assert_eq!(req.scale, 3.0);
        assert_eq!(req.viewport.width, 800);
        assert_eq!(req.target_id, "invoice-preview");
        assert_eq!(req.background, Color::WHITE);
    }
}
