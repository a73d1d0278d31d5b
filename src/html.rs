//! HtmlCapture: pure-Rust capture backend over a static preview document.

use crate::bitmap::SourceBitmap;
use crate::rendering::{layout, paint, raster};
use crate::{Capture, CaptureRequest, Error, Result};
use log::debug;
use scraper::{Html, Selector};

/// Upper bound on captured pixels (~1 GiB of RGBA)
pub const MAX_CAPTURE_PIXELS: u64 = 268_435_456;

/// Captures elements of an HTML document without a browser.
///
/// The document is parsed on every capture, so a capture always reflects the
/// most recently loaded HTML.
#[derive(Debug, Clone, Default)]
pub struct HtmlCapture {
    html: Option<String>,
}

impl HtmlCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_html(html: impl Into<String>) -> Self {
        Self { html: Some(html.into()) }
    }
}

impl Capture for HtmlCapture {
    fn load_html(&mut self, html: &str) -> Result<()> {
        self.html = Some(html.to_string());
        Ok(())
    }

    fn capture(&self, request: &CaptureRequest) -> Result<SourceBitmap> {
        if !request.scale.is_finite() || request.scale <= 0.0 {
            return Err(Error::CaptureError(format!("scale must be > 0, got {}", request.scale)));
        }
        let html = self
            .html
            .as_deref()
            .ok_or_else(|| Error::CaptureError("no document loaded".into()))?;

        let document = Html::parse_document(html);
        let with_id = Selector::parse("[id]").map_err(|e| Error::CaptureError(format!("selector: {:?}", e)))?;
        let root = document
            .select(&with_id)
            .find(|el| el.value().id() == Some(request.target_id.as_str()))
            .ok_or_else(|| Error::CaptureError(format!("element #{} not found", request.target_id)))?;

        let tree = layout::layout_subtree(root, request.viewport);
        let (w, h) = raster::scaled_size(tree.width, tree.height, request.scale);
        if w as u64 * h as u64 > MAX_CAPTURE_PIXELS {
            return Err(Error::CaptureError(format!("capture of {}x{} px exceeds the pixel limit", w, h)));
        }

        let commands = paint::build_display_list(&tree);
        let image = raster::rasterize(&commands, tree.width, tree.height, request.scale, request.background);
        debug!("rasterized #{} to {}x{}", request.target_id, image.width(), image.height());
        SourceBitmap::from_rgba(&image, request.background, request.target_id.clone())
    }
}
