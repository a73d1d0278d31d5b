//! Chrome DevTools Protocol capture backend

use crate::bitmap::SourceBitmap;
use crate::{Capture, CaptureRequest, Error, ExportConfig, Result};
use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::warn;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Element geometry reported by the page, CSS px relative to the document
#[derive(Debug, Deserialize)]
struct ElementBox {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Captures elements with headless Chrome.
///
/// The browser window is sized to the configured viewport so the preview
/// lays out at the same CSS width as in the application. Screenshots are
/// taken with `capture_beyond_viewport`, so elements taller than the window
/// are captured in full.
pub struct CdpCapture {
    browser: Browser,
    tab: Arc<Tab>,
    settle: Duration,
}

impl CdpCapture {
    pub fn new(config: &ExportConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .build()
            .map_err(|e| Error::CaptureError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::CaptureError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::CaptureError(format!("Failed to create tab: {}", e)))?;

        Ok(Self {
            browser,
            tab,
            settle: Duration::from_millis(300),
        })
    }

    /// Navigate to a page that already contains the preview
    pub fn load_url(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::CaptureError(format!("Navigation failed: {}", e)))?;
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::CaptureError(format!("Wait for navigation failed: {}", e)))?;

        // Let web fonts and images finish before anything is captured
        std::thread::sleep(self.settle);
        Ok(())
    }

    fn element_box(&self, target_id: &str) -> Result<ElementBox> {
        let id = serde_json::to_string(target_id)?;
        let script = format!(
            r#"(function(){{
                const el = document.getElementById({id});
                if (!el || !el.isConnected) return null;
                const r = el.getBoundingClientRect();
                return JSON.stringify({{
                    x: r.left + window.scrollX,
                    y: r.top + window.scrollY,
                    width: r.width,
                    height: Math.max(r.height, el.scrollHeight)
                }});
            }})()"#
        );
        let eval = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| Error::CaptureError(format!("Evaluation failed: {}", e)))?;

        match eval.value {
            Some(serde_json::Value::String(s)) => Ok(serde_json::from_str(&s)?),
            _ => Err(Error::CaptureError(format!("element #{} not found", target_id))),
        }
    }
}

impl Capture for CdpCapture {
    fn load_html(&mut self, html: &str) -> Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(html.as_bytes());
        self.load_url(&format!("data:text/html;charset=utf-8;base64,{}", encoded))
    }

    fn capture(&self, request: &CaptureRequest) -> Result<SourceBitmap> {
        if !request.scale.is_finite() || request.scale <= 0.0 {
            return Err(Error::CaptureError(format!("scale must be > 0, got {}", request.scale)));
        }
        let bounds = self.element_box(&request.target_id)?;
        if bounds.width <= 0.0 || bounds.height <= 0.0 {
            return Err(Error::CaptureError(format!(
                "element #{} has no layout size ({}x{})",
                request.target_id, bounds.width, bounds.height
            )));
        }

        let clip = Page::Viewport {
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            scale: request.scale,
        };
        let png = self
            .tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::CaptureError(format!("Screenshot failed: {}", e)))?;

        let bitmap = SourceBitmap::decode(&png, request.background, request.target_id.clone())?;
        let expected_w = (bounds.width * request.scale).round() as u32;
        if bitmap.pixel_width() != expected_w {
            warn!(
                "screenshot of #{} is {} px wide, expected {}",
                request.target_id,
                bitmap.pixel_width(),
                expected_w
            );
        }
        Ok(bitmap)
    }

    fn close(self) -> Result<()> {
        // Dropping the browser terminates the Chrome process
        drop(self.tab);
        drop(self.browser);
        Ok(())
    }
}
