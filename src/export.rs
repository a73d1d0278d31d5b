//! Export controller: capture -> slice -> assemble -> deliver

use crate::assembler::{ImageEncoding, PageImage, PdfAssembler};
use crate::delivery::Delivery;
use crate::error::StageContext;
use crate::slicer::{PageSlicer, Slice};
use crate::{AssembledDocument, Capture, CaptureRequest, ExportConfig, ExportError, Result, Stage};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// What to export and how to name it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// Quotation / invoice number, e.g. `Q-2024-001`
    pub document_number: String,
    /// Client or party name; sanitized into the file name
    pub party_name: String,
    /// Element id override; the configured `target_id` is used when `None`
    pub target_id: Option<String>,
}

impl ExportRequest {
    pub fn new(document_number: impl Into<String>, party_name: impl Into<String>) -> Self {
        Self {
            document_number: document_number.into(),
            party_name: party_name.into(),
            target_id: None,
        }
    }

    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn file_name(&self) -> String {
        derive_file_name(&self.document_number, &self.party_name)
    }
}

/// `"{number}_{party}.pdf"` with every character of the party name outside
/// `[A-Za-z0-9]` replaced by `_`. Path separators in the number are replaced
/// too so the name never escapes its directory.
pub fn derive_file_name(document_number: &str, party_name: &str) -> String {
    let number: String = document_number
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let party: String = party_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}.pdf", number, party)
}

/// Outcome of a successful export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file_name: String,
    /// Where the delivery put the document
    pub location: PathBuf,
    pub page_count: usize,
    pub byte_len: usize,
    /// Hex SHA-256 of the document bytes
    pub sha256: String,
    pub slices: Vec<Slice>,
}

/// A rendered document that has not been delivered
#[derive(Debug, Clone)]
pub struct RenderedExport {
    pub document: AssembledDocument,
    pub slices: Vec<Slice>,
}

/// Runs the export pipeline over a capture backend and a delivery target.
///
/// Each call is independent: the bitmap and slices are owned by the call and
/// dropped when it returns. Nothing is retried; the first failing stage
/// aborts the export and nothing is delivered.
pub struct Exporter<C, D> {
    capturer: C,
    delivery: D,
    config: ExportConfig,
    slicer: PageSlicer,
    assembler: PdfAssembler,
}

impl<C: Capture, D: Delivery> Exporter<C, D> {
    /// Validates the configuration up front; invalid geometry fails here
    pub fn new(capturer: C, delivery: D, config: ExportConfig) -> Result<Self> {
        config.validate()?;
        let geometry = config.page_geometry()?;
        let encoding = ImageEncoding::from_config(config.image_format, config.jpeg_quality);
        Ok(Self {
            capturer,
            delivery,
            slicer: PageSlicer::new(geometry),
            assembler: PdfAssembler::new(geometry, encoding),
            config,
        })
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn capturer(&self) -> &C {
        &self.capturer
    }

    pub fn capturer_mut(&mut self) -> &mut C {
        &mut self.capturer
    }

    pub fn delivery(&self) -> &D {
        &self.delivery
    }

    /// Give the capture backend back, e.g. to close it
    pub fn into_capturer(self) -> C {
        self.capturer
    }

    /// Capture, slice and assemble without delivering
    pub fn render(&self, request: &ExportRequest) -> std::result::Result<RenderedExport, ExportError> {
        let mut capture = CaptureRequest::from_config(&self.config);
        if let Some(target) = &request.target_id {
            capture.target_id = target.clone();
        }

        let bitmap = self.capturer.capture(&capture).stage(Stage::Capture)?;
        debug!(
            "captured #{} at {}x{} px (scale {})",
            bitmap.origin(),
            bitmap.pixel_width(),
            bitmap.pixel_height(),
            capture.scale
        );

        let slices = self.slicer.slice(&bitmap).stage(Stage::Slice)?;

        let pages = slices
            .iter()
            .map(|slice| {
                bitmap.crop(slice).map(|pixels| PageImage {
                    slice: *slice,
                    pixels,
                })
            })
            .collect::<Result<Vec<_>>>()
            .stage(Stage::Assemble)?;
        drop(bitmap);

        let title = format!("{} {}", request.document_number, request.party_name);
        let document = self
            .assembler
            .clone()
            .with_title(title.trim())
            .assemble(&pages)
            .stage(Stage::Assemble)?;

        Ok(RenderedExport { document, slices })
    }

    /// Run the whole pipeline and deliver the document
    pub fn export(&self, request: &ExportRequest) -> std::result::Result<ExportReport, ExportError> {
        let rendered = self.render(request)?;
        let file_name = request.file_name();
        let bytes = &rendered.document.bytes;

        let location = self.delivery.deliver(&file_name, bytes).stage(Stage::Deliver)?;
        info!(
            "exported {} ({} pages, {} bytes)",
            file_name,
            rendered.document.page_count,
            bytes.len()
        );

        Ok(ExportReport {
            file_name,
            location,
            page_count: rendered.document.page_count,
            byte_len: bytes.len(),
            sha256: hex::encode(Sha256::digest(bytes)),
            slices: rendered.slices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, MemoryDelivery, SourceBitmap};
    use image::{Rgb, RgbImage};
    use std::cell::Cell;

    /// Produces a fixed-size bitmap and counts calls
    struct FixedCapture {
        width: u32,
        height: u32,
        calls: Cell<usize>,
    }

    impl FixedCapture {
        fn new(width: u32, height: u32) -> Self {
            Self { width, height, calls: Cell::new(0) }
        }
    }

    impl Capture for FixedCapture {
        fn load_html(&mut self, _html: &str) -> Result<()> {
            Ok(())
        }

        fn capture(&self, request: &CaptureRequest) -> Result<SourceBitmap> {
            self.calls.set(self.calls.get() + 1);
            if request.target_id != "invoice-preview" {
                return Err(Error::CaptureError(format!("element #{} not found", request.target_id)));
            }
            let img = RgbImage::from_fn(self.width, self.height, |_, y| Rgb([(y % 251) as u8, 90, 160]));
            SourceBitmap::from_rgb(img, request.target_id.clone())
        }
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(derive_file_name("Q-2024-001", "Acme Builders & Co."), "Q-2024-001_Acme_Builders___Co_.pdf");
        assert_eq!(derive_file_name("INV/7", "Ravi"), "INV_7_Ravi.pdf");
        assert_eq!(derive_file_name("Q1", "Müller"), "Q1_M_ller.pdf");
    }

    #[test]
    fn exports_and_delivers_once() {
        let exporter = Exporter::new(FixedCapture::new(400, 900), MemoryDelivery::new(), ExportConfig::default()).unwrap();
        let report = exporter.export(&ExportRequest::new("Q-9", "Acme Ltd")).unwrap();

        // 900 rows at 400 px / 190 mm => 427.5 mm => 2 pages
        assert_eq!(report.page_count, 2);
        assert_eq!(report.file_name, "Q-9_Acme_Ltd.pdf");
        assert_eq!(report.slices.iter().map(|s| s.source_height).sum::<u32>(), 900);
        assert_eq!(report.sha256.len(), 64);

        let files = exporter.delivery().files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "Q-9_Acme_Ltd.pdf");
        assert_eq!(files[0].1.len(), report.byte_len);
    }

    #[test]
    fn missing_target_fails_in_capture_without_delivery() {
        let exporter = Exporter::new(FixedCapture::new(400, 900), MemoryDelivery::new(), ExportConfig::default()).unwrap();
        let err = exporter
            .export(&ExportRequest::new("Q-9", "Acme").with_target("nope"))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Capture);
        assert!(matches!(err.source, Error::CaptureError(_)));
        assert!(exporter.delivery().is_empty());
    }

    #[test]
    fn invalid_geometry_fails_at_construction() {
        let config = ExportConfig {
            margin_left_mm: 105.0,
            margin_right_mm: 105.0,
            ..Default::default()
        };
        let res = Exporter::new(FixedCapture::new(10, 10), MemoryDelivery::new(), config);
        assert!(matches!(res, Err(Error::SliceGeometryError(_))));
    }

    #[test]
    fn repeated_exports_are_identical() {
        let exporter = Exporter::new(FixedCapture::new(300, 2000), MemoryDelivery::new(), ExportConfig::default()).unwrap();
        let request = ExportRequest::new("Q-1", "Same");
        let a = exporter.export(&request).unwrap();
        let b = exporter.export(&request).unwrap();
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.slices, b.slices);
        assert_eq!(exporter.capturer().calls.get(), 2);
    }
}
