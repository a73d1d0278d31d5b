//! PDF assembly: one image XObject per slice, one slice per page

use crate::config::ImageFormat;
use crate::geometry::{mm_to_pt, PageGeometry};
use crate::slicer::Slice;
use crate::{Error, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

/// A slice together with its cropped pixels
#[derive(Debug, Clone)]
pub struct PageImage {
    pub slice: Slice,
    pub pixels: RgbImage,
}

/// Finished document bytes
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Page image encoding with its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImageEncoding {
    /// Flate-compressed RGB, lossless
    Lossless,
    /// DCT at the given quality (1..=100)
    Jpeg(u8),
}

impl ImageEncoding {
    pub fn from_config(format: ImageFormat, jpeg_quality: f64) -> Self {
        match format {
            ImageFormat::Png => ImageEncoding::Lossless,
            ImageFormat::Jpeg => ImageEncoding::Jpeg(((jpeg_quality * 100.0).round() as u8).clamp(1, 100)),
        }
    }
}

/// Writes slices into a paginated PDF.
///
/// Every page gets the full page `MediaBox`; the image is placed at
/// `(margin_left, dest_y)` measured from the top-left corner, `content_width`
/// wide and `dest_height` tall. No timestamps or random IDs are written, so
/// identical input produces identical bytes.
#[derive(Debug, Clone)]
pub struct PdfAssembler {
    geometry: PageGeometry,
    encoding: ImageEncoding,
    title: Option<String>,
}

impl PdfAssembler {
    pub fn new(geometry: PageGeometry, encoding: ImageEncoding) -> Self {
        Self {
            geometry,
            encoding,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn assemble(&self, pages: &[PageImage]) -> Result<AssembledDocument> {
        if pages.is_empty() {
            return Err(Error::AssemblyError("no page images to assemble".into()));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_w = mm_to_pt(self.geometry.width_mm());
        let page_h = mm_to_pt(self.geometry.height_mm());

        let mut kids = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            if page.slice.page_index != index {
                return Err(Error::AssemblyError(format!(
                    "page image {} carries slice for page {}",
                    index, page.slice.page_index
                )));
            }
            let page_id = self.add_page(&mut doc, pages_id, page, page_w, page_h)?;
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(pages.len() as i64),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut info = dictionary! {
            "Producer" => Object::String(b"quotepress".to_vec(), StringFormat::Literal),
        };
        if let Some(title) = &self.title {
            info.set("Title", text_string(title));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Error::AssemblyError(format!("cannot serialize document: {}", e)))?;

        Ok(AssembledDocument {
            bytes,
            page_count: pages.len(),
        })
    }

    fn add_page(&self, doc: &mut Document, parent: ObjectId, page: &PageImage, page_w: f64, page_h: f64) -> Result<ObjectId> {
        let (w, h) = page.pixels.dimensions();
        if w == 0 || h == 0 {
            return Err(Error::AssemblyError(format!(
                "page {} image is empty ({}x{})",
                page.slice.page_index, w, h
            )));
        }
        if page.slice.source_height != h {
            return Err(Error::AssemblyError(format!(
                "page {} image has {} rows, slice expects {}",
                page.slice.page_index, h, page.slice.source_height
            )));
        }

        let image_id = doc.add_object(self.encode_image(&page.pixels)?);
        let name = format!("Im{}", page.slice.page_index + 1);

        let margins = self.geometry.margins();
        let x = mm_to_pt(margins.left);
        let draw_w = mm_to_pt(self.geometry.content_width_mm());
        let draw_h = mm_to_pt(page.slice.dest_height_mm);
        // PDF space grows upwards from the bottom edge
        let y = page_h - mm_to_pt(page.slice.dest_y_mm) - draw_h;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![real(draw_w), real(0.0), real(0.0), real(draw_h), real(x), real(y)],
                ),
                Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_bytes = content
            .encode()
            .map_err(|e| Error::AssemblyError(format!("cannot encode page content: {}", e)))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content_bytes));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![real(0.0), real(0.0), real(page_w), real(page_h)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    name.as_str() => image_id,
                },
            },
        });
        Ok(page_id)
    }

    fn encode_image(&self, pixels: &RgbImage) -> Result<Stream> {
        let (w, h) = pixels.dimensions();
        let (filter, data) = match self.encoding {
            ImageEncoding::Lossless => {
                let compress = || -> std::io::Result<Vec<u8>> {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(pixels.as_raw())?;
                    encoder.finish()
                };
                let data = compress()
                    .map_err(|e| Error::AssemblyError(format!("cannot compress page image: {}", e)))?;
                ("FlateDecode", data)
            }
            ImageEncoding::Jpeg(quality) => {
                let mut data = Vec::new();
                JpegEncoder::new_with_quality(&mut data, quality)
                    .encode_image(pixels)
                    .map_err(|e| Error::AssemblyError(format!("cannot encode page image: {}", e)))?;
                ("DCTDecode", data)
            }
        };

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => Object::Integer(w as i64),
                "Height" => Object::Integer(h as i64),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => Object::Integer(8),
                "Filter" => filter,
            },
            data,
        );
        // Already compressed; never re-filter
        stream.allows_compression = false;
        Ok(stream)
    }
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// PDF text string: ASCII as a literal, anything else as UTF-16BE with a BOM
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}
