//! Image to single-page PDF conversion via PDFium

use crate::error::{Error, Result};
use image::{DynamicImage, Rgb, RgbImage};
use pdfium_render::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bind PDFium (creates a new instance each time - PDFium is not thread-safe)
pub fn create_pdfium() -> Result<Pdfium> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "/opt/pdfium/lib",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| Error::Pdfium {
            reason: format!("Failed to initialize PDFium: {}", e),
        })?;

    Ok(Pdfium::new(bindings))
}

fn pdfium_error(context: &str) -> impl Fn(PdfiumError) -> Error + '_ {
    move |e| Error::Pdfium {
        reason: format!("{}: {}", context, e),
    }
}

/// Reduce any colour mode to opaque 8-bit RGB.
///
/// Transparent pixels are composited onto white since PDF pages have no
/// alpha channel of their own.
pub fn flatten_to_rgb(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = RgbImage::new(width, height);

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        rgb.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }

    rgb
}

/// Page size in points for an image of the given pixel size at `dpi`
pub fn page_size_points(width_px: u32, height_px: u32, dpi: f32) -> (f32, f32) {
    let scale = 72.0 / dpi;
    (width_px as f32 * scale, height_px as f32 * scale)
}

/// Encode PNG or JPEG bytes as a one-page PDF with the image filling the page
pub fn image_bytes_to_pdf(data: &[u8], dpi: f32) -> Result<Vec<u8>> {
    if dpi <= 0.0 {
        return Err(Error::ImageConversion {
            reason: format!("Invalid resolution: {}", dpi),
        });
    }

    let rgb = flatten_to_rgb(image::load_from_memory(data)?);
    let (width_px, height_px) = rgb.dimensions();
    if width_px == 0 || height_px == 0 {
        return Err(Error::ImageConversion {
            reason: "Image has no pixels".to_string(),
        });
    }
    let (width, height) = page_size_points(width_px, height_px, dpi);
    let image = DynamicImage::ImageRgb8(rgb);

    let pdfium = create_pdfium()?;
    let mut document = pdfium
        .create_new_pdf()
        .map_err(pdfium_error("Failed to create document"))?;

    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(
                PdfPoints::new(width),
                PdfPoints::new(height),
            ))
            .map_err(pdfium_error("Failed to create page"))?;

        page.objects_mut()
            .create_image_object(
                PdfPoints::new(0.0),
                PdfPoints::new(0.0),
                &image,
                Some(PdfPoints::new(width)),
                Some(PdfPoints::new(height)),
            )
            .map_err(pdfium_error("Failed to place image"))?;
    }

    document
        .save_to_bytes()
        .map_err(pdfium_error("Failed to save document"))
}

/// Convert the image at `image_path` into a PDF next to it.
///
/// The PDF is written to `image_path` with a `.pdf` extension; the image is
/// removed once the PDF is in place. Returns the PDF path.
pub fn image_to_pdf(image_path: &Path, dpi: f32) -> Result<PathBuf> {
    info!(path = %image_path.display(), "Converting image to PDF");

    let data = std::fs::read(image_path)?;
    let pdf = image_bytes_to_pdf(&data, dpi)?;

    let pdf_path = image_path.with_extension("pdf");
    let dir = pdf_path.parent().unwrap_or(Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    staged.write_all(&pdf)?;
    staged.persist(&pdf_path).map_err(|e| Error::Io(e.error))?;

    if pdf_path != image_path {
        std::fs::remove_file(image_path)?;
    }

    info!(path = %pdf_path.display(), "Image converted to PDF");
    Ok(pdf_path)
}
