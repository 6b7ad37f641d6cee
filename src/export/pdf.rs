//! Draws a `PrintDocument` with printpdf using the built-in PDF fonts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use printpdf::image_crate::{self, DynamicImage, GenericImageView};
use printpdf::{
  BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
  PdfDocumentReference, PdfLayerReference, Point, Rgb,
};
use tracing::debug;

use super::layout::{Font, ImageRef, Item, PrintDocument, PAGE_HEIGHT, PAGE_WIDTH};
use crate::domain::GeneratedContent;
use crate::error::ExportError;

const DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;
const MM_TO_PT: f32 = 2.8346;
const LAYER: &str = "content";

struct Fonts {
  regular: IndirectFontRef,
  bold: IndirectFontRef,
  italic: IndirectFontRef,
  mono: IndirectFontRef,
}

impl Fonts {
  fn load(doc: &PdfDocumentReference) -> Result<Self, ExportError> {
    let font = |f: BuiltinFont| doc.add_builtin_font(f).map_err(|e| ExportError::Pdf(e.to_string()));
    Ok(Self {
      regular: font(BuiltinFont::Helvetica)?,
      bold: font(BuiltinFont::HelveticaBold)?,
      italic: font(BuiltinFont::HelveticaOblique)?,
      mono: font(BuiltinFont::CourierBold)?,
    })
  }

  fn get(&self, font: Font) -> &IndirectFontRef {
    match font {
      Font::Regular => &self.regular,
      Font::Bold => &self.bold,
      Font::Italic => &self.italic,
      Font::Mono => &self.mono,
    }
  }
}

/// Render `doc` to PDF bytes. Images are taken from `content` and must be valid
/// base64-encoded rasters.
pub fn render_pdf(content: &GeneratedContent, doc: &PrintDocument) -> Result<Vec<u8>, ExportError> {
  let cover = decode_image("cover", &content.narrative.cover_image)?;
  let vignettes = content
    .narrative
    .vignette_images
    .iter()
    .enumerate()
    .map(|(i, b64)| decode_image(&format!("vignette {}", i + 1), b64))
    .collect::<Result<Vec<_>, _>>()?;

  let (pdf, first_page, first_layer) = PdfDocument::new(&doc.title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
  let fonts = Fonts::load(&pdf)?;

  for (n, page) in doc.pages.iter().enumerate() {
    let layer = if n == 0 {
      pdf.get_page(first_page).get_layer(first_layer)
    } else {
      let (p, l) = pdf.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
      pdf.get_page(p).get_layer(l)
    };

    for item in &page.items {
      match item {
        Item::Text { x, y, size, font, text, .. } => {
          layer.use_text(text.as_str(), *size, Mm(*x), Mm(PAGE_HEIGHT - *y), fonts.get(*font));
        }
        Item::Image { image, x, y, width, height } => {
          let raster = match image {
            ImageRef::Cover => Some(&cover),
            ImageRef::Vignette(i) => vignettes.get(*i),
          };
          if let Some(raster) = raster {
            place_image(&layer, raster, (*x, *y, *width, *height));
          }
        }
        Item::Highlight { from, to, thickness } => {
          stroke(&layer, *from, *to, *thickness * MM_TO_PT, Rgb::new(0.82, 0.82, 0.82, None));
        }
        Item::Rule { from, to } => {
          stroke(&layer, *from, *to, 0.5, Rgb::new(0.55, 0.55, 0.55, None));
        }
      }
    }
  }

  let bytes = pdf.save_to_bytes().map_err(|e| ExportError::Pdf(e.to_string()))?;
  debug!(target: "taller_backend", pages = doc.pages.len(), bytes = bytes.len(), "PDF written");
  Ok(bytes)
}

fn decode_image(which: &str, b64: &str) -> Result<DynamicImage, ExportError> {
  let bytes = STANDARD
    .decode(b64.trim())
    .map_err(|source| ExportError::ImageEncoding { which: which.to_string(), source })?;
  let image = image_crate::load_from_memory(&bytes)
    .map_err(|e| ExportError::ImageDecode { which: which.to_string(), message: e.to_string() })?;
  // Alpha channels are flattened; coloring pages are opaque anyway.
  Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// Fit `raster` inside the box (top-left origin), centred, keeping its aspect ratio.
fn place_image(layer: &PdfLayerReference, raster: &DynamicImage, (x, y, width, height): (f32, f32, f32, f32)) {
  let (px_w, px_h) = raster.dimensions();
  let natural_w = px_w.max(1) as f32 / DPI * MM_PER_INCH;
  let natural_h = px_h.max(1) as f32 / DPI * MM_PER_INCH;
  let scale = (width / natural_w).min(height / natural_h);
  let (drawn_w, drawn_h) = (natural_w * scale, natural_h * scale);

  Image::from_dynamic_image(raster).add_to_layer(
    layer.clone(),
    ImageTransform {
      translate_x: Some(Mm(x + (width - drawn_w) / 2.0)),
      translate_y: Some(Mm(PAGE_HEIGHT - y - (height + drawn_h) / 2.0)),
      scale_x: Some(scale),
      scale_y: Some(scale),
      dpi: Some(DPI),
      ..Default::default()
    },
  );
}

fn stroke(layer: &PdfLayerReference, from: (f32, f32), to: (f32, f32), thickness_pt: f32, color: Rgb) {
  layer.set_outline_color(Color::Rgb(color));
  layer.set_outline_thickness(thickness_pt);
  layer.add_line(Line {
    points: vec![
      (Point::new(Mm(from.0), Mm(PAGE_HEIGHT - from.1)), false),
      (Point::new(Mm(to.0), Mm(PAGE_HEIGHT - to.1)), false),
    ],
    is_closed: false,
  });
}
