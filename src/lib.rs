//! Markdown typesetting for thermal printers
//!
//! This crate renders markdown documents to a stream of 1-bit raster lines for
//! narrow receipt printers, and drives printers speaking the common `DC2 *`
//! raster command set.
//!
//! # Example
//!
//! ```rust,no_run
//! use mdprint::{Printer, Renderer, Images, Style, Unshortened, PRINTER_DPI};
//!
//! let style = Style::system(PRINTER_DPI).unwrap();
//! let renderer = Renderer::new(style, Box::new(Images::new(".")), Box::new(Unshortened));
//! let mut printer = Printer::new(std::io::stdout());
//! renderer.render_markdown(&mut printer, "# Hello\n\nFrom *markdown*.").unwrap();
//! ```

mod barcode;
mod bitmap;
mod device;
mod document;
mod error;
mod fixed;
mod font;
mod layout;
mod preview;
mod printer;
mod render;
mod renderer;
mod resource;
mod server;
mod style;

#[cfg(test)]
mod test_utils;

pub use crate::{
    barcode::url_barcode,
    bitmap::{Bitmap, BLACK, DEFAULT_THRESHOLD, WHITE},
    device::Device,
    document::{parse, walk, Node, NodeKind, WalkStatus},
    error::{Error, Result},
    fixed::{fixed_to_points, points_to_fixed, points_to_pixels, Fixed},
    font::{Face, Family, FontdueTypeface, GlyphMask, LineMetrics, Metrics, Typeface},
    layout::{layout, measure_word, ContentItem, Line, Segment, WordWidth},
    preview::{Preview, GUTTER},
    printer::{Config, Printer, MAX_RASTER_WIDTH},
    render::{print_paragraph, LineRenderer, LINE_THRESHOLD},
    renderer::{Renderer, DOCUMENT_MARGIN, IMAGE_PLACEHOLDER, INDENT_STEP, MARKER_GAP},
    resource::{check_shortenable, ImageSource, Images, Unshortened, UrlShortener},
    server::{PrintServer, Reply},
    style::{
        BlockStyle, FontFiles, Style, Stylesheet, DEFAULT_HEADING_STYLES, DEFAULT_PARAGRAPH_STYLE,
    },
};

#[cfg(feature = "http")]
pub use crate::resource::TinyUrl;

/// Width in pixels of 58 mm thermal printers.
///
/// Rows are 48 bytes when packed into raster records (384 / 8 = 48).
pub const PRINTER_WIDTH: u32 = 384;

/// Resolution of 58 mm thermal printers, 8 dots per millimetre.
pub const PRINTER_DPI: f64 = 203.2;
