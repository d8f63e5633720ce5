//! Error types for document rendering and printing.
//!
//! This module defines all possible errors that can occur while loading fonts
//! and stylesheets, fetching resources, typesetting a document and writing the
//! resulting rasters to an output device.

use thiserror::Error;

/// Main error type for rendering operations.
///
/// Most variants are fatal and abort a render as soon as they occur. Two
/// classes are contained by the document walker instead: image fetch failures
/// (`Fetch`, `Image`, `Io` raised by an image source) are replaced by a
/// placeholder glyph, and `UnsupportedUrl` raised while encoding a link makes
/// the walker skip that link.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    ///
    /// Wraps failures writing to the output device or reading files.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A bitmap wider than the device was sent to the device.
    #[error("bitmap is {width} pixels wide, device accepts at most {max}")]
    BitmapTooWide { width: u32, max: u32 },

    /// Feed request outside of the `[0, 256)` range the device accepts.
    #[error("feed of {0} lines is out of range [0, 256)")]
    FeedOutOfRange(u32),

    /// The URL can not be shortened.
    ///
    /// Only absolute HTTP and HTTPS URLs are accepted by URL shorteners. Links
    /// failing with this error are silently skipped by the renderer.
    #[error("only absolute HTTP and HTTPS URLs can be shortened: {0}")]
    UnsupportedUrl(String),

    /// A network fetch failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Image decoding or encoding error.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// The barcode encoder rejected its input.
    #[error("barcode encoding failed: {0}")]
    Barcode(#[from] qrcode::types::QrError),

    /// Font data could not be parsed.
    ///
    /// Fonts are validated eagerly when a family is loaded, never during a
    /// render.
    #[error("failed to parse {face} font: {reason}")]
    InvalidFont { face: &'static str, reason: String },

    /// No matching font was found in the system font database.
    #[error("no system font found for {0}")]
    FontNotFound(String),

    /// Stylesheet could not be decoded.
    #[error(transparent)]
    Stylesheet(#[from] serde_json::Error),

    #[error("invalid style: {0}")]
    InvalidStyle(String),

    /// The HTTP listener could not be started.
    #[error("failed to start server: {0}")]
    Serve(String),
}

impl Error {
    /// Check if this is the recoverable "unsupported URL" class.
    ///
    /// # Returns
    /// `true` if the error was raised because a URL was relative or used a
    /// scheme other than HTTP(S).
    pub fn is_unsupported_url(&self) -> bool {
        matches!(self, Self::UnsupportedUrl(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
