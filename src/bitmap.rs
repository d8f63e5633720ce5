//! 1-bit raster images.
//!
//! A [`Bitmap`] stores one intensity sample per pixel and a threshold. A pixel
//! is *set* (unmarked paper, white) when its sample is at or above the
//! threshold and *unset* (printed, black) otherwise. Keeping the continuous
//! samples around lets a non-dithered source image be thresholded on read.

use image::imageops::{self, BiLevel, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma};

/// Threshold used when none is given.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Sample value of a white (set) pixel.
pub const WHITE: u8 = 255;

/// Sample value of a black (unset) pixel.
pub const BLACK: u8 = 0;

/// A fixed-size 1-bit image.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    samples: GrayImage,
    threshold: u8,
}

impl Bitmap {
    /// Create a bitmap with every sample black and the default threshold.
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_threshold(width, height, DEFAULT_THRESHOLD)
    }

    /// Create a bitmap with every sample black and the given threshold.
    pub fn with_threshold(width: u32, height: u32, threshold: u8) -> Self {
        Bitmap {
            samples: GrayImage::new(width, height),
            threshold,
        }
    }

    /// Create a bitmap with every sample white.
    pub fn white(width: u32, height: u32, threshold: u8) -> Self {
        let mut bitmap = Self::with_threshold(width, height, threshold);
        bitmap.fill(WHITE);
        bitmap
    }

    /// Wrap an existing grayscale image.
    pub fn from_gray(samples: GrayImage, threshold: u8) -> Self {
        Bitmap { samples, threshold }
    }

    /// Convert an arbitrary image to a bitmap at most `max_width` pixels wide.
    ///
    /// Wider images are downscaled with a bilinear filter, preserving their
    /// aspect ratio, then converted to grayscale. With `dither` set, samples are
    /// pushed to black or white with Floyd-Steinberg error diffusion; otherwise
    /// they are kept continuous and thresholded on read.
    ///
    /// Zero-sized sources produce a zero-sized bitmap.
    pub fn from_source(source: &DynamicImage, max_width: u32, dither: bool) -> Self {
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 || max_width == 0 {
            return Self::new(0, 0);
        }

        let mut gray = if width > max_width {
            source
                .resize(max_width, height, FilterType::Triangle)
                .to_luma8()
        } else {
            source.to_luma8()
        };

        if dither {
            imageops::dither(&mut gray, &BiLevel);
        }
        Self::from_gray(gray, DEFAULT_THRESHOLD)
    }

    pub fn width(&self) -> u32 {
        self.samples.width()
    }

    pub fn height(&self) -> u32 {
        self.samples.height()
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Raw sample at `(x, y)`.
    ///
    /// # Panics
    /// If the coordinates are out of bounds.
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.samples.get_pixel(x, y).0[0]
    }

    /// Store a raw sample at `(x, y)`.
    ///
    /// # Panics
    /// If the coordinates are out of bounds.
    pub fn set(&mut self, x: u32, y: u32, sample: u8) {
        self.samples.put_pixel(x, y, Luma([sample]));
    }

    /// Returns true if the bit at `(x, y)` is set (white).
    pub fn bit_at(&self, x: u32, y: u32) -> bool {
        self.get(x, y) >= self.threshold
    }

    /// Set (white) or clear (black) the bit at `(x, y)`.
    pub fn set_bit(&mut self, x: u32, y: u32, set: bool) {
        self.set(x, y, if set { WHITE } else { BLACK });
    }

    /// Overwrite every sample.
    pub fn fill(&mut self, sample: u8) {
        for p in self.samples.pixels_mut() {
            p.0[0] = sample;
        }
    }

    /// Fill a rectangle, clipped to the bitmap bounds.
    pub fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, sample: u8) {
        let (x0, x1) = clip(x, width, self.width());
        let (y0, y1) = clip(y, height, self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                self.set(px, py, sample);
            }
        }
    }

    /// Copy another bitmap's bits with its upper-left corner at `(x, y)`.
    ///
    /// The source is thresholded with its own threshold; destination samples
    /// become pure black or white. Pixels falling outside this bitmap are
    /// dropped.
    pub fn draw_bitmap(&mut self, src: &Bitmap, x: i32, y: i32) {
        let (x0, x1) = clip(x, src.width(), self.width());
        let (y0, y1) = clip(y, src.height(), self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                let set = src.bit_at((px as i32 - x) as u32, (py as i32 - y) as u32);
                self.set_bit(px, py, set);
            }
        }
    }

    /// Composite black through a coverage mask with its upper-left corner at
    /// `(x, y)`.
    ///
    /// `coverage` is row-major, `width` samples per row, 0 meaning transparent
    /// and 255 fully opaque.
    pub fn draw_mask(&mut self, coverage: &[u8], width: u32, x: i32, y: i32) {
        if width == 0 {
            return;
        }
        let height = coverage.len() as u32 / width;
        let (x0, x1) = clip(x, width, self.width());
        let (y0, y1) = clip(y, height, self.height());
        for py in y0..y1 {
            for px in x0..x1 {
                let mx = (px as i32 - x) as u32;
                let my = (py as i32 - y) as u32;
                let alpha = coverage[(my * width + mx) as usize] as u32;
                if alpha == 0 {
                    continue;
                }
                let dst = self.get(px, py) as u32;
                self.set(px, py, ((dst * (255 - alpha) + 127) / 255) as u8);
            }
        }
    }

    /// Color-model view of the bitmap: every pixel thresholded to pure black
    /// or white, usable with generic image operations.
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width(), self.height(), |x, y| {
            Luma([if self.bit_at(x, y) { WHITE } else { BLACK }])
        })
    }

    /// The underlying continuous samples.
    pub fn samples(&self) -> &GrayImage {
        &self.samples
    }
}

/// Intersect `[start, start + len)` with `[0, bound)`.
fn clip(start: i32, len: u32, bound: u32) -> (u32, u32) {
    let lo = start.max(0) as i64;
    let hi = (start as i64 + len as i64).min(bound as i64);
    if hi <= lo {
        (0, 0)
    } else {
        (lo as u32, hi as u32)
    }
}
