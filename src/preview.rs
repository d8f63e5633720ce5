use image::{imageops, DynamicImage, GrayImage, ImageFormat, ImageOutputFormat, Luma};
use log::info;
use std::io::Cursor;
use std::path::Path;

use crate::{
    bitmap::{Bitmap, WHITE},
    device::Device,
    error::{Error, Result},
};

/// Blank margin drawn on either side of the paper in previews, in pixels.
pub const GUTTER: u32 = 40;

/// A [`Device`] that collects output into an image instead of printing it.
#[derive(Debug)]
pub struct Preview {
    max_width: u32,
    dpi: f64,
    /// Printed bitmaps and the row each starts at.
    slices: Vec<(u32, Bitmap)>,
    height: u32,
}

impl Preview {
    pub fn new(max_width: u32, dpi: f64) -> Self {
        Preview {
            max_width,
            dpi,
            slices: Vec::new(),
            height: 0,
        }
    }

    /// Length of paper used so far, in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Draw everything printed so far onto white paper with a gutter on each
    /// side.
    pub fn to_image(&self) -> GrayImage {
        let mut img = GrayImage::from_pixel(
            self.max_width + 2 * GUTTER,
            self.height,
            Luma([WHITE]),
        );
        for (y, bitmap) in &self.slices {
            imageops::replace(&mut img, &bitmap.to_luma(), GUTTER as i64, *y as i64);
        }
        img
    }

    /// Encode the preview as a PNG file in memory.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(self.to_image())
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
        Ok(buf)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!(
            "writing {}x{} preview to {}",
            self.max_width + 2 * GUTTER,
            self.height,
            path.display()
        );
        self.to_image().save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

impl Default for Preview {
    fn default() -> Self {
        Self::new(crate::PRINTER_WIDTH, crate::PRINTER_DPI)
    }
}

impl Device for Preview {
    fn max_width(&self) -> u32 {
        self.max_width
    }

    fn dpi(&self) -> f64 {
        self.dpi
    }

    fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<()> {
        if bitmap.width() > self.max_width {
            return Err(Error::BitmapTooWide {
                width: bitmap.width(),
                max: self.max_width,
            });
        }
        self.slices.push((self.height, bitmap.clone()));
        self.height += bitmap.height();
        Ok(())
    }

    fn feed(&mut self, lines: u32) -> Result<()> {
        if lines >= 256 {
            return Err(Error::FeedOutOfRange(lines));
        }
        self.height += lines;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{BLACK, DEFAULT_THRESHOLD};

    #[test]
    fn stacks_output_between_gutters() {
        let mut preview = Preview::new(16, 72.0);
        preview.print_bitmap(&Bitmap::new(16, 2)).unwrap();
        preview.feed(3).unwrap();
        let mut dot = Bitmap::white(4, 1, DEFAULT_THRESHOLD);
        dot.set(1, 0, BLACK);
        preview.print_bitmap(&dot).unwrap();
        assert_eq!(preview.height(), 6);

        let img = preview.to_image();
        assert_eq!(img.dimensions(), (16 + 2 * GUTTER, 6));
        let at = |x: u32, y: u32| img.get_pixel(x, y).0[0];

        assert_eq!(at(GUTTER - 1, 0), WHITE);
        assert_eq!(at(GUTTER, 0), BLACK);
        assert_eq!(at(GUTTER + 15, 1), BLACK);
        assert_eq!(at(GUTTER + 16, 1), WHITE);
        assert_eq!(at(GUTTER, 3), WHITE, "fed paper");
        assert_eq!(at(GUTTER + 1, 5), BLACK);
        assert_eq!(at(GUTTER + 2, 5), WHITE);
    }

    #[test]
    fn rejects_what_a_printer_would() {
        let mut preview = Preview::new(8, 72.0);
        assert!(matches!(
            preview.print_bitmap(&Bitmap::new(9, 1)),
            Err(Error::BitmapTooWide { width: 9, max: 8 })
        ));
        assert!(matches!(preview.feed(300), Err(Error::FeedOutOfRange(300))));
    }

    #[test]
    fn encodes_png_in_memory() {
        let mut preview = Preview::new(8, 72.0);
        preview.print_bitmap(&Bitmap::new(8, 3)).unwrap();
        let png = preview.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let img = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(img, preview.to_image());
    }

    #[test]
    fn saves_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut preview = Preview::default();
        preview.print_bitmap(&Bitmap::new(384, 4)).unwrap();
        preview.save_png(&path).unwrap();

        let saved = image::open(&path).unwrap().to_luma8();
        assert_eq!(saved.dimensions(), (384 + 2 * GUTTER, 4));
        assert_eq!(saved.get_pixel(GUTTER, 0).0[0], BLACK);
    }
}
