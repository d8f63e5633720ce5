use crate::{bitmap::Bitmap, error::Result};

/// An infinitely tall, 1-bit output device with a maximum width and a DPI.
///
/// Calls are issued strictly in document order. Any error aborts the render
/// that issued it.
pub trait Device {
    /// Printable width in pixels.
    fn max_width(&self) -> u32;

    /// Resolution in dots per inch.
    fn dpi(&self) -> f64;

    /// Print one bitmap. Fails if the bitmap is wider than [`Device::max_width`].
    fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<()>;

    /// Advance the paper by `lines` blank pixel rows, `lines` in `[0, 256)`.
    fn feed(&mut self, lines: u32) -> Result<()>;
}

impl<D: Device + ?Sized> Device for &mut D {
    fn max_width(&self) -> u32 {
        (**self).max_width()
    }

    fn dpi(&self) -> f64 {
        (**self).dpi()
    }

    fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<()> {
        (**self).print_bitmap(bitmap)
    }

    fn feed(&mut self, lines: u32) -> Result<()> {
        (**self).feed(lines)
    }
}
