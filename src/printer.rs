use log::{debug, trace, warn};
use std::io::Write;

use crate::{
    bitmap::Bitmap,
    device::Device,
    error::{Error, Result},
};

/// Raster bit image command: `DC2 * r n`, followed by `r * n` bytes.
const RASTER_ROW: [u8; 3] = [0x12, 0x2A, 0x01];

/// Print and feed paper: `ESC J n`.
const FEED: [u8; 2] = [0x1B, 0x4A];

/// Widest row a raster record can carry: its byte count is a single byte.
pub const MAX_RASTER_WIDTH: u32 = 255 * 8;

/// Thermal printer driver writing the raster command stream to any
/// [`Write`] sink, typically a serial port or a file.
pub struct Printer<W: Write> {
    writer: W,
    config: Config,
}

impl<W: Write> Printer<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, Config::new())
    }

    pub fn with_config(writer: W, config: Config) -> Self {
        debug!("{:?}", config);
        Printer { writer, config }
    }

    /// Return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.write_all(buf)?;
        Ok(())
    }

    /// Encode one bitmap row as a raster record.
    ///
    /// A set bit in the bitmap is white paper, but a set bit in the output is
    /// a printed dot, so the bits are inverted while packing.
    fn raster_row(bitmap: &Bitmap, y: u32, buf: &mut Vec<u8>) {
        let bytes_per_row = ((bitmap.width() + 7) / 8) as usize;
        buf.clear();
        buf.extend_from_slice(&RASTER_ROW);
        buf.push(bytes_per_row as u8);

        for x in 0..(bytes_per_row as u32) {
            let mut tmp: u8 = 0x00;
            for i in 0..8 {
                let px = x * 8 + i;
                if px < bitmap.width() && !bitmap.bit_at(px, y) {
                    tmp |= 0x80 >> i;
                }
            }
            buf.push(tmp);
        }
    }
}

impl<W: Write> Device for Printer<W> {
    fn max_width(&self) -> u32 {
        self.config.max_width
    }

    fn dpi(&self) -> f64 {
        self.config.dpi
    }

    fn print_bitmap(&mut self, bitmap: &Bitmap) -> Result<()> {
        if bitmap.width() > self.config.max_width {
            return Err(Error::BitmapTooWide {
                width: bitmap.width(),
                max: self.config.max_width,
            });
        }
        trace!("print bitmap {}x{}", bitmap.width(), bitmap.height());
        if bitmap.width() == 0 {
            return Ok(());
        }

        // Print the image one scanline at a time.
        let mut row = Vec::with_capacity(4 + ((bitmap.width() + 7) / 8) as usize);
        for y in 0..bitmap.height() {
            Self::raster_row(bitmap, y, &mut row);
            self.write(&row)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    fn feed(&mut self, lines: u32) -> Result<()> {
        if lines >= 256 {
            return Err(Error::FeedOutOfRange(lines));
        }
        trace!("feed {} lines", lines);
        self.write(&[FEED[0], FEED[1], lines as u8])?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Printer configuration.
///
/// Defaults to the 58 mm class of thermal printers: 384 dots across at
/// 203.2 DPI (8 dots per millimetre).
#[derive(Debug, Clone)]
pub struct Config {
    max_width: u32,
    dpi: f64,
}

impl Config {
    /// Initialize configuration data with default values.
    ///
    /// # Example
    ///
    /// ```
    /// use mdprint::Config;
    ///
    /// let config = Config::new().max_width(576).dpi(203.2);
    /// ```
    pub fn new() -> Config {
        Config {
            max_width: crate::PRINTER_WIDTH,
            dpi: crate::PRINTER_DPI,
        }
    }

    /// Printable width in dots, at most [`MAX_RASTER_WIDTH`]. Wider values
    /// are clamped.
    pub fn max_width(self, max_width: u32) -> Self {
        if max_width > MAX_RASTER_WIDTH {
            warn!(
                "width of {} dots clamped to {}",
                max_width, MAX_RASTER_WIDTH
            );
        }
        Config {
            max_width: max_width.min(MAX_RASTER_WIDTH),
            ..self
        }
    }

    pub fn dpi(self, dpi: f64) -> Self {
        Config { dpi, ..self }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{BLACK, DEFAULT_THRESHOLD};

    #[test]
    fn rows_are_inverted_and_packed() {
        let mut bitmap = Bitmap::white(10, 2, DEFAULT_THRESHOLD);
        bitmap.set(0, 0, BLACK);
        bitmap.set(9, 0, BLACK);
        bitmap.set(3, 1, BLACK);

        let mut printer = Printer::new(Vec::new());
        printer.print_bitmap(&bitmap).unwrap();
        let out = printer.into_inner();
        assert_eq!(
            out,
            vec![
                0x12, 0x2A, 0x01, 2, 0b1000_0000, 0b0100_0000, //
                0x12, 0x2A, 0x01, 2, 0b0001_0000, 0b0000_0000,
            ]
        );
    }

    #[test]
    fn feed_writes_escape_sequence() {
        let mut printer = Printer::new(Vec::new());
        printer.feed(85).unwrap();
        assert_eq!(printer.into_inner(), vec![0x1B, 0x4A, 85]);
    }

    #[test]
    fn feed_out_of_range() {
        let mut printer = Printer::new(Vec::new());
        assert!(matches!(printer.feed(256), Err(Error::FeedOutOfRange(256))));
        assert!(printer.into_inner().is_empty());
    }

    #[test]
    fn rejects_wide_bitmaps() {
        let mut printer = Printer::with_config(Vec::new(), Config::new().max_width(16));
        let err = printer.print_bitmap(&Bitmap::new(17, 1)).unwrap_err();
        assert!(matches!(err, Error::BitmapTooWide { width: 17, max: 16 }));
    }

    #[test]
    fn widest_rows_fit_a_record() {
        let mut printer =
            Printer::with_config(Vec::new(), Config::new().max_width(MAX_RASTER_WIDTH + 8));
        printer.print_bitmap(&Bitmap::new(MAX_RASTER_WIDTH, 1)).unwrap();
        let out = printer.into_inner();
        assert_eq!(out.len(), 4 + 255);
        assert_eq!(out[3], 255);

        let mut printer =
            Printer::with_config(Vec::new(), Config::new().max_width(MAX_RASTER_WIDTH + 8));
        assert!(matches!(
            printer.print_bitmap(&Bitmap::new(MAX_RASTER_WIDTH + 1, 1)),
            Err(Error::BitmapTooWide { max: MAX_RASTER_WIDTH, .. })
        ));
    }

    #[test]
    fn config_builder() {
        let printer = Printer::with_config(Vec::new(), Config::new().max_width(576).dpi(300.0));
        assert_eq!(printer.max_width(), 576);
        assert_eq!(printer.dpi(), 300.0);
        let wide = Printer::with_config(Vec::new(), Config::new().max_width(4096));
        assert_eq!(wide.max_width(), MAX_RASTER_WIDTH);
        let default = Printer::new(Vec::new());
        assert_eq!(default.max_width(), 384);
        assert_eq!(default.dpi(), 203.2);
    }
}
