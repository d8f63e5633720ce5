use image::{DynamicImage, GrayImage, Luma};
use qrcode::{Color, QrCode};

use crate::{
    bitmap::{Bitmap, BLACK, WHITE},
    error::Result,
    fixed::points_to_pixels,
};

/// Encode `url` as a square QR code bitmap.
///
/// The code is at least `point_size` tall and at least two pixels per module,
/// scaled by a whole factor and centered. Wider than `max_width` it is
/// downscaled to fit.
pub fn url_barcode(url: &str, point_size: f64, max_width: u32, dpi: f64) -> Result<Bitmap> {
    let code = QrCode::new(url.as_bytes())?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let size = (points_to_pixels(point_size, dpi).max(0) as u32).max(modules * 2);
    let scale = size / modules;
    let offset = (size - modules * scale) / 2;

    let mut img = GrayImage::from_pixel(size, size, Luma([WHITE]));
    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let (mx, my) = (i as u32 % modules, i as u32 / modules);
        for dy in 0..scale {
            for dx in 0..scale {
                img.put_pixel(
                    offset + mx * scale + dx,
                    offset + my * scale + dy,
                    Luma([BLACK]),
                );
            }
        }
    }

    Ok(Bitmap::from_source(
        &DynamicImage::ImageLuma8(img),
        max_width,
        false,
    ))
}
