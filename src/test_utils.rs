//! Deterministic fonts, devices and collaborators for unit tests.

use image::{DynamicImage, GrayImage, Luma};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    bitmap::Bitmap,
    device::Device,
    error::{Error, Result},
    font::{Family, GlyphMask, LineMetrics, Typeface},
    resource::{check_shortenable, ImageSource, UrlShortener},
};

/// Typeface drawing every visible character as a solid box.
///
/// Advances are half an em, ascent 4/5 and descent 1/5 of an em. The pair
/// `" W"` kerns by -1/5 em.
pub(crate) struct BoxTypeface;

impl Typeface for BoxTypeface {
    fn advance(&self, c: char, px: f32) -> Option<f32> {
        if c == '\u{fffe}' {
            None
        } else {
            Some(px / 2.0)
        }
    }

    fn kern(&self, left: char, right: char, px: f32) -> f32 {
        if left == ' ' && right == 'W' {
            -px / 5.0
        } else {
            0.0
        }
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 4.0 / 5.0,
            descent: px / 5.0,
        }
    }

    fn rasterize(&self, c: char, px: f32) -> Option<GlyphMask> {
        if c.is_whitespace() {
            return Some(GlyphMask {
                coverage: Vec::new(),
                width: 0,
                height: 0,
                xmin: 0,
                ymin: 0,
            });
        }
        let width = ((px / 2.0) as u32).saturating_sub(1).max(1);
        let height = ((px * 3.0 / 5.0) as u32).max(1);
        Some(GlyphMask {
            coverage: vec![255; (width * height) as usize],
            width,
            height,
            xmin: 0,
            ymin: 0,
        })
    }
}

pub(crate) fn box_family(name: &str, dpi: f64) -> Family {
    let face: Arc<dyn Typeface> = Arc::new(BoxTypeface);
    Family::new(name, dpi, face.clone(), face.clone(), face.clone(), face)
}

/// Device output, in call order.
#[derive(Debug, Clone)]
pub(crate) enum Event {
    Bitmap(Bitmap),
    Feed(u32),
}

/// Device recording every call.
pub(crate) struct Recorder {
    pub max_width: u32,
    pub dpi: f64,
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn new(max_width: u32, dpi: f64) -> Self {
        Recorder {
            max_width,
            dpi,
            events: Vec::new(),
        }
    }

    pub fn bitmaps(&self) -> Vec<&Bitmap> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Bitmap(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn feeds(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Feed(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl Device for Recorder {
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
        self.events.push(Event::Bitmap(bitmap.clone()));
        Ok(())
    }

    fn feed(&mut self, lines: u32) -> Result<()> {
        if lines >= 256 {
            return Err(Error::FeedOutOfRange(lines));
        }
        self.events.push(Event::Feed(lines));
        Ok(())
    }
}

/// Image source serving fixed images by destination.
#[derive(Default)]
pub(crate) struct StubImages {
    images: HashMap<String, DynamicImage>,
}

impl StubImages {
    pub fn with(mut self, destination: &str, width: u32, height: u32) -> Self {
        let img = GrayImage::from_pixel(width, height, Luma([0u8]));
        self.images
            .insert(destination.to_string(), DynamicImage::ImageLuma8(img));
        self
    }
}

impl ImageSource for StubImages {
    fn fetch(&self, destination: &str) -> Result<DynamicImage> {
        self.images
            .get(destination)
            .cloned()
            .ok_or_else(|| Error::Fetch(format!("no image at {}", destination)))
    }
}

/// Shortener that fails for URLs containing `fail`.
pub(crate) struct StubShortener;

impl UrlShortener for StubShortener {
    fn shorten(&self, url: &str) -> Result<String> {
        let url = check_shortenable(url)?;
        if url.as_str().contains("fail") {
            return Err(Error::Fetch("service unavailable".to_string()));
        }
        Ok(format!("https://s.example/{}", url.path().trim_start_matches('/')))
    }
}
