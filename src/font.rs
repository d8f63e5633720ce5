//! Font families and scaled faces.
//!
//! A [`Family`] holds the four typefaces (regular, bold, italic, bold-italic)
//! backing one logical font, parsed once at load time. Faces at a given point
//! size and style are created on first request and memoized in a cache shared
//! by every clone of the family, so concurrent renders can reuse them.
//!
//! All metrics handed to the layout engine are in 26.6 fixed-point device
//! pixels.

use log::{debug, info};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::{
    error::{Error, Result},
    fixed::Fixed,
};

/// Vertical metrics of a face at some pixel size, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    /// Distance from the baseline to the top of the line.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line, positive.
    pub descent: f32,
}

/// Rasterized glyph coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMask {
    /// Row-major coverage, 0 (none) to 255 (full).
    pub coverage: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Offset of the left edge of the mask from the pen position.
    pub xmin: i32,
    /// Offset of the bottom edge of the mask above the baseline.
    pub ymin: i32,
}

/// An unscaled glyph source, such as one parsed font file.
///
/// Sizes are pixels per em.
pub trait Typeface: Send + Sync {
    /// Horizontal advance of `c`, or `None` if the typeface can't draw it.
    fn advance(&self, c: char, px: f32) -> Option<f32>;

    /// Kerning adjustment between two adjacent characters.
    fn kern(&self, left: char, right: char, px: f32) -> f32;

    fn line_metrics(&self, px: f32) -> LineMetrics;

    fn rasterize(&self, c: char, px: f32) -> Option<GlyphMask>;
}

/// [`Typeface`] backed by a TrueType/OpenType font parsed with `fontdue`.
pub struct FontdueTypeface {
    font: fontdue::Font,
}

impl FontdueTypeface {
    /// Parse font data, selecting face `index` in a collection.
    pub fn parse(data: &[u8], index: u32, face: &'static str) -> Result<Self> {
        let settings = fontdue::FontSettings {
            collection_index: index,
            ..fontdue::FontSettings::default()
        };
        let font = fontdue::Font::from_bytes(data, settings).map_err(|reason| Error::InvalidFont {
            face,
            reason: reason.to_string(),
        })?;
        Ok(FontdueTypeface { font })
    }
}

impl Typeface for FontdueTypeface {
    fn advance(&self, c: char, px: f32) -> Option<f32> {
        Some(self.font.metrics(c, px).advance_width)
    }

    fn kern(&self, left: char, right: char, px: f32) -> f32 {
        self.font.horizontal_kern(left, right, px).unwrap_or(0.0)
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: -m.descent,
            },
            None => LineMetrics {
                ascent: px * 0.8,
                descent: px * 0.2,
            },
        }
    }

    fn rasterize(&self, c: char, px: f32) -> Option<GlyphMask> {
        let (metrics, coverage) = self.font.rasterize(c, px);
        Some(GlyphMask {
            coverage,
            width: metrics.width as u32,
            height: metrics.height as u32,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
        })
    }
}

/// Vertical face metrics in fixed-point pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub ascent: Fixed,
    pub descent: Fixed,
}

impl Metrics {
    /// Total line height.
    pub fn height(&self) -> Fixed {
        self.ascent + self.descent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FaceKey {
    point_size: u64,
    bold: bool,
    italic: bool,
}

impl FaceKey {
    fn new(point_size: f64, bold: bool, italic: bool) -> Self {
        FaceKey {
            point_size: point_size.to_bits(),
            bold,
            italic,
        }
    }
}

/// A typeface bound to a size.
struct ScaledFace {
    typeface: Arc<dyn Typeface>,
    point_size: f64,
    px: f32,
    bold: bool,
    italic: bool,
    metrics: Metrics,
}

struct FamilyInner {
    name: String,
    dpi: f64,
    /// Regular, bold, italic, bold-italic.
    typefaces: [Arc<dyn Typeface>; 4],
    faces: RwLock<HashMap<FaceKey, Arc<ScaledFace>>>,
}

/// The four typefaces backing one logical font, plus a face cache.
///
/// Cloning is cheap; clones share the cache.
#[derive(Clone)]
pub struct Family {
    inner: Arc<FamilyInner>,
}

impl Family {
    /// Build a family from already-loaded typefaces, rendered at `dpi`.
    pub fn new(
        name: impl Into<String>,
        dpi: f64,
        regular: Arc<dyn Typeface>,
        bold: Arc<dyn Typeface>,
        italic: Arc<dyn Typeface>,
        bold_italic: Arc<dyn Typeface>,
    ) -> Self {
        Family {
            inner: Arc::new(FamilyInner {
                name: name.into(),
                dpi,
                typefaces: [regular, bold, italic, bold_italic],
                faces: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Parse the four font files of a family.
    ///
    /// Fails on the first malformed file.
    pub fn parse(
        name: impl Into<String>,
        dpi: f64,
        regular: &[u8],
        bold: &[u8],
        italic: &[u8],
        bold_italic: &[u8],
    ) -> Result<Self> {
        let name = name.into();
        debug!("parsing font family '{}'", name);
        Ok(Self::new(
            name,
            dpi,
            Arc::new(FontdueTypeface::parse(regular, 0, "regular")?),
            Arc::new(FontdueTypeface::parse(bold, 0, "bold")?),
            Arc::new(FontdueTypeface::parse(italic, 0, "italic")?),
            Arc::new(FontdueTypeface::parse(bold_italic, 0, "boldItalic")?),
        ))
    }

    /// Load the system's default sans-serif family.
    pub fn system_sans(dpi: f64) -> Result<Self> {
        Self::system(fontdb::Family::SansSerif, "sans-serif", dpi)
    }

    /// Load the system's default monospace family.
    pub fn system_monospace(dpi: f64) -> Result<Self> {
        Self::system(fontdb::Family::Monospace, "monospace", dpi)
    }

    fn system(family: fontdb::Family<'_>, name: &str, dpi: f64) -> Result<Self> {
        use fontdb::{Style, Weight};

        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        info!("loaded {} system font faces", db.len());

        let load = |weight: Weight, style: Style, face: &'static str| {
            let query = fontdb::Query {
                families: std::slice::from_ref(&family),
                weight,
                stretch: fontdb::Stretch::Normal,
                style,
            };
            let id = db
                .query(&query)
                .ok_or_else(|| Error::FontNotFound(format!("{} {}", name, face)))?;
            let typeface = db
                .with_face_data(id, |data, index| FontdueTypeface::parse(data, index, face))
                .ok_or_else(|| Error::FontNotFound(format!("{} {}", name, face)))??;
            Ok::<Arc<dyn Typeface>, Error>(Arc::new(typeface))
        };

        Ok(Self::new(
            name,
            dpi,
            load(Weight::NORMAL, Style::Normal, "regular")?,
            load(Weight::BOLD, Style::Normal, "bold")?,
            load(Weight::NORMAL, Style::Italic, "italic")?,
            load(Weight::BOLD, Style::Italic, "boldItalic")?,
        ))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn dpi(&self) -> f64 {
        self.inner.dpi
    }

    /// Return the face at the given size and style, creating it on first use.
    pub fn face(&self, point_size: f64, bold: bool, italic: bool) -> Face {
        let key = FaceKey::new(point_size, bold, italic);
        let cached = self
            .inner
            .faces
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        let scaled = match cached {
            Some(scaled) => scaled,
            None => {
                let mut faces = self.inner.faces.write().unwrap_or_else(|e| e.into_inner());
                faces
                    .entry(key)
                    .or_insert_with(|| {
                        debug!(
                            "new face {} {}pt bold={} italic={}",
                            self.inner.name, point_size, bold, italic
                        );
                        Arc::new(self.scale(point_size, bold, italic))
                    })
                    .clone()
            }
        };
        Face {
            family: self.clone(),
            scaled,
        }
    }

    pub fn regular(&self, point_size: f64) -> Face {
        self.face(point_size, false, false)
    }

    pub fn bold(&self, point_size: f64) -> Face {
        self.face(point_size, true, false)
    }

    fn scale(&self, point_size: f64, bold: bool, italic: bool) -> ScaledFace {
        let index = match (bold, italic) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        };
        let typeface = self.inner.typefaces[index].clone();
        let px = (point_size / 72.0 * self.inner.dpi) as f32;
        let line = typeface.line_metrics(px);
        ScaledFace {
            typeface,
            point_size,
            px,
            bold,
            italic,
            metrics: Metrics {
                ascent: Fixed::from_f32(line.ascent),
                descent: Fixed::from_f32(line.descent),
            },
        }
    }

    #[cfg(test)]
    fn cached_faces(&self) -> usize {
        self.inner.faces.read().unwrap().len()
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("name", &self.inner.name)
            .field("dpi", &self.inner.dpi)
            .finish()
    }
}

/// A font at a specific size, weight and slant.
///
/// Cloning is cheap.
#[derive(Clone)]
pub struct Face {
    family: Family,
    scaled: Arc<ScaledFace>,
}

impl Face {
    pub fn family(&self) -> &Family {
        &self.family
    }

    pub fn point_size(&self) -> f64 {
        self.scaled.point_size
    }

    pub fn is_bold(&self) -> bool {
        self.scaled.bold
    }

    pub fn is_italic(&self) -> bool {
        self.scaled.italic
    }

    pub fn with_size(&self, point_size: f64) -> Face {
        self.family.face(point_size, self.scaled.bold, self.scaled.italic)
    }

    pub fn with_bold(&self, bold: bool) -> Face {
        self.family.face(self.scaled.point_size, bold, self.scaled.italic)
    }

    pub fn with_italic(&self, italic: bool) -> Face {
        self.family.face(self.scaled.point_size, self.scaled.bold, italic)
    }

    /// Advance width of `c`, or `None` if the face has no glyph for it.
    pub fn glyph_advance(&self, c: char) -> Option<Fixed> {
        self.scaled
            .typeface
            .advance(c, self.scaled.px)
            .map(Fixed::from_f32)
    }

    /// Kerning adjustment between `left` and `right`.
    pub fn kern(&self, left: char, right: char) -> Fixed {
        Fixed::from_f32(self.scaled.typeface.kern(left, right, self.scaled.px))
    }

    pub fn metrics(&self) -> Metrics {
        self.scaled.metrics
    }

    /// Coverage mask for `c`.
    pub fn glyph(&self, c: char) -> Option<GlyphMask> {
        self.scaled.typeface.rasterize(c, self.scaled.px)
    }
}

impl PartialEq for Face {
    fn eq(&self, other: &Face) -> bool {
        Arc::ptr_eq(&self.scaled, &other.scaled)
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("family", &self.family.inner.name)
            .field("point_size", &self.scaled.point_size)
            .field("bold", &self.scaled.bold)
            .field("italic", &self.scaled.italic)
            .finish()
    }
}
