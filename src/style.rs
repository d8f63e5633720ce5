//! Block styles, font families and JSON stylesheets.

use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    font::Family,
};

/// Font size and vertical margins of a block, in points.
#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockStyle {
    pub point_size: f64,
    pub top_margin: f64,
    pub bottom_margin: f64,
}

impl BlockStyle {
    pub const fn new(point_size: f64, top_margin: f64, bottom_margin: f64) -> Self {
        BlockStyle {
            point_size,
            top_margin,
            bottom_margin,
        }
    }

    /// Fill in unset (zero) fields: 10pt text, a top margin of a fifth and a
    /// bottom margin of a tenth of the point size.
    pub fn or_defaults(self) -> Self {
        let point_size = if self.point_size == 0.0 {
            10.0
        } else {
            self.point_size
        };
        BlockStyle {
            point_size,
            top_margin: if self.top_margin == 0.0 {
                point_size * 0.2
            } else {
                self.top_margin
            },
            bottom_margin: if self.bottom_margin == 0.0 {
                point_size * 0.1
            } else {
                self.bottom_margin
            },
        }
    }
}

/// Styles for heading levels 1 to 4.
pub const DEFAULT_HEADING_STYLES: [BlockStyle; 4] = [
    BlockStyle::new(16.0, 3.2, 1.6),
    BlockStyle::new(14.0, 2.8, 1.4),
    BlockStyle::new(12.0, 2.4, 1.2),
    BlockStyle::new(10.0, 2.0, 1.0),
];

pub const DEFAULT_PARAGRAPH_STYLE: BlockStyle = BlockStyle::new(8.0, 1.6, 0.8);

/// Paths of the typefaces of a family. Only `regular` is required; the other
/// variants fall back to it.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontFiles {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
}

impl FontFiles {
    /// Read and parse the family. Relative paths are resolved against `base`.
    pub fn load(&self, name: &str, base: &Path, dpi: f64) -> Result<Family> {
        let regular_path = self.regular.as_ref().ok_or_else(|| {
            Error::InvalidStyle(format!("font family {} must specify a regular typeface", name))
        })?;

        let read = |path: &Path| -> Result<Vec<u8>> {
            let path = base.join(path);
            debug!("reading typeface {}", path.display());
            Ok(fs::read(path)?)
        };
        let regular = read(regular_path)?;
        let variant = |path: &Option<PathBuf>| -> Result<Vec<u8>> {
            match path {
                Some(path) => read(path),
                None => Ok(regular.clone()),
            }
        };
        let bold = variant(&self.bold)?;
        let italic = variant(&self.italic)?;
        let bold_italic = variant(&self.bold_italic)?;

        Family::parse(name, dpi, &regular, &bold, &italic, &bold_italic)
    }
}

/// The JSON stylesheet format.
///
/// ```json
/// {
///   "proportionalFamily": { "regular": "fonts/Inter.ttf", "bold": "fonts/Inter-Bold.ttf" },
///   "headingStyles": [ { "pointSize": 18 }, { "pointSize": 14, "topMargin": 4 } ],
///   "paragraphStyle": { "pointSize": 9 }
/// }
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stylesheet {
    pub proportional_family: Option<FontFiles>,
    pub monospace_family: Option<FontFiles>,
    #[serde(default)]
    pub heading_styles: Vec<BlockStyle>,
    pub paragraph_style: Option<BlockStyle>,
}

impl Stylesheet {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Heading styles, with defaults filled in, or the built-in table.
    pub fn heading_styles(&self) -> Vec<BlockStyle> {
        if self.heading_styles.is_empty() {
            DEFAULT_HEADING_STYLES.to_vec()
        } else {
            self.heading_styles
                .iter()
                .map(|s| s.or_defaults())
                .collect()
        }
    }

    pub fn paragraph_style(&self) -> BlockStyle {
        self.paragraph_style
            .map(BlockStyle::or_defaults)
            .unwrap_or(DEFAULT_PARAGRAPH_STYLE)
    }
}

/// Everything the renderer needs to know about how a document looks.
#[derive(Debug, Clone)]
pub struct Style {
    pub proportional: Family,
    pub monospace: Family,
    /// Heading styles indexed by heading level.
    pub heading_styles: Vec<BlockStyle>,
    pub paragraph_style: BlockStyle,
}

impl Style {
    /// Default styles with the given families.
    pub fn new(proportional: Family, monospace: Family) -> Self {
        Style {
            proportional,
            monospace,
            heading_styles: DEFAULT_HEADING_STYLES.to_vec(),
            paragraph_style: DEFAULT_PARAGRAPH_STYLE,
        }
    }

    /// Default styles using the system's sans-serif and monospace fonts.
    pub fn system(dpi: f64) -> Result<Self> {
        Ok(Self::new(
            Family::system_sans(dpi)?,
            Family::system_monospace(dpi)?,
        ))
    }

    /// Load a JSON stylesheet. Font paths are relative to the stylesheet;
    /// families it doesn't name come from the system.
    pub fn load(path: impl AsRef<Path>, dpi: f64) -> Result<Self> {
        let path = path.as_ref();
        info!("loading stylesheet {}", path.display());
        let sheet = Stylesheet::from_json(&fs::read_to_string(path)?)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_stylesheet(&sheet, base, dpi)
    }

    pub fn from_stylesheet(sheet: &Stylesheet, base: &Path, dpi: f64) -> Result<Self> {
        let proportional = match &sheet.proportional_family {
            Some(files) => files.load("proportional", base, dpi)?,
            None => Family::system_sans(dpi)?,
        };
        let monospace = match &sheet.monospace_family {
            Some(files) => files.load("monospace", base, dpi)?,
            None => Family::system_monospace(dpi)?,
        };
        Ok(Style {
            proportional,
            monospace,
            heading_styles: sheet.heading_styles(),
            paragraph_style: sheet.paragraph_style(),
        })
    }

    /// The style of a heading of `level`. The table is indexed by the level
    /// itself, so entry 0 is never used by a parsed heading; levels without an
    /// entry use the paragraph style.
    pub fn heading_style(&self, level: u32) -> BlockStyle {
        self.heading_styles
            .get(level as usize)
            .copied()
            .unwrap_or(self.paragraph_style)
    }
}
