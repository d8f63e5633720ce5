//! Document rendering.
//!
//! The [`Renderer`] walks a document tree, keeping stacks of active faces,
//! open lists and blockquote rules. Inline content is collected into a
//! paragraph buffer which is laid out and printed at the end of each block.

use log::{debug, info, trace, warn};
use std::mem;
use std::sync::Arc;

use crate::{
    barcode::url_barcode,
    bitmap::{Bitmap, BLACK, DEFAULT_THRESHOLD},
    device::Device,
    document::{parse, walk, Node, NodeKind, WalkStatus},
    error::Result,
    fixed::{fixed_to_points, points_to_pixels},
    font::Face,
    layout::{measure_word, ContentItem, Line, Segment},
    render::print_paragraph,
    resource::{ImageSource, UrlShortener},
    style::{BlockStyle, Style},
};

/// Indent added by each blockquote and list level, in points.
pub const INDENT_STEP: f64 = 4.5;

/// Space between a list marker and the item's content, in points.
pub const MARKER_GAP: f64 = 2.5;

/// Blank space fed after the end of a document, in points.
pub const DOCUMENT_MARGIN: f64 = 30.0;

/// Printed in place of images that can't be loaded.
pub const IMAGE_PLACEHOLDER: &str = "∅";

/// Horizontal space around link barcodes, in points.
const LINK_MARGIN: f64 = 1.0;

const BULLET: &str = "•";

/// Renders documents to a [`Device`] in a fixed [`Style`].
///
/// A renderer holds no per-document state and can render any number of
/// documents.
pub struct Renderer {
    style: Style,
    images: Box<dyn ImageSource>,
    shortener: Box<dyn UrlShortener>,
}

impl Renderer {
    pub fn new(
        style: Style,
        images: Box<dyn ImageSource>,
        shortener: Box<dyn UrlShortener>,
    ) -> Self {
        Renderer {
            style,
            images,
            shortener,
        }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Parse and render markdown source.
    pub fn render_markdown<D: Device + ?Sized>(&self, device: &mut D, markdown: &str) -> Result<()> {
        self.render(device, &parse(markdown))
    }

    /// Render a document tree. Fails on the first device error or fatal
    /// link error; output already sent to the device stays there.
    pub fn render<D: Device + ?Sized>(&self, device: &mut D, document: &Node) -> Result<()> {
        info!(
            "rendering document at {} px, {} DPI",
            device.max_width(),
            device.dpi()
        );
        let mut walker = Walker {
            renderer: self,
            device,
            state: WalkerState::default(),
        };
        walk(document, &mut |node: &Node, enter| walker.visit(node, enter))?;
        debug_assert!(walker.state.is_empty(), "unbalanced walk: {:?}", walker.state);
        Ok(())
    }
}

#[derive(Debug)]
struct ListState {
    ordered: bool,
    /// Width of the widest marker, in points.
    marker_width: f64,
    index: u64,
}

impl ListState {
    fn item_indent(&self) -> f64 {
        INDENT_STEP + self.marker_width + MARKER_GAP
    }
}

/// Mutable state of one document render.
#[derive(Debug, Default)]
struct WalkerState {
    faces: Vec<Face>,
    lists: Vec<ListState>,
    paragraph: Vec<ContentItem>,
    /// Vertical rule offsets in points.
    vrules: Vec<f64>,
    /// Current indent in points.
    indent_width: f64,
}

impl WalkerState {
    fn is_empty(&self) -> bool {
        self.faces.is_empty()
            && self.lists.is_empty()
            && self.paragraph.is_empty()
            && self.vrules.is_empty()
            && self.indent_width.abs() < 1e-9
    }
}

struct Walker<'a, D: ?Sized> {
    renderer: &'a Renderer,
    device: &'a mut D,
    state: WalkerState,
}

impl<'a, D: Device + ?Sized> Walker<'a, D> {
    fn visit(&mut self, node: &Node, enter: bool) -> Result<WalkStatus> {
        match &node.kind {
            NodeKind::Document => self.document(enter),

            // blocks
            NodeKind::Heading { level } => self.heading(*level, enter),
            NodeKind::Blockquote => Ok(self.blockquote(enter)),
            NodeKind::CodeBlock { lines } | NodeKind::FencedCodeBlock { lines, .. } => {
                self.code(lines, enter)
            }
            NodeKind::List { ordered, start } => {
                Ok(self.list(*ordered, *start, node.children.len(), enter))
            }
            NodeKind::ListItem => Ok(self.list_item(enter)),
            NodeKind::Paragraph | NodeKind::TextBlock => self.paragraph(enter),
            NodeKind::ThematicBreak => self.thematic_break(enter),

            // inlines
            NodeKind::AutoLink { .. } => Ok(WalkStatus::Continue),
            NodeKind::CodeSpan => Ok(self.code_span(enter)),
            NodeKind::Emphasis { level } => Ok(self.emphasis(*level, enter)),
            NodeKind::Image { destination } => Ok(self.image(destination, enter)),
            NodeKind::Link { destination } => self.link(destination, enter),
            NodeKind::Text {
                value,
                soft_break,
                hard_break,
            } => Ok(self.text(value, *soft_break, *hard_break, enter)),
            NodeKind::String { value } => Ok(self.string(value, enter)),
        }
    }

    fn style(&self) -> &'a Style {
        &self.renderer.style
    }

    fn paragraph_face(&self) -> Face {
        let style = self.style();
        style.proportional.regular(style.paragraph_style.point_size)
    }

    /// The face on top of the stack.
    fn face(&self) -> Face {
        match self.state.faces.last() {
            Some(face) => face.clone(),
            None => self.paragraph_face(),
        }
    }

    fn pop_face(&mut self) {
        self.state.faces.pop();
    }

    /// Advance by `points` of blank paper, continuing any vertical rules.
    fn print_margin(&mut self, points: f64) -> Result<()> {
        let dpi = self.device.dpi();
        let lines = points_to_pixels(points, dpi).max(0) as u32;
        if lines == 0 {
            return Ok(());
        }

        if self.state.vrules.is_empty() {
            let mut remaining = lines;
            while remaining > 0 {
                let n = remaining.min(255);
                self.device.feed(n)?;
                remaining -= n;
            }
            return Ok(());
        }

        let mut margin = Bitmap::white(self.device.max_width(), lines, DEFAULT_THRESHOLD);
        for vr in &self.state.vrules {
            margin.fill_rect(points_to_pixels(*vr, dpi), 0, 1, lines, BLACK);
        }
        self.device.print_bitmap(&margin)
    }

    fn append_content(&mut self, items: impl IntoIterator<Item = ContentItem>) {
        if self.state.paragraph.is_empty() && self.state.indent_width != 0.0 {
            self.state.paragraph.push(ContentItem::Indent {
                vrules: self.state.vrules.clone(),
                points: self.state.indent_width,
            });
        }
        self.state.paragraph.extend(items);
    }

    /// Print the pending paragraph between the margins of `style`.
    fn print_paragraph(&mut self, style: BlockStyle, raw: bool) -> Result<()> {
        if self.state.paragraph.is_empty() {
            return Ok(());
        }
        self.print_margin(style.top_margin)?;
        let items = mem::take(&mut self.state.paragraph);
        print_paragraph(&mut *self.device, &items, raw)?;
        self.print_margin(style.bottom_margin)
    }

    fn document(&mut self, enter: bool) -> Result<WalkStatus> {
        if enter {
            self.state = WalkerState::default();
        } else {
            if !self.state.paragraph.is_empty() {
                debug!("discarding {} trailing items", self.state.paragraph.len());
                self.state.paragraph.clear();
            }
            self.print_margin(DOCUMENT_MARGIN)?;
        }
        Ok(WalkStatus::Continue)
    }

    fn heading(&mut self, level: u32, enter: bool) -> Result<WalkStatus> {
        let style = self.style().heading_style(level);
        if enter {
            let face = self.style().proportional.bold(style.point_size);
            self.state.faces.push(face);
        } else {
            self.print_paragraph(style, false)?;
            self.pop_face();
        }
        Ok(WalkStatus::Continue)
    }

    fn blockquote(&mut self, enter: bool) -> WalkStatus {
        if enter {
            self.state.vrules.push(self.state.indent_width);
            self.state.indent_width += INDENT_STEP;
        } else {
            self.state.vrules.pop();
            self.state.indent_width -= INDENT_STEP;
        }
        WalkStatus::Continue
    }

    fn code(&mut self, lines: &[String], enter: bool) -> Result<WalkStatus> {
        if enter && !lines.is_empty() {
            let style = self.style().paragraph_style;
            let face = self.style().monospace.regular(style.point_size);
            self.append_content(lines.iter().map(|line| ContentItem::Text {
                face: face.clone(),
                text: line.clone(),
            }));
            self.print_paragraph(style, true)?;
        }
        Ok(WalkStatus::SkipChildren)
    }

    fn list(&mut self, ordered: bool, start: u64, items: usize, enter: bool) -> WalkStatus {
        if !enter {
            self.state.lists.pop();
            return WalkStatus::Continue;
        }

        let face = self.paragraph_face();
        let marker_width = |marker: String| {
            let word = [Segment::Text {
                face: face.clone(),
                runes: marker.chars().collect(),
            }];
            measure_word(&Line::default(), &word).width
        };
        let width = if ordered {
            (0..items as u64)
                .map(|i| marker_width(format!("{}.", start + i)))
                .max()
                .unwrap_or_default()
        } else {
            marker_width(BULLET.to_string())
        };

        let marker_width = fixed_to_points(width, self.device.dpi());
        trace!("list marker width {}pt", marker_width);
        self.state.lists.push(ListState {
            ordered,
            marker_width,
            index: start,
        });
        WalkStatus::Continue
    }

    fn list_item(&mut self, enter: bool) -> WalkStatus {
        let face = self.paragraph_face();
        let Some(list) = self.state.lists.last_mut() else {
            warn!("list item outside of a list");
            return WalkStatus::Continue;
        };
        let step = list.item_indent();

        if enter {
            let marker = if list.ordered {
                let marker = format!("{}.", list.index);
                list.index += 1;
                marker
            } else {
                BULLET.to_string()
            };
            let indent = self.state.indent_width;
            let vrules = self.state.vrules.clone();
            self.append_content([
                ContentItem::Indent {
                    vrules: vrules.clone(),
                    points: indent + INDENT_STEP,
                },
                ContentItem::Text { face, text: marker },
                ContentItem::Indent {
                    vrules,
                    points: indent + step,
                },
            ]);
            self.state.indent_width += step;
        } else {
            self.state.indent_width -= step;
        }
        WalkStatus::Continue
    }

    fn paragraph(&mut self, enter: bool) -> Result<WalkStatus> {
        if enter {
            let face = self.paragraph_face();
            self.state.faces.push(face);
        } else {
            self.print_paragraph(self.style().paragraph_style, false)?;
            self.pop_face();
        }
        Ok(WalkStatus::Continue)
    }

    fn thematic_break(&mut self, enter: bool) -> Result<WalkStatus> {
        if enter {
            let pixels = self.style().paragraph_style.point_size / 72.0 * self.device.dpi();
            let margin = (pixels / 2.0).ceil().max(0.0) as u32;
            let width = self.device.max_width();
            let mut img = Bitmap::white(width, margin * 2 + 1, DEFAULT_THRESHOLD);
            img.fill_rect(0, margin as i32, width, 1, BLACK);
            self.device.print_bitmap(&img)?;
        }
        Ok(WalkStatus::Continue)
    }

    fn code_span(&mut self, enter: bool) -> WalkStatus {
        if enter {
            let current = self.face();
            let face = self.style().monospace.face(
                current.point_size(),
                current.is_bold(),
                current.is_italic(),
            );
            self.state.faces.push(face);
        } else {
            self.pop_face();
        }
        WalkStatus::Continue
    }

    fn emphasis(&mut self, level: u32, enter: bool) -> WalkStatus {
        if enter {
            let current = self.face();
            let face = if level >= 2 {
                current.with_bold(true)
            } else {
                current.with_italic(true)
            };
            self.state.faces.push(face);
        } else {
            self.pop_face();
        }
        WalkStatus::Continue
    }

    /// Images print as inline glyphs. Their alt text is not printed.
    fn image(&mut self, destination: &str, enter: bool) -> WalkStatus {
        if !enter {
            return WalkStatus::Continue;
        }
        let item = match self.renderer.images.fetch(destination) {
            Ok(img) => ContentItem::Glyph {
                bits: Arc::new(Bitmap::from_source(&img, self.device.max_width(), true)),
                left_margin: 0.0,
                right_margin: 0.0,
            },
            Err(e) => {
                warn!("failed to load image {}: {}", destination, e);
                ContentItem::Text {
                    face: self.face(),
                    text: IMAGE_PLACEHOLDER.to_string(),
                }
            }
        };
        self.append_content([item]);
        WalkStatus::SkipChildren
    }

    /// Links print their text followed by a barcode of the shortened URL.
    fn link(&mut self, destination: &str, enter: bool) -> Result<WalkStatus> {
        if enter {
            return Ok(WalkStatus::Continue);
        }
        match self.link_barcode(destination) {
            Ok(bits) => self.append_content([ContentItem::Glyph {
                bits: Arc::new(bits),
                left_margin: LINK_MARGIN,
                right_margin: LINK_MARGIN,
            }]),
            Err(e) if e.is_unsupported_url() => debug!("skipping link: {}", e),
            Err(e) => return Err(e),
        }
        Ok(WalkStatus::Continue)
    }

    fn link_barcode(&self, destination: &str) -> Result<Bitmap> {
        let short = self.renderer.shortener.shorten(destination)?;
        url_barcode(
            &short,
            self.face().point_size(),
            self.device.max_width(),
            self.device.dpi(),
        )
    }

    fn text(&mut self, value: &str, soft_break: bool, hard_break: bool, enter: bool) -> WalkStatus {
        if !enter {
            return WalkStatus::Continue;
        }

        let face = self.face();
        if !value.is_empty() {
            self.append_content([ContentItem::Text {
                face: face.clone(),
                text: value.to_string(),
            }]);
        }
        if soft_break {
            self.append_content([ContentItem::Text {
                face,
                text: " ".to_string(),
            }]);
        } else if hard_break {
            self.state.paragraph.push(ContentItem::LineBreak);
        }
        WalkStatus::Continue
    }

    fn string(&mut self, value: &str, enter: bool) -> WalkStatus {
        if enter {
            let face = self.face();
            self.append_content([ContentItem::Text {
                face,
                text: value.to_string(),
            }]);
        }
        WalkStatus::Continue
    }
}
