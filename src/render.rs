//! Rasterizing laid-out lines.

use log::trace;

use crate::{
    bitmap::{Bitmap, BLACK},
    device::Device,
    error::Result,
    fixed::Fixed,
    layout::{glyph_lead, layout, ContentItem, Line, Segment},
};

/// Binarization threshold for rendered lines. Slightly above the midpoint so
/// that anti-aliased glyph edges print a little bolder.
pub const LINE_THRESHOLD: u8 = 140;

/// Renders the lines of one paragraph.
///
/// The indent and vertical rules set by an indent segment persist to the
/// following lines of the same paragraph.
#[derive(Debug)]
pub struct LineRenderer {
    output_width: u32,
    indent_width: Fixed,
    vrules: Vec<Fixed>,
}

impl LineRenderer {
    pub fn new(output_width: u32) -> Self {
        LineRenderer {
            output_width,
            indent_width: Fixed::ZERO,
            vrules: Vec::new(),
        }
    }

    /// Render `line` into a bitmap exactly `output_width` wide.
    pub fn render(&mut self, line: &Line) -> Bitmap {
        let line_height = line_height(line);
        let height = line_height.ceil().max(0) as u32;
        let mut img = Bitmap::white(self.output_width, height, LINE_THRESHOLD);

        draw_rules(&mut img, &self.vrules);
        let mut dot_x = Fixed::from_int(self.indent_width.ceil());
        let mut prev_c: Option<char> = None;
        let mut prev_margin = Fixed::ZERO;

        for segment in &line.segments {
            match segment {
                Segment::Text { face, runes } => {
                    let baseline = line_height - face.metrics().descent;
                    for &c in runes {
                        match prev_c {
                            Some(p) => dot_x += face.kern(p, c),
                            None => dot_x += prev_margin,
                        }
                        let advance = match face.glyph_advance(c) {
                            Some(advance) => advance,
                            None => continue,
                        };
                        // Masks are rasterized at one horizontal phase, so the
                        // pen snaps to the nearest pixel; fractional advances
                        // still accumulate in `dot_x`.
                        if let Some(mask) = face.glyph(c) {
                            let x = dot_x.round() + mask.xmin;
                            let y = baseline.floor() - mask.ymin - mask.height as i32;
                            img.draw_mask(&mask.coverage, mask.width, x, y);
                        }
                        dot_x += advance;
                        prev_c = Some(c);
                        prev_margin = Fixed::ZERO;
                    }
                }
                Segment::Glyph {
                    bits,
                    left_margin,
                    right_margin,
                } => {
                    dot_x += glyph_lead(prev_c, prev_margin, *left_margin);
                    let y = line_height.ceil() / 2 - bits.height() as i32 / 2;
                    img.draw_bitmap(bits, dot_x.ceil(), y);
                    dot_x += Fixed::from_int(bits.width() as i32);
                    prev_c = None;
                    prev_margin = *right_margin;
                }
                Segment::Indent { vrules, width } => {
                    draw_rules(&mut img, vrules);
                    self.indent_width = *width;
                    self.vrules = vrules.clone();
                    dot_x = *width;
                    prev_c = None;
                    prev_margin = Fixed::ZERO;
                }
            }
        }
        img
    }
}

/// The tallest text face or inline glyph on the line.
fn line_height(line: &Line) -> Fixed {
    line.segments
        .iter()
        .map(|s| match s {
            Segment::Text { face, .. } => face.metrics().height(),
            Segment::Glyph { bits, .. } => Fixed::from_int(bits.height() as i32),
            Segment::Indent { .. } => Fixed::ZERO,
        })
        .max()
        .unwrap_or(Fixed::ZERO)
}

fn draw_rules(img: &mut Bitmap, vrules: &[Fixed]) {
    let height = img.height();
    for vr in vrules {
        img.fill_rect(vr.ceil(), 0, 1, height, BLACK);
    }
}

/// Lay out `items` for `device` and print each line, top to bottom.
pub fn print_paragraph<D: Device + ?Sized>(
    device: &mut D,
    items: &[ContentItem],
    raw: bool,
) -> Result<()> {
    let width = device.max_width();
    let lines = layout(Fixed::from_int(width as i32), device.dpi(), items, raw);
    trace!("paragraph: {} items, {} lines", items.len(), lines.len());

    let mut renderer = LineRenderer::new(width);
    for line in &lines {
        let img = renderer.render(line);
        device.print_bitmap(&img)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::Face;
    use crate::test_utils::{box_family, Recorder};
    use std::sync::Arc;

    fn face() -> Face {
        box_family("sans", 72.0).regular(10.0)
    }

    fn text_line(face: &Face, s: &str) -> Segment {
        Segment::Text {
            face: face.clone(),
            runes: s.chars().collect(),
        }
    }

    fn column_is_black(img: &Bitmap, x: u32) -> bool {
        (0..img.height()).all(|y| !img.bit_at(x, y))
    }

    #[test]
    fn text_sits_on_the_baseline() {
        // 10px em: ascent 8, descent 2, boxes 4 wide and 6 tall.
        let mut renderer = LineRenderer::new(40);
        let img = renderer.render(&Line {
            segments: vec![text_line(&face(), "ab")],
        });
        assert_eq!((img.width(), img.height()), (40, 10));

        assert!(!img.bit_at(0, 2));
        assert!(!img.bit_at(3, 7));
        assert!(img.bit_at(4, 4), "gap between boxes");
        assert!(!img.bit_at(5, 7));
        assert!(img.bit_at(0, 1), "above the box");
        assert!(img.bit_at(0, 8), "below the baseline");
        assert!(img.bit_at(12, 5), "past the text");
    }

    #[test]
    fn fractional_pens_snap_to_the_nearest_pixel() {
        // 9px em: 4.5px advances, boxes 3 wide.
        let f = box_family("sans", 72.0).regular(9.0);
        let mut renderer = LineRenderer::new(40);
        let img = renderer.render(&Line {
            segments: vec![text_line(&f, "abc")],
        });
        assert!(!img.bit_at(2, 4));
        assert!(img.bit_at(3, 4));
        assert!(img.bit_at(4, 4), "second box starts at 4.5, drawn at 5");
        assert!(!img.bit_at(5, 4));
        assert!(!img.bit_at(7, 4));
        assert!(img.bit_at(8, 4));
        assert!(!img.bit_at(9, 4), "third box at 9");
    }

    #[test]
    fn glyphs_are_centered_vertically() {
        let bits = Arc::new(Bitmap::new(4, 4));
        let mut renderer = LineRenderer::new(40);
        let img = renderer.render(&Line {
            segments: vec![
                text_line(&face(), "a"),
                Segment::Glyph {
                    bits,
                    left_margin: Fixed::from_int(2),
                    right_margin: Fixed::ZERO,
                },
            ],
        });
        // Glyph starts after the 5px advance and 2px margin, rows 3..7.
        assert!(!img.bit_at(7, 3));
        assert!(!img.bit_at(10, 6));
        assert!(img.bit_at(7, 2));
        assert!(img.bit_at(7, 7));
        assert!(img.bit_at(11, 5));
    }

    #[test]
    fn tall_glyphs_set_the_line_height() {
        let bits = Arc::new(Bitmap::new(3, 25));
        let mut renderer = LineRenderer::new(20);
        let img = renderer.render(&Line {
            segments: vec![
                text_line(&face(), "a"),
                Segment::Glyph {
                    bits,
                    left_margin: Fixed::ZERO,
                    right_margin: Fixed::ZERO,
                },
            ],
        });
        assert_eq!(img.height(), 25);
    }

    #[test]
    fn indent_rules_persist_across_lines() {
        let f = face();
        let mut renderer = LineRenderer::new(40);
        let first = renderer.render(&Line {
            segments: vec![
                Segment::Indent {
                    vrules: vec![Fixed::ZERO, Fixed::from_int(5)],
                    width: Fixed::from_int(9),
                },
                text_line(&f, "a"),
            ],
        });
        let second = renderer.render(&Line {
            segments: vec![text_line(&f, "a")],
        });

        for img in [&first, &second] {
            assert!(column_is_black(img, 0));
            assert!(column_is_black(img, 5));
            assert!(!column_is_black(img, 1));
            assert!(img.bit_at(8, 4), "indent is blank");
            assert!(!img.bit_at(9, 4), "text starts at the indent");
        }
    }

    #[test]
    fn missing_glyphs_are_skipped() {
        let mut renderer = LineRenderer::new(40);
        let img = renderer.render(&Line {
            segments: vec![text_line(&face(), "\u{fffe}a")],
        });
        assert!(!img.bit_at(0, 4));
    }

    #[test]
    fn paragraphs_print_one_bitmap_per_line() {
        let f = face();
        let mut device = Recorder::new(50, 72.0);
        let items = vec![ContentItem::Text {
            face: f,
            text: "hello world again".to_string(),
        }];
        print_paragraph(&mut device, &items, false).unwrap();
        let bitmaps = device.bitmaps();
        assert_eq!(bitmaps.len(), 3);
        assert!(bitmaps.iter().all(|b| b.width() == 50 && b.height() == 10));
        assert!(bitmaps.iter().all(|b| b.threshold() == LINE_THRESHOLD));
    }
}
