//! Paragraph line breaking.
//!
//! [`layout`] turns the content items collected for one paragraph into lines
//! of positioned segments using greedy word wrap. Words are never split: a
//! word wider than the output overflows its own line.

use std::mem;
use std::sync::Arc;

use crate::{
    bitmap::Bitmap,
    fixed::{points_to_fixed, Fixed},
    font::Face,
};

/// One unit of paragraph input, produced by the document walker.
#[derive(Debug, Clone)]
pub enum ContentItem {
    /// A run of text in one face.
    Text { face: Face, text: String },
    /// A pre-rendered image laid out as an unbreakable glyph. Margins are in
    /// points.
    Glyph {
        bits: Arc<Bitmap>,
        left_margin: f64,
        right_margin: f64,
    },
    /// Forces a line break.
    LineBreak,
    /// Sets the left margin and the vertical rules (x offsets, points) drawn
    /// on subsequent lines.
    Indent { vrules: Vec<f64>, points: f64 },
}

/// One unit of a laid-out line, in fixed-point device pixels.
#[derive(Debug, Clone)]
pub enum Segment {
    Text {
        face: Face,
        runes: Vec<char>,
    },
    Glyph {
        bits: Arc<Bitmap>,
        left_margin: Fixed,
        right_margin: Fixed,
    },
    /// Marks the point where the indent changes.
    Indent { vrules: Vec<Fixed>, width: Fixed },
}

/// Segments of one output line, left to right.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub segments: Vec<Segment>,
}

impl Line {
    /// Returns true if the line holds anything besides indent markers.
    pub fn has_content(&self) -> bool {
        self.segments
            .iter()
            .any(|s| !matches!(s, Segment::Indent { .. }))
    }

    /// The character or glyph margin the next word will be placed against.
    fn trailing(&self) -> (Option<char>, Fixed) {
        match self.segments.last() {
            Some(Segment::Text { runes, .. }) => (runes.last().copied(), Fixed::ZERO),
            Some(Segment::Glyph { right_margin, .. }) => (None, *right_margin),
            _ => (None, Fixed::ZERO),
        }
    }
}

/// Width of a word placed at the end of a line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WordWidth {
    /// Total advance, including `first_kern`.
    pub width: Fixed,
    /// Adjustment between the line's last character (or inline glyph margin)
    /// and the word's first. It no longer applies if the word starts a line.
    pub first_kern: Fixed,
}

/// Measure `word` as if appended to `line`.
pub fn measure_word(line: &Line, word: &[Segment]) -> WordWidth {
    let (mut prev_c, mut prev_margin) = line.trailing();
    let mut measured = WordWidth::default();
    let mut first = true;

    for s in word {
        match s {
            Segment::Text { face, runes } => {
                for &c in runes {
                    let adjust = match prev_c {
                        Some(p) => face.kern(p, c),
                        None => prev_margin,
                    };
                    if first {
                        measured.first_kern = adjust;
                        first = false;
                    }
                    measured.width += adjust;
                    if let Some(advance) = face.glyph_advance(c) {
                        measured.width += advance;
                        prev_c = Some(c);
                        prev_margin = Fixed::ZERO;
                    }
                }
            }
            Segment::Glyph {
                bits,
                left_margin,
                right_margin,
            } => {
                let adjust = glyph_lead(prev_c, prev_margin, *left_margin);
                if first {
                    measured.first_kern = adjust;
                    first = false;
                }
                measured.width += adjust + Fixed::from_int(bits.width() as i32);
                prev_c = None;
                prev_margin = *right_margin;
            }
            Segment::Indent { .. } => {}
        }
    }
    measured
}

/// Space before an inline glyph: its left margin after a character, or both
/// margins between two glyphs. Nothing at the start of a line.
pub(crate) fn glyph_lead(prev_c: Option<char>, prev_margin: Fixed, left_margin: Fixed) -> Fixed {
    if prev_c.is_some() {
        left_margin
    } else if prev_margin != Fixed::ZERO {
        prev_margin + left_margin
    } else {
        Fixed::ZERO
    }
}

/// Break `items` into lines no wider than `output_width` where possible.
///
/// In `raw` mode (code blocks) only newlines end lines and spaces never wrap.
pub fn layout(output_width: Fixed, dpi: f64, items: &[ContentItem], raw: bool) -> Vec<Line> {
    let mut breaker = Breaker {
        output_width,
        lines: Vec::new(),
        line: Line::default(),
        word: Vec::new(),
        line_width: Fixed::ZERO,
        indent_width: Fixed::ZERO,
    };

    for item in items {
        match item {
            ContentItem::Text { face, text } if raw => breaker.raw_text(face, text),
            ContentItem::Text { face, text } => breaker.text(face, text),
            ContentItem::Glyph {
                bits,
                left_margin,
                right_margin,
            } => breaker.word.push(Segment::Glyph {
                bits: bits.clone(),
                left_margin: points_to_fixed(*left_margin, dpi),
                right_margin: points_to_fixed(*right_margin, dpi),
            }),
            ContentItem::LineBreak => {
                breaker.push_word();
                breaker.end_line();
            }
            ContentItem::Indent { vrules, points } => {
                breaker.push_word();
                breaker.indent_width = points_to_fixed(*points, dpi);
                breaker.line.segments.push(Segment::Indent {
                    vrules: vrules.iter().map(|vr| points_to_fixed(*vr, dpi)).collect(),
                    width: breaker.indent_width,
                });
                breaker.line_width = breaker.indent_width;
            }
        }
    }

    breaker.push_word();
    if !breaker.line.segments.is_empty() {
        breaker.lines.push(breaker.line);
    }
    breaker.lines
}

struct Breaker {
    output_width: Fixed,
    lines: Vec<Line>,
    line: Line,
    /// Segments of the word being accumulated.
    word: Vec<Segment>,
    line_width: Fixed,
    indent_width: Fixed,
}

impl Breaker {
    fn text(&mut self, face: &Face, text: &str) {
        let mut runes = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            let is_space = c.is_whitespace();
            runes.push(if is_space { ' ' } else { c });

            // A space, or the end of the run, ends a segment; only a space ends the word.
            if is_space || chars.peek().is_none() {
                self.word.push(Segment::Text {
                    face: face.clone(),
                    runes: mem::take(&mut runes),
                });
            }
            if is_space {
                self.push_word();
            }
        }
    }

    fn raw_text(&mut self, face: &Face, text: &str) {
        let mut runes = Vec::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\n' {
                self.word.push(Segment::Text {
                    face: face.clone(),
                    runes: mem::take(&mut runes),
                });
                let word = mem::take(&mut self.word);
                self.line.segments.extend(word);
                self.end_line();
            } else {
                runes.push(c);
                if chars.peek().is_none() {
                    self.word.push(Segment::Text {
                        face: face.clone(),
                        runes: mem::take(&mut runes),
                    });
                }
            }
        }
    }

    /// Place the pending word on the current line, or start a new line with it.
    fn push_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let word = mem::take(&mut self.word);
        let measured = measure_word(&self.line, &word);

        if self.line_width + measured.width < self.output_width {
            self.line.segments.extend(word);
            self.line_width += measured.width;
        } else if !self.line.has_content() {
            // TODO: hyphenate words wider than the whole output instead of overflowing.
            self.line.segments.extend(word);
            self.line_width = self.indent_width + measured.width - measured.first_kern;
        } else {
            let full = mem::replace(&mut self.line, Line { segments: word });
            self.lines.push(full);
            self.line_width = self.indent_width + measured.width - measured.first_kern;
        }
    }

    fn end_line(&mut self) {
        let line = mem::take(&mut self.line);
        self.lines.push(line);
        self.line_width = self.indent_width;
    }
}
