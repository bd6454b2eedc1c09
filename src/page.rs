//! Positioned text runs and the page access contract.
//!
//! A page is whatever the container adapter says it is: an ordered list of
//! styled, positioned runs plus erase/draw operations. The core never parses
//! or serializes a container format itself.

use serde::Serialize;

use crate::error::Result;
use crate::fonts::ResolvedFont;

/// Packed 0xRRGGBB fill color; 0 is black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Color(pub u32);

impl Color {
    pub const BLACK: Color = Color(0);
    pub const WHITE: Color = Color(0x00FF_FFFF);

    /// Pack components given in the 0..=1 range.
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
        Color((quantize(r) << 16) | (quantize(g) << 8) | quantize(b))
    }

    /// Unpack to components in the 0..=1 range.
    pub fn to_rgb(self) -> (f32, f32, f32) {
        let c = |shift: u32| ((self.0 >> shift) & 0xFF) as f32 / 255.0;
        (c(16), c(8), c(0))
    }
}

/// Axis-aligned box in page coordinates, `(x0, y0)` bottom-left and
/// `(x1, y1)` top-right, y growing upward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Bold/italic bits read from a run's font.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StyleFlags {
    pub bold: bool,
    pub italic: bool,
}

/// Structural address of a run: block -> line -> run, in reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct SpanPath {
    pub block: usize,
    pub line: usize,
    pub run: usize,
}

/// One positioned, styled run of text, as read from the source page.
/// Immutable once indexed; rewriting replaces it wholesale.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub font_name: String,
    pub flags: StyleFlags,
    pub color: Color,
    pub size: f32,
    pub bbox: Rect,
    pub page_index: usize,
    pub path: SpanPath,
}

/// A replacement run ready to paint: resolved font, fitted size, and a
/// bounding box clipped to the original run's box.
#[derive(Debug, Clone)]
pub struct ReplacementRun {
    pub text: String,
    pub font: ResolvedFont,
    pub size: f32,
    /// Original run's color, carried through unchanged.
    pub color: Color,
    /// Baseline start point.
    pub origin: (f32, f32),
    pub bbox: Rect,
}

/// Page access contract implemented by container adapters.
pub trait PageAccess {
    /// Every positioned run on the page.
    fn spans(&mut self) -> Result<Vec<TextSpan>>;

    /// Opaque cover over the run's visual area, matching the page background.
    fn erase(&mut self, span: &TextSpan) -> Result<()>;

    /// Paint a replacement run.
    fn draw(&mut self, run: &ReplacementRun) -> Result<()>;
}

/// Read-only index of a page's runs in reading order (block, line, run).
#[derive(Debug, Default)]
pub struct SpanIndex {
    spans: Vec<TextSpan>,
}

impl SpanIndex {
    pub fn build(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by_key(|s| s.path);
        Self { spans }
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextSpan> {
        self.spans.iter()
    }

    /// Runs whose text contains the needle, for diagnostics.
    pub fn find(&self, needle: &str) -> impl Iterator<Item = &TextSpan> + '_ {
        let needle = needle.to_string();
        self.spans.iter().filter(move |s| s.text.contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(block: usize, line: usize, run: usize, text: &str) -> TextSpan {
        TextSpan {
            text: text.into(),
            font_name: "Helvetica".into(),
            flags: StyleFlags::default(),
            color: Color::BLACK,
            size: 11.0,
            bbox: Rect::default(),
            page_index: 0,
            path: SpanPath { block, line, run },
        }
    }

    #[test]
    fn index_sorts_into_reading_order() {
        let index = SpanIndex::build(vec![
            span(1, 0, 0, "c"),
            span(0, 1, 0, "b"),
            span(0, 0, 0, "a"),
        ]);
        let order: Vec<&str> = index.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn color_packs_and_unpacks() {
        let c = Color::from_rgb(1.0, 0.5, 0.0);
        assert_eq!(c.0, 0x00FF8000);
        let (r, g, b) = c.to_rgb();
        assert!((r - 1.0).abs() < 1e-3);
        assert!((g - 0.502).abs() < 1e-2);
        assert!(b.abs() < 1e-3);
    }
}
