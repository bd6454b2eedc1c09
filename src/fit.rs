//! Size and placement of replacement text inside an existing run's box.
//!
//! The fitter measures with real base-14 metrics and shrinks in small steps
//! until the text fits the original bounding-box width or hits the legibility
//! floor. Placement anchors the left edge to the original run (no centering,
//! so a rewrite/restore round trip does not drift) and derives the baseline
//! from the resolved font's ascent so different fonts at the same nominal
//! size still align.

use crate::fonts::ResolvedFont;
use crate::metrics;
use crate::page::{Rect, ReplacementRun, TextSpan};

/// Fitting knobs.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Smallest size the fitter will shrink to.
    pub floor_size: f32,
    /// Size subtracted per shrink iteration.
    pub shrink_step: f32,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            floor_size: 5.0,
            shrink_step: 0.5,
        }
    }
}

/// Outcome of fitting a text into a box width.
#[derive(Debug, Clone, Copy)]
pub struct Fit {
    pub size: f32,
    pub width: f32,
    /// True when even the floor size still overflows the box.
    pub clipped: bool,
}

/// Choose a size for `text` so it fits `box_width`, starting from the
/// original run's size and never going below the floor.
pub fn fit_text(text: &str, font: &ResolvedFont, start_size: f32, box_width: f32, opts: &FitOptions) -> Fit {
    let mut size = start_size.max(opts.floor_size);
    loop {
        let width = metrics::text_width(font, text, size);
        if width <= box_width || size <= opts.floor_size {
            return Fit {
                size,
                width,
                clipped: width > box_width,
            };
        }
        size = (size - opts.shrink_step).max(opts.floor_size);
    }
}

/// Build the replacement run for a span: left edge anchored to the original,
/// bounding box clipped to the original's box.
pub fn place(span: &TextSpan, text: String, font: ResolvedFont, fit: Fit) -> ReplacementRun {
    let baseline_y = span.bbox.y1 - metrics::ascent(&font) * fit.size / 1000.0;
    let bbox = Rect {
        x0: span.bbox.x0,
        y0: span.bbox.y0,
        x1: span.bbox.x0 + fit.width.min(span.bbox.width()),
        y1: span.bbox.y1,
    };
    ReplacementRun {
        text,
        font,
        size: fit.size,
        color: span.color,
        origin: (span.bbox.x0, baseline_y),
        bbox,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::resolve;
    use crate::metrics;
    use crate::page::{Color, SpanPath, StyleFlags};

    fn helv() -> ResolvedFont {
        resolve("Helvetica", StyleFlags::default())
    }

    #[test]
    fn text_that_fits_keeps_its_size() {
        let fit = fit_text("NOM1", &helv(), 11.0, 200.0, &FitOptions::default());
        assert_eq!(fit.size, 11.0);
        assert!(!fit.clipped);
    }

    #[test]
    fn overflowing_text_shrinks_until_it_fits() {
        let font = helv();
        let opts = FitOptions::default();
        let box_width = metrics::text_width(&font, "PORTABLE1", 11.0) * 0.7;
        let fit = fit_text("PORTABLE1", &font, 11.0, box_width, &opts);
        assert!(fit.size < 11.0);
        assert!(fit.size >= opts.floor_size);
        assert!(!fit.clipped);
        assert!(fit.width <= box_width);
    }

    #[test]
    fn floor_size_is_never_crossed() {
        let opts = FitOptions::default();
        let fit = fit_text("UNREASONABLYLONGTAG1", &helv(), 11.0, 1.0, &opts);
        assert_eq!(fit.size, opts.floor_size);
        assert!(fit.clipped);
    }

    #[test]
    fn placement_anchors_left_edge_and_clips_bbox() {
        let span = TextSpan {
            text: "HUISSOUD".into(),
            font_name: "Helvetica".into(),
            flags: StyleFlags::default(),
            color: Color(0x00112233),
            size: 11.0,
            bbox: Rect {
                x0: 72.0,
                y0: 698.0,
                x1: 140.0,
                y1: 710.0,
            },
            page_index: 0,
            path: SpanPath::default(),
        };
        let font = helv();
        let fit = fit_text("NOM1", &font, span.size, span.bbox.width(), &FitOptions::default());
        let run = place(&span, "NOM1".into(), font, fit);

        assert_eq!(run.origin.0, span.bbox.x0);
        assert!(run.origin.1 < span.bbox.y1);
        assert!(run.bbox.x1 <= span.bbox.x1);
        assert_eq!(run.color, span.color);
    }
}
