//! Advance widths and vertical metrics for the base-14 text fonts.
//!
//! Widths are in 1/1000 em for the printable ASCII range (0x20..=0x7E), from
//! the standard AFM files. Oblique cuts share their upright widths; Courier
//! is monospaced at 600. Characters outside the table (accented Latin-1
//! mostly) fall back to the family's typical lowercase width, which keeps
//! measurements conservative without shipping full Latin-1 tables.

use crate::fonts::{BaseFamily, ResolvedFont};

const ASCII_START: u32 = 0x20;
const ASCII_END: u32 = 0x7E;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];

#[rustfmt::skip]
const TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 675, 675, 675, 500,
    920, 611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833, 667, 722,
    611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556, 389, 278, 389, 422, 500,
    333, 500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722, 500, 500,
    500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389, 400, 275, 400, 541,
];

#[rustfmt::skip]
const TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    832, 667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889, 722, 722,
    611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611, 333, 278, 333, 570, 500,
    333, 500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778, 556, 500,
    500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389, 348, 220, 348, 570,
];

const COURIER_WIDTH: u16 = 600;

fn table(font: &ResolvedFont) -> Option<&'static [u16; 95]> {
    match (font.family, font.bold, font.italic) {
        (BaseFamily::Sans, false, _) => Some(&HELVETICA),
        (BaseFamily::Sans, true, _) => Some(&HELVETICA_BOLD),
        (BaseFamily::Serif, false, false) => Some(&TIMES_ROMAN),
        (BaseFamily::Serif, true, false) => Some(&TIMES_BOLD),
        (BaseFamily::Serif, false, true) => Some(&TIMES_ITALIC),
        (BaseFamily::Serif, true, true) => Some(&TIMES_BOLD_ITALIC),
        (BaseFamily::Mono, _, _) => None,
    }
}

fn fallback_width(family: BaseFamily) -> u16 {
    match family {
        BaseFamily::Sans => 556,
        BaseFamily::Serif => 500,
        BaseFamily::Mono => COURIER_WIDTH,
    }
}

/// Advance width of one character, in 1/1000 em.
pub fn advance(font: &ResolvedFont, ch: char) -> u16 {
    if font.family == BaseFamily::Mono {
        return COURIER_WIDTH;
    }
    let code = ch as u32;
    if (ASCII_START..=ASCII_END).contains(&code) {
        if let Some(table) = table(font) {
            return table[(code - ASCII_START) as usize];
        }
    }
    fallback_width(font.family)
}

/// Rendered width of a string at the given size, in page units.
pub fn text_width(font: &ResolvedFont, text: &str, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| advance(font, c) as u32).sum();
    units as f32 * size / 1000.0
}

/// Ascender above the baseline, in 1/1000 em.
pub fn ascent(font: &ResolvedFont) -> f32 {
    match font.family {
        BaseFamily::Sans => 718.0,
        BaseFamily::Serif => 683.0,
        BaseFamily::Mono => 629.0,
    }
}

/// Descender below the baseline (negative), in 1/1000 em.
pub fn descent(font: &ResolvedFont) -> f32 {
    match font.family {
        BaseFamily::Sans => -207.0,
        BaseFamily::Serif => -217.0,
        BaseFamily::Mono => -157.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{resolve, Resolution};
    use crate::page::StyleFlags;

    fn font(name: &str) -> ResolvedFont {
        let f = resolve(name, StyleFlags::default());
        assert_eq!(f.resolution, Resolution::Exact);
        f
    }

    #[test]
    fn courier_is_monospaced() {
        let courier = font("Courier");
        assert_eq!(text_width(&courier, "iiii", 10.0), text_width(&courier, "MMMM", 10.0));
        assert_eq!(text_width(&courier, "abc", 10.0), 18.0);
    }

    #[test]
    fn width_scales_linearly_with_size() {
        let helv = font("Helvetica");
        let w1 = text_width(&helv, "NOM1", 10.0);
        let w2 = text_width(&helv, "NOM1", 20.0);
        assert!((w2 - 2.0 * w1).abs() < 1e-4);
    }

    #[test]
    fn proportional_fonts_vary_by_glyph() {
        let helv = font("Helvetica");
        assert!(advance(&helv, 'W') > advance(&helv, 'i'));
        assert_eq!(advance(&helv, ' '), 278);
        assert_eq!(advance(&helv, 'M'), 833);
    }

    #[test]
    fn bold_runs_at_least_as_wide() {
        let helv = font("Helvetica");
        let bold = font("Helvetica-Bold");
        let text = "ADRESSE1";
        assert!(text_width(&bold, text, 11.0) >= text_width(&helv, text, 11.0));
    }

    #[test]
    fn non_ascii_uses_family_fallback() {
        let times = font("Times-Roman");
        assert_eq!(advance(&times, 'é'), 500);
    }
}
