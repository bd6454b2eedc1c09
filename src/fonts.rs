//! Font resolution for replacement runs.
//!
//! Replacement text is always drawn with one of the base-14 text fonts, so a
//! renderer needs no embedded font program. The resolver walks four states in
//! order: reuse the exact base-14 font, map a known external family onto the
//! nearest base family with the run's style bits, keep only the style bits on
//! the sans-serif default, or fall back to plain sans-serif. The run's color
//! is never part of the decision.

use serde::Serialize;

use crate::page::StyleFlags;

/// The three base families every PDF renderer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BaseFamily {
    Sans,
    Serif,
    Mono,
}

/// How far down the fallback chain the resolver had to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Exact,
    StyledFallback,
    FlagFallback,
    Default,
}

/// A concrete, always-renderable font choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedFont {
    pub family: BaseFamily,
    pub bold: bool,
    pub italic: bool,
    pub resolution: Resolution,
}

impl ResolvedFont {
    /// PostScript name of the base-14 font this resolves to.
    pub fn ps_name(&self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (BaseFamily::Sans, false, false) => "Helvetica",
            (BaseFamily::Sans, true, false) => "Helvetica-Bold",
            (BaseFamily::Sans, false, true) => "Helvetica-Oblique",
            (BaseFamily::Sans, true, true) => "Helvetica-BoldOblique",
            (BaseFamily::Serif, false, false) => "Times-Roman",
            (BaseFamily::Serif, true, false) => "Times-Bold",
            (BaseFamily::Serif, false, true) => "Times-Italic",
            (BaseFamily::Serif, true, true) => "Times-BoldItalic",
            (BaseFamily::Mono, false, false) => "Courier",
            (BaseFamily::Mono, true, false) => "Courier-Bold",
            (BaseFamily::Mono, false, true) => "Courier-Oblique",
            (BaseFamily::Mono, true, true) => "Courier-BoldOblique",
        }
    }
}

/// The base-14 text fonts, directly reusable. Symbol and ZapfDingbats are
/// intentionally absent: replacement tags are Latin text.
fn base14_font(name: &str) -> Option<ResolvedFont> {
    let (family, bold, italic) = match name {
        "Helvetica" => (BaseFamily::Sans, false, false),
        "Helvetica-Bold" => (BaseFamily::Sans, true, false),
        "Helvetica-Oblique" => (BaseFamily::Sans, false, true),
        "Helvetica-BoldOblique" => (BaseFamily::Sans, true, true),
        "Times-Roman" => (BaseFamily::Serif, false, false),
        "Times-Bold" => (BaseFamily::Serif, true, false),
        "Times-Italic" => (BaseFamily::Serif, false, true),
        "Times-BoldItalic" => (BaseFamily::Serif, true, true),
        "Courier" => (BaseFamily::Mono, false, false),
        "Courier-Bold" => (BaseFamily::Mono, true, false),
        "Courier-Oblique" => (BaseFamily::Mono, false, true),
        "Courier-BoldOblique" => (BaseFamily::Mono, true, true),
        _ => return None,
    };
    Some(ResolvedFont {
        family,
        bold,
        italic,
        resolution: Resolution::Exact,
    })
}

const SANS_FAMILIES: &[&str] = &[
    "arial", "helvetica", "calibri", "verdana", "tahoma", "segoe", "geneva", "lucida",
    "liberation sans", "dejavu sans", "noto sans", "open sans", "roboto",
];
const SERIF_FAMILIES: &[&str] = &[
    "times", "georgia", "cambria", "garamond", "palatino", "book antiqua", "century",
    "liberation serif", "dejavu serif", "noto serif", "minion",
];
const MONO_FAMILIES: &[&str] = &[
    "courier", "consolas", "menlo", "monaco", "mono", "inconsolata",
];

/// Nearest base family for a known external font name, if any.
fn family_for(name: &str) -> Option<BaseFamily> {
    let lower = name.to_lowercase();
    // Mono first: "liberation mono" must not hit the "liberation sans" entry.
    if MONO_FAMILIES.iter().any(|f| lower.contains(f)) {
        return Some(BaseFamily::Mono);
    }
    if SANS_FAMILIES.iter().any(|f| lower.contains(f)) {
        return Some(BaseFamily::Sans);
    }
    if SERIF_FAMILIES.iter().any(|f| lower.contains(f)) {
        return Some(BaseFamily::Serif);
    }
    None
}

/// Bold/italic bits inferred from a font name.
pub fn style_from_name(name: &str) -> StyleFlags {
    let lower = name.to_lowercase();
    StyleFlags {
        bold: lower.contains("bold") || lower.contains("black") || lower.contains("heavy"),
        italic: lower.contains("italic") || lower.contains("oblique"),
    }
}

/// Resolve the font for a replacement run.
///
/// `flags` are the style bits read from the run; name-derived bits are folded
/// in so a "Calibri-Bold" without descriptor flags still comes out bold.
pub fn resolve(font_name: &str, flags: StyleFlags) -> ResolvedFont {
    if let Some(exact) = base14_font(font_name) {
        log::debug!("font-resolve: {font_name} reused verbatim");
        return exact;
    }

    let named = style_from_name(font_name);
    let flags = StyleFlags {
        bold: flags.bold || named.bold,
        italic: flags.italic || named.italic,
    };

    if let Some(family) = family_for(font_name) {
        log::debug!("font-resolve: {font_name} mapped to {family:?} (styled fallback)");
        return ResolvedFont {
            family,
            bold: flags.bold,
            italic: flags.italic,
            resolution: Resolution::StyledFallback,
        };
    }

    if flags.bold || flags.italic {
        log::debug!("font-resolve: {font_name} unknown family, keeping style bits");
        return ResolvedFont {
            family: BaseFamily::Sans,
            bold: flags.bold,
            italic: flags.italic,
            resolution: Resolution::FlagFallback,
        };
    }

    log::debug!("font-resolve: {font_name} unknown, default sans-serif");
    ResolvedFont {
        family: BaseFamily::Sans,
        bold: false,
        italic: false,
        resolution: Resolution::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base14_names_are_reused_verbatim() {
        let font = resolve("Times-BoldItalic", StyleFlags::default());
        assert_eq!(font.resolution, Resolution::Exact);
        assert_eq!(font.ps_name(), "Times-BoldItalic");
    }

    #[test]
    fn known_families_map_with_style_preserved() {
        let flags = StyleFlags {
            bold: true,
            italic: false,
        };
        let font = resolve("Calibri", flags);
        assert_eq!(font.resolution, Resolution::StyledFallback);
        assert_eq!(font.ps_name(), "Helvetica-Bold");

        let font = resolve("Cambria-Italic", StyleFlags::default());
        assert_eq!(font.resolution, Resolution::StyledFallback);
        assert_eq!(font.ps_name(), "Times-Italic");

        let font = resolve("Consolas", StyleFlags::default());
        assert_eq!(font.ps_name(), "Courier");
    }

    #[test]
    fn unknown_family_keeps_flags_on_sans() {
        let flags = StyleFlags {
            bold: false,
            italic: true,
        };
        let font = resolve("MysteryGrotesk", flags);
        assert_eq!(font.resolution, Resolution::FlagFallback);
        assert_eq!(font.ps_name(), "Helvetica-Oblique");
    }

    #[test]
    fn plain_fallback_is_plain_sans() {
        let font = resolve("MysteryGrotesk", StyleFlags::default());
        assert_eq!(font.resolution, Resolution::Default);
        assert_eq!(font.ps_name(), "Helvetica");
    }

    #[test]
    fn symbol_fonts_are_not_reused() {
        let font = resolve("Symbol", StyleFlags::default());
        assert_ne!(font.resolution, Resolution::Exact);
    }

    #[test]
    fn style_bits_read_from_names() {
        assert!(style_from_name("Arial-BoldMT").bold);
        assert!(style_from_name("Helvetica-Oblique").italic);
        assert!(!style_from_name("Verdana").bold);
    }
}
