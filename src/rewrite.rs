//! In-place page rewriting.
//!
//! The rewriter walks a page's span index in reading order, asks a transform
//! for each run's replacement text, and for every changed run resolves a
//! font, fits the text, erases the original area, and paints the replacement.
//! A run that cannot be rewritten is left alone and recorded; the page is
//! never abandoned halfway.

use serde::Serialize;

use crate::error::Result;
use crate::fit::{self, FitOptions};
use crate::fonts;
use crate::page::{PageAccess, SpanIndex, SpanPath};

/// One run that could not be rewritten. Recorded, never raised.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteFailure {
    pub page_index: usize,
    pub path: SpanPath,
    pub reason: String,
}

/// Outcome of rewriting one or more pages.
#[derive(Debug, Default, Serialize)]
pub struct RewriteReport {
    pub pages: usize,
    pub spans_seen: usize,
    pub replaced: usize,
    pub failures: Vec<RewriteFailure>,
}

/// Orchestrates span location, font resolution, fitting, and redraw.
#[derive(Debug, Default)]
pub struct PageRewriter {
    pub fit: FitOptions,
}

impl PageRewriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit(fit: FitOptions) -> Self {
        Self { fit }
    }

    /// Rewrite every span whose text the transform changes. The transform
    /// returns `None` for runs to leave untouched.
    pub fn rewrite_page<P: PageAccess>(
        &self,
        page: &mut P,
        transform: &mut dyn FnMut(&str) -> Option<String>,
        report: &mut RewriteReport,
    ) -> Result<()> {
        let index = SpanIndex::build(page.spans()?);
        report.pages += 1;

        for span in index.iter() {
            report.spans_seen += 1;
            let Some(new_text) = transform(&span.text) else {
                continue;
            };
            if new_text == span.text {
                continue;
            }

            let font = fonts::resolve(&span.font_name, span.flags);
            let fit = fit::fit_text(&new_text, &font, span.size, span.bbox.width(), &self.fit);
            if fit.clipped {
                log::warn!(
                    "rewrite: page {} span {:?}: \"{}\" still overflows at floor size",
                    span.page_index,
                    span.path,
                    new_text
                );
            }
            let run = fit::place(span, new_text, font, fit);

            if let Err(e) = page.erase(span) {
                report.failures.push(RewriteFailure {
                    page_index: span.page_index,
                    path: span.path,
                    reason: format!("erase: {e}"),
                });
                continue;
            }
            if let Err(e) = page.draw(&run) {
                report.failures.push(RewriteFailure {
                    page_index: span.page_index,
                    path: span.path,
                    reason: format!("draw: {e}"),
                });
                continue;
            }
            report.replaced += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ValidationError};
    use crate::page::{Color, Rect, ReplacementRun, StyleFlags, TextSpan};

    /// In-memory page double: spans in, operations recorded.
    struct MemoryPage {
        spans: Vec<TextSpan>,
        erased: Vec<SpanPath>,
        drawn: Vec<ReplacementRun>,
        fail_draw: bool,
    }

    impl MemoryPage {
        fn new(spans: Vec<TextSpan>) -> Self {
            Self {
                spans,
                erased: Vec::new(),
                drawn: Vec::new(),
                fail_draw: false,
            }
        }
    }

    impl PageAccess for MemoryPage {
        fn spans(&mut self) -> Result<Vec<TextSpan>> {
            Ok(self.spans.clone())
        }

        fn erase(&mut self, span: &TextSpan) -> Result<()> {
            self.erased.push(span.path);
            Ok(())
        }

        fn draw(&mut self, run: &ReplacementRun) -> Result<()> {
            if self.fail_draw {
                return Err(Error::Validation(ValidationError::Empty));
            }
            self.drawn.push(run.clone());
            Ok(())
        }
    }

    fn span(run: usize, text: &str, width: f32) -> TextSpan {
        TextSpan {
            text: text.into(),
            font_name: "Calibri".into(),
            flags: StyleFlags::default(),
            color: Color(0x00AA0000),
            size: 11.0,
            bbox: Rect {
                x0: 50.0,
                y0: 700.0,
                x1: 50.0 + width,
                y1: 711.0,
            },
            page_index: 0,
            path: SpanPath {
                block: 0,
                line: 0,
                run,
            },
        }
    }

    #[test]
    fn only_changed_spans_are_rewritten() {
        let mut page = MemoryPage::new(vec![
            span(0, "Monsieur", 60.0),
            span(1, "HUISSOUD", 70.0),
        ]);
        let rewriter = PageRewriter::new();
        let mut report = RewriteReport::default();
        rewriter
            .rewrite_page(
                &mut page,
                &mut |t| (t == "HUISSOUD").then(|| "NOM1".to_string()),
                &mut report,
            )
            .unwrap();

        assert_eq!(report.spans_seen, 2);
        assert_eq!(report.replaced, 1);
        assert_eq!(page.erased, vec![SpanPath { block: 0, line: 0, run: 1 }]);
        assert_eq!(page.drawn.len(), 1);
        assert_eq!(page.drawn[0].text, "NOM1");
        // Original color carried through.
        assert_eq!(page.drawn[0].color, Color(0x00AA0000));
    }

    #[test]
    fn replacement_stays_inside_the_original_box() {
        let mut page = MemoryPage::new(vec![span(0, "Louis", 30.0)]);
        let rewriter = PageRewriter::new();
        let mut report = RewriteReport::default();
        rewriter
            .rewrite_page(
                &mut page,
                &mut |_| Some("PRENOM1".to_string()),
                &mut report,
            )
            .unwrap();

        let run = &page.drawn[0];
        assert!(run.bbox.x1 <= 50.0 + 30.0 + 1e-3);
        assert!(run.size <= 11.0);
    }

    #[test]
    fn draw_failures_are_recorded_and_skipped() {
        let mut page = MemoryPage::new(vec![span(0, "HUISSOUD", 70.0)]);
        page.fail_draw = true;
        let rewriter = PageRewriter::new();
        let mut report = RewriteReport::default();
        rewriter
            .rewrite_page(&mut page, &mut |_| Some("NOM1".to_string()), &mut report)
            .unwrap();

        assert_eq!(report.replaced, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].reason.starts_with("draw:"));
    }
}
