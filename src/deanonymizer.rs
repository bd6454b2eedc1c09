//! Tag restoration.
//!
//! Tags are restored longest-first so that `NOM1` can never partially match
//! an occurrence of `NOM10`. Each tag is tried with word boundaries first;
//! when that finds nothing, a bare substring replacement is the last resort —
//! an accepted partial-match risk, not a silently safe path. Tags with no
//! occurrence at all are left alone.

use regex::Regex;

use crate::anonymizer::{apply_edits, TextEdit};
use crate::mapping::Mapping;

struct TagRule {
    tag: String,
    value: String,
    boundary: Regex,
}

/// Restores original values from a mapping. Compiled once, reusable across
/// any number of buffers.
pub struct Deanonymizer {
    rules: Vec<TagRule>,
}

impl Deanonymizer {
    pub fn new(mapping: &Mapping) -> Self {
        let mut rules: Vec<TagRule> = mapping
            .iter()
            .map(|(tag, value)| TagRule {
                boundary: Regex::new(&format!(r"\b{}\b", regex::escape(tag)))
                    .expect("invalid regex"),
                tag: tag.to_string(),
                value: value.to_string(),
            })
            .collect();
        // Longest tag first; ties broken lexically for determinism.
        rules.sort_by(|a, b| b.tag.len().cmp(&a.tag.len()).then(a.tag.cmp(&b.tag)));
        Self { rules }
    }

    /// Restore every tag occurrence in one buffer.
    pub fn restore(&self, text: &str) -> String {
        apply_edits(text, &self.plan(text))
    }

    /// Plan the restorations for one buffer without applying them.
    pub fn plan(&self, text: &str) -> Vec<TextEdit> {
        let mut taken: Vec<(usize, usize)> = Vec::new();
        let mut raw: Vec<(usize, usize, String)> = Vec::new();

        for rule in &self.rules {
            let bounded: Vec<(usize, usize)> = rule
                .boundary
                .find_iter(text)
                .map(|m| (m.start(), m.end()))
                .collect();
            let candidates: Vec<(usize, usize)> = if bounded.is_empty() {
                let fallback: Vec<(usize, usize)> = text
                    .match_indices(rule.tag.as_str())
                    .map(|(s, _)| (s, s + rule.tag.len()))
                    .collect();
                if !fallback.is_empty() {
                    log::debug!(
                        "restore: {} has no word-boundary occurrence, using substring fallback",
                        rule.tag
                    );
                }
                fallback
            } else {
                bounded
            };

            for (start, end) in candidates {
                if overlaps(&taken, start, end) {
                    continue;
                }
                taken.push((start, end));
                raw.push((start, end, rule.value.clone()));
            }
        }

        to_edits(text, raw)
    }

    /// Replacement closure for page rewriting: `None` when nothing changed.
    pub fn span_transform(&self) -> impl Fn(&str) -> Option<String> + '_ {
        move |text| {
            let restored = self.restore(text);
            (restored != text).then_some(restored)
        }
    }
}

fn overlaps(taken: &[(usize, usize)], start: usize, end: usize) -> bool {
    taken.iter().any(|&(s, e)| start < e && end > s)
}

fn to_edits(text: &str, mut raw: Vec<(usize, usize, String)>) -> Vec<TextEdit> {
    raw.sort_by_key(|r| r.0);
    // Byte offsets -> char offsets; matches cover whole tags, so offsets
    // always land on char boundaries.
    let mut edits = Vec::with_capacity(raw.len());
    let mut char_of_byte = vec![0usize; text.len() + 1];
    let mut chars = 0usize;
    for (ci, (bi, ch)) in text.char_indices().enumerate() {
        for b in bi..bi + ch.len_utf8() {
            char_of_byte[b] = ci;
        }
        chars = ci + 1;
    }
    char_of_byte[text.len()] = chars;
    for (start, end, replacement) in raw {
        edits.push(TextEdit {
            start: char_of_byte[start],
            end: char_of_byte[end],
            replacement,
        });
    }
    edits
}
