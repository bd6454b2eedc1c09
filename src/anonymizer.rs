//! Entity matching and tag substitution.
//!
//! An [`AnonymizeSession`] owns the call-scoped allocator and mapping, and
//! compiles every case/punctuation variant of every entity value into a single
//! leftmost-longest Aho-Corasick automaton. One pass over a text buffer plans
//! all replacements at once, so a short value can never clobber an occurrence
//! of a longer one and substitution stays linear in the text length.
//!
//! With no usable entities at all, the session falls back to pattern-only
//! detection of phone- and email-shaped tokens, tagged `TEL{n}` / `EMAIL{n}`
//! in first-seen order.

use aho_corasick::{AhoCorasick, MatchKind};
use lazy_static::lazy_static;
use regex::Regex;

use crate::entity::{expand_tiers, Entity, TierRecord};
use crate::mapping::Mapping;
use crate::tags::TagAllocator;

lazy_static! {
    static ref PHONE_RE: Regex =
        Regex::new(r"\b0[1-9](?:[ .-]?\d{2}){4}\b").expect("invalid regex");
    static ref EMAIL_RE: Regex =
        Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("invalid regex");
}

/// Tuning knobs for an anonymization session.
#[derive(Debug, Clone)]
pub struct AnonymizeOptions {
    /// Detect phone/email shapes when no usable entities are supplied.
    pub pattern_fallback: bool,
}

impl Default for AnonymizeOptions {
    fn default() -> Self {
        Self {
            pattern_fallback: true,
        }
    }
}

/// A planned replacement within one text buffer, in character offsets.
///
/// Edits are sorted ascending and never overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// Apply non-overlapping, ascending edits (character offsets) to a string.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> String {
    if edits.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut pending = edits.iter().peekable();
    for (ci, ch) in text.chars().enumerate() {
        if let Some(edit) = pending.peek() {
            if ci == edit.start {
                out.push_str(&edit.replacement);
            }
            if ci >= edit.start && ci < edit.end {
                if ci + 1 == edit.end {
                    pending.next();
                }
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Convert byte-offset matches into character-offset edits.
fn to_char_edits(text: &str, raw: Vec<(usize, usize, String)>) -> Vec<TextEdit> {
    if raw.is_empty() {
        return Vec::new();
    }
    let mut byte_to_char = vec![0usize; text.len() + 1];
    let mut count = 0usize;
    for (ci, (bi, ch)) in text.char_indices().enumerate() {
        for b in bi..bi + ch.len_utf8() {
            byte_to_char[b] = ci;
        }
        count = ci + 1;
    }
    byte_to_char[text.len()] = count;

    let mut edits: Vec<TextEdit> = raw
        .into_iter()
        .filter(|(s, e, _)| text.is_char_boundary(*s) && text.is_char_boundary(*e))
        .map(|(s, e, replacement)| TextEdit {
            start: byte_to_char[s],
            end: byte_to_char[e],
            replacement,
        })
        .collect();
    edits.sort_by_key(|e| e.start);
    edits
}

/// One entity value registered for matching.
#[derive(Debug)]
struct MatchEntry {
    tag: String,
    canonical: String,
    /// Reject matches whose text differs from the canonical value.
    exact: bool,
    phone_like: bool,
    hits: usize,
}

/// Additional literal forms a phone-like value should match under: separators
/// stripped, and (for plain ten-digit numbers) digit pairs re-joined with the
/// common separators.
fn phone_variants(canonical: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let stripped: String = canonical
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();
    if stripped != canonical {
        variants.push(stripped.clone());
    }
    if stripped.len() == 10 && stripped.chars().all(|c| c.is_ascii_digit()) {
        let pairs: Vec<&str> = (0..5).map(|i| &stripped[i * 2..i * 2 + 2]).collect();
        for sep in [" ", ".", "-"] {
            let grouped = pairs.join(sep);
            if grouped != canonical {
                variants.push(grouped);
            }
        }
    }
    variants
}

/// State for one anonymization call: allocator, mapping, and the compiled
/// matcher over all entity value variants.
pub struct AnonymizeSession {
    options: AnonymizeOptions,
    allocator: TagAllocator,
    mapping: Mapping,
    entries: Vec<MatchEntry>,
    /// Automaton pattern index -> entry index.
    pattern_entry: Vec<usize>,
    automaton: Option<AhoCorasick>,
}

impl AnonymizeSession {
    /// Build a session from wire-format tier records.
    pub fn new(tiers: &[TierRecord], options: AnonymizeOptions) -> Self {
        Self::from_entities(expand_tiers(tiers), options)
    }

    /// Build a session from already-expanded entities, in processing order.
    ///
    /// Every entity allocates its tag and lands in the mapping here, before
    /// any text has been seen; an entity that never matches keeps its slot.
    pub fn from_entities(entities: Vec<Entity>, options: AnonymizeOptions) -> Self {
        let mut session = Self {
            options,
            allocator: TagAllocator::new(),
            mapping: Mapping::new(),
            entries: Vec::new(),
            pattern_entry: Vec::new(),
            automaton: None,
        };
        for entity in entities {
            session.register(entity);
        }
        session.build_automaton();
        session
    }

    fn register(&mut self, entity: Entity) {
        let tag = self.allocator.allocate(entity.category.label());
        log::debug!(
            "match: {} (tier {}) -> {}",
            entity.category.label(),
            entity.owner_index,
            tag
        );
        self.mapping.insert(tag.clone(), entity.value.clone());
        self.entries.push(MatchEntry {
            tag,
            canonical: entity.value,
            exact: entity.category.exact_match(),
            phone_like: entity.category.phone_like(),
            hits: 0,
        });
    }

    fn build_automaton(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        let mut patterns: Vec<String> = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let mut variants = vec![entry.canonical.clone()];
            if !entry.exact {
                let upper = entry.canonical.to_uppercase();
                let lower = entry.canonical.to_lowercase();
                if upper != entry.canonical {
                    variants.push(upper);
                }
                if lower != entry.canonical {
                    variants.push(lower);
                }
            }
            if entry.phone_like {
                variants.extend(phone_variants(&entry.canonical));
            }
            variants.dedup();
            for variant in variants {
                patterns.push(variant);
                self.pattern_entry.push(i);
            }
        }
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .ascii_case_insensitive(true)
            .build(&patterns)
            .expect("failed to build match automaton");
        self.automaton = Some(automaton);
    }

    /// The mapping built so far.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Tags whose value never matched any processed text.
    pub fn unmatched_tags(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.hits == 0)
            .map(|e| e.tag.as_str())
            .collect()
    }

    /// Consume the session, warning about tags that never matched, and hand
    /// the mapping back to the caller.
    pub fn into_mapping(self) -> Mapping {
        for entry in &self.entries {
            if entry.hits == 0 {
                log::warn!(
                    "match: {} allocated for \"{}\" but no occurrence was found",
                    entry.tag,
                    entry.canonical
                );
            }
        }
        self.mapping
    }

    /// Plan the replacements for one text buffer.
    pub fn plan(&mut self, text: &str) -> Vec<TextEdit> {
        if self.automaton.is_some() {
            self.plan_entities(text)
        } else if self.options.pattern_fallback {
            self.plan_patterns(text)
        } else {
            Vec::new()
        }
    }

    /// Replace every planned occurrence and return the new buffer.
    pub fn apply(&mut self, text: &str) -> String {
        let edits = self.plan(text);
        apply_edits(text, &edits)
    }

    fn plan_entities(&mut self, text: &str) -> Vec<TextEdit> {
        let mut raw: Vec<(usize, usize, usize)> = Vec::new();
        {
            let ac = self.automaton.as_ref().expect("automaton built");
            for m in ac.find_iter(text) {
                raw.push((m.start(), m.end(), self.pattern_entry[m.pattern().as_usize()]));
            }
        }
        let mut edits = Vec::with_capacity(raw.len());
        for (start, end, entry_idx) in raw {
            if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                continue;
            }
            let entry = &mut self.entries[entry_idx];
            if entry.exact && &text[start..end] != entry.canonical {
                continue;
            }
            entry.hits += 1;
            edits.push((start, end, entry.tag.clone()));
        }
        to_char_edits(text, edits)
    }

    /// Pattern-only mode: tag phone- and email-shaped tokens in document
    /// order, reusing the tag for values already in the mapping.
    fn plan_patterns(&mut self, text: &str) -> Vec<TextEdit> {
        let mut found: Vec<(usize, usize, &'static str)> = PHONE_RE
            .find_iter(text)
            .map(|m| (m.start(), m.end(), "TEL"))
            .chain(
                EMAIL_RE
                    .find_iter(text)
                    .map(|m| (m.start(), m.end(), "EMAIL")),
            )
            .collect();
        found.sort_by_key(|f| f.0);

        let mut raw: Vec<(usize, usize, String)> = Vec::new();
        let mut last_end = 0usize;
        for (start, end, label) in found {
            if start < last_end {
                continue;
            }
            last_end = end;
            let value = &text[start..end];
            let tag = match self.mapping.tag_for_value(value) {
                Some(tag) => tag.to_string(),
                None => {
                    let tag = self.allocator.allocate(label);
                    log::debug!("match: pattern fallback {value:?} -> {tag}");
                    self.mapping.insert(tag.clone(), value.to_string());
                    tag
                }
            };
            raw.push((start, end, tag));
        }
        to_char_edits(text, raw)
    }
}
