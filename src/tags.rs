//! Tag allocation.
//!
//! Tags are `{CATEGORY}{n}` strings ("NOM1", "TEL2", ...). Counters live in a
//! [`TagAllocator`] owned by the anonymization session, never in process
//! globals, so independent documents can be processed concurrently.

use std::collections::HashMap;

/// Label used when a custom category sanitizes down to nothing.
pub const CUSTOM_FALLBACK_LABEL: &str = "PERSO";

/// Strip everything but letters from a custom category label and upper-case
/// the rest. An empty result falls back to [`CUSTOM_FALLBACK_LABEL`].
pub fn sanitize_label(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect();
    if cleaned.is_empty() {
        CUSTOM_FALLBACK_LABEL.to_string()
    } else {
        cleaned
    }
}

/// Call-scoped tag counter state.
///
/// Counters are monotonic per category: a slot is consumed even when the
/// caller ends up finding no match for the resulting tag, so tags are never
/// reused within one run.
#[derive(Debug, Clone, Default)]
pub struct TagAllocator {
    counters: HashMap<String, u32>,
}

impl TagAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next tag for a category label: "NOM" -> "NOM1", "NOM2", ...
    pub fn allocate(&mut self, label: &str) -> String {
        let n = self.counters.entry(label.to_string()).or_insert(0);
        *n += 1;
        format!("{}{}", label, n)
    }

    /// How many tags have been handed out for a label so far.
    pub fn count(&self, label: &str) -> u32 {
        self.counters.get(label).copied().unwrap_or(0)
    }
}
