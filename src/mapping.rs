//! Insertion-ordered, bidirectional tag <-> original-value store.
//!
//! The mapping is the single unit of state shared between the anonymize and
//! deanonymize phases. On the wire it is a flat JSON object of
//! `{tag: original_value}` pairs; insertion order is preserved on write but
//! never relied upon on read (the restoration engine re-sorts by tag length).

use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pairs: Vec<(String, String)>,
    by_tag: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a (tag, value) pair. Tags are unique and append-only; a
    /// duplicate tag is ignored with a warning rather than overwriting.
    pub fn insert(&mut self, tag: String, value: String) {
        if self.by_tag.contains_key(&tag) {
            log::warn!("mapping already contains tag {tag}, ignoring");
            return;
        }
        self.by_tag.insert(tag.clone(), self.pairs.len());
        self.pairs.push((tag, value));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    pub fn value_for_tag(&self, tag: &str) -> Option<&str> {
        self.by_tag
            .get(tag)
            .map(|&i| self.pairs[i].1.as_str())
    }

    /// First tag registered for a value. Values may repeat across entities;
    /// tag identity, not value identity, is the join key.
    pub fn tag_for_value(&self, value: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(_, v)| v == value)
            .map(|(t, _)| t.as_str())
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.tag_for_value(value).is_some()
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut mapping = Self::new();
        for (tag, value) in pairs {
            mapping.insert(tag.into(), value.into());
        }
        mapping
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.pairs == other.pairs
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (tag, value) in &self.pairs {
            map.serialize_entry(tag, value)?;
        }
        map.end()
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a flat object of tag to original-value pairs")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Mapping, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((tag, value)) = access.next_entry::<String, String>()? {
            mapping.insert(tag, value);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Mapping, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mapping = Mapping::from_pairs([("NOM1", "Durand"), ("PRENOM1", "Anne"), ("NOM2", "Li")]);
        let tags: Vec<&str> = mapping.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, ["NOM1", "PRENOM1", "NOM2"]);
    }

    #[test]
    fn duplicate_tags_are_ignored() {
        let mut mapping = Mapping::new();
        mapping.insert("NOM1".into(), "Durand".into());
        mapping.insert("NOM1".into(), "Other".into());
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.value_for_tag("NOM1"), Some("Durand"));
    }

    #[test]
    fn repeated_values_keep_distinct_tags() {
        let mapping = Mapping::from_pairs([("NOM1", "Durand"), ("NOM2", "Durand")]);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.tag_for_value("Durand"), Some("NOM1"));
    }

    #[test]
    fn wire_format_is_a_flat_object() {
        let mapping = Mapping::from_pairs([("NOM1", "HUISSOUD"), ("ADRESSE1", "244 Montée du Mollard")]);
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(
            json,
            r#"{"NOM1":"HUISSOUD","ADRESSE1":"244 Montée du Mollard"}"#
        );

        let back: Mapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mapping);
    }

    #[test]
    fn wire_format_accepts_any_order() {
        let json = r#"{"NOM10":"b","NOM1":"a"}"#;
        let mapping: Mapping = serde_json::from_str(json).unwrap();
        assert_eq!(mapping.value_for_tag("NOM1"), Some("a"));
        assert_eq!(mapping.value_for_tag("NOM10"), Some("b"));
    }
}
