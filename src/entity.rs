//! Entity records: the identifying values a caller wants replaced.
//!
//! Callers supply one [`TierRecord`] per person; each non-empty field expands
//! into one [`Entity`] in a fixed attribute order so that tag numbering is
//! deterministic for a given input.

use serde::{Deserialize, Serialize};

use crate::tags::sanitize_label;

/// Category of an identifying value. The label doubles as the tag prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Name,
    FirstName,
    Address,
    Phone,
    Mobile,
    Email,
    Organization,
    /// Sanitized custom label (letters only, upper-cased).
    Custom(String),
}

impl Category {
    /// Tag prefix for this category ("NOM", "PRENOM", ...).
    pub fn label(&self) -> &str {
        match self {
            Category::Name => "NOM",
            Category::FirstName => "PRENOM",
            Category::Address => "ADRESSE",
            Category::Phone => "TEL",
            Category::Mobile => "PORTABLE",
            Category::Email => "EMAIL",
            Category::Organization => "SOCIETE",
            Category::Custom(label) => label,
        }
    }

    /// Values at or below this length are skipped without error.
    pub fn min_len(&self) -> usize {
        match self {
            Category::Address | Category::Phone | Category::Mobile => 6,
            _ => 2,
        }
    }

    /// Addresses only match the stored value verbatim; everything else is
    /// matched case-insensitively with explicit upper/lower variants.
    pub fn exact_match(&self) -> bool {
        matches!(self, Category::Address)
    }

    /// Phone-like values also match with separators stripped or re-grouped.
    pub fn phone_like(&self) -> bool {
        matches!(self, Category::Phone | Category::Mobile)
    }
}

/// One person's identifying values, as supplied on the wire.
///
/// Absent, empty, or too-short fields are skipped without error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_field_label: Option<String>,
}

/// One identifying fact to redact, expanded from a tier record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub category: Category,
    pub value: String,
    /// 1-based tier number the value belongs to.
    pub owner_index: usize,
}

/// Expand tier records into entities, preserving list order and the fixed
/// per-tier attribute order: name, first name, address, phone, mobile, email,
/// organization, then the custom field.
pub fn expand_tiers(tiers: &[TierRecord]) -> Vec<Entity> {
    let mut entities = Vec::new();
    for (i, tier) in tiers.iter().enumerate() {
        let owner_index = i + 1;
        let mut push = |category: Category, value: &Option<String>| {
            let Some(raw) = value else { return };
            let trimmed = raw.trim();
            if trimmed.len() < category.min_len() {
                log::debug!(
                    "skipping {} value for tier {}: below minimum length",
                    category.label(),
                    owner_index
                );
                return;
            }
            entities.push(Entity {
                category,
                value: trimmed.to_string(),
                owner_index,
            });
        };

        push(Category::Name, &tier.name);
        push(Category::FirstName, &tier.first_name);
        push(Category::Address, &tier.address);
        push(Category::Phone, &tier.phone);
        push(Category::Mobile, &tier.mobile);
        push(Category::Email, &tier.email);
        push(Category::Organization, &tier.organization);

        let label = tier
            .custom_field_label
            .as_deref()
            .map(sanitize_label)
            .unwrap_or_else(|| crate::tags::CUSTOM_FALLBACK_LABEL.to_string());
        push(Category::Custom(label), &tier.custom_field);
    }
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_follows_attribute_order() {
        let tier = TierRecord {
            name: Some("HUISSOUD".into()),
            first_name: Some("Louis".into()),
            phone: Some("04 76 00 00 00".into()),
            email: Some("louis@example.org".into()),
            ..Default::default()
        };
        let entities = expand_tiers(&[tier]);
        let labels: Vec<&str> = entities.iter().map(|e| e.category.label()).collect();
        assert_eq!(labels, ["NOM", "PRENOM", "TEL", "EMAIL"]);
        assert!(entities.iter().all(|e| e.owner_index == 1));
    }

    #[test]
    fn short_values_are_skipped_silently() {
        let tier = TierRecord {
            name: Some("X".into()),          // below 2
            address: Some("12 rue".into()),  // exactly 6, kept
            phone: Some("06 12".into()),     // below 6
            ..Default::default()
        };
        let entities = expand_tiers(&[tier]);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].category, Category::Address);
    }

    #[test]
    fn custom_field_uses_sanitized_label() {
        let tier = TierRecord {
            custom_field: Some("REF-2024-117".into()),
            custom_field_label: Some("n° dossier".into()),
            ..Default::default()
        };
        let entities = expand_tiers(&[tier]);
        assert_eq!(entities[0].category.label(), "NDOSSIER");
    }

    #[test]
    fn custom_field_without_label_defaults_to_perso() {
        let tier = TierRecord {
            custom_field: Some("something secret".into()),
            ..Default::default()
        };
        let entities = expand_tiers(&[tier]);
        assert_eq!(entities[0].category.label(), "PERSO");
    }

    #[test]
    fn tier_records_tolerate_unknown_and_absent_fields() {
        let json = r#"[{"name": "Durand", "unknown_key": 1}, {}]"#;
        let tiers: Vec<TierRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(expand_tiers(&tiers).len(), 1);
    }
}
