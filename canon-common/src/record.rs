//! Data items and composition groups
//!
//! A [`DataItem`] is a loosely-structured record of a named type. Its values
//! live in slots laid out by the declared schema, so items are only created
//! through [`SchemaRegistry`](crate::schema::SchemaRegistry) and only read or
//! written through resolved [`AttributeAccessor`](crate::schema::AttributeAccessor)s.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns true when a value is absent, empty or whitespace-only
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// A raw or canonical item of a declared type
///
/// `Clone` produces an independent copy: blanking an attribute on the clone
/// never changes the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    item_type: String,
    values: Vec<Option<String>>,
}

impl DataItem {
    pub(crate) fn with_slots(item_type: impl Into<String>, slots: usize) -> Self {
        Self {
            item_type: item_type.into(),
            values: vec![None; slots],
        }
    }

    /// Declared type name of this item
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }

    pub(crate) fn set_slot(&mut self, index: usize, value: Option<String>) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

/// Identifies one attribute of a canonical type
///
/// Used for dispatch only: handlers decide applicability from it, data never
/// flows through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalAttributeDefinition {
    /// Canonical item type (e.g., "CanonicalCustomerAddressRel")
    pub canonical_type: String,
    /// Attribute name on the canonical type (e.g., "addressType")
    pub attribute_name: String,
}

impl CanonicalAttributeDefinition {
    pub fn new(canonical_type: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self {
            canonical_type: canonical_type.into(),
            attribute_name: attribute_name.into(),
        }
    }

    /// True if this definition names exactly `canonical_type.attribute_name`
    pub fn matches(&self, canonical_type: &str, attribute_name: &str) -> bool {
        self.canonical_type == canonical_type && self.attribute_name == attribute_name
    }
}

impl fmt::Display for CanonicalAttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.canonical_type, self.attribute_name)
    }
}

/// Raw items considered together for one derivation
///
/// Members are expected to share one identity and one raw type. The
/// grouping and composition handlers validate this; construction does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionGroup {
    /// Ordered raw items
    pub items: Vec<DataItem>,
    /// Canonical attributes this group will be used to populate
    pub attributes: Vec<CanonicalAttributeDefinition>,
}

impl CompositionGroup {
    pub fn new(items: Vec<DataItem>, attributes: Vec<CanonicalAttributeDefinition>) -> Self {
        Self { items, attributes }
    }

    /// New group holding `items` and a copy of this group's attribute definitions
    pub fn derive(&self, items: Vec<DataItem>) -> Self {
        Self {
            items,
            attributes: self.attributes.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn first_item(&self) -> Option<&DataItem> {
        self.items.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   \t\n")));
        assert!(!is_blank(Some("A1")));
        assert!(!is_blank(Some("  A1 ")));
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = DataItem::with_slots("RawCustomer", 2);
        original.set_slot(0, Some("C1".to_string()));

        let mut copy = original.clone();
        copy.set_slot(0, None);

        assert_eq!(original.slot(0), Some("C1"));
        assert_eq!(copy.slot(0), None);
    }

    #[test]
    fn test_set_slot_out_of_range_is_ignored() {
        let mut item = DataItem::with_slots("RawCustomer", 1);
        item.set_slot(5, Some("x".to_string()));
        assert_eq!(item.slot(5), None);
    }

    #[test]
    fn test_derive_keeps_attributes() {
        let attrs = vec![CanonicalAttributeDefinition::new("Canon", "a")];
        let group = CompositionGroup::new(vec![DataItem::with_slots("Raw", 1)], attrs.clone());
        let derived = group.derive(vec![]);
        assert_eq!(derived.attributes, attrs);
        assert!(derived.is_empty());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_attribute_definition_matches() {
        let def = CanonicalAttributeDefinition::new("CanonicalCustomerAddressRel", "addressType");
        assert!(def.matches("CanonicalCustomerAddressRel", "addressType"));
        assert!(!def.matches("CanonicalCustomerAddressRel", "addressId"));
        assert!(!def.matches("CanonicalCustomer", "addressType"));
        assert_eq!(def.to_string(), "CanonicalCustomerAddressRel.addressType");
    }
}
