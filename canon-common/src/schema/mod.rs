//! Declared item schemas and attribute resolution
//!
//! Item types are declared once at startup, either statically through
//! [`ItemSchema`] or from configuration through [`ItemDeclaration`]. The
//! [`SchemaRegistry`] built from those declarations maps
//! `(item_type, attribute_name)` to an [`AttributeAccessor`] that reads and
//! writes that attribute on any item of the type.
//!
//! # Usage
//!
//! ```rust
//! use canon_common::schema::{SchemaRegistry, RawCustomerSchema};
//!
//! let registry = SchemaRegistry::builder()
//!     .register::<RawCustomerSchema>()
//!     .build()
//!     .unwrap();
//!
//! let bill_to = registry.resolve("RawCustomer", "billTo").unwrap();
//! let mut customer = registry.create_item("RawCustomer").unwrap();
//! bill_to.set(&mut customer, Some("A1".to_string())).unwrap();
//! assert_eq!(bill_to.get(&customer).unwrap(), Some("A1"));
//!
//! assert!(registry.resolve("RawCustomer", "missing").is_none());
//! ```

pub mod item_schemas;

pub use item_schemas::*;

use crate::record::{CanonicalAttributeDefinition, DataItem};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Whether an item type is source data or composition output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Raw,
    Canonical,
}

/// Attribute declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Attribute name
    pub name: String,
    /// Part of the item's identity
    #[serde(default)]
    pub primary_key: bool,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AttributeDefinition {
    /// Create new attribute definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
            description: None,
        }
    }

    /// Mark attribute as part of the identity
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Set description
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Declares the expected shape of an item type
pub trait ItemSchema {
    /// Item type name
    fn item_type() -> &'static str;

    /// Raw or canonical
    fn kind() -> ItemKind;

    /// Attribute definitions (order fixes the slot layout)
    fn attributes() -> Vec<AttributeDefinition>;

    /// Declaration equivalent to this schema
    fn declaration() -> ItemDeclaration {
        ItemDeclaration {
            item_type: Self::item_type().to_string(),
            kind: Self::kind(),
            attributes: Self::attributes(),
        }
    }
}

/// Item type declaration as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDeclaration {
    pub item_type: String,
    pub kind: ItemKind,
    pub attributes: Vec<AttributeDefinition>,
}

/// Resolved get/set capability for one attribute of one item type
///
/// Cheap to clone; resolve once and reuse across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeAccessor {
    item_type: Arc<str>,
    attribute: Arc<str>,
    slot: usize,
}

impl AttributeAccessor {
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Read the attribute value
    ///
    /// Fails if `item` is not of this accessor's type.
    pub fn get<'a>(&self, item: &'a DataItem) -> Result<Option<&'a str>> {
        self.check_type(item)?;
        Ok(item.slot(self.slot))
    }

    /// Write the attribute value (`None` blanks it)
    pub fn set(&self, item: &mut DataItem, value: Option<String>) -> Result<()> {
        self.check_type(item)?;
        item.set_slot(self.slot, value);
        Ok(())
    }

    /// Blank the attribute
    pub fn clear(&self, item: &mut DataItem) -> Result<()> {
        self.set(item, None)
    }

    fn check_type(&self, item: &DataItem) -> Result<()> {
        if item.item_type() != &*self.item_type {
            return Err(Error::InvalidInput(format!(
                "accessor {}.{} cannot be applied to a {} item",
                self.item_type,
                self.attribute,
                item.item_type()
            )));
        }
        Ok(())
    }
}

struct ItemMetadata {
    declaration: ItemDeclaration,
    accessors: HashMap<String, AttributeAccessor>,
}

impl ItemMetadata {
    fn from_declaration(declaration: ItemDeclaration) -> Self {
        let item_type: Arc<str> = Arc::from(declaration.item_type.as_str());
        let accessors = declaration
            .attributes
            .iter()
            .enumerate()
            .map(|(slot, attr)| {
                let accessor = AttributeAccessor {
                    item_type: Arc::clone(&item_type),
                    attribute: Arc::from(attr.name.as_str()),
                    slot,
                };
                (attr.name.clone(), accessor)
            })
            .collect();

        Self {
            declaration,
            accessors,
        }
    }
}

/// Collects item declarations and validates them into a [`SchemaRegistry`]
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    declarations: Vec<ItemDeclaration>,
}

impl SchemaRegistryBuilder {
    /// Add a statically declared item type
    pub fn register<S: ItemSchema>(mut self) -> Self {
        self.declarations.push(S::declaration());
        self
    }

    /// Add an item type declared at run time
    pub fn declare(mut self, declaration: ItemDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }

    /// Add several run-time declarations
    pub fn declare_all(mut self, declarations: impl IntoIterator<Item = ItemDeclaration>) -> Self {
        self.declarations.extend(declarations);
        self
    }

    /// Validate declarations and build the registry
    ///
    /// Rejects duplicate item types, duplicate attribute names within a type
    /// and blank names.
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut items = HashMap::new();

        for declaration in self.declarations {
            if declaration.item_type.trim().is_empty() {
                return Err(Error::Config("item type name cannot be blank".to_string()));
            }

            let mut seen = HashSet::new();
            for attr in &declaration.attributes {
                if attr.name.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "{} declares an attribute with a blank name",
                        declaration.item_type
                    )));
                }
                if !seen.insert(attr.name.as_str()) {
                    return Err(Error::Config(format!(
                        "{} declares attribute {} more than once",
                        declaration.item_type, attr.name
                    )));
                }
            }

            if items.contains_key(&declaration.item_type) {
                return Err(Error::Config(format!(
                    "item type {} is declared more than once",
                    declaration.item_type
                )));
            }

            debug!(
                "Declared {:?} item type {} with {} attributes",
                declaration.kind,
                declaration.item_type,
                declaration.attributes.len()
            );
            items.insert(
                declaration.item_type.clone(),
                ItemMetadata::from_declaration(declaration),
            );
        }

        info!("Schema registry built with {} item types", items.len());
        Ok(SchemaRegistry { items })
    }
}

/// Read-only registry of declared item types and their attribute accessors
///
/// Built once at startup. Accessors are created during the build, so the
/// registry is also the accessor cache and is safe to share across threads.
pub struct SchemaRegistry {
    items: HashMap<String, ItemMetadata>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Resolve an attribute accessor, `None` if the type or attribute is not declared
    pub fn resolve(&self, item_type: &str, attribute: &str) -> Option<AttributeAccessor> {
        self.items
            .get(item_type)?
            .accessors
            .get(attribute)
            .cloned()
    }

    /// Resolve an attribute accessor that the caller cannot work without
    ///
    /// `context` names the operation (e.g., "compose CanonicalCustomerAddressRel")
    /// and appears in the error.
    pub fn resolve_for(
        &self,
        item_type: &str,
        attribute: &str,
        context: &str,
    ) -> Result<AttributeAccessor> {
        self.resolve(item_type, attribute)
            .ok_or_else(|| Error::SchemaMismatch {
                item_type: item_type.to_string(),
                attribute: attribute.to_string(),
                context: context.to_string(),
            })
    }

    pub fn contains(&self, item_type: &str) -> bool {
        self.items.contains_key(item_type)
    }

    pub fn declaration(&self, item_type: &str) -> Option<&ItemDeclaration> {
        self.items.get(item_type).map(|m| &m.declaration)
    }

    /// Declared item type names, sorted
    pub fn item_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.items.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Create an item of `item_type` with every attribute blank
    pub fn create_item(&self, item_type: &str) -> Result<DataItem> {
        let metadata = self.metadata(item_type)?;
        Ok(DataItem::with_slots(
            item_type,
            metadata.declaration.attributes.len(),
        ))
    }

    /// Create an item from attribute name/value pairs
    ///
    /// Every name must be declared for `item_type`.
    pub fn item_from_values(
        &self,
        item_type: &str,
        values: &BTreeMap<String, Option<String>>,
    ) -> Result<DataItem> {
        let mut item = self.create_item(item_type)?;
        for (name, value) in values {
            let accessor = self.resolve_for(item_type, name, "load item")?;
            accessor.set(&mut item, value.clone())?;
        }
        Ok(item)
    }

    /// Attribute name/value pairs of an item
    pub fn item_values(&self, item: &DataItem) -> Result<BTreeMap<String, Option<String>>> {
        let metadata = self.metadata(item.item_type())?;
        let mut values = BTreeMap::new();
        for attr in &metadata.declaration.attributes {
            let value = metadata.accessors[&attr.name].get(item)?;
            values.insert(attr.name.clone(), value.map(str::to_string));
        }
        Ok(values)
    }

    /// One attribute definition per declared attribute of a canonical type
    pub fn canonical_attributes(
        &self,
        canonical_type: &str,
    ) -> Result<Vec<CanonicalAttributeDefinition>> {
        let metadata = self.metadata(canonical_type)?;
        if metadata.declaration.kind != ItemKind::Canonical {
            return Err(Error::InvalidInput(format!(
                "{} is not a canonical item type",
                canonical_type
            )));
        }
        Ok(metadata
            .declaration
            .attributes
            .iter()
            .map(|attr| CanonicalAttributeDefinition::new(canonical_type, attr.name.clone()))
            .collect())
    }

    fn metadata(&self, item_type: &str) -> Result<&ItemMetadata> {
        self.items
            .get(item_type)
            .ok_or_else(|| Error::UnknownItemType(item_type.to_string()))
    }
}
