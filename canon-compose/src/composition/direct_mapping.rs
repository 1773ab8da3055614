//! Direct attribute mapping
//!
//! Default composition for plain attributes: the canonical attribute takes
//! the first non-blank value of one raw attribute. Left unset when no member
//! carries a value.

use super::{first_populated, CompositionHandler};
use crate::handler::Registered;
use crate::preconditions::{check_canonical, check_group};
use canon_common::config::AttributeMapping;
use canon_common::{CanonicalAttributeDefinition, CompositionGroup, DataItem, Result, SchemaRegistry};
use std::sync::Arc;
use tracing::debug;

pub struct DirectMappingCompositionHandler {
    mapping: AttributeMapping,
    registry: Arc<SchemaRegistry>,
    name: String,
}

impl DirectMappingCompositionHandler {
    pub fn new(mapping: AttributeMapping, registry: Arc<SchemaRegistry>) -> Self {
        let name = format!(
            "{}.{}<-{}.{}",
            mapping.canonical_type, mapping.attribute, mapping.raw_type, mapping.source_attribute
        );
        Self {
            mapping,
            registry,
            name,
        }
    }
}

impl Registered for DirectMappingCompositionHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.mapping.order
    }
}

impl CompositionHandler for DirectMappingCompositionHandler {
    fn is_applicable(&self, attribute: &CanonicalAttributeDefinition) -> bool {
        attribute.matches(&self.mapping.canonical_type, &self.mapping.attribute)
    }

    fn compose(
        &self,
        attribute: &CanonicalAttributeDefinition,
        group: &CompositionGroup,
        mut canonical: DataItem,
    ) -> Result<DataItem> {
        check_group(group, &self.mapping.raw_type, &self.name)?;
        check_canonical(&canonical, &self.mapping.canonical_type, &self.name)?;

        let context = format!("compose {}", attribute);
        let source = self
            .registry
            .resolve_for(&self.mapping.raw_type, &self.mapping.source_attribute, &context)?;
        let target = self
            .registry
            .resolve_for(&self.mapping.canonical_type, &self.mapping.attribute, &context)?;

        match first_populated(&group.items, &source)? {
            Some(value) => target.set(&mut canonical, Some(value))?,
            None => debug!("{}: no populated {}", self.name, self.mapping.source_attribute),
        }
        Ok(canonical)
    }
}
