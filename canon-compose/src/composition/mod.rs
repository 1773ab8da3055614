//! Composition handlers
//!
//! A composition handler fills one or more canonical attributes from a
//! derived group. Handlers resolve every accessor and compute every value
//! before writing, so a failed call leaves no partial output.

mod direct_mapping;
mod first_populated;

pub use direct_mapping::DirectMappingCompositionHandler;
pub use first_populated::FirstPopulatedCompositionHandler;

use crate::handler::Registered;
use canon_common::{is_blank, AttributeAccessor, CanonicalAttributeDefinition, CompositionGroup, DataItem, Result};

/// Populates canonical attributes from a composition group
pub trait CompositionHandler: Registered + Send + Sync {
    /// True if this handler populates `attribute`
    fn is_applicable(&self, attribute: &CanonicalAttributeDefinition) -> bool;

    /// Write the composed value(s) onto `canonical` and return it
    fn compose(
        &self,
        attribute: &CanonicalAttributeDefinition,
        group: &CompositionGroup,
        canonical: DataItem,
    ) -> Result<DataItem>;
}

/// First non-blank value of `accessor` across `items`, in member order
pub(crate) fn first_populated(items: &[DataItem], accessor: &AttributeAccessor) -> Result<Option<String>> {
    for item in items {
        let value = accessor.get(item)?;
        if !is_blank(value) {
            return Ok(value.map(str::to_string));
        }
    }
    Ok(None)
}
