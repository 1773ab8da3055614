//! Input checks shared by grouping and composition handlers

use canon_common::{CompositionGroup, DataItem, Error, Result};

/// Group must be non-empty and every member must be a `raw_type` item
pub(crate) fn check_group(group: &CompositionGroup, raw_type: &str, handler: &str) -> Result<()> {
    if group.is_empty() {
        return Err(Error::InvalidInput(format!(
            "{} requires a composition group containing {} items, got an empty group",
            handler, raw_type
        )));
    }

    if let Some(item) = group.items.iter().find(|i| i.item_type() != raw_type) {
        return Err(Error::InvalidInput(format!(
            "{} must have a composition group containing {} items, found {}",
            handler,
            raw_type,
            item.item_type()
        )));
    }
    Ok(())
}

/// Canonical item must be of the type the handler populates
pub(crate) fn check_canonical(canonical: &DataItem, canonical_type: &str, handler: &str) -> Result<()> {
    if canonical.item_type() != canonical_type {
        return Err(Error::InvalidInput(format!(
            "{} populates {} items, got {}",
            handler,
            canonical_type,
            canonical.item_type()
        )));
    }
    Ok(())
}
