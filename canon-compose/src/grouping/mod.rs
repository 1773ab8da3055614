//! Grouping handlers
//!
//! A grouping handler turns one raw composition group into the derived
//! groups that composition runs against. Handlers never mutate the input:
//! derived groups hold clones.

mod discriminator;

pub use discriminator::{DerivedGroups, DiscriminatorGroupingHandler};

use crate::handler::Registered;
use crate::preconditions::check_group;
use canon_common::{CompositionGroup, Error, Result};

/// Splits a raw composition group into derived groups
pub trait GroupingHandler: Registered + Send + Sync {
    /// True if this handler knows how to split `group`
    ///
    /// Must not fail: a mismatch means "try another handler".
    fn is_applicable(&self, group: &CompositionGroup) -> bool;

    /// Derived groups, in a deterministic order
    ///
    /// Fails on an empty group or on members of an unexpected type.
    fn group(&self, group: &CompositionGroup) -> Result<Vec<CompositionGroup>>;
}

/// Default handler: the group is used as-is
pub struct PassThroughGroupingHandler;

impl Registered for PassThroughGroupingHandler {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn order(&self) -> i32 {
        i32::MAX
    }
}

impl GroupingHandler for PassThroughGroupingHandler {
    fn is_applicable(&self, group: &CompositionGroup) -> bool {
        !group.is_empty()
    }

    fn group(&self, group: &CompositionGroup) -> Result<Vec<CompositionGroup>> {
        let raw_type = group
            .first_item()
            .map(|item| item.item_type().to_string())
            .ok_or_else(|| Error::InvalidInput("Composition group must contain raw items".to_string()))?;
        check_group(group, &raw_type, self.name())?;
        Ok(vec![group.clone()])
    }
}
