//! Discriminator grouping
//!
//! Splits a raw group on optional "discriminator" attributes so each derived
//! group exposes at most one of them:
//!
//! - the base group: every discriminator blanked (default case), always first
//! - one group per discriminator populated on any member, with every other
//!   discriminator blanked, in the rule's grouping order
//!
//! Example with grouping order `[shipTo, billTo]` and a single member
//! `{integrationKey: C1, billTo: A1, shipTo: S1}`:
//!
//! | group | billTo | shipTo |
//! |-------|--------|--------|
//! | base  | -      | -      |
//! | shipTo| -      | S1     |
//! | billTo| A1     | -      |

use super::GroupingHandler;
use crate::handler::Registered;
use crate::preconditions::check_group;
use canon_common::config::CompositionRule;
use canon_common::{is_blank, AttributeAccessor, CompositionGroup, Result, SchemaRegistry};
use std::sync::Arc;
use tracing::debug;

/// Grouping handler driven by a [`CompositionRule`]'s candidate attributes
pub struct DiscriminatorGroupingHandler {
    rule: CompositionRule,
    registry: Arc<SchemaRegistry>,
    name: String,
}

impl DiscriminatorGroupingHandler {
    pub fn new(rule: CompositionRule, registry: Arc<SchemaRegistry>) -> Self {
        let name = format!("{}-grouping", rule.name);
        Self {
            rule,
            registry,
            name,
        }
    }

    /// Lazily produce the derived groups of `group`
    ///
    /// Validation and accessor resolution happen here; each derived group is
    /// only cloned when the iterator reaches it.
    pub fn derived_groups<'a>(&self, group: &'a CompositionGroup) -> Result<DerivedGroups<'a>> {
        check_group(group, &self.rule.raw_type, &self.name)?;
        let discriminators = self.resolve_discriminators()?;

        let mut plan = vec![None];
        for (index, accessor) in discriminators.iter().enumerate() {
            if has_populated(group, accessor)? {
                plan.push(Some(index));
            }
        }

        debug!(
            "{}: {} derived groups for {} items",
            self.name,
            plan.len(),
            group.len()
        );

        Ok(DerivedGroups {
            source: group,
            discriminators,
            plan: plan.into_iter(),
        })
    }

    fn resolve_discriminators(&self) -> Result<Vec<AttributeAccessor>> {
        let context = format!("group {}", self.rule.canonical_type);
        self.rule
            .grouping_discriminators()
            .into_iter()
            .map(|attr| self.registry.resolve_for(&self.rule.raw_type, attr, &context))
            .collect()
    }
}

impl Registered for DiscriminatorGroupingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.rule.order
    }
}

impl GroupingHandler for DiscriminatorGroupingHandler {
    fn is_applicable(&self, group: &CompositionGroup) -> bool {
        let resolvable = self
            .rule
            .discriminators()
            .all(|attr| self.registry.resolve(&self.rule.raw_type, attr).is_some());
        if !resolvable {
            return false;
        }

        match group.first_item() {
            Some(item) if item.item_type() == self.rule.raw_type => {}
            _ => return false,
        }

        group
            .attributes
            .iter()
            .all(|def| def.canonical_type == self.rule.canonical_type)
    }

    fn group(&self, group: &CompositionGroup) -> Result<Vec<CompositionGroup>> {
        self.derived_groups(group)?.collect()
    }
}

fn has_populated(group: &CompositionGroup, accessor: &AttributeAccessor) -> Result<bool> {
    for item in &group.items {
        if !is_blank(accessor.get(item)?) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Iterator over the derived groups of one source group
///
/// Yields the base group first, then one group per populated discriminator
/// in grouping order.
pub struct DerivedGroups<'a> {
    source: &'a CompositionGroup,
    discriminators: Vec<AttributeAccessor>,
    plan: std::vec::IntoIter<Option<usize>>,
}

impl DerivedGroups<'_> {
    /// Clone every member, blanking all discriminators except `keep`
    fn build(&self, keep: Option<usize>) -> Result<CompositionGroup> {
        let mut items = Vec::with_capacity(self.source.len());
        for item in &self.source.items {
            let mut copy = item.clone();
            for (index, accessor) in self.discriminators.iter().enumerate() {
                if Some(index) != keep {
                    accessor.clear(&mut copy)?;
                }
            }
            items.push(copy);
        }
        Ok(self.source.derive(items))
    }
}

impl Iterator for DerivedGroups<'_> {
    type Item = Result<CompositionGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        let keep = self.plan.next()?;
        Some(self.build(keep))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.plan.size_hint()
    }
}

impl ExactSizeIterator for DerivedGroups<'_> {}
