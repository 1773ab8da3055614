//! First-populated candidate composition
//!
//! Writes an identifier/classification pair onto the canonical item:
//! 1. Scan candidates in priority order; the first with a non-blank value on
//!    any member wins, and its label becomes the classification
//! 2. No candidate populated: the group's identity value is the identifier and
//!    the rule's default label is the classification
//!
//! The built-in customer address rule maps every branch to "Home Address".

use super::{first_populated, CompositionHandler};
use crate::handler::Registered;
use crate::preconditions::{check_canonical, check_group};
use canon_common::config::CompositionRule;
use canon_common::{
    AttributeAccessor, CanonicalAttributeDefinition, CompositionGroup, DataItem, Result,
    SchemaRegistry,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Composition handler driven by a [`CompositionRule`]
pub struct FirstPopulatedCompositionHandler {
    rule: CompositionRule,
    registry: Arc<SchemaRegistry>,
    name: String,
}

struct ResolvedAccessors<'r> {
    identity: AttributeAccessor,
    candidates: Vec<(AttributeAccessor, &'r str)>,
    identifier: AttributeAccessor,
    classification: AttributeAccessor,
}

impl FirstPopulatedCompositionHandler {
    pub fn new(rule: CompositionRule, registry: Arc<SchemaRegistry>) -> Self {
        let name = format!("{}-composition", rule.name);
        Self {
            rule,
            registry,
            name,
        }
    }

    /// Resolve every raw and canonical accessor the rule needs
    fn resolve(&self) -> Result<ResolvedAccessors<'_>> {
        let context = format!("compose {}", self.rule.canonical_type);
        let raw = |attr: &str| {
            self.registry
                .resolve_for(&self.rule.raw_type, attr, &context)
        };
        let canonical = |attr: &str| {
            self.registry
                .resolve_for(&self.rule.canonical_type, attr, &context)
        };

        let identity = raw(&self.rule.identity_attribute)?;
        let candidates = self
            .rule
            .candidates
            .iter()
            .map(|c| Ok((raw(&c.attribute)?, c.label.as_str())))
            .collect::<Result<Vec<_>>>()?;

        Ok(ResolvedAccessors {
            identity,
            candidates,
            identifier: canonical(&self.rule.identifier_attribute)?,
            classification: canonical(&self.rule.classification_attribute)?,
        })
    }
}

impl Registered for FirstPopulatedCompositionHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.rule.order
    }
}

impl CompositionHandler for FirstPopulatedCompositionHandler {
    fn is_applicable(&self, attribute: &CanonicalAttributeDefinition) -> bool {
        attribute.matches(&self.rule.canonical_type, &self.rule.target_attribute)
    }

    fn compose(
        &self,
        attribute: &CanonicalAttributeDefinition,
        group: &CompositionGroup,
        mut canonical: DataItem,
    ) -> Result<DataItem> {
        check_group(group, &self.rule.raw_type, &self.name)?;
        check_canonical(&canonical, &self.rule.canonical_type, &self.name)?;
        let accessors = self.resolve()?;

        let identity = first_populated(&group.items, &accessors.identity)?;

        let mut chosen = None;
        for (accessor, label) in &accessors.candidates {
            if let Some(value) = first_populated(&group.items, accessor)? {
                debug!(
                    "{}: {} populated by {}",
                    self.name,
                    attribute,
                    accessor.attribute()
                );
                chosen = Some((Some(value), *label));
                break;
            }
        }

        let (identifier, label) = match chosen {
            Some(found) => found,
            None => {
                if identity.is_none() {
                    warn!(
                        "{}: no candidate and no {} populated, identifier left blank",
                        self.name, self.rule.identity_attribute
                    );
                }
                (identity, self.rule.default_label.as_str())
            }
        };

        accessors.identifier.set(&mut canonical, identifier)?;
        accessors
            .classification
            .set(&mut canonical, Some(label.to_string()))?;
        Ok(canonical)
    }
}
