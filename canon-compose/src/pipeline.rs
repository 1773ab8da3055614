//! Reference orchestrator
//!
//! Builds priority-ordered grouping and composition chains from
//! configuration and drives them:
//! 1. Partition raw items into one composition group per identity
//! 2. Split each group with the first applicable grouping handler
//! 3. For each derived group, create a canonical item and compose every
//!    attribute definition with the first applicable composition handler
//!
//! Groups are independent units of work; a `Pipeline` can be shared across
//! threads.

use crate::composition::{
    CompositionHandler, DirectMappingCompositionHandler, FirstPopulatedCompositionHandler,
};
use crate::grouping::{DiscriminatorGroupingHandler, GroupingHandler, PassThroughGroupingHandler};
use crate::handler::HandlerChain;
use canon_common::config::{AttributeMapping, ComposeConfig, CompositionRule};
use canon_common::schema::ItemKind;
use canon_common::{is_blank, CompositionGroup, DataItem, Error, Result, SchemaRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Pipeline {
    registry: Arc<SchemaRegistry>,
    grouping: HandlerChain<dyn GroupingHandler>,
    composition: HandlerChain<dyn CompositionHandler>,
}

impl Pipeline {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        grouping: Vec<Box<dyn GroupingHandler>>,
        composition: Vec<Box<dyn CompositionHandler>>,
    ) -> Self {
        Self {
            registry,
            grouping: HandlerChain::new(grouping),
            composition: HandlerChain::new(composition),
        }
    }

    /// Build handlers for every configured rule and mapping
    ///
    /// Every attribute a rule or mapping names must resolve; a mismatch
    /// between configuration and schema fails here rather than mid-batch.
    pub fn from_config(config: &ComposeConfig, registry: Arc<SchemaRegistry>) -> Result<Self> {
        let mut grouping: Vec<Box<dyn GroupingHandler>> = Vec::new();
        let mut composition: Vec<Box<dyn CompositionHandler>> = Vec::new();

        for rule in &config.rules {
            rule.validate()?;
            verify_rule(&registry, rule)?;
            grouping.push(Box::new(DiscriminatorGroupingHandler::new(
                rule.clone(),
                Arc::clone(&registry),
            )));
            composition.push(Box::new(FirstPopulatedCompositionHandler::new(
                rule.clone(),
                Arc::clone(&registry),
            )));
        }

        for mapping in &config.mappings {
            verify_mapping(&registry, mapping)?;
            composition.push(Box::new(DirectMappingCompositionHandler::new(
                mapping.clone(),
                Arc::clone(&registry),
            )));
        }

        grouping.push(Box::new(PassThroughGroupingHandler));

        let pipeline = Self::new(registry, grouping, composition);
        info!(
            "Pipeline ready: grouping {:?}, composition {:?}",
            pipeline.grouping.names(),
            pipeline.composition.names()
        );
        Ok(pipeline)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Grouping handler names in priority order
    pub fn grouping_handlers(&self) -> Vec<&str> {
        self.grouping.names()
    }

    /// Composition handler names in priority order
    pub fn composition_handlers(&self) -> Vec<&str> {
        self.composition.names()
    }

    /// Split raw items into one group per identity, in first-seen order
    ///
    /// Identity is the tuple of the raw type's primary-key attributes. Every
    /// group is attached to all attributes of `canonical_type`.
    pub fn partition(
        &self,
        raw_type: &str,
        items: Vec<DataItem>,
        canonical_type: &str,
    ) -> Result<Vec<CompositionGroup>> {
        let declaration = self
            .registry
            .declaration(raw_type)
            .ok_or_else(|| Error::UnknownItemType(raw_type.to_string()))?;
        if declaration.kind != ItemKind::Raw {
            return Err(Error::InvalidInput(format!("{} is not a raw item type", raw_type)));
        }

        let context = format!("partition {}", raw_type);
        let keys = declaration
            .attributes
            .iter()
            .filter(|a| a.primary_key)
            .map(|a| self.registry.resolve_for(raw_type, &a.name, &context))
            .collect::<Result<Vec<_>>>()?;
        if keys.is_empty() {
            return Err(Error::Config(format!(
                "{} declares no primary key attribute to group by",
                raw_type
            )));
        }

        let attributes = self.registry.canonical_attributes(canonical_type)?;

        let mut index: HashMap<Vec<Option<String>>, usize> = HashMap::new();
        let mut buckets: Vec<Vec<DataItem>> = Vec::new();
        for item in items {
            let identity = keys
                .iter()
                .map(|k| Ok(identity_value(k.get(&item)?)))
                .collect::<Result<Vec<_>>>()?;
            match index.get(&identity) {
                Some(&slot) => buckets[slot].push(item),
                None => {
                    index.insert(identity, buckets.len());
                    buckets.push(vec![item]);
                }
            }
        }

        debug!("Partitioned {} into {} groups", raw_type, buckets.len());
        Ok(buckets
            .into_iter()
            .map(|items| CompositionGroup::new(items, attributes.clone()))
            .collect())
    }

    /// Derive every canonical item for one raw group
    pub fn process(&self, group: &CompositionGroup) -> Result<Vec<DataItem>> {
        let canonical_type = canonical_type_of(group)?;

        let grouping = self
            .grouping
            .first_matching(|h| h.is_applicable(group))
            .ok_or_else(|| {
                Error::InvalidInput("no grouping handler applies to this composition group".to_string())
            })?;
        let derived = grouping.group(group)?;
        debug!("{} produced {} derived groups", grouping.name(), derived.len());

        let mut canonicals = Vec::with_capacity(derived.len());
        for derived_group in &derived {
            let mut canonical = self.registry.create_item(canonical_type)?;
            for attribute in &derived_group.attributes {
                match self.composition.first_matching(|h| h.is_applicable(attribute)) {
                    Some(handler) => {
                        canonical = handler.compose(attribute, derived_group, canonical)?;
                    }
                    None => debug!("No composition handler for {}", attribute),
                }
            }
            canonicals.push(canonical);
        }
        Ok(canonicals)
    }

    /// Process independent groups in order, stopping at the first failure
    pub fn process_all(&self, groups: &[CompositionGroup]) -> Result<Vec<DataItem>> {
        let mut canonicals = Vec::new();
        for group in groups {
            canonicals.extend(self.process(group)?);
        }
        info!(
            "Composed {} canonical items from {} groups",
            canonicals.len(),
            groups.len()
        );
        Ok(canonicals)
    }
}

/// Trimmed key value; blank and absent keys are the same identity
fn identity_value(value: Option<&str>) -> Option<String> {
    if is_blank(value) {
        return None;
    }
    value.map(|v| v.trim().to_string())
}

/// All attribute definitions of a group must target one canonical type
fn canonical_type_of(group: &CompositionGroup) -> Result<&str> {
    let first = group.attributes.first().ok_or_else(|| {
        Error::InvalidInput("composition group has no canonical attributes to populate".to_string())
    })?;

    if let Some(other) = group
        .attributes
        .iter()
        .find(|def| def.canonical_type != first.canonical_type)
    {
        return Err(Error::InvalidInput(format!(
            "composition group mixes canonical types {} and {}",
            first.canonical_type, other.canonical_type
        )));
    }
    Ok(&first.canonical_type)
}

fn verify_rule(registry: &SchemaRegistry, rule: &CompositionRule) -> Result<()> {
    let context = format!("compose {}", rule.canonical_type);
    registry.resolve_for(&rule.raw_type, &rule.identity_attribute, &context)?;
    for attr in rule.discriminators() {
        registry.resolve_for(&rule.raw_type, attr, &context)?;
    }
    for attr in [
        &rule.target_attribute,
        &rule.identifier_attribute,
        &rule.classification_attribute,
    ] {
        registry.resolve_for(&rule.canonical_type, attr, &context)?;
    }
    Ok(())
}

fn verify_mapping(registry: &SchemaRegistry, mapping: &AttributeMapping) -> Result<()> {
    let context = format!("compose {}.{}", mapping.canonical_type, mapping.attribute);
    registry.resolve_for(&mapping.raw_type, &mapping.source_attribute, &context)?;
    registry.resolve_for(&mapping.canonical_type, &mapping.attribute, &context)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use canon_common::CanonicalAttributeDefinition;

    fn pipeline() -> Pipeline {
        let config = ComposeConfig::default();
        let registry = Arc::new(config.build_registry().unwrap());
        Pipeline::from_config(&config, registry).unwrap()
    }

    #[test]
    fn test_handler_order() {
        let pipeline = pipeline();
        assert_eq!(
            pipeline.grouping_handlers(),
            vec!["customer-address-rel-grouping", "pass-through"]
        );
        assert_eq!(
            pipeline.composition_handlers(),
            vec![
                "customer-address-rel-composition",
                "CanonicalCustomerAddressRel.customerId<-RawCustomer.integrationKey"
            ]
        );
    }

    #[test]
    fn test_from_config_fails_on_unknown_attribute() {
        let mut config = ComposeConfig::default();
        config.rules[0].candidates[1].attribute = "deliverTo".to_string();
        let registry = Arc::new(config.build_registry().unwrap());

        let err = Pipeline::from_config(&config, registry).err().unwrap();
        assert!(err.is_schema_mismatch());
        assert!(err.to_string().contains("deliverTo"));
    }

    #[test]
    fn test_process_requires_canonical_attributes() {
        let pipeline = pipeline();
        let item = pipeline.registry().create_item("RawCustomer").unwrap();
        let group = CompositionGroup::new(vec![item], vec![]);

        assert!(matches!(pipeline.process(&group), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_process_rejects_mixed_canonical_types() {
        let pipeline = pipeline();
        let item = pipeline.registry().create_item("RawCustomer").unwrap();
        let group = CompositionGroup::new(
            vec![item],
            vec![
                CanonicalAttributeDefinition::new("CanonicalCustomerAddressRel", "addressId"),
                CanonicalAttributeDefinition::new("CanonicalCustomer", "name"),
            ],
        );

        let err = pipeline.process(&group).unwrap_err();
        assert!(err.to_string().contains("mixes canonical types"));
    }

    #[test]
    fn test_process_empty_group_has_no_handler() {
        let pipeline = pipeline();
        let group = CompositionGroup::new(
            vec![],
            vec![CanonicalAttributeDefinition::new("CanonicalCustomerAddressRel", "addressId")],
        );
        assert!(pipeline.process(&group).is_err());
    }

    #[test]
    fn test_partition_requires_raw_type() {
        let pipeline = pipeline();
        assert!(pipeline
            .partition("CanonicalCustomerAddressRel", vec![], "CanonicalCustomerAddressRel")
            .is_err());
        assert!(matches!(
            pipeline.partition("RawProduct", vec![], "CanonicalCustomerAddressRel"),
            Err(Error::UnknownItemType(_))
        ));
    }

    #[test]
    fn test_partition_normalizes_blank_and_padded_keys() {
        let pipeline = pipeline();
        let registry = pipeline.registry();
        let key = registry.resolve("RawCustomer", "integrationKey").unwrap();
        let customer = |value: Option<&str>| {
            let mut item = registry.create_item("RawCustomer").unwrap();
            key.set(&mut item, value.map(str::to_string)).unwrap();
            item
        };

        let items = vec![
            customer(Some("C1")),
            customer(None),
            customer(Some(" C1 ")),
            customer(Some("")),
            customer(Some("   ")),
        ];
        let groups = pipeline
            .partition("RawCustomer", items, "CanonicalCustomerAddressRel")
            .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 3);
        assert_eq!(key.get(&groups[0].items[1]).unwrap(), Some(" C1 "));
        assert!(groups[1].items.iter().all(|i| is_blank(key.get(i).unwrap())));
    }

    #[test]
    fn test_pipeline_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();
    }
}
