//! End-to-end tests for the customer/address relationship rule
//!
//! Raw customers are grouped on billTo/shipTo and composed into
//! CanonicalCustomerAddressRel items.

use canon_common::config::{ComposeConfig, CompositionRule};
use canon_common::{CanonicalAttributeDefinition, CompositionGroup, DataItem, Error, SchemaRegistry};
use canon_compose::batch::{run_batch, BatchInput, ItemValues};
use canon_compose::{
    CompositionHandler, DiscriminatorGroupingHandler, FirstPopulatedCompositionHandler,
    GroupingHandler, Pipeline,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(ComposeConfig::default().build_registry().unwrap())
}

fn customer(registry: &SchemaRegistry, key: &str, bill_to: &str, ship_to: &str) -> DataItem {
    let mut values = BTreeMap::new();
    values.insert("integrationKey".to_string(), Some(key.to_string()));
    values.insert("billTo".to_string(), Some(bill_to.to_string()));
    values.insert("shipTo".to_string(), Some(ship_to.to_string()));
    registry.item_from_values("RawCustomer", &values).unwrap()
}

fn address_type() -> CanonicalAttributeDefinition {
    CanonicalAttributeDefinition::new("CanonicalCustomerAddressRel", "addressType")
}

fn handlers(registry: &Arc<SchemaRegistry>) -> (DiscriminatorGroupingHandler, FirstPopulatedCompositionHandler) {
    let rule = CompositionRule::customer_address_rel();
    (
        DiscriminatorGroupingHandler::new(rule.clone(), Arc::clone(registry)),
        FirstPopulatedCompositionHandler::new(rule, Arc::clone(registry)),
    )
}

fn compose(
    registry: &SchemaRegistry,
    composer: &FirstPopulatedCompositionHandler,
    group: &CompositionGroup,
) -> ItemValues {
    let canonical = registry.create_item("CanonicalCustomerAddressRel").unwrap();
    let out = composer.compose(&address_type(), group, canonical).unwrap();
    registry.item_values(&out).unwrap()
}

#[test]
fn test_bill_to_example() {
    let registry = registry();
    let (grouper, composer) = handlers(&registry);
    let group = CompositionGroup::new(vec![customer(&registry, "C1", "A1", "")], vec![address_type()]);

    let groups = grouper.group(&group).unwrap();
    assert_eq!(groups.len(), 2);

    let base = compose(&registry, &composer, &groups[0]);
    assert_eq!(base["addressId"].as_deref(), Some("C1"));
    assert_eq!(base["addressType"].as_deref(), Some("Home Address"));

    let bill_to = compose(&registry, &composer, &groups[1]);
    assert_eq!(bill_to["addressId"].as_deref(), Some("A1"));
    assert_eq!(bill_to["addressType"].as_deref(), Some("Home Address"));
}

#[test]
fn test_ship_to_view_precedes_bill_to_view() {
    let registry = registry();
    let (grouper, composer) = handlers(&registry);
    let group = CompositionGroup::new(vec![customer(&registry, "C1", "A1", "S1")], vec![address_type()]);

    let groups = grouper.group(&group).unwrap();
    let ids: Vec<Option<String>> = groups
        .iter()
        .map(|g| compose(&registry, &composer, g)["addressId"].clone())
        .collect();

    assert_eq!(
        ids,
        vec![Some("C1".to_string()), Some("S1".to_string()), Some("A1".to_string())]
    );
}

#[test]
fn test_default_example() {
    let registry = registry();
    let (grouper, composer) = handlers(&registry);
    let group = CompositionGroup::new(vec![customer(&registry, "C1", "", "")], vec![address_type()]);

    let groups = grouper.group(&group).unwrap();
    assert_eq!(groups.len(), 1);

    let out = compose(&registry, &composer, &groups[0]);
    assert_eq!(out["addressId"].as_deref(), Some("C1"));
    assert_eq!(out["addressType"].as_deref(), Some("Home Address"));
}

#[test]
fn test_primary_discriminator_wins_from_any_member() {
    let registry = registry();
    let (_, composer) = handlers(&registry);

    for position in 0..3 {
        let mut items: Vec<DataItem> = (0..3).map(|_| customer(&registry, "C1", "", "S1")).collect();
        items[position] = customer(&registry, "C1", "A1", "S1");
        let group = CompositionGroup::new(items, vec![address_type()]);

        let out = compose(&registry, &composer, &group);
        assert_eq!(out["addressId"].as_deref(), Some("A1"), "billTo on member {}", position);
    }
}

#[test]
fn test_secondary_discriminator_without_primary() {
    let registry = registry();
    let (_, composer) = handlers(&registry);
    let group = CompositionGroup::new(
        vec![customer(&registry, "C1", "", ""), customer(&registry, "C1", " ", "S2")],
        vec![address_type()],
    );

    let out = compose(&registry, &composer, &group);
    assert_eq!(out["addressId"].as_deref(), Some("S2"));
    assert_eq!(out["addressType"].as_deref(), Some("Home Address"));
}

#[test]
fn test_grouping_is_deterministic() {
    let registry = registry();
    let (grouper, _) = handlers(&registry);
    let group = CompositionGroup::new(
        vec![customer(&registry, "C1", "A1", ""), customer(&registry, "C1", "", "S1")],
        vec![address_type()],
    );

    let first = grouper.group(&group).unwrap();
    let second = grouper.group(&group).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_applicability_never_fails_but_operations_do() {
    let registry = registry();
    let (grouper, composer) = handlers(&registry);
    let empty = CompositionGroup::new(vec![], vec![address_type()]);

    assert!(!grouper.is_applicable(&empty));
    assert!(!composer.is_applicable(&CanonicalAttributeDefinition::new("CanonicalProduct", "code")));

    assert!(matches!(grouper.group(&empty), Err(Error::InvalidInput(_))));
    let canonical = registry.create_item("CanonicalCustomerAddressRel").unwrap();
    assert!(matches!(
        composer.compose(&address_type(), &empty, canonical),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_pipeline_batch_from_fixture() {
    let config = ComposeConfig::default();
    let pipeline = Pipeline::from_config(&config, Arc::new(config.build_registry().unwrap())).unwrap();
    let input = BatchInput::from_json(include_str!("fixtures/customers.json")).unwrap();

    let out = run_batch(&pipeline, &input).unwrap();

    let rows: Vec<(Option<&str>, Option<&str>, Option<&str>)> = out
        .iter()
        .map(|v| {
            (
                v["customerId"].as_deref(),
                v["addressId"].as_deref(),
                v["addressType"].as_deref(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            // C1: base, shipTo view, billTo view
            (Some("C1"), Some("C1"), Some("Home Address")),
            (Some("C1"), Some("S1"), Some("Home Address")),
            (Some("C1"), Some("A1"), Some("Home Address")),
            // C2: base only
            (Some("C2"), Some("C2"), Some("Home Address")),
            // C3: base, shipTo view
            (Some("C3"), Some("C3"), Some("Home Address")),
            (Some("C3"), Some("S3"), Some("Home Address")),
        ]
    );
}

#[test]
fn test_batch_with_undeclared_attribute_fails() {
    let config = ComposeConfig::default();
    let pipeline = Pipeline::from_config(&config, Arc::new(config.build_registry().unwrap())).unwrap();
    let input = BatchInput::from_json(
        r#"{"raw_type": "RawCustomer", "canonical_type": "CanonicalCustomerAddressRel",
            "items": [{"integrationKey": "C1", "deliverTo": "D1"}]}"#,
    )
    .unwrap();

    let err = run_batch(&pipeline, &input).unwrap_err();
    assert!(err.is_schema_mismatch());
}

#[test]
fn test_groups_processed_from_several_threads() {
    let config = ComposeConfig::default();
    let registry = Arc::new(config.build_registry().unwrap());
    let pipeline = Pipeline::from_config(&config, Arc::clone(&registry)).unwrap();

    let items: Vec<DataItem> = (0..8)
        .map(|i| customer(&registry, &format!("C{}", i), &format!("A{}", i), ""))
        .collect();
    let groups = pipeline
        .partition("RawCustomer", items, "CanonicalCustomerAddressRel")
        .unwrap();
    assert_eq!(groups.len(), 8);

    let pipeline = &pipeline;
    let results: Vec<Vec<DataItem>> = std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .map(|group| scope.spawn(move || pipeline.process(group).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let address_id = registry
        .resolve("CanonicalCustomerAddressRel", "addressId")
        .unwrap();
    for (i, canonicals) in results.iter().enumerate() {
        assert_eq!(canonicals.len(), 2);
        let expected = format!("A{}", i);
        assert_eq!(address_id.get(&canonicals[1]).unwrap(), Some(expected.as_str()));
    }
}
