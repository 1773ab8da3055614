//! JSON batch input and output
//!
//! A batch names the raw and canonical types and carries raw items as
//! attribute maps:
//!
//! ```json
//! {
//!   "raw_type": "RawCustomer",
//!   "canonical_type": "CanonicalCustomerAddressRel",
//!   "items": [ { "integrationKey": "C1", "billTo": "A1", "shipTo": null } ]
//! }
//! ```

use crate::pipeline::Pipeline;
use canon_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Attribute name to value
pub type ItemValues = BTreeMap<String, Option<String>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub raw_type: String,
    pub canonical_type: String,
    pub items: Vec<ItemValues>,
}

impl BatchInput {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

/// Load, partition, group and compose a batch
///
/// Returns one attribute map per canonical item, in group order.
pub fn run_batch(pipeline: &Pipeline, input: &BatchInput) -> Result<Vec<ItemValues>> {
    let registry = pipeline.registry();
    let items = input
        .items
        .iter()
        .map(|values| registry.item_from_values(&input.raw_type, values))
        .collect::<Result<Vec<_>>>()?;
    info!("Loaded {} {} items", items.len(), input.raw_type);

    let groups = pipeline.partition(&input.raw_type, items, &input.canonical_type)?;
    let canonicals = pipeline.process_all(&groups)?;

    canonicals
        .iter()
        .map(|item| registry.item_values(item))
        .collect()
}
