//! Built-in item type declarations
//!
//! Raw customers and the canonical customer/address relationship composed
//! from them. Additional types are declared in configuration.

use super::{AttributeDefinition, ItemKind, ItemSchema};

/// Raw customer as delivered by a source system
pub struct RawCustomerSchema;

impl RawCustomerSchema {
    pub const ITEM_TYPE: &'static str = "RawCustomer";
    pub const INTEGRATION_KEY: &'static str = "integrationKey";
    pub const BILL_TO: &'static str = "billTo";
    pub const SHIP_TO: &'static str = "shipTo";
}

impl ItemSchema for RawCustomerSchema {
    fn item_type() -> &'static str {
        Self::ITEM_TYPE
    }

    fn kind() -> ItemKind {
        ItemKind::Raw
    }

    fn attributes() -> Vec<AttributeDefinition> {
        vec![
            AttributeDefinition::new(Self::INTEGRATION_KEY)
                .primary_key()
                .description("Customer identity shared by every record of one customer"),

            // Optional address sources; either, both or neither may be populated
            AttributeDefinition::new(Self::BILL_TO).description("Billing address id"),
            AttributeDefinition::new(Self::SHIP_TO).description("Shipping address id"),

            AttributeDefinition::new("firstName"),
            AttributeDefinition::new("lastName"),
            AttributeDefinition::new("email"),
        ]
    }
}

/// Canonical relationship between a customer and one of its addresses
pub struct CanonicalCustomerAddressRelSchema;

impl CanonicalCustomerAddressRelSchema {
    pub const ITEM_TYPE: &'static str = "CanonicalCustomerAddressRel";
    pub const CUSTOMER_ID: &'static str = "customerId";
    pub const ADDRESS_ID: &'static str = "addressId";
    pub const ADDRESS_TYPE: &'static str = "addressType";
}

impl ItemSchema for CanonicalCustomerAddressRelSchema {
    fn item_type() -> &'static str {
        Self::ITEM_TYPE
    }

    fn kind() -> ItemKind {
        ItemKind::Canonical
    }

    fn attributes() -> Vec<AttributeDefinition> {
        vec![
            AttributeDefinition::new(Self::CUSTOMER_ID).primary_key(),
            AttributeDefinition::new(Self::ADDRESS_ID).primary_key(),
            AttributeDefinition::new(Self::ADDRESS_TYPE),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_customer_schema_definition() {
        let attrs = RawCustomerSchema::attributes();

        assert!(attrs.iter().any(|a| a.name == "integrationKey" && a.primary_key));
        assert!(attrs.iter().any(|a| a.name == "billTo" && !a.primary_key));
        assert!(attrs.iter().any(|a| a.name == "shipTo" && !a.primary_key));
        assert_eq!(RawCustomerSchema::kind(), ItemKind::Raw);
    }

    #[test]
    fn test_canonical_address_rel_declaration() {
        let decl = CanonicalCustomerAddressRelSchema::declaration();

        assert_eq!(decl.item_type, "CanonicalCustomerAddressRel");
        assert_eq!(decl.kind, ItemKind::Canonical);
        let keys: Vec<_> = decl
            .attributes
            .iter()
            .filter(|a| a.primary_key)
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(keys, vec!["customerId", "addressId"]);
    }
}
