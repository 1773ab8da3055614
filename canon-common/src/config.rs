//! Configuration loading
//!
//! Composition rules, attribute mappings and extra item declarations are
//! read from a TOML file. Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `CANON_CONFIG` environment variable
//! 3. `<user config dir>/canon/canon.toml`
//!
//! A missing file is not fatal: a warning is logged and the built-in
//! defaults are used. A file that exists but does not parse is an error.

use crate::schema::{
    CanonicalCustomerAddressRelSchema, ItemDeclaration, RawCustomerSchema, SchemaRegistry,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CANON_CONFIG";

/// Label written for every branch of the built-in address rule
pub const HOME_ADDRESS_LABEL: &str = "Home Address";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposeConfig {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Register the built-in RawCustomer and CanonicalCustomerAddressRel types
    #[serde(default = "default_true")]
    pub include_builtin_items: bool,

    /// Additional item type declarations
    #[serde(default)]
    pub items: Vec<ItemDeclaration>,

    /// Discriminator grouping + first-populated composition rules
    #[serde(default = "default_rules")]
    pub rules: Vec<CompositionRule>,

    /// Direct raw-to-canonical attribute mappings
    #[serde(default = "default_mappings")]
    pub mappings: Vec<AttributeMapping>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One candidate raw attribute and the classification label it implies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub attribute: String,
    pub label: String,
}

/// Rule splitting raw groups on discriminator attributes and composing an
/// identifier/classification pair from the first populated candidate
///
/// `candidates` order is the composition priority. `grouping_order` is the
/// order in which grouping emits one derived group per populated
/// discriminator; left empty, it follows `candidates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionRule {
    pub name: String,

    /// Registration priority (lower runs first)
    #[serde(default = "default_rule_order")]
    pub order: i32,

    pub raw_type: String,
    pub canonical_type: String,

    /// Raw attribute carrying the group identity
    pub identity_attribute: String,

    /// Canonical attribute this rule is dispatched for
    pub target_attribute: String,

    /// Canonical attribute receiving the chosen value
    pub identifier_attribute: String,

    /// Canonical attribute receiving the label
    pub classification_attribute: String,

    /// Label written when no candidate is populated
    pub default_label: String,

    pub candidates: Vec<Candidate>,

    /// Discriminator order for derived groups (empty: candidate order)
    #[serde(default)]
    pub grouping_order: Vec<String>,
}

impl CompositionRule {
    /// Built-in customer/address relationship rule
    pub fn customer_address_rel() -> Self {
        Self {
            name: "customer-address-rel".to_string(),
            order: default_rule_order(),
            raw_type: RawCustomerSchema::ITEM_TYPE.to_string(),
            canonical_type: CanonicalCustomerAddressRelSchema::ITEM_TYPE.to_string(),
            identity_attribute: RawCustomerSchema::INTEGRATION_KEY.to_string(),
            target_attribute: CanonicalCustomerAddressRelSchema::ADDRESS_TYPE.to_string(),
            identifier_attribute: CanonicalCustomerAddressRelSchema::ADDRESS_ID.to_string(),
            classification_attribute: CanonicalCustomerAddressRelSchema::ADDRESS_TYPE.to_string(),
            default_label: HOME_ADDRESS_LABEL.to_string(),
            candidates: vec![
                Candidate {
                    attribute: RawCustomerSchema::BILL_TO.to_string(),
                    label: HOME_ADDRESS_LABEL.to_string(),
                },
                Candidate {
                    attribute: RawCustomerSchema::SHIP_TO.to_string(),
                    label: HOME_ADDRESS_LABEL.to_string(),
                },
            ],
            grouping_order: vec![
                RawCustomerSchema::SHIP_TO.to_string(),
                RawCustomerSchema::BILL_TO.to_string(),
            ],
        }
    }

    /// Candidate attribute names in priority order
    pub fn discriminators(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.attribute.as_str())
    }

    /// Discriminator names in the order grouping emits their derived groups
    pub fn grouping_discriminators(&self) -> Vec<&str> {
        if self.grouping_order.is_empty() {
            self.discriminators().collect()
        } else {
            self.grouping_order.iter().map(String::as_str).collect()
        }
    }

    /// Check the rule is self-consistent (names present, candidates unique)
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("raw_type", &self.raw_type),
            ("canonical_type", &self.canonical_type),
            ("identity_attribute", &self.identity_attribute),
            ("target_attribute", &self.target_attribute),
            ("identifier_attribute", &self.identifier_attribute),
            ("classification_attribute", &self.classification_attribute),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Config(format!(
                    "rule '{}': {} cannot be blank",
                    self.name, field
                )));
            }
        }

        if self.candidates.is_empty() {
            return Err(Error::Config(format!(
                "rule '{}' must declare at least one candidate",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for candidate in &self.candidates {
            if !seen.insert(candidate.attribute.as_str()) {
                return Err(Error::Config(format!(
                    "rule '{}' lists candidate {} more than once",
                    self.name, candidate.attribute
                )));
            }
        }

        if !self.grouping_order.is_empty() {
            let ordered: HashSet<&str> = self.grouping_order.iter().map(String::as_str).collect();
            if ordered.len() != self.grouping_order.len() || ordered != seen {
                return Err(Error::Config(format!(
                    "rule '{}': grouping_order must list each candidate exactly once",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// Canonical attribute filled from the first populated value of one raw attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapping {
    pub canonical_type: String,
    pub attribute: String,
    pub raw_type: String,
    pub source_attribute: String,

    #[serde(default = "default_mapping_order")]
    pub order: i32,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            include_builtin_items: true,
            items: Vec::new(),
            rules: default_rules(),
            mappings: default_mappings(),
        }
    }
}

impl ComposeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every rule
    pub fn validate(&self) -> Result<()> {
        for rule in &self.rules {
            rule.validate()?;
        }
        Ok(())
    }

    /// Build the schema registry from built-in and declared item types
    pub fn build_registry(&self) -> Result<SchemaRegistry> {
        let mut builder = SchemaRegistry::builder();
        if self.include_builtin_items {
            builder = builder
                .register::<RawCustomerSchema>()
                .register::<CanonicalCustomerAddressRelSchema>();
        }
        builder.declare_all(self.items.iter().cloned()).build()
    }
}

/// Load configuration, falling back to defaults when the file is missing
pub fn load_config(path: &Path) -> Result<ComposeConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(ComposeConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = ComposeConfig::from_toml_str(&content)?;
    info!(
        "Loaded {} rules and {} mappings from {}",
        config.rules.len(),
        config.mappings.len(),
        path.display()
    );
    Ok(config)
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("canon").join("canon.toml"))
}

/// Pick the config file: command line, then environment, then platform default
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rule_order() -> i32 {
    100
}

fn default_mapping_order() -> i32 {
    1000
}

fn default_rules() -> Vec<CompositionRule> {
    vec![CompositionRule::customer_address_rel()]
}

fn default_mappings() -> Vec<AttributeMapping> {
    vec![AttributeMapping {
        canonical_type: CanonicalCustomerAddressRelSchema::ITEM_TYPE.to_string(),
        attribute: CanonicalCustomerAddressRelSchema::CUSTOMER_ID.to_string(),
        raw_type: RawCustomerSchema::ITEM_TYPE.to_string(),
        source_attribute: RawCustomerSchema::INTEGRATION_KEY.to_string(),
        order: default_mapping_order(),
    }]
}
