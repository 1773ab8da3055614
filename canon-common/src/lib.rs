//! # Canon Common Library
//!
//! Shared code for the canonical composition engine:
//! - Data items and composition groups
//! - Declared item schemas and the attribute registry
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod record;
pub mod schema;

pub use error::{Error, Result};
pub use record::{is_blank, CanonicalAttributeDefinition, CompositionGroup, DataItem};
pub use schema::{AttributeAccessor, SchemaRegistry};
