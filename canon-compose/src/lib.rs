//! canon-compose - rule-based canonical composition
//!
//! Raw groups flow through two handler tiers:
//! - **Grouping:** split one raw group into derived groups, one view per
//!   populated discriminator plus a default view
//! - **Composition:** fill canonical attributes from a derived group
//!
//! [`Pipeline`] wires priority-ordered handler chains from configuration and
//! drives both tiers for a batch of raw items.

pub mod batch;
pub mod composition;
pub mod grouping;
pub mod handler;
pub mod logging;
pub mod pipeline;
mod preconditions;

pub use composition::{
    CompositionHandler, DirectMappingCompositionHandler, FirstPopulatedCompositionHandler,
};
pub use grouping::{DiscriminatorGroupingHandler, GroupingHandler, PassThroughGroupingHandler};
pub use handler::{HandlerChain, Registered};
pub use pipeline::Pipeline;
