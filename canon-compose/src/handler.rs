//! Handler registration and priority ordering
//!
//! Handlers are collected into explicit chains when the pipeline is built.
//! There is no global registry: whoever builds the chain owns it.

/// Identity and registration priority of a handler
pub trait Registered {
    /// Handler name for logging
    fn name(&self) -> &str;

    /// Registration priority, lower values are consulted first
    fn order(&self) -> i32;
}

/// Handlers sorted by [`Registered::order`]
///
/// Sorting is stable, so handlers sharing an order keep insertion order.
pub struct HandlerChain<H: ?Sized + Registered> {
    handlers: Vec<Box<H>>,
}

impl<H: ?Sized + Registered> HandlerChain<H> {
    pub fn new(mut handlers: Vec<Box<H>>) -> Self {
        handlers.sort_by_key(|h| h.order());
        Self { handlers }
    }

    /// First handler, in priority order, accepted by `predicate`
    pub fn first_matching(&self, predicate: impl Fn(&H) -> bool) -> Option<&H> {
        self.handlers
            .iter()
            .map(|h| &**h)
            .find(|h| predicate(*h))
    }

    pub fn iter(&self) -> impl Iterator<Item = &H> {
        self.handlers.iter().map(|h| &**h)
    }

    /// Handler names in priority order
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
