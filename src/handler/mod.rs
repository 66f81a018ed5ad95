//! Handler module
//!
//! Handler chains and the per-request context they run against. A route's
//! chain is an ordered sequence of callables; middleware registered on the
//! engine or a group is prepended to every chain at registration time.

pub mod context;

pub use context::Context;

use std::sync::Arc;

/// A single request handler
pub type HandlerFunc = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// Ordered sequence of handlers executed for a matched route
pub type HandlerChain = Vec<HandlerFunc>;

/// Wrap a closure into a [`HandlerFunc`]
pub fn handler(f: impl Fn(&mut Context) + Send + Sync + 'static) -> HandlerFunc {
    Arc::new(f)
}
