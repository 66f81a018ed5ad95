//! Route groups
//!
//! A group scopes registrations under a path prefix and a shared middleware
//! chain. Groups borrow the engine mutably, so they exist only during the
//! startup registration phase and cannot outlive it.

use std::sync::Arc;

use super::Engine;
use crate::handler::{Context, HandlerChain};
use crate::routing::RouteError;

/// Registration scope with a base path and an inherited handler chain
pub struct RouterGroup<'e> {
    engine: &'e mut Engine,
    base_path: String,
    handlers: HandlerChain,
}

impl<'e> RouterGroup<'e> {
    pub(crate) fn new(
        engine: &'e mut Engine,
        base: &str,
        prefix: &str,
        handlers: HandlerChain,
    ) -> Self {
        Self {
            engine,
            base_path: join_paths(base, prefix),
            handlers,
        }
    }

    /// Append middleware to this group's chain.
    ///
    /// Affects routes registered through this group afterwards; the parent
    /// scope is untouched.
    pub fn use_middleware(
        &mut self,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> &mut Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Open a nested group; prefixes join and the chain is inherited
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let base = self.base_path.clone();
        let handlers = self.handlers.clone();
        RouterGroup::new(&mut *self.engine, &base, prefix, handlers)
    }

    pub fn get(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("GET", path, vec![Arc::new(handler)])
    }

    pub fn post(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("POST", path, vec![Arc::new(handler)])
    }

    pub fn put(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("PUT", path, vec![Arc::new(handler)])
    }

    pub fn delete(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("DELETE", path, vec![Arc::new(handler)])
    }

    pub fn patch(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("PATCH", path, vec![Arc::new(handler)])
    }

    pub fn head(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("HEAD", path, vec![Arc::new(handler)])
    }

    pub fn options(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        self.handle("OPTIONS", path, vec![Arc::new(handler)])
    }

    /// Register a handler chain under this group's prefix
    pub fn handle(
        &mut self,
        method: &str,
        path: &str,
        handlers: HandlerChain,
    ) -> Result<(), RouteError> {
        let absolute = join_paths(&self.base_path, path);
        let mut chain: HandlerChain = self.handlers.iter().map(Arc::clone).collect();
        chain.extend(handlers);
        self.engine.register(method, &absolute, chain)
    }

    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Join an absolute base with a relative path, normalizing the slash between
fn join_paths(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}
