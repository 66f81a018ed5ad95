//! Engine module
//!
//! The engine owns the per-method routing trees and the root middleware
//! chain. Routes are registered during startup through the verb methods or
//! a [`RouterGroup`]; once the engine is shared behind an `Arc` for serving,
//! no further registration is possible and dispatch is a pure read.

mod group;

pub use group::RouterGroup;

use crate::handler::{Context, HandlerChain, HandlerFunc};
use crate::routing::{MethodTrees, RouteError, RouteInfo};
use std::sync::Arc;

/// Methods covered by [`Engine::any`]
const ANY_METHODS: [&str; 9] = [
    "GET", "POST", "PUT", "PATCH", "HEAD", "OPTIONS", "DELETE", "CONNECT", "TRACE",
];

/// Route registry and dispatcher
#[derive(Default)]
pub struct Engine {
    trees: MethodTrees,
    middleware: HandlerChain,
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: MethodTrees::new(),
            middleware: HandlerChain::new(),
        }
    }

    /// Append middleware to the root chain.
    ///
    /// Applies to every route registered afterwards; routes registered
    /// before the call keep their shorter chain.
    pub fn use_middleware(&mut self, handler: impl Fn(&mut Context) + Send + Sync + 'static) {
        self.middleware.push(Arc::new(handler));
    }

    /// Open a route group under `prefix`, inheriting the current root chain
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        let handlers = self.middleware.clone();
        RouterGroup::new(self, "/", prefix, handlers)
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

    /// Register `handler` under every standard HTTP verb
    pub fn any(
        &mut self,
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        let handler: HandlerFunc = Arc::new(handler);
        for method in ANY_METHODS {
            self.handle(method, path, vec![Arc::clone(&handler)])?;
        }
        Ok(())
    }

    /// Register `handler` under each of the given verbs
    pub fn match_methods(
        &mut self,
        methods: &[&str],
        path: &str,
        handler: impl Fn(&mut Context) + Send + Sync + 'static,
    ) -> Result<(), RouteError> {
        let handler: HandlerFunc = Arc::new(handler);
        for method in methods {
            self.handle(method, path, vec![Arc::clone(&handler)])?;
        }
        Ok(())
    }

    /// Register a handler chain, prepending the root middleware
    pub fn handle(
        &mut self,
        method: &str,
        path: &str,
        handlers: HandlerChain,
    ) -> Result<(), RouteError> {
        let mut chain = self.middleware.clone();
        chain.extend(handlers);
        self.register(method, path, chain)
    }

    /// Raw trie insertion; group chains arrive here already combined
    pub(crate) fn register(
        &mut self,
        method: &str,
        path: &str,
        chain: HandlerChain,
    ) -> Result<(), RouteError> {
        self.trees.add_route(method, path, chain)
    }

    /// Every registered route, for startup listings
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.trees.routes()
    }

    /// Whether a missed request's path is routable under another method,
    /// so the serving layer can answer 405 instead of 404
    #[must_use]
    pub fn allows_other_method(&self, method: &str, path: &str) -> bool {
        self.trees.matches_other_method(method, path)
    }

    /// Route the request in `ctx` and run the matched chain.
    ///
    /// Returns `false` when the method has no tree or the path does not
    /// match; the caller is responsible for the not-found response.
    pub fn dispatch(&self, ctx: &mut Context) -> bool {
        let method = ctx.method().as_str().to_string();
        let path = ctx.path().to_string();
        match self.trees.find(&method, &path) {
            Some((handlers, params)) => {
                ctx.set_matched(handlers.clone(), params);
                ctx.next();
                true
            }
            None => false,
        }
    }
}
