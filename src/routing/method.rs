//! Per-method tree registry
//!
//! An ordered collection of routing trees, one per distinct HTTP method.
//! The registry is small (bounded by the number of verbs in use), so lookup
//! is a linear scan by method string.

use super::params::Params;
use super::tree::{Node, RouteError, Tree};
use crate::handler::HandlerChain;

/// A registered route, for startup listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
}

/// Ordered collection of per-method routing trees
#[derive(Default)]
pub struct MethodTrees {
    trees: Vec<Tree>,
}

impl MethodTrees {
    #[must_use]
    pub const fn new() -> Self {
        Self { trees: Vec::new() }
    }

    #[must_use]
    pub fn get(&self, method: &str) -> Option<&Tree> {
        self.trees.iter().find(|tree| tree.method() == method)
    }

    /// Register a route, lazily creating the method's tree on first use
    pub fn add_route(
        &mut self,
        method: &str,
        path: &str,
        handlers: HandlerChain,
    ) -> Result<(), RouteError> {
        let existing = self.trees.iter().position(|tree| tree.method() == method);
        let tree = match existing {
            Some(idx) => &mut self.trees[idx],
            None => {
                self.trees.push(Tree::new(method));
                let end = self.trees.len() - 1;
                &mut self.trees[end]
            }
        };
        tree.add_route(path, handlers)
    }

    /// Look up the handler chain for a request; `None` when the method has
    /// no tree or the path does not match
    #[must_use]
    pub fn find(&self, method: &str, path: &str) -> Option<(&HandlerChain, Params)> {
        self.get(method)?.find(path)
    }

    /// Whether the path is routable under some method other than `method`,
    /// used to distinguish 405 from 404
    #[must_use]
    pub fn matches_other_method(&self, method: &str, path: &str) -> bool {
        self.trees
            .iter()
            .filter(|tree| tree.method() != method)
            .any(|tree| tree.find(path).is_some())
    }

    /// Depth-first listing of every registered route
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes = Vec::new();
        for tree in &self.trees {
            collect_routes(tree.method(), "", tree.root(), &mut routes);
        }
        routes
    }
}

fn collect_routes(method: &str, prefix: &str, node: &Node, routes: &mut Vec<RouteInfo>) {
    let path = join_segment(prefix, &node.path);
    if !node.handlers.is_empty() {
        routes.push(RouteInfo {
            method: method.to_string(),
            path: path.clone(),
        });
    }
    for child in &node.children {
        collect_routes(method, &path, child, routes);
    }
}

fn join_segment(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() || prefix == "/" {
        if segment == "/" {
            "/".to_string()
        } else {
            format!("/{segment}")
        }
    } else {
        format!("{prefix}/{segment}")
    }
}
