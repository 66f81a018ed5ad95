//! Routing module
//!
//! The path-matching core: captured parameters, the per-method routing trie
//! with its backtracking lookup, and the method-keyed tree registry.

mod method;
mod params;
mod tree;

pub use method::{MethodTrees, RouteInfo};
pub use params::{Param, Params};
pub use tree::{Node, NodeKind, RouteError, Tree};
