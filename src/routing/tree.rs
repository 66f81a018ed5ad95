//! Routing trie
//!
//! One tree per HTTP method. Segments are matched in a fixed priority order
//! (static > parameter > wildcard); a skipped-node stack lets the search back
//! out of a static branch that has no terminal handlers and resume from a
//! bypassed parameter or wildcard sibling.

use thiserror::Error;

use super::params::{Param, Params};
use crate::handler::HandlerChain;

/// Registration failures; fatal configuration errors meant to abort startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The path already resolves to an existing terminal node
    #[error("duplicate route: {0}")]
    Duplicate(String),
    /// Same condition, specialized to the root path
    #[error("root route \"/\" already registered")]
    RootAlreadyRegistered,
}

/// Kind of a trie node, derived from the segment's leading character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Literal segment, matched exactly
    Static,
    /// Synthetic root of a tree
    Root,
    /// `:name` segment, captures a single path component
    Parameter,
    /// `*name` segment, captures the remainder of the path
    Wildcard,
}

/// A single trie node owning its children exclusively
pub struct Node {
    /// Segment this node represents, prefix included for `:`/`*` kinds
    pub path: String,
    pub kind: NodeKind,
    /// Non-empty exactly when a registered route terminates here
    pub handlers: HandlerChain,
    pub children: Vec<Node>,
}

impl Node {
    fn new(segment: &str) -> Self {
        let kind = match segment.as_bytes().first() {
            Some(b':') => NodeKind::Parameter,
            Some(b'*') => NodeKind::Wildcard,
            _ => NodeKind::Static,
        };
        Self {
            path: segment.to_string(),
            kind,
            handlers: HandlerChain::new(),
            children: Vec::new(),
        }
    }

    /// Whether a new registration segment lands on this existing child.
    ///
    /// An existing Parameter child absorbs any new `:` segment regardless of
    /// its name, and an existing Wildcard child any new `*` segment, so
    /// `/users/:id` followed by `/users/:userId` is a duplicate rather than
    /// an ambiguous sibling.
    fn absorbs(&self, segment: &str) -> bool {
        self.path == segment
            || (self.kind == NodeKind::Parameter && segment.starts_with(':'))
            || (self.kind == NodeKind::Wildcard && segment.starts_with('*'))
    }

    /// Strip the `:`/`*` prefix to get the capture key
    fn param_key(&self) -> &str {
        &self.path[1..]
    }
}

/// Saved alternative for backtracking: a bypassed parameter or wildcard
/// child, the segment index it applies to, and the params length to roll
/// back to before retrying.
struct SkippedNode<'t> {
    node: &'t Node,
    seg_index: usize,
    params_len: usize,
}

/// Routing tree for a single HTTP method
pub struct Tree {
    method: String,
    root: Node,
}

impl Tree {
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            root: Node {
                path: "/".to_string(),
                kind: NodeKind::Root,
                handlers: HandlerChain::new(),
                children: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// Register a handler chain under `path`.
    ///
    /// Fails when the path already resolves to an existing terminal node
    /// without creating any new node along the walk.
    pub fn add_route(&mut self, path: &str, handlers: HandlerChain) -> Result<(), RouteError> {
        if path.is_empty() || path == "/" {
            if !self.root.handlers.is_empty() {
                return Err(RouteError::RootAlreadyRegistered);
            }
            self.root.handlers = handlers;
            return Ok(());
        }

        let segments = split_path(path);
        let last = segments.len() - 1;
        let mut current = &mut self.root;
        let mut path_exists = true;
        let mut handlers = Some(handlers);

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                continue;
            }

            let existing = current
                .children
                .iter()
                .position(|child| child.absorbs(segment));
            current = match existing {
                Some(idx) => &mut current.children[idx],
                None => {
                    // A new node anywhere along the walk means a new path
                    path_exists = false;
                    current.children.push(Node::new(segment));
                    let end = current.children.len() - 1;
                    &mut current.children[end]
                }
            };

            if i == last {
                if !current.handlers.is_empty() && path_exists {
                    return Err(RouteError::Duplicate(path.to_string()));
                }
                if let Some(chain) = handlers.take() {
                    current.handlers = chain;
                }
            }
        }

        Ok(())
    }

    /// Locate the handler chain for a request path and extract parameters.
    ///
    /// A miss is a normal outcome, not an error. Pure read over the tree;
    /// the accumulator and skipped stack are allocated per call, so
    /// concurrent lookups share nothing mutable.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<(&HandlerChain, Params)> {
        let segments = split_path(path);
        let mut params = Params::new();
        let mut skipped = Vec::new();
        let handlers = self.find_node(&self.root, &segments, 0, &mut params, &mut skipped)?;
        Some((handlers, params))
    }

    fn find_node<'t>(
        &'t self,
        node: &'t Node,
        segments: &[&str],
        index: usize,
        params: &mut Params,
        skipped: &mut Vec<SkippedNode<'t>>,
    ) -> Option<&'t HandlerChain> {
        // End of path, including a trailing slash's empty final segment
        if index >= segments.len() || (index == segments.len() - 1 && segments[index].is_empty()) {
            if !node.handlers.is_empty() {
                return Some(&node.handlers);
            }
            return self.backtrack(segments, params, skipped);
        }

        let segment = segments[index];

        // Static children first. The bypassed parameter/wildcard siblings are
        // saved as alternatives; wildcards are pushed below parameters so
        // parameters pop first and the priority order survives backtracking.
        for child in &node.children {
            if child.kind == NodeKind::Static && child.path == segment {
                for sibling in &node.children {
                    if sibling.kind == NodeKind::Wildcard {
                        skipped.push(SkippedNode {
                            node: sibling,
                            seg_index: index,
                            params_len: params.len(),
                        });
                    }
                }
                for sibling in &node.children {
                    if sibling.kind == NodeKind::Parameter {
                        skipped.push(SkippedNode {
                            node: sibling,
                            seg_index: index,
                            params_len: params.len(),
                        });
                    }
                }
                if let Some(handlers) = self.find_node(child, segments, index + 1, params, skipped)
                {
                    return Some(handlers);
                }
            }
        }

        // Then parameter children, rolling back the capture on failure
        for child in &node.children {
            if child.kind == NodeKind::Parameter {
                let snapshot = params.len();
                params.push(Param::new(child.param_key(), segment));
                if let Some(handlers) = self.find_node(child, segments, index + 1, params, skipped)
                {
                    return Some(handlers);
                }
                params.truncate(snapshot);
            }
        }

        // Finally wildcards: capture the rest of the path and terminate
        for child in &node.children {
            if child.kind == NodeKind::Wildcard {
                let snapshot = params.len();
                params.push(Param::new(child.param_key(), segments[index..].join("/")));
                if !child.handlers.is_empty() {
                    return Some(&child.handlers);
                }
                params.truncate(snapshot);
            }
        }

        self.backtrack(segments, params, skipped)
    }

    /// Resume the search from the most recently bypassed alternative
    fn backtrack<'t>(
        &'t self,
        segments: &[&str],
        params: &mut Params,
        skipped: &mut Vec<SkippedNode<'t>>,
    ) -> Option<&'t HandlerChain> {
        while let Some(record) = skipped.pop() {
            // Undo any captures made along the abandoned branch
            params.truncate(record.params_len);
            match record.node.kind {
                NodeKind::Parameter => {
                    params.push(Param::new(
                        record.node.param_key(),
                        segments[record.seg_index],
                    ));
                    if let Some(handlers) = self.find_node(
                        record.node,
                        segments,
                        record.seg_index + 1,
                        params,
                        skipped,
                    ) {
                        return Some(handlers);
                    }
                    params.truncate(record.params_len);
                }
                NodeKind::Wildcard => {
                    params.push(Param::new(
                        record.node.param_key(),
                        segments[record.seg_index..].join("/"),
                    ));
                    if !record.node.handlers.is_empty() {
                        return Some(&record.node.handlers);
                    }
                    params.truncate(record.params_len);
                }
                NodeKind::Static | NodeKind::Root => {}
            }
        }
        None
    }
}

/// Split a URL path into segments, discarding the leading empty segment a
/// leading slash produces. An empty path normalizes to a single empty
/// segment representing the root.
fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        vec![""]
    } else {
        trimmed.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Context, HandlerFunc};
    use std::sync::Arc;

    fn handlers(count: usize) -> HandlerChain {
        (0..count)
            .map(|_| Arc::new(|_: &mut Context| {}) as HandlerFunc)
            .collect()
    }

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("/users/42"), vec!["users", "42"]);
        assert_eq!(split_path("/"), vec![""]);
        assert_eq!(split_path(""), vec![""]);
        assert_eq!(split_path("/users/"), vec!["users", ""]);
    }

    #[test]
    fn test_round_trip_registration() {
        let mut tree = Tree::new("GET");
        let routes = [
            "/",
            "/users",
            "/users/:id",
            "/posts",
            "/posts/:id/comments",
            "/posts/:id/comments/:commentId",
            "/static/*filepath",
        ];
        for route in routes {
            tree.add_route(route, handlers(1)).unwrap();
        }

        assert!(tree.find("/").is_some());
        assert!(tree.find("/users").is_some());
        assert!(tree.find("/posts/9/comments").is_some());
    }

    #[test]
    fn test_parameter_extraction() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users/:id", handlers(1)).unwrap();

        let (chain, params) = tree.find("/users/123").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(params.by_name("id"), "123");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_multi_parameter_extraction_in_capture_order() {
        let mut tree = Tree::new("GET");
        tree.add_route("/posts/:postId/comments/:commentId", handlers(1))
            .unwrap();

        let (_, params) = tree.find("/posts/456/comments/789").unwrap();
        let expected: Params = [
            Param::new("postId", "456"),
            Param::new("commentId", "789"),
        ]
        .into_iter()
        .collect();
        assert_eq!(params, expected);
    }

    #[test]
    fn test_wildcard_capture() {
        let mut tree = Tree::new("GET");
        tree.add_route("/static/*filepath", handlers(1)).unwrap();

        let (_, params) = tree.find("/static/css/style.css").unwrap();
        assert_eq!(params.by_name("filepath"), "css/style.css");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_static_wins_over_parameter() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users/:id", handlers(1)).unwrap();
        tree.add_route("/users/profile", handlers(2)).unwrap();

        let (chain, params) = tree.find("/users/profile").unwrap();
        assert_eq!(chain.len(), 2);
        assert!(params.is_empty());

        let (chain, params) = tree.find("/users/42").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(params.by_name("id"), "42");
    }

    #[test]
    fn test_backtracks_out_of_dead_static_branch() {
        let mut tree = Tree::new("GET");
        // "admin" exists as a static node but only has a deeper terminal
        tree.add_route("/users/admin/settings", handlers(3)).unwrap();
        tree.add_route("/users/:id", handlers(1)).unwrap();

        let (chain, params) = tree.find("/users/admin").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(params.by_name("id"), "admin");
    }

    #[test]
    fn test_backtrack_discards_abandoned_captures() {
        let mut tree = Tree::new("GET");
        tree.add_route("/a/:x/c/deep", handlers(1)).unwrap();
        tree.add_route("/a/*rest", handlers(2)).unwrap();

        // ":x" captures "b", the "c" branch dead-ends, the wildcard wins;
        // the abandoned ":x" capture must not leak into the result
        let (chain, params) = tree.find("/a/b/c").unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(params.len(), 1);
        assert_eq!(params.by_name("rest"), "b/c");
    }

    #[test]
    fn test_duplicate_route() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users", handlers(1)).unwrap();

        assert_eq!(
            tree.add_route("/users", handlers(1)),
            Err(RouteError::Duplicate("/users".to_string()))
        );
    }

    #[test]
    fn test_root_duplicate() {
        let mut tree = Tree::new("GET");
        tree.add_route("/", handlers(1)).unwrap();

        assert_eq!(
            tree.add_route("/", handlers(1)),
            Err(RouteError::RootAlreadyRegistered)
        );
        assert_eq!(
            tree.add_route("", handlers(1)),
            Err(RouteError::RootAlreadyRegistered)
        );
    }

    #[test]
    fn test_parameter_name_conflation_is_duplicate() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users/:id", handlers(1)).unwrap();

        // A parameter child at this position absorbs any ":" segment
        assert!(matches!(
            tree.add_route("/users/:userId", handlers(1)),
            Err(RouteError::Duplicate(_))
        ));
    }

    #[test]
    fn test_wildcard_conflation_is_duplicate() {
        let mut tree = Tree::new("GET");
        tree.add_route("/static/*filepath", handlers(1)).unwrap();

        assert!(matches!(
            tree.add_route("/static/*path", handlers(1)),
            Err(RouteError::Duplicate(_))
        ));
    }

    #[test]
    fn test_parameter_then_static_is_not_duplicate() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users/:id", handlers(1)).unwrap();
        assert!(tree.add_route("/users/profile", handlers(1)).is_ok());
    }

    #[test]
    fn test_miss_is_silent() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users", handlers(1)).unwrap();
        tree.add_route("/posts/:id", handlers(1)).unwrap();

        for path in ["/unknown", "/users/profile", "/posts", "/admin"] {
            assert!(tree.find(path).is_none(), "unexpected match for {path}");
        }
    }

    #[test]
    fn test_trailing_slash_matches_terminal() {
        let mut tree = Tree::new("GET");
        tree.add_route("/users", handlers(1)).unwrap();

        assert!(tree.find("/users/").is_some());
    }

    #[test]
    fn test_root_path_lookup() {
        let mut tree = Tree::new("GET");
        tree.add_route("/", handlers(1)).unwrap();

        let (chain, params) = tree.find("/").unwrap();
        assert_eq!(chain.len(), 1);
        assert!(params.is_empty());
    }
}
