//! Small HTTP framework built around a backtracking path trie.
//!
//! Routes are registered per HTTP method into a segment trie supporting
//! static, `:parameter` and `*wildcard` segments, matched in that priority
//! order with explicit backtracking. The [`engine::Engine`] dispatches each
//! request to the matched handler chain; [`server::serve`] runs the whole
//! thing over hyper.

pub mod config;
pub mod engine;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use engine::{Engine, RouterGroup};
pub use handler::{handler, Context, HandlerChain, HandlerFunc};
pub use routing::{Param, Params, RouteError};
