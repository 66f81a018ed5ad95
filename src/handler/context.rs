//! Per-request context
//!
//! Carries the parsed request, captured path parameters, a string key/value
//! bag, and the response under construction. Handlers advance the chain with
//! [`Context::next`] and short-circuit it with [`Context::abort`].

use std::collections::HashMap;
use std::sync::Arc;

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, StatusCode, Uri};
use serde::Serialize;

use crate::logger;
use crate::routing::Params;

use super::HandlerChain;

/// Chain index value that stops further handlers from running
const ABORT_INDEX: usize = usize::MAX / 2;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request context handed to every handler in a matched chain
pub struct Context {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,

    /// Parameters captured by the routing trie
    pub params: Params,

    handlers: HandlerChain,
    index: usize,

    keys: Option<HashMap<String, String>>,
    query_cache: Option<Vec<(String, String)>>,
    form_cache: Option<Vec<(String, String)>>,

    status: StatusCode,
    response_headers: HeaderMap,
    response_body: Vec<u8>,
}

impl Context {
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            params: Params::new(),
            handlers: HandlerChain::new(),
            index: 0,
            keys: None,
            query_cache: None,
            form_cache: None,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: Vec::new(),
        }
    }

    /// Install the matched chain and captures before execution
    pub(crate) fn set_matched(&mut self, handlers: HandlerChain, params: Params) {
        self.handlers = handlers;
        self.params = params;
        self.index = 0;
    }

    // ---- chain control ----

    /// Run the remaining handlers in order.
    ///
    /// A middleware handler may call this itself to run the rest of the
    /// chain before doing post-processing; the outer loop then finds the
    /// chain already consumed.
    pub fn next(&mut self) {
        while self.index < self.handlers.len() {
            let handler = Arc::clone(&self.handlers[self.index]);
            self.index += 1;
            handler(self);
        }
    }

    /// Stop the remaining handlers from running
    pub fn abort(&mut self) {
        self.index = ABORT_INDEX;
    }

    /// Abort and set the response status in one step
    pub fn abort_with_status(&mut self, status: StatusCode) {
        self.status = status;
        self.abort();
    }

    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.index >= ABORT_INDEX
    }

    // ---- request accessors ----

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Captured path parameter by name; empty string when absent
    #[must_use]
    pub fn param(&self, key: &str) -> &str {
        self.params.by_name(key)
    }

    /// First query value for `key`; empty string when absent
    pub fn query(&mut self, key: &str) -> String {
        self.get_query(key).unwrap_or_default()
    }

    /// First query value for `key`
    pub fn get_query(&mut self, key: &str) -> Option<String> {
        self.init_query_cache();
        lookup_first(self.query_cache.as_deref().unwrap_or_default(), key)
    }

    /// Every query value registered under `key`, in order
    pub fn query_array(&mut self, key: &str) -> Vec<String> {
        self.init_query_cache();
        lookup_all(self.query_cache.as_deref().unwrap_or_default(), key)
    }

    /// First urlencoded form value for `key`; empty string when absent
    pub fn post_form(&mut self, key: &str) -> String {
        self.get_post_form(key).unwrap_or_default()
    }

    /// First urlencoded form value for `key`
    pub fn get_post_form(&mut self, key: &str) -> Option<String> {
        self.init_form_cache();
        lookup_first(self.form_cache.as_deref().unwrap_or_default(), key)
    }

    /// Form value for `key`, or `default` when the field is absent
    pub fn default_post_form(&mut self, key: &str, default: &str) -> String {
        self.get_post_form(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Every form value registered under `key`, in order
    pub fn post_form_array(&mut self, key: &str) -> Vec<String> {
        self.init_form_cache();
        lookup_all(self.form_cache.as_deref().unwrap_or_default(), key)
    }

    fn init_query_cache(&mut self) {
        if self.query_cache.is_none() {
            let raw = self.uri.query().unwrap_or("");
            self.query_cache = Some(parse_urlencoded(raw));
        }
    }

    fn init_form_cache(&mut self) {
        if self.form_cache.is_none() {
            let is_form = self
                .headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
            let pairs = if is_form {
                parse_urlencoded(&String::from_utf8_lossy(&self.body))
            } else {
                Vec::new()
            };
            self.form_cache = Some(pairs);
        }
    }

    // ---- key/value bag ----

    /// Store a value for later handlers in the chain
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.keys
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.keys.as_ref()?.get(key).map(String::as_str)
    }

    /// Like [`Context::get_value`], but returns an empty string when absent
    #[must_use]
    pub fn get_string(&self, key: &str) -> &str {
        self.get_value(key).unwrap_or("")
    }

    // ---- response construction ----

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Set a response header; invalid names or values are logged and dropped
    pub fn header(&mut self, key: &str, value: &str) {
        match (
            HeaderName::try_from(key),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(val)) => {
                self.response_headers.insert(name, val);
            }
            _ => logger::log_warning(&format!("invalid response header: {key}: {value}")),
        }
    }

    /// Plain-text response
    pub fn string(&mut self, status: StatusCode, body: impl Into<String>) {
        self.status = status;
        self.header("Content-Type", "text/plain; charset=utf-8");
        self.response_body = body.into().into_bytes();
    }

    /// HTML response
    pub fn html(&mut self, status: StatusCode, body: impl Into<String>) {
        self.status = status;
        self.header("Content-Type", "text/html; charset=utf-8");
        self.response_body = body.into().into_bytes();
    }

    /// JSON response; serialization failures become a 500 and are logged
    pub fn json<T: Serialize>(&mut self, status: StatusCode, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.status = status;
                self.header("Content-Type", "application/json");
                self.response_body = bytes;
            }
            Err(err) => {
                logger::log_error(&format!("JSON serialization failed: {err}"));
                self.status = StatusCode::INTERNAL_SERVER_ERROR;
            }
        }
    }

    /// Response parts accumulated by the chain: status, headers, body
    #[must_use]
    pub fn into_response_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status, self.response_headers, self.response_body)
    }
}

/// Decode an urlencoded string into ordered key/value pairs
fn parse_urlencoded(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn lookup_first(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
}

fn lookup_all(pairs: &[(String, String)], key: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use crate::routing::Param;

    fn context_for(uri: &str) -> Context {
        Context::new(
            Method::GET,
            uri.parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn test_next_runs_handlers_in_order() {
        let mut ctx = context_for("/");
        let chain = vec![
            handler(|c: &mut Context| c.set("trace", "first")),
            handler(|c: &mut Context| {
                let trace = format!("{},second", c.get_string("trace"));
                c.set("trace", trace);
            }),
        ];
        ctx.set_matched(chain, Params::new());
        ctx.next();

        assert_eq!(ctx.get_string("trace"), "first,second");
    }

    #[test]
    fn test_abort_stops_chain() {
        let mut ctx = context_for("/");
        let chain = vec![
            handler(|c: &mut Context| c.abort_with_status(StatusCode::UNAUTHORIZED)),
            handler(|c: &mut Context| c.set("reached", "yes")),
        ];
        ctx.set_matched(chain, Params::new());
        ctx.next();

        assert!(ctx.is_aborted());
        assert_eq!(ctx.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.get_value("reached"), None);
    }

    #[test]
    fn test_param_lookup() {
        let mut ctx = context_for("/users/7");
        let params: Params = [Param::new("id", "7")].into_iter().collect();
        ctx.set_matched(HandlerChain::new(), params);

        assert_eq!(ctx.param("id"), "7");
        assert_eq!(ctx.param("missing"), "");
    }

    #[test]
    fn test_query_parsing() {
        let mut ctx = context_for("/search?q=trees&page=2&q=again");

        assert_eq!(ctx.query("q"), "trees");
        assert_eq!(ctx.get_query("page"), Some("2".to_string()));
        assert_eq!(ctx.get_query("missing"), None);
        assert_eq!(ctx.query_array("q"), vec!["trees", "again"]);
    }

    #[test]
    fn test_form_parsing_requires_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, FORM_CONTENT_TYPE.parse().unwrap());
        let mut ctx = Context::new(
            Method::POST,
            "/submit".parse().unwrap(),
            headers,
            Bytes::from_static(b"name=arbor&tag=a&tag=b"),
        );

        assert_eq!(ctx.post_form("name"), "arbor");
        assert_eq!(ctx.post_form_array("tag"), vec!["a", "b"]);
        assert_eq!(ctx.default_post_form("missing", "fallback"), "fallback");

        // Without the form content type the body is not interpreted
        let mut plain = Context::new(
            Method::POST,
            "/submit".parse().unwrap(),
            HeaderMap::new(),
            Bytes::from_static(b"name=arbor"),
        );
        assert_eq!(plain.get_post_form("name"), None);
    }

    #[test]
    fn test_response_helpers() {
        let mut ctx = context_for("/");
        ctx.string(StatusCode::CREATED, "made");
        ctx.header("X-Request-Id", "abc");

        let (status, headers, body) = ctx.into_response_parts();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, b"made");
        assert_eq!(headers.get("X-Request-Id").unwrap(), "abc");
        assert_eq!(
            headers.get("Content-Type").unwrap(),
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_json_response() {
        #[derive(Serialize)]
        struct Payload {
            id: u32,
        }

        let mut ctx = context_for("/");
        ctx.json(StatusCode::OK, &Payload { id: 9 });

        let (status, headers, body) = ctx.into_response_parts();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("Content-Type").unwrap(), "application/json");
        assert_eq!(body, br#"{"id":9}"#);
    }
}
