// Connection handling module
// Serves a single accepted TCP connection and turns each request into a
// context dispatched through the engine

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;

use crate::config::Config;
use crate::engine::Engine;
use crate::handler::Context;
use crate::http;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing the connection limit and logging
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    engine: &Arc<Engine>,
    config: &Arc<Config>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment first, then check, so two racing accepts cannot both pass
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);
    if let Some(max_conn) = config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if config.logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(engine),
        Arc::clone(config),
        Arc::clone(conn_counter),
    );
}

/// Serve one connection in a spawned task: HTTP/1.1 with keep-alive per
/// config and an overall read/write timeout
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    engine: Arc<Engine>,
    config: Arc<Config>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
            config.performance.read_timeout,
            config.performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        builder.keep_alive(config.performance.keep_alive_timeout > 0);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let engine = Arc::clone(&engine);
                let config = Arc::clone(&config);
                async move { handle_request(req, peer_addr, &engine, &config).await }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection timeout after {} seconds",
                timeout_duration.as_secs()
            )),
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Dispatch one request through the engine and render the response
async fn handle_request(
    req: Request<Incoming>,
    peer_addr: SocketAddr,
    engine: &Arc<Engine>,
    config: &Arc<Config>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    let oversized = check_body_size(&req, config.http.max_body_size);
    let (parts, body) = req.into_parts();
    let referer = header_string(&parts.headers, "referer");
    let user_agent = header_string(&parts.headers, "user-agent");

    let response = if let Some(resp) = oversized {
        resp
    } else {
        match body.collect().await {
            Ok(collected) => {
                let mut ctx = Context::new(
                    parts.method.clone(),
                    parts.uri.clone(),
                    parts.headers.clone(),
                    collected.to_bytes(),
                );
                if engine.dispatch(&mut ctx) {
                    http::from_context(ctx, &config.http.server_name)
                } else if engine.allows_other_method(parts.method.as_str(), parts.uri.path()) {
                    http::build_405_response()
                } else {
                    http::build_404_response()
                }
            }
            Err(err) => {
                logger::log_error(&format!("Failed to read request body: {err}"));
                http::build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request")
            }
        }
    };

    if config.logging.access_log {
        let mut entry = AccessLogEntry::new(
            peer_addr.ip().to_string(),
            parts.method.to_string(),
            parts.uri.path().to_string(),
        );
        entry.query = parts.uri.query().map(ToString::to_string);
        entry.http_version = version_label(parts.version).to_string();
        entry.status = response.status().as_u16();
        entry.body_bytes = response_body_len(&response);
        entry.referer = referer;
        entry.user_agent = user_agent;
        entry.duration_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &config.logging.access_log_format);
    }

    Ok(response)
}

/// Reject early when Content-Length exceeds the configured limit
fn check_body_size(req: &Request<Incoming>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get("content-length")?;
    let size_str = content_length.to_str().ok()?;
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

fn header_string(headers: &hyper::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        _ => "1.1",
    }
}

fn response_body_len(response: &Response<Full<Bytes>>) -> usize {
    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}
