// Server module entry point
// Listener setup and the accept loop that feeds connections to the engine

pub mod connection;
pub mod listener;

pub use listener::create_reusable_listener;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::Engine;
use crate::logger;

/// Bind the configured address and serve requests through the engine.
///
/// Registration must be complete before this is called; the engine is
/// shared immutably from here on and only `dispatch` touches it.
pub async fn serve(engine: Arc<Engine>, config: Arc<Config>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    let conn_counter = Arc::new(AtomicUsize::new(0));

    logger::log_server_start(&addr, &config);
    for route in engine.routes() {
        logger::log_route(&route.method, &route.path);
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                connection::accept_connection(stream, peer_addr, &engine, &config, &conn_counter);
            }
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
            }
        }
    }
}
