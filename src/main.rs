use std::sync::Arc;

use hyper::StatusCode;
use serde_json::json;

use arbor::{config, logger, server, Engine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::Config::load()?;
    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine()?;
    server::serve(Arc::new(engine), Arc::new(cfg)).await
}

/// All route registration happens here, before serving begins
fn build_engine() -> Result<Engine, arbor::RouteError> {
    let mut engine = Engine::new();

    engine.use_middleware(|ctx| {
        // Request id for downstream handlers; a real app would generate one
        ctx.set("request_id", "-");
    });

    engine.get("/", |ctx| {
        ctx.string(StatusCode::OK, "welcome");
    })?;

    engine.get("/users/:id", |ctx| {
        let id = ctx.param("id").to_string();
        ctx.json(StatusCode::OK, &json!({ "user": id }));
    })?;

    engine.get("/static/*filepath", |ctx| {
        let requested = ctx.param("filepath").to_string();
        ctx.string(StatusCode::OK, format!("would serve {requested}"));
    })?;

    {
        let mut api = engine.group("/api");
        api.get("/posts/:postId/comments/:commentId", |ctx| {
            let post = ctx.param("postId").to_string();
            let comment = ctx.param("commentId").to_string();
            ctx.json(StatusCode::OK, &json!({ "post": post, "comment": comment }));
        })?;
        api.post("/posts", |ctx| {
            let title = ctx.post_form("title");
            ctx.json(StatusCode::CREATED, &json!({ "created": title }));
        })?;
    }

    Ok(engine)
}
