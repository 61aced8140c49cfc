//! Minimal relay example — two prefix groups, an auth gate, and a core handler.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/v1/users
//!   curl -H 'authorization: Bearer x' http://localhost:3000/api/v2/users
//!   curl http://localhost:3000/api/v2/users        # 401, chain aborted
//!   curl http://localhost:3000/favicon.ico         # empty 200, skipped
//!
//! Reads `relay.toml` next to the binary when present.

use relay::{BoxFuture, Config, Context, Dispatcher, Registry, Server, StatusCode, logging, middleware};

#[tokio::main]
async fn main() -> Result<(), relay::Error> {
    let config = Config::discover()?;
    logging::init(&config.log)?;

    let mut registry = Registry::new();
    registry
        .group("/")
        .with_handler(middleware::Trace)
        .with_handler(middleware::SkipFavicon);
    registry
        .group("/api")
        .with_handler(middleware::Trace)
        .with(tag_version);
    registry
        .group("/api/v2")
        .with_handler(middleware::Trace)
        .with(require_auth)
        .with(tag_version);

    let dispatcher = Dispatcher::builder(registry).core(core).build()?;

    Server::from_config(&config).serve(dispatcher).await
}

// Stores which group served the request for the core handler to report.
fn tag_version(cx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let group = cx.matched_prefix().unwrap_or("/").to_owned();
        cx.set("group", group);
        cx.next().await;
    })
}

// 401 and stop unless an authorization header is present.
fn require_auth(cx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        if cx.request().header("authorization").is_none() {
            cx.respond(StatusCode::UNAUTHORIZED);
            cx.abort();
            return;
        }
        cx.next().await;
    })
}

fn core(cx: &mut Context) -> BoxFuture<'_> {
    Box::pin(async move {
        let group = cx.get::<String>("group").cloned().unwrap_or_else(|| "-".to_owned());
        let body = format!(r#"{{"group":"{group}","path":"{}"}}"#, cx.request().path());
        cx.respond(relay::Response::json(body.into_bytes()));
    })
}
