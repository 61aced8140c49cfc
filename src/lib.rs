//! # relay
//!
//! A minimal HTTP dispatch layer: pick a middleware chain by longest path
//! prefix, then run it with explicit forward and abort control.
//!
//! ## The model
//!
//! - A [`Registry`] holds groups. Each group is a literal path prefix plus an
//!   ordered list of handlers.
//! - For every request the [`Dispatcher`] picks the group whose prefix is the
//!   longest textual prefix of the raw request target, and snapshots its
//!   handlers into a fresh [`Context`].
//! - Handlers call [`Context::next`] to run the rest of the chain and
//!   [`Context::abort`] to stop it. Code after `next().await` runs once the
//!   downstream handlers are done, so one handler can wrap the others.
//! - An optional core handler is appended to every chain and produces the
//!   actual response.
//! - A panicking handler costs its own request a `500`; nothing else.
//!
//! What relay leaves out: path parameters, wildcards, per-method routes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use relay::{Context, Dispatcher, Registry, Server, middleware};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), relay::Error> {
//!     let mut registry = Registry::new();
//!     registry
//!         .group("/api")
//!         .with_handler(middleware::Trace)
//!         .with(|cx: &mut Context| Box::pin(async move {
//!             if cx.request().header("authorization").is_none() {
//!                 cx.respond(relay::StatusCode::UNAUTHORIZED);
//!                 cx.abort();
//!                 return;
//!             }
//!             cx.set("user", "alice".to_owned());
//!             cx.next().await;
//!         }));
//!
//!     let dispatcher = Dispatcher::builder(registry)
//!         .core(|cx: &mut Context| Box::pin(async move {
//!             let user = cx.get::<String>("user").cloned().unwrap_or_default();
//!             cx.respond(format!("hello {user}"));
//!         }))
//!         .build()?;
//!
//!     Server::bind("0.0.0.0:3000".parse().unwrap()).serve(dispatcher).await
//! }
//! ```

mod context;
mod dispatcher;
mod error;
mod handler;
mod registry;
mod request;
mod response;
mod scope;
mod server;

pub mod config;
pub mod logging;
pub mod middleware;
pub mod paths;

pub use config::Config;
pub use context::{Context, MAX_CHAIN_LEN};
pub use http::{Method, StatusCode};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use registry::{Chain, Group, Registry};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use scope::{CancelSignal, Scope};
pub use server::Server;
