//! Per-request entry point.
//!
//! For each request the dispatcher:
//! 1. resolves the longest-prefix group from its [`Registry`],
//! 2. builds a [`Context`] over an owned snapshot of that group's chain,
//! 3. appends the core handler, when one is configured,
//! 4. resets the cursor and drives the chain with a single `next()`,
//! 5. turns a handler panic into `500 Internal Server Error`.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::{Instrument, debug, error, info_span};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};
use crate::registry::Registry;
use crate::request::Request;
use crate::response::Response;
use crate::scope::cancellation;

/// A validated routing table plus an optional core handler.
///
/// Build it once at startup, then share it (the server wraps it in an `Arc`).
/// Owning the registry means no group can change while requests are served.
pub struct Dispatcher {
    registry: Registry,
    core: Option<BoxedHandler>,
}

impl Dispatcher {
    /// A dispatcher without a core handler.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyPrefix`] or [`Error::ChainTooLong`] when the registry
    /// cannot be served.
    pub fn new(registry: Registry) -> Result<Self, Error> {
        Self::builder(registry).build()
    }

    pub fn builder(registry: Registry) -> DispatcherBuilder {
        DispatcherBuilder { registry, core: None }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs one request through its chain and returns the response it wrote.
    ///
    /// A chain that writes nothing answers `200 OK` with an empty body. A
    /// handler panic answers `500`, whatever was written before it.
    pub async fn dispatch(&self, request: Request) -> Response {
        let span = info_span!("request", method = %request.method(), uri = request.target());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: Request) -> Response {
        // Dropped on return or when the transport abandons this future.
        let (_cancel, signal) = cancellation();

        let chain = self.registry.resolve(request.target());
        debug!(group = chain.prefix().unwrap_or("-"), handlers = chain.len(), "resolved chain");

        let mut cx = Context::new(request, chain, signal);
        if let Some(core) = &self.core {
            cx.push_terminal(core.clone());
        }
        cx.reset();

        let outcome = AssertUnwindSafe(cx.next()).catch_unwind().await;
        match outcome {
            Ok(()) => cx
                .take_response()
                .unwrap_or_else(|| Response::status(StatusCode::OK)),
            Err(panic) => {
                error!(panic = panic_message(&*panic), "handler panicked");
                Response::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Configures a [`Dispatcher`]; finished by [`build`](DispatcherBuilder::build).
pub struct DispatcherBuilder {
    registry: Registry,
    core: Option<BoxedHandler>,
}

impl DispatcherBuilder {
    /// Sets the core handler, appended after every resolved chain, including
    /// the empty one a non-matching request gets.
    pub fn core<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.core_handler(handler)
    }

    pub fn core_handler(mut self, handler: impl Handler) -> Self {
        self.core = Some(boxed(handler));
        self
    }

    /// Validates the registry and produces the dispatcher.
    pub fn build(self) -> Result<Dispatcher, Error> {
        self.registry.validate(self.core.is_some())?;
        debug!(groups = self.registry.len(), core = self.core.is_some(), "dispatcher ready");
        Ok(Dispatcher { registry: self.registry, core: self.core })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
