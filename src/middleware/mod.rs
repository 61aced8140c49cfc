//! Built-in middleware.
//!
//! Middleware are ordinary [`Handler`]s that do their work around a call to
//! [`Context::next`]: code before it sees the request on the way in, code
//! after it sees the outcome of the downstream chain on the way out.
//!
//! - [`Trace`] — one event per request with status, latency and abort state
//! - [`SkipFavicon`] — drops `/favicon.ico` requests before they reach the core

use std::time::Instant;

use tracing::info;

use crate::context::Context;
use crate::handler::{BoxFuture, Handler};

/// Logs the outcome of the downstream chain.
///
/// Put it first in a group so the latency covers everything after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trace;

impl Handler for Trace {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            cx.next().await;
            let status = cx.response_status().map_or(0, |s| s.as_u16());
            info!(
                status,
                elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                aborted = cx.is_aborted(),
                "request finished"
            );
        })
    }
}

/// Aborts the chain for `/favicon.ico`; logs the target on the way in and
/// again once the rest of the chain has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipFavicon;

impl Handler for SkipFavicon {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        Box::pin(async move {
            if cx.request().target() == "/favicon.ico" {
                cx.abort();
                return;
            }
            info!(uri = cx.request().target(), "entering chain");
            cx.next().await;
            info!(uri = cx.request().target(), "leaving chain");
        })
    }
}
