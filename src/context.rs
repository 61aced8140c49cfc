//! Per-request context and the chain execution state machine.
//!
//! The cursor walks the resolved chain:
//!
//! ```text
//! -1 (before first) ──next()──▶ 0 ─▶ 1 ─▶ … ─▶ N (completed)
//!                                 │
//!                              abort()
//!                                 ▼
//!                         ABORT_INDEX (63) and above
//! ```
//!
//! The cursor only moves forward while it points before or into the chain, so
//! a finished chain rests at exactly N. Chains are capped at [`MAX_CHAIN_LEN`]
//! handlers, below the abort sentinel, so N is never mistaken for an abort.

use std::any::Any;

use http::StatusCode;
use tracing::{trace, warn};

use crate::handler::{BoxFuture, BoxedHandler};
use crate::registry::Chain;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::scope::{CancelSignal, Scope};

const BEFORE_FIRST: i8 = -1;
const ABORT_INDEX: i8 = i8::MAX / 2;

/// Largest number of handlers one resolved chain may hold, the dispatcher's
/// core handler included.
pub const MAX_CHAIN_LEN: usize = ABORT_INDEX as usize - 1;

/// Everything a handler can see and change about the request in flight.
///
/// One context is built per request and dropped when the request finishes.
pub struct Context {
    request: Request,
    response: Option<Response>,
    scope: Scope,
    chain: Chain,
    cursor: i8,
}

impl Context {
    pub(crate) fn new(request: Request, chain: Chain, cancel: CancelSignal) -> Self {
        Self {
            request,
            response: None,
            scope: Scope::new(cancel),
            chain,
            cursor: BEFORE_FIRST,
        }
    }

    pub fn request(&self) -> &Request { &self.request }
    pub fn request_mut(&mut self) -> &mut Request { &mut self.request }

    /// Prefix of the group this request resolved to, `None` when no group
    /// matched.
    pub fn matched_prefix(&self) -> Option<&str> { self.chain.prefix() }

    // ── Chain control ─────────────────────────────────────────────────────────

    /// Runs the rest of the chain.
    ///
    /// Called from inside a handler, the downstream handlers run before this
    /// future resolves, so code after `cx.next().await` sees their effects.
    /// Handlers that return without calling `next` do not stop the chain; the
    /// enclosing loop moves on to the following handler. Use
    /// [`abort`](Context::abort) to stop it.
    pub fn next(&mut self) -> BoxFuture<'_> {
        Box::pin(async move {
            self.advance();
            while let Some(handler) = self.current() {
                trace!(index = self.cursor, len = self.chain.len(), "running handler");
                handler.call(self).await;
                self.advance();
            }
        })
    }

    /// Stops the chain: no handler after the current one will start. Frames
    /// already inside their own `next().await` still run their remaining code.
    pub fn abort(&mut self) {
        self.cursor = ABORT_INDEX;
    }

    pub fn is_aborted(&self) -> bool {
        self.cursor >= ABORT_INDEX
    }

    /// Puts the cursor back before the first handler.
    pub fn reset(&mut self) {
        self.cursor = BEFORE_FIRST;
    }

    /// Index of the handler currently running, `None` before the first call
    /// to `next`, once the chain is exhausted, or after an abort.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.cursor)
            .ok()
            .filter(|&i| i < self.chain.len())
    }

    /// Steps forward unless the chain is already finished or aborted. A nested
    /// `next` that ran the chain to its end leaves nothing for outer frames
    /// to advance.
    fn advance(&mut self) {
        let finished = usize::try_from(self.cursor).is_ok_and(|i| i >= self.chain.len());
        if !finished && !self.is_aborted() {
            self.cursor += 1;
        }
    }

    fn current(&self) -> Option<BoxedHandler> {
        self.index().and_then(|i| self.chain.handler(i))
    }

    pub(crate) fn push_terminal(&mut self, handler: BoxedHandler) {
        self.chain.push(handler);
    }

    // ── Request-scoped values ─────────────────────────────────────────────────

    /// Reads a request-scoped value. `None` when `key` is unset or holds a
    /// value of another type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.scope.value(key)
    }

    /// Binds `key` to `value` for the rest of this request. Last write wins.
    pub fn set<T: Any + Send + Sync>(&mut self, key: &'static str, value: T) {
        self.scope = self.scope.with_value(key, value);
    }

    /// The current scope. A clone taken now does not see later `set` calls.
    pub fn scope(&self) -> &Scope { &self.scope }

    pub fn cancellation(&self) -> &CancelSignal { self.scope.cancellation() }

    // ── Response sink ─────────────────────────────────────────────────────────

    /// Writes the response for this request. Only the first write is kept;
    /// later ones are discarded and `false` is returned.
    pub fn respond(&mut self, response: impl IntoResponse) -> bool {
        if self.response.is_some() {
            warn!(request_target = self.request.target(), "response already written, discarding");
            return false;
        }
        self.response = Some(response.into_response());
        true
    }

    pub fn is_written(&self) -> bool {
        self.response.is_some()
    }

    /// Status of the written response, if any.
    pub fn response_status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(Response::status_code)
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}
