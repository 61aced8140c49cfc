//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A group holds handlers of *different* concrete types in one `Vec`, so every
//! handler is erased behind `Arc<dyn Handler>`. Handlers borrow the request
//! [`Context`] mutably for the duration of their future, which is what lets a
//! handler run code both before and after its call to [`Context::next`]:
//!
//! ```text
//! |cx| Box::pin(async move { … })        ← user writes this
//!        ↓ group.with(…)
//! Arc::new(closure)                       ← stored as BoxedHandler
//!        ↓
//! handler.call(&mut cx)  at request time  ← one vtable dispatch
//!        ↓
//! BoxFuture<'_>                           ← borrows cx until it resolves
//! ```
//!
//! The per-step cost is one `Arc` clone and one boxed future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A heap-allocated, type-erased future borrowing the request context.
///
/// `Send` lets tokio move the whole chain across worker threads between polls.
pub type BoxFuture<'a, T = ()> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One step of a middleware chain.
///
/// Implemented automatically for every closure or `fn` of shape
/// `for<'a> Fn(&'a mut Context) -> BoxFuture<'a>`. Implement it by hand on a
/// struct when the middleware carries configuration:
///
/// ```rust
/// use relay::{BoxFuture, Context, Handler};
///
/// struct Tag(&'static str);
///
/// impl Handler for Tag {
///     fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
///         Box::pin(async move {
///             cx.set("tag", self.0);
///             cx.next().await;
///         })
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a>;
}

/// A type-erased handler shared by every request that resolves to its group.
pub(crate) type BoxedHandler = Arc<dyn Handler>;

impl<F> Handler for F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, cx: &'a mut Context) -> BoxFuture<'a> {
        (self)(cx)
    }
}

pub(crate) fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}
