//! Per-request scope: a layered key-value store plus a cancellation signal.
//!
//! Values are never mutated in place. [`Scope::with_value`] returns a new scope
//! whose top layer holds the new entry and whose parent is the old scope, so a
//! clone taken earlier keeps seeing the old values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

type Value = Arc<dyn Any + Send + Sync>;

struct Layer {
    key: &'static str,
    value: Value,
    parent: Option<Arc<Layer>>,
}

/// Request-scoped values and cancellation. Cheap to clone.
#[derive(Clone)]
pub struct Scope {
    top: Option<Arc<Layer>>,
    cancel: CancelSignal,
}

impl Scope {
    pub(crate) fn new(cancel: CancelSignal) -> Self {
        Self { top: None, cancel }
    }

    /// Returns a new scope with `key` bound to `value` on top of `self`.
    pub fn with_value<T: Any + Send + Sync>(&self, key: &'static str, value: T) -> Self {
        Self {
            top: Some(Arc::new(Layer {
                key,
                value: Arc::new(value),
                parent: self.top.clone(),
            })),
            cancel: self.cancel.clone(),
        }
    }

    /// Nearest binding of `key`, downcast to `T`. `None` when the key is
    /// unset or was bound to another type.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        let mut layer = self.top.as_deref();
        while let Some(l) = layer {
            if l.key == key {
                return l.value.downcast_ref();
            }
            layer = l.parent.as_deref();
        }
        None
    }

    pub fn cancellation(&self) -> &CancelSignal {
        &self.cancel
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = Vec::new();
        let mut layer = self.top.as_deref();
        while let Some(l) = layer {
            keys.push(l.key);
            layer = l.parent.as_deref();
        }
        f.debug_struct("Scope")
            .field("keys", &keys)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

// ── Cancellation ──────────────────────────────────────────────────────────────

/// Observes whether the request has been cancelled.
///
/// Cancellation fires when the request finishes or when the transport drops
/// the dispatch future (client went away). Handlers that spawn background
/// work should watch it; the chain itself never stops on cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the request is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        // A dropped sender means the request is gone.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Cancels the paired [`CancelSignal`] when dropped.
#[derive(Debug)]
pub(crate) struct CancelGuard(watch::Sender<bool>);

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

pub(crate) fn cancellation() -> (CancelGuard, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelGuard(tx), CancelSignal(rx))
}
