//! Prefix-keyed handler groups and longest-prefix resolution.
//!
//! No radix tree, no parameters, no per-method tables. A request is matched by
//! comparing its raw target against every registered prefix; the longest one
//! wins. Build the registry once at startup and hand it to a
//! [`Dispatcher`](crate::Dispatcher).

use std::sync::Arc;

use crate::context::{Context, MAX_CHAIN_LEN};
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler, boxed};

struct Entry {
    prefix: Arc<str>,
    handlers: Vec<BoxedHandler>,
}

/// The routing table: an append-only list of groups in registration order.
#[derive(Default)]
pub struct Registry {
    groups: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a group for `prefix`.
    ///
    /// Nothing is registered until the first handler is attached, so a group
    /// handle that never receives a handler leaves the registry untouched.
    ///
    /// ```rust
    /// use relay::{Context, Registry};
    ///
    /// let mut registry = Registry::new();
    /// registry
    ///     .group("/api")
    ///     .with(|cx: &mut Context| Box::pin(async move { cx.next().await }))
    ///     .with(|cx: &mut Context| Box::pin(async move { cx.respond("hello"); }));
    /// assert_eq!(registry.len(), 1);
    /// ```
    pub fn group(&mut self, prefix: impl Into<String>) -> Group<'_> {
        let prefix: String = prefix.into();
        Group { registry: self, prefix: Arc::from(prefix), slot: None }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Registered prefixes in registration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| &*g.prefix)
    }

    /// Resolves the chain for `target`.
    ///
    /// A group matches when `target` starts with its prefix. The group with
    /// the longest matching prefix wins; a later group only replaces the
    /// current best when its prefix is strictly longer, so among equal-length
    /// matches the first registered one is kept. No match gives an empty
    /// chain.
    ///
    /// The returned [`Chain`] owns its handler list, so registering more
    /// handlers afterwards does not affect it.
    pub fn resolve(&self, target: &str) -> Chain {
        let mut best: Option<&Entry> = None;
        let mut best_len = 0;
        for group in &self.groups {
            if target.starts_with(&*group.prefix) && group.prefix.len() > best_len {
                best_len = group.prefix.len();
                best = Some(group);
            }
        }
        match best {
            Some(group) => Chain::new(Some(Arc::clone(&group.prefix)), group.handlers.clone()),
            None => Chain::default(),
        }
    }

    /// Rejects empty prefixes and groups that, with the core handler appended
    /// when `with_core` is set, would exceed [`MAX_CHAIN_LEN`].
    pub(crate) fn validate(&self, with_core: bool) -> Result<(), Error> {
        let reserved = usize::from(with_core);
        for group in &self.groups {
            if group.prefix.is_empty() {
                return Err(Error::EmptyPrefix);
            }
            let len = group.handlers.len() + reserved;
            if len > MAX_CHAIN_LEN {
                return Err(Error::ChainTooLong {
                    prefix: group.prefix.to_string(),
                    len,
                    max: MAX_CHAIN_LEN,
                });
            }
        }
        Ok(())
    }
}

// ── Group ─────────────────────────────────────────────────────────────────────

/// Handle for attaching handlers to one prefix. Each call returns the handle
/// so attachments chain.
pub struct Group<'r> {
    registry: &'r mut Registry,
    prefix: Arc<str>,
    slot: Option<usize>,
}

impl Group<'_> {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Appends a closure handler.
    pub fn with<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a> + Send + Sync + 'static,
    {
        self.with_handler(handler)
    }

    /// Appends a handler type such as one from [`middleware`](crate::middleware).
    pub fn with_handler(mut self, handler: impl Handler) -> Self {
        self.attach(boxed(handler));
        self
    }

    /// Appends several handlers of the same type, in iteration order.
    pub fn with_all<H: Handler>(mut self, handlers: impl IntoIterator<Item = H>) -> Self {
        for handler in handlers {
            self.attach(boxed(handler));
        }
        self
    }

    fn attach(&mut self, handler: BoxedHandler) {
        let slot = match self.slot {
            Some(slot) => slot,
            None => {
                self.registry.groups.push(Entry {
                    prefix: Arc::clone(&self.prefix),
                    handlers: Vec::new(),
                });
                let slot = self.registry.groups.len() - 1;
                self.slot = Some(slot);
                slot
            }
        };
        self.registry.groups[slot].handlers.push(handler);
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// A resolved, owned snapshot of one group's handlers.
#[derive(Clone, Default)]
pub struct Chain {
    prefix: Option<Arc<str>>,
    handlers: Vec<BoxedHandler>,
}

impl Chain {
    pub(crate) fn new(prefix: Option<Arc<str>>, handlers: Vec<BoxedHandler>) -> Self {
        Self { prefix, handlers }
    }

    /// Prefix of the matched group, `None` when nothing matched.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn handler(&self, index: usize) -> Option<BoxedHandler> {
        self.handlers.get(index).map(Arc::clone)
    }

    pub(crate) fn push(&mut self, handler: BoxedHandler) {
        self.handlers.push(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(cx: &mut Context) -> BoxFuture<'_> {
        Box::pin(async move { cx.next().await })
    }

    fn registry(prefixes: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for prefix in prefixes {
            registry.group(*prefix).with(noop);
        }
        registry
    }

    #[test]
    fn longest_prefix_wins() {
        let registry = registry(&["/api", "/api/v2"]);

        assert_eq!(registry.resolve("/api/v2/users").prefix(), Some("/api/v2"));
        assert_eq!(registry.resolve("/api/v1/users").prefix(), Some("/api"));
        assert_eq!(registry.resolve("/other").prefix(), None);
        assert!(registry.resolve("/other").is_empty());
    }

    #[test]
    fn registration_order_does_not_change_the_winner() {
        let registry = registry(&["/api/v2", "/api", "/"]);
        assert_eq!(registry.resolve("/api/v2/users").prefix(), Some("/api/v2"));
        assert_eq!(registry.resolve("/api/v1").prefix(), Some("/api"));
        assert_eq!(registry.resolve("/static/app.js").prefix(), Some("/"));
    }

    #[test]
    fn equal_prefixes_resolve_to_first_registered() {
        let mut registry = Registry::new();
        registry.group("/api").with(noop);
        registry.group("/api").with(noop).with(noop);

        for _ in 0..3 {
            let chain = registry.resolve("/api/users");
            assert_eq!(chain.prefix(), Some("/api"));
            assert_eq!(chain.len(), 1);
        }
    }

    #[test]
    fn matching_is_literal() {
        let registry = registry(&["/caf%C3%A9"]);
        assert_eq!(registry.resolve("/caf%C3%A9/menu").prefix(), Some("/caf%C3%A9"));
        assert_eq!(registry.resolve("/café/menu").prefix(), None);
        assert_eq!(registry.resolve("/CAF%C3%A9").prefix(), None);
    }

    #[test]
    fn repeated_attachment_registers_once() {
        let mut registry = Registry::new();
        registry.group("/api").with(noop).with(noop).with_all([noop, noop]);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("/api").len(), 4);
    }

    #[test]
    fn group_without_handlers_is_not_registered() {
        let mut registry = Registry::new();
        let group = registry.group("/idle");
        assert_eq!(group.prefix(), "/idle");
        assert!(registry.is_empty());
    }

    #[test]
    fn resolved_chain_is_a_snapshot() {
        let mut registry = registry(&["/api"]);
        let chain = registry.resolve("/api");
        registry.group("/api/v2").with(noop);
        registry.group("/api").with(noop);

        assert_eq!(chain.len(), 1);
        assert_eq!(registry.prefixes().collect::<Vec<_>>(), ["/api", "/api/v2", "/api"]);
    }

    #[test]
    fn validate_rejects_empty_prefix() {
        let registry = registry(&["/ok", ""]);
        assert!(matches!(registry.validate(false), Err(Error::EmptyPrefix)));
    }

    #[test]
    fn validate_counts_core_handler() {
        let mut registry = Registry::new();
        registry.group("/full").with_all(std::iter::repeat_n(noop, MAX_CHAIN_LEN));

        assert!(registry.validate(false).is_ok());
        match registry.validate(true) {
            Err(Error::ChainTooLong { prefix, len, max }) => {
                assert_eq!(prefix, "/full");
                assert_eq!(len, MAX_CHAIN_LEN + 1);
                assert_eq!(max, MAX_CHAIN_LEN);
            }
            other => panic!("expected ChainTooLong, got {other:?}"),
        }
    }
}
