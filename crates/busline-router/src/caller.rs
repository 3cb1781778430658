// SPDX-FileCopyrightText: 2026 Busline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Callback registry and dispatch.
//!
//! Handler sets are stored per message name behind an [`ArcSwap`]. Mutations
//! copy the map and swap it in; dispatch takes a snapshot of one name's set and
//! iterates it without holding any lock, so registration changes made while a
//! message is being dispatched apply to the next message.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;
use busline_core::{BuslineError, CommandMessage, Handler};
use tracing::{debug, warn};

type HandlerSet = Arc<[Arc<dyn Handler>]>;
type HandlerMap = HashMap<String, HandlerSet>;

/// Instance identity, ignoring vtable pointers.
fn same_instance(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Holds named handlers and dispatches command messages to them.
pub struct CallbackRegistry {
    handlers: ArcSwap<HandlerMap>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            handlers: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Registers `handler` under its declared message name.
    ///
    /// Returns `false` if this exact instance was already registered.
    pub fn add_callback(&self, handler: Arc<dyn Handler>) -> bool {
        let name = handler.message_name().to_string();
        let mut added = false;
        self.handlers.rcu(|current| {
            let existing = current.get(&name);
            if existing.is_some_and(|set| set.iter().any(|h| same_instance(h, &handler))) {
                added = false;
                return Arc::clone(current);
            }
            let mut set: Vec<Arc<dyn Handler>> =
                existing.map(|set| set.to_vec()).unwrap_or_default();
            set.push(Arc::clone(&handler));
            let mut next = HandlerMap::clone(current);
            next.insert(name.clone(), set.into());
            added = true;
            Arc::new(next)
        });
        if added {
            debug!(message_name = %name, handler = handler.name(), "callback registered");
        }
        added
    }

    /// Registers every handler in `handlers`, returning how many were new.
    pub fn add_all<I>(&self, handlers: I) -> usize
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        handlers
            .into_iter()
            .filter(|h| self.add_callback(Arc::clone(h)))
            .count()
    }

    /// Removes `handler`. Returns `false` if it was not registered.
    pub fn remove_callback(&self, handler: &Arc<dyn Handler>) -> bool {
        let name = handler.message_name();
        let mut removed = false;
        self.handlers.rcu(|current| {
            let Some(set) = current.get(name) else {
                removed = false;
                return Arc::clone(current);
            };
            if !set.iter().any(|h| same_instance(h, handler)) {
                removed = false;
                return Arc::clone(current);
            }
            let remaining: Vec<Arc<dyn Handler>> = set
                .iter()
                .filter(|h| !same_instance(h, handler))
                .cloned()
                .collect();
            let mut next = HandlerMap::clone(current);
            if remaining.is_empty() {
                next.remove(name);
            } else {
                next.insert(name.to_string(), remaining.into());
            }
            removed = true;
            Arc::new(next)
        });
        if removed {
            debug!(message_name = name, handler = handler.name(), "callback removed");
        }
        removed
    }

    /// Atomically replaces every registration with `handlers`.
    pub fn replace_all<I>(&self, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn Handler>>,
    {
        let mut grouped: HashMap<String, Vec<Arc<dyn Handler>>> = HashMap::new();
        for handler in handlers {
            let set = grouped.entry(handler.message_name().to_string()).or_default();
            if !set.iter().any(|h| same_instance(h, &handler)) {
                set.push(handler);
            }
        }
        let next: HandlerMap = grouped
            .into_iter()
            .map(|(name, set)| (name, set.into()))
            .collect();
        self.handlers.store(Arc::new(next));
    }

    /// The handlers currently registered under `message_name`, in
    /// registration order.
    pub fn handlers_for(&self, message_name: &str) -> Vec<Arc<dyn Handler>> {
        self.handlers
            .load()
            .get(message_name)
            .map(|set| set.to_vec())
            .unwrap_or_default()
    }

    pub fn contains(&self, message_name: &str) -> bool {
        self.handlers.load().contains_key(message_name)
    }

    /// Registered message names, sorted.
    pub fn message_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.load().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total number of registrations across all names.
    pub fn len(&self) -> usize {
        self.handlers.load().values().map(|set| set.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.load().is_empty()
    }

    /// Dispatches `message` to the handlers registered under its name.
    ///
    /// Handlers run lazily as the returned iterator is advanced. A message
    /// with no handlers yields nothing.
    pub fn dispatch<'m>(&self, message: &'m CommandMessage) -> Dispatch<'m> {
        let handlers = self.handlers.load().get(message.message_name()).cloned();
        Dispatch {
            message,
            handlers,
            next: 0,
            failures: Vec::new(),
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("message_names", &self.message_names())
            .field("len", &self.len())
            .finish()
    }
}

/// A single pass over the handlers for one message.
///
/// Yields one command message per handler that returned one, in registration
/// order. Handler failures do not stop the iteration; they are logged and
/// collected in [`Dispatch::failures`].
pub struct Dispatch<'m> {
    message: &'m CommandMessage,
    handlers: Option<HandlerSet>,
    next: usize,
    failures: Vec<BuslineError>,
}

impl Dispatch<'_> {
    /// Whether any handler was registered for the message at dispatch time.
    pub fn is_routable(&self) -> bool {
        self.handlers.as_ref().is_some_and(|set| !set.is_empty())
    }

    /// Number of handlers in the snapshot.
    pub fn handler_count(&self) -> usize {
        self.handlers.as_ref().map_or(0, |set| set.len())
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> &[BuslineError] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<BuslineError> {
        self.failures
    }

    fn record_failure(&mut self, handler: &dyn Handler, error: BuslineError) {
        let message_name = self.message.message_name();
        warn!(
            handler = handler.name(),
            message_name,
            topic = self.message.topic(),
            error = %error,
            "handler failed"
        );
        let error = match error {
            e @ BuslineError::HandlerExecution { .. } => e,
            other => BuslineError::HandlerExecution {
                handler: handler.name().to_string(),
                message_name: message_name.to_string(),
                source: Box::new(other),
            },
        };
        self.failures.push(error);
    }
}

impl Iterator for Dispatch<'_> {
    type Item = CommandMessage;

    fn next(&mut self) -> Option<CommandMessage> {
        loop {
            let handler = Arc::clone(self.handlers.as_ref()?.get(self.next)?);
            self.next += 1;

            let outcome = catch_unwind(AssertUnwindSafe(|| handler.execute(self.message)));
            match outcome {
                Ok(Ok(Some(reply))) => return Some(reply),
                Ok(Ok(None)) => {}
                Ok(Err(error)) => self.record_failure(handler.as_ref(), error),
                Err(_) => {
                    let error = BuslineError::handler(
                        handler.name(),
                        self.message.message_name(),
                        "handler panicked",
                    );
                    self.record_failure(handler.as_ref(), error);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.handler_count().saturating_sub(self.next)))
    }
}
