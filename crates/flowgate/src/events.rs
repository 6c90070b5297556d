//! Minimal pub/sub dispatcher with async-first handlers
//!
//! Handlers are registered per event name and invoked sequentially in
//! registration order. Each handler is awaited before the next one runs, and
//! the first handler error stops delivery for that trigger and is returned to
//! the caller.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};

use crate::error::{EventError, EventResult, HandlerError};

/// Future returned by an async handler.
pub type HandlerFuture = BoxFuture<'static, Result<(), HandlerError>>;

enum HandlerFn<P> {
    Sync(Arc<dyn Fn(&P) -> Result<(), HandlerError> + Send + Sync>),
    Async(Arc<dyn Fn(P) -> HandlerFuture + Send + Sync>),
}

/// A subscriber for events carrying a payload of type `P`.
pub struct Handler<P> {
    function: HandlerFn<P>,
}

impl<P> Handler<P> {
    /// Create a handler from a plain function
    pub fn sync<F>(function: F) -> Self
    where
        F: Fn(&P) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            function: HandlerFn::Sync(Arc::new(function)),
        }
    }

    /// Create a handler from a function returning a future
    pub fn future<F, Fut>(function: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            function: HandlerFn::Async(Arc::new(move |payload| function(payload).boxed())),
        }
    }

    async fn call(&self, payload: &P) -> Result<(), HandlerError>
    where
        P: Clone,
    {
        match &self.function {
            HandlerFn::Sync(function) => function(payload),
            HandlerFn::Async(function) => function(payload.clone()).await,
        }
    }
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        let function = match &self.function {
            HandlerFn::Sync(function) => HandlerFn::Sync(Arc::clone(function)),
            HandlerFn::Async(function) => HandlerFn::Async(Arc::clone(function)),
        };
        Self { function }
    }
}

impl<P> fmt::Debug for Handler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.function {
            HandlerFn::Sync(_) => "sync",
            HandlerFn::Async(_) => "async",
        };
        f.debug_struct("Handler").field("kind", &kind).finish()
    }
}

/// Event name to handlers registry.
pub struct EventDispatcher<P> {
    subscribers: DashMap<String, Vec<Handler<P>>>,
    /// When set, only these event names accept handlers.
    events: Option<HashSet<String>>,
}

impl<P> Default for EventDispatcher<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventDispatcher<P> {
    /// Create a dispatcher accepting any event name
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            events: None,
        }
    }

    /// Create a dispatcher that only accepts handlers for the given events
    pub fn with_events<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subscribers: DashMap::new(),
            events: Some(events.into_iter().map(Into::into).collect()),
        }
    }

    /// Register a handler for an event
    pub fn observe(&self, event: &str, handler: Handler<P>) -> EventResult<()> {
        if let Some(events) = &self.events {
            if !events.contains(event) {
                return Err(EventError::invalid_handler(event));
            }
        }
        self.subscribers
            .entry(event.to_string())
            .or_default()
            .push(handler);
        Ok(())
    }

    /// Remove every handler registered for an event
    pub fn remove(&self, event: &str) {
        self.subscribers.remove(event);
    }

    /// Remove every handler for every event
    pub fn clear(&self) {
        self.subscribers.clear();
    }

    /// Number of handlers registered for an event
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .get(event)
            .map(|handlers| handlers.len())
            .unwrap_or(0)
    }

    /// Deliver an event to its handlers in registration order
    pub async fn trigger(&self, event: &str, payload: P) -> EventResult<()>
    where
        P: Clone + Send + Sync,
    {
        let handlers = match self.subscribers.get(event) {
            Some(handlers) => handlers.value().clone(),
            None => return Ok(()),
        };

        for handler in &handlers {
            handler
                .call(&payload)
                .await
                .map_err(|source| EventError::handler(event, source))?;
        }
        Ok(())
    }
}

impl<P> fmt::Debug for EventDispatcher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("events", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}
