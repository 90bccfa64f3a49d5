//! Observer registry used by the time-series store.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::trader::{ChangeKind, EventMarker, Timeframe};

/// Payload delivered to subscribers after every store mutation
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub timeframe: Timeframe,
    pub events: Vec<EventMarker>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, timeframe: Timeframe, events: Vec<EventMarker>) -> Self {
        Self {
            kind,
            timeframe,
            events,
        }
    }
}

/// Type alias for change handler functions
pub type ChangeHandler = dyn Fn(&ChangeEvent);

/// Identifies a registered handler for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

/// Keeps a handler alive. Dropping it ends the subscription.
pub struct Subscription {
    id: HandlerId,
    _handler: Rc<ChangeHandler>,
}

impl Subscription {
    pub fn id(&self) -> HandlerId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Plain collection of weakly-held change handlers
#[derive(Default)]
pub struct ChangeBus {
    handlers: Vec<(HandlerId, Weak<ChangeHandler>)>,
    handler_counter: usize,
}

impl ChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; it stays registered while the returned handle lives
    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.handler_counter += 1;
        let id = HandlerId(self.handler_counter);
        let handler: Rc<ChangeHandler> = Rc::new(handler);
        self.handlers.push((id, Rc::downgrade(&handler)));
        Subscription {
            id,
            _handler: handler,
        }
    }

    /// Remove a handler explicitly
    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Deliver an event to every live handler in registration order
    pub fn emit(&mut self, event: &ChangeEvent) {
        self.handlers.retain(|(_, handler)| handler.strong_count() > 0);
        let live: Vec<Rc<ChangeHandler>> = self
            .handlers
            .iter()
            .filter_map(|(_, handler)| handler.upgrade())
            .collect();
        for handler in live {
            handler(event);
        }
    }

    /// Number of live handlers
    pub fn len(&self) -> usize {
        self.handlers
            .iter()
            .filter(|(_, handler)| handler.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ChangeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBus")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn append_event() -> ChangeEvent {
        ChangeEvent::new(ChangeKind::Append, Timeframe::Minute1, Vec::new())
    }

    #[test]
    fn test_emit_reaches_subscribers() {
        let mut bus = ChangeBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus.subscribe(move |event| sink.borrow_mut().push(event.kind));

        bus.emit(&append_event());
        assert_eq!(*seen.borrow(), vec![ChangeKind::Append]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let mut bus = ChangeBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let sub = bus.subscribe(move |_| *sink.borrow_mut() += 1);
        assert_eq!(bus.len(), 1);

        drop(sub);
        bus.emit(&append_event());
        assert_eq!(*count.borrow(), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_explicit_unsubscribe() {
        let mut bus = ChangeBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = count.clone();
        let sub = bus.subscribe(move |_| *sink.borrow_mut() += 1);

        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
        bus.emit(&append_event());
        assert_eq!(*count.borrow(), 0);
    }
}
