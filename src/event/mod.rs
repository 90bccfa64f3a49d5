//! Store change notifications.
//!
//! Subscribers register a callback and get back a [`Subscription`] handle.
//! The bus only keeps a weak reference, so dropping the handle unsubscribes.

mod bus;

pub use bus::{ChangeBus, ChangeEvent, ChangeHandler, HandlerId, Subscription};
