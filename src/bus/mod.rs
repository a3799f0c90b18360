//! Dispatch bus connecting command handlers to live consumers.
//!
//! Command handlers publish; entity platforms and entities subscribe. Delivery
//! is best effort: events published while nobody listens are gone. The pending
//! update buffer covers that gap for state pushes, the reconcile phase of the
//! entity platform covers it for sensor creation.

pub mod channel;
pub mod dispatch;

pub use channel::{BusEvent, Channel};
pub use dispatch::{DispatchBus, Listener, SubscriptionId};
