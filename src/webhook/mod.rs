//! Webhook command router.
//!
//! A device posts `{type, data}` to its secret webhook URL. The router resolves
//! the secret handle to a registration, picks the handler for `type` and runs
//! it against the hub.

pub mod commands;
pub mod router;

pub use router::{CommandType, WebhookRouter};
