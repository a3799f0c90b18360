//! Desktop App Bridge library.
//!
//! This library lets desktop clients register themselves once, receive a
//! secret webhook handle, and push sensor readings that are rendered as live
//! entities. The HTTP surface, the snapshot store, and the entity
//! synchronization engine all hang off a single [`hub::Hub`] service object.

pub mod bootstrap;
pub mod bus;
pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod hub;
pub mod instance_lock;
pub mod registration;
pub mod sensors;
pub mod storage;
pub mod webhook;

pub use error::{BridgeError, Result};
pub use hub::Hub;
