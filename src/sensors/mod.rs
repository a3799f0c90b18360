//! Sensor bookkeeping shared by the webhook handlers and live entities.
//!
//! - [`SensorRegistry`]: durable descriptors, one per store key
//! - [`PendingUpdateBuffer`]: transient latest push per store key
//! - [`SensorState`]: the rendered value of a live entity

pub mod descriptor;
pub mod pending;
pub mod registry;
pub mod state;

pub use descriptor::{SensorDescriptor, SensorKind, StoreKey};
pub use pending::{PendingUpdateBuffer, SensorUpdate};
pub use registry::SensorRegistry;
pub use state::SensorState;
