//! Live sensor entities and the synchronization protocol that creates them.
//!
//! Sensors reach the presentation layer along two racing paths: creation
//! events on the bus and a scan of the durable registry. An
//! [`EntityPlatform`] runs restore, then subscribe, then reconcile, and keeps
//! a `known` set so each store key yields exactly one [`SensorEntity`].
//! Entities drain the pending update buffer when they attach, so pushes that
//! arrived before them are not lost.

pub mod host;
pub mod platform;
pub mod recall;
pub mod sensor_entity;

pub use host::{EntityHost, LoggingSink};
pub use platform::{EntityPlatform, EntitySink, PriorEntity};
pub use recall::{load_prior, save_prior};
pub use sensor_entity::SensorEntity;
