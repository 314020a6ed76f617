pub mod config;
pub mod entity;
pub mod error;
pub mod registry;
pub mod time;

pub use config::PollerConfig;
pub use entity::*;
pub use error::*;
pub use registry::{new_shared_registry, Registry, SharedRegistry};
pub use time::Timestamp;
