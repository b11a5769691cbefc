// MissionLens library
// Read-only mission metadata and imagery gateway

pub mod api;
pub mod blob;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod error;
pub mod gateway;
pub mod kv;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod proxy;
pub mod transform;
