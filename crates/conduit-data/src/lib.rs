//! Data-driven setup for the resource network engine.
//!
//! Loads the block catalog from `blocks.{ron,toml,json}` and the engine
//! configuration from `engine.{ron,toml,json}`.

pub mod loader;
pub mod schema;

pub use loader::{load_catalog, load_engine_config, load_engine_data, DataLoadError, EngineData};
