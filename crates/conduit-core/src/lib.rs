//! Conduit Core -- spatial model, classification and discovery for resource
//! networks in a voxel world.
//!
//! Everything the energy and item engines build on lives here: coordinates,
//! the block catalog, the world and durable-store interfaces, node
//! classification and bounded network discovery.
//!
//! # Key Types
//!
//! - [`coord::Location`] -- Integer coordinate plus dimension; the canonical map key.
//! - [`catalog::BlockCatalog`] -- Frozen table of block types and their
//!   capability bitsets, built with [`catalog::CatalogBuilder`].
//! - [`world::World`] -- World query interface; [`world::GridWorld`] is the
//!   in-memory implementation.
//! - [`store::KvStore`] -- Durable key-value interface; [`store::MemoryStore`]
//!   snapshots to `bitcode`.
//! - [`node::Classifier`] -- Turns a cell into a [`node::Node`].
//! - [`discovery::discover`] -- Bounded BFS producing a [`discovery::Network`].
//! - [`error::EngineError`] -- Error taxonomy shared by every engine task.

pub mod catalog;
pub mod config;
pub mod coord;
pub mod discovery;
pub mod error;
pub mod id;
pub mod item;
pub mod keys;
pub mod node;
pub mod store;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
