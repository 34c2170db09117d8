//! Item logistics for conduit networks.
//!
//! Output item conduits ("transport sources") pull one item at a time from
//! adjacent inventories and push it into the inventories reachable over
//! item pipes.
//!
//! # Key Types
//!
//! - [`registry::TransportRegistry`] -- Durable set of known sources with
//!   restart recovery and periodic validation.
//! - [`fairness::FairnessIndex`] -- Per-network round-robin offsets.
//! - [`scan::ScanCursor`] -- Resumable region scan that finds sources in
//!   newly loaded areas.
//! - [`transport::ItemTransport`] -- One transport cycle over all sources.

pub mod fairness;
pub mod registry;
pub mod scan;
pub mod transport;
