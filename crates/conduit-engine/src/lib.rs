//! Cooperative tick scheduler for the resource network engine.
//!
//! The host calls [`Engine::step`] once per game tick and forwards block
//! placement and removal events. Everything else (distribution, transport,
//! registry cleanup, region scans) runs on configured intervals inside
//! `step`, and no failure escapes it.
//!
//! # Key Types
//!
//! - [`Engine`] -- Owns cross-tick state and runs the scheduled tasks.
//! - [`schedule::Schedule`] -- Decides which tasks are due on a tick.
//! - [`schedule::TickBudget`] -- Caps scan work per tick.
//! - [`cache::ActiveCache`] -- Energy-bearing blocks evaluated on
//!   distribution ticks.
//! - [`stats::EngineStats`] -- Cumulative counters, including contained
//!   failures.

pub mod cache;
pub mod engine;
pub mod schedule;
pub mod stats;

pub use engine::{Engine, Recovery, TickReport};
