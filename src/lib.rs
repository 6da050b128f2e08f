//! Plant Nanny firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

#[cfg(test)]
use critical_section as _;

pub mod app;
pub mod battery;
pub mod config;
pub mod error;
pub mod events;
pub mod pins;
pub mod power;
pub mod schedule;
pub mod scheduler;
pub mod topics;

// The ESP-IDF adapters and drivers compile on the host too; their
// hardware bodies are swapped for simulations by cfg attributes inside.
pub mod adapters;
pub mod drivers;
