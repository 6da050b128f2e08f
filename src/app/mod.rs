//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules for Plant Nanny: the wake
//! cycle, command handling and telemetry assembly. Scheduling maths lives
//! in [`crate::schedule`] and [`crate::scheduler`]. All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
