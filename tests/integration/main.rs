//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

// Host critical-section impl for the embassy-sync event queue.
use critical_section as _;

mod ingestion_tests;
mod mock_hw;
mod service_tests;
