//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT command
//! topics, the local menu) that the [`AppService`](super::service::AppService)
//! validates and writes through to NVS.
//!
//! Payloads are carried exactly as parsed. Range checks happen in the
//! service so a rejected command can be reported with the offending value.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// `command-container`: container size category.
    SetContainerSize(i32),

    /// `command-water`: override the remaining-water estimate (mL).
    SetRemainingWater(i32),

    /// `<pump>/command-freq`: frequency category. `pump` is 1-based.
    SetFrequency { pump: i32, category: i32 },

    /// `<pump>/command-wait`: hours until the next watering.
    SetNextDue { pump: i32, hours: i32 },

    /// `<pump>/command-amount`: amount category.
    SetAmount { pump: i32, category: i32 },

    /// Local menu: the container was filled to the brim.
    Refill,
}
