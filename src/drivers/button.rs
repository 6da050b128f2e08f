//! Polled, debounced menu button with short and long press detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch on [`BUTTON_GPIO`](crate::pins::BUTTON_GPIO)
//! with an external pull-up. The same pin is armed as the ext0 deep-sleep
//! wake source, so a press while asleep starts a wake cycle and a press
//! while awake is picked up by [`ButtonDriver::tick`] from the wake loop.
//!
//! ## Gestures
//!
//! | Gesture     | Condition               | Queued event                      |
//! |-------------|-------------------------|-----------------------------------|
//! | Short press | Release before 5 s      | `Event::UserActivity`             |
//! | Long press  | Hold >= 5 s             | `Event::Command(AppCommand::Refill)` |

use crate::app::commands::AppCommand;
use crate::events::Event;

const DEBOUNCE_MS: u64 = 50;
const LONG_PRESS_MS: u64 = 5000;

/// Button events emitted after gesture classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    ShortPress,
    LongPress,
}

impl ButtonEvent {
    /// Queue input for this gesture. A long press marks the tank refilled.
    pub fn into_event(self) -> Event {
        match self {
            Self::ShortPress => Event::UserActivity,
            Self::LongPress => Event::Command(AppCommand::Refill),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    DebounceWait { since_ms: u64 },
    Pressed { since_ms: u64 },
    /// Long press already reported; waiting for release.
    Held,
}

pub struct ButtonDriver {
    state: GestureState,
}

impl Default for ButtonDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ButtonDriver {
    pub fn new() -> Self {
        Self {
            state: GestureState::Idle,
        }
    }

    /// Feed one sample of the button level taken at `now_ms`.
    pub fn tick(&mut self, now_ms: u64, pressed: bool) -> Option<ButtonEvent> {
        match self.state {
            GestureState::Idle => {
                if pressed {
                    self.state = GestureState::DebounceWait { since_ms: now_ms };
                }
                None
            }

            GestureState::DebounceWait { since_ms } => {
                if !pressed {
                    self.state = GestureState::Idle;
                } else if now_ms.saturating_sub(since_ms) >= DEBOUNCE_MS {
                    self.state = GestureState::Pressed { since_ms };
                }
                None
            }

            GestureState::Pressed { since_ms } => {
                if now_ms.saturating_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::Held;
                    Some(ButtonEvent::LongPress)
                } else if !pressed {
                    self.state = GestureState::Idle;
                    Some(ButtonEvent::ShortPress)
                } else {
                    None
                }
            }

            GestureState::Held => {
                if !pressed {
                    self.state = GestureState::Idle;
                }
                None
            }
        }
    }
}

/// Current button level. `true` while held down.
pub fn is_pressed() -> bool {
    !crate::drivers::hw_init::gpio_read(crate::pins::BUTTON_GPIO)
}
