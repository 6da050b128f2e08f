//! Category → physical unit lookup tables.
//!
//! Every setting the user can change is a small integer "category" so the
//! two-button menu and the command channel only ever carry one byte. The
//! tables below turn a category into millilitres, hours or milliseconds.
//!
//! Out-of-range categories never fail: they fall back to the highest
//! bucket. A corrupted NVS value therefore degrades to "biggest container,
//! most frequent, largest amount" instead of a crash loop.

/// Highest valid category for all tables.
pub const MAX_CATEGORY: u8 = 4;

/// Nominal pump throughput assumed by [`translate_amount`].
pub const PUMP_THROUGHPUT_ML_PER_S: u32 = 10;

/// Container capacity in mL, indexed by `category - 1` (IKEA 365+ boxes).
const CONTAINER_ML: [u32; MAX_CATEGORY as usize] = [2000, 4200, 5200, 10600];

/// Hours between waterings, indexed by `category - 1`.
const FREQUENCY_HOURS: [u32; MAX_CATEGORY as usize] = [96, 72, 48, 24];

/// Volume per watering in mL, indexed by `category - 1`.
const AMOUNT_ML: [u32; MAX_CATEGORY as usize] = [25, 50, 75, 100];

/// Watering interval of a pump slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Category 0: the slot never becomes due.
    Disabled,
    /// Water every `n` hours.
    Every(u32),
}

impl Frequency {
    pub fn hours(self) -> Option<u32> {
        match self {
            Self::Disabled => None,
            Self::Every(h) => Some(h),
        }
    }

    pub fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }
}

/// How long to run a pump and how much water that is assumed to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount {
    pub duration_ms: u32,
    pub volume_ml: u32,
}

/// Map a 1-based category onto a table index, clamping unknown values
/// to the last bucket.
fn bucket(category: u8) -> usize {
    if (1..=MAX_CATEGORY).contains(&category) {
        usize::from(category - 1)
    } else {
        usize::from(MAX_CATEGORY - 1)
    }
}

pub fn translate_container_size(category: u8) -> u32 {
    CONTAINER_ML[bucket(category)]
}

pub fn translate_frequency(category: u8) -> Frequency {
    if category == 0 {
        return Frequency::Disabled;
    }
    Frequency::Every(FREQUENCY_HOURS[bucket(category)])
}

pub fn translate_amount(category: u8) -> Amount {
    let volume_ml = AMOUNT_ML[bucket(category)];
    Amount {
        duration_ms: volume_ml * 1000 / PUMP_THROUGHPUT_ML_PER_S,
        volume_ml,
    }
}
