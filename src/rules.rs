//! Fixed rules of the simulation.
//!
//! Every run plays against the same timeline, so these are constants rather
//! than per-run configuration.

/// Year at which a run that is still going counts as a victory.
pub const MAX_YEAR: u32 = 1000;

pub const RAIDER_YEAR: u32 = 50;
/// Combined military strength and wall defense needed to repel the raiders.
pub const RAIDER_DEFENSE_THRESHOLD: f64 = 25.0;
pub const RAIDER_REWARD_FOOD: f64 = 40.0;
pub const RAIDER_REWARD_WOOD: f64 = 20.0;
pub const RAIDER_XP_BONUS: f64 = 50.0;

/// First year of the long winter.
pub const WINTER_START_YEAR: u32 = 200;
/// First year after the long winter.
pub const WINTER_END_YEAR: u32 = 450;

pub const FOOD_PER_POP: f64 = 1.0;
pub const WINTER_FOOD_FACTOR: f64 = 2.0;
/// Food needed on top of a year's consumption before the population grows.
pub const GROWTH_SURPLUS: f64 = 10.0;
/// Spoilage is `food^2 / (SPOILAGE_K * food_storage)`.
pub const SPOILAGE_K: f64 = 10.0;

pub const XP_PER_TICK: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub winter: bool,
    pub raider_year: bool,
}

impl Season {
    pub fn for_year(year: u32) -> Self {
        Self {
            winter: (WINTER_START_YEAR..WINTER_END_YEAR).contains(&year),
            raider_year: year == RAIDER_YEAR,
        }
    }

    pub fn food_per_pop(self) -> f64 {
        if self.winter {
            FOOD_PER_POP * WINTER_FOOD_FACTOR
        } else {
            FOOD_PER_POP
        }
    }
}
