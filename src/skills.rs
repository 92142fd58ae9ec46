//! Skill levels carried across civilization loops.
//!
//! Every action trains one skill. Levels shorten action durations and boost
//! their output, and they never reset between runs.

use serde::{Deserialize, Serialize};

const BASE_XP_PER_LEVEL: f64 = 100.0;
const XP_GROWTH: f64 = 1.2;
const DURATION_STEP: f64 = 0.03;
const MIN_DURATION_MULTIPLIER: f64 = 0.25;
const OUTPUT_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Farming,
    Building,
    Research,
    Military,
}

impl SkillKind {
    pub const ALL: [SkillKind; 4] = [
        SkillKind::Farming,
        SkillKind::Building,
        SkillKind::Research,
        SkillKind::Military,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SkillKind::Farming => "farming",
            SkillKind::Building => "building",
            SkillKind::Research => "research",
            SkillKind::Military => "military",
        }
    }
}

/// Level plus the experience gathered toward the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillState {
    pub level: u32,
    pub xp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skills {
    pub farming: SkillState,
    pub building: SkillState,
    pub research: SkillState,
    pub military: SkillState,
}

impl Skills {
    pub fn get(&self, kind: SkillKind) -> SkillState {
        match kind {
            SkillKind::Farming => self.farming,
            SkillKind::Building => self.building,
            SkillKind::Research => self.research,
            SkillKind::Military => self.military,
        }
    }

    fn get_mut(&mut self, kind: SkillKind) -> &mut SkillState {
        match kind {
            SkillKind::Farming => &mut self.farming,
            SkillKind::Building => &mut self.building,
            SkillKind::Research => &mut self.research,
            SkillKind::Military => &mut self.military,
        }
    }

    pub fn level(&self, kind: SkillKind) -> u32 {
        self.get(kind).level
    }

    /// Award experience to one skill. Returns the number of levels gained.
    pub fn award(&mut self, kind: SkillKind, amount: f64) -> u32 {
        let slot = self.get_mut(kind);
        let before = slot.level;
        *slot = add_xp(*slot, amount);
        slot.level - before
    }
}

/// Experience required to go from `level` to `level + 1`.
pub fn xp_to_next_level(level: u32) -> f64 {
    BASE_XP_PER_LEVEL * XP_GROWTH.powi(level.min(i32::MAX as u32) as i32)
}

/// Add experience, crossing as many level thresholds as it pays for.
pub fn add_xp(state: SkillState, amount: f64) -> SkillState {
    if !amount.is_finite() || amount <= 0.0 {
        return state;
    }
    let mut next = state;
    next.xp += amount;
    loop {
        let needed = xp_to_next_level(next.level);
        if next.xp < needed {
            break;
        }
        next.xp -= needed;
        next.level += 1;
    }
    next
}

/// Factor applied to an action's base duration. Never drops below 0.25.
pub fn duration_multiplier(level: u32) -> f64 {
    (1.0 - DURATION_STEP * level as f64).max(MIN_DURATION_MULTIPLIER)
}

/// Factor applied to an action's output.
pub fn output_multiplier(level: u32) -> f64 {
    1.0 + OUTPUT_STEP * level as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_xp_crosses_multiple_levels() {
        let state = add_xp(SkillState::default(), 100.0 + 120.0 + 5.0);
        assert_eq!(state.level, 2);
        assert!((state.xp - 5.0).abs() < 1e-9);
    }

    #[test]
    fn add_xp_ignores_invalid_amounts() {
        let state = SkillState { level: 3, xp: 12.0 };
        assert_eq!(add_xp(state, -4.0), state);
        assert_eq!(add_xp(state, f64::NAN), state);
    }

    #[test]
    fn duration_multiplier_has_a_floor() {
        assert_eq!(duration_multiplier(0), 1.0);
        assert!(duration_multiplier(10) < duration_multiplier(5));
        assert_eq!(duration_multiplier(500), 0.25);
    }

    #[test]
    fn award_reports_levels_gained() {
        let mut skills = Skills::default();
        assert_eq!(skills.award(SkillKind::Military, 50.0), 0);
        assert_eq!(skills.award(SkillKind::Military, 50.0), 1);
        assert_eq!(skills.level(SkillKind::Military), 1);
        assert_eq!(skills.level(SkillKind::Farming), 0);
        assert!(output_multiplier(1) > output_multiplier(0));
    }
}
