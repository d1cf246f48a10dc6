//! Level/XP progression.

/// Highest reachable character level.
pub const MAX_LEVEL: u8 = 20;
/// HP restored by each level gained.
pub const LEVEL_UP_HEAL: i32 = 10;

/// XP needed to advance out of `level`: floor(100 × (level+1) × 1.5).
pub fn xp_required(level: u8) -> u32 {
    (100 * (level as u32 + 1)) * 3 / 2
}

/// Max HP for a level: 100 + level × 10.
pub fn max_hp(level: u8) -> i32 {
    100 + level as i32 * 10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub level: u8,
    pub xp: u32,
    pub hp: i32,
    pub leveled_up: bool,
}

/// Apply an XP gain to (level, xp, hp).
///
/// Each level gained heals 10 HP, capped at the new max. Once the cap is hit the
/// remaining XP is kept but clamped below the cap's threshold.
pub fn apply_xp(level: u8, xp: u32, hp: i32, gained: u32) -> Progression {
    let mut new_level = level.min(MAX_LEVEL);
    let mut new_xp = xp.saturating_add(gained);
    let mut new_hp = hp;

    while new_level < MAX_LEVEL && new_xp >= xp_required(new_level) {
        new_xp -= xp_required(new_level);
        new_level += 1;
        new_hp = (new_hp + LEVEL_UP_HEAL).min(max_hp(new_level));
    }

    if new_level == MAX_LEVEL {
        new_xp = new_xp.min(xp_required(MAX_LEVEL) - 1);
    }

    Progression {
        level: new_level,
        xp: new_xp,
        hp: new_hp,
        leveled_up: new_level > level,
    }
}
