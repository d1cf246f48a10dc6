//! Process-wide game counters.
//! Read through [`snapshot`] by the `status` command and tests.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::game::encounter::EncounterOrigin;

static VICTORIES: AtomicU64 = AtomicU64::new(0);
static DEFEATS: AtomicU64 = AtomicU64::new(0);
static FLEES: AtomicU64 = AtomicU64::new(0);
static EXPIRED: AtomicU64 = AtomicU64::new(0);
static ABANDONED: AtomicU64 = AtomicU64::new(0);
static LOOT_FOUND: AtomicU64 = AtomicU64::new(0);
static COMMANDS: AtomicU64 = AtomicU64::new(0);
static COMMAND_ERRORS: AtomicU64 = AtomicU64::new(0);

static ENCOUNTER_COUNTERS: OnceLock<Mutex<HashMap<String, EncounterCounter>>> = OnceLock::new();

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncounterResult {
    Victory,
    Defeat,
    Fled,
    Expired,
    /// Dropped unresolved, e.g. the character was deleted mid-fight.
    Abandoned,
}

/// Per-origin session counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncounterCounter {
    pub started: u64,
    pub finished: u64,
    pub currently_active: u64,
    pub concurrent_peak: u64,
}

fn encounter_counter_lock() -> MutexGuard<'static, HashMap<String, EncounterCounter>> {
    ENCOUNTER_COUNTERS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn record_encounter_started(origin: EncounterOrigin) -> EncounterCounter {
    let mut guard = encounter_counter_lock();
    let counter = guard.entry(origin.as_str().to_string()).or_default();
    counter.started = counter.started.saturating_add(1);
    counter.currently_active = counter.currently_active.saturating_add(1);
    if counter.currently_active > counter.concurrent_peak {
        counter.concurrent_peak = counter.currently_active;
    }
    *counter
}

pub fn record_encounter_finished(origin: EncounterOrigin, result: EncounterResult) {
    let counter = match result {
        EncounterResult::Victory => &VICTORIES,
        EncounterResult::Defeat => &DEFEATS,
        EncounterResult::Fled => &FLEES,
        EncounterResult::Expired => &EXPIRED,
        EncounterResult::Abandoned => &ABANDONED,
    };
    counter.fetch_add(1, Ordering::Relaxed);
    let mut guard = encounter_counter_lock();
    let c = guard.entry(origin.as_str().to_string()).or_default();
    c.finished = c.finished.saturating_add(1);
    c.currently_active = c.currently_active.saturating_sub(1);
}

pub fn inc_loot_found() {
    LOOT_FOUND.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_commands(failed: bool) {
    COMMANDS.fetch_add(1, Ordering::Relaxed);
    if failed {
        COMMAND_ERRORS.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn encounter_counters_snapshot() -> HashMap<String, EncounterCounter> {
    encounter_counter_lock().clone()
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub encounters_started: u64,
    pub victories: u64,
    pub defeats: u64,
    pub flees: u64,
    pub expired: u64,
    pub abandoned: u64,
    pub loot_found: u64,
    pub commands: u64,
    pub command_errors: u64,
    /// Share of finished fights that were won, if any finished.
    pub win_rate: Option<f64>,
}

pub fn snapshot() -> Snapshot {
    let victories = VICTORIES.load(Ordering::Relaxed);
    let defeats = DEFEATS.load(Ordering::Relaxed);
    let decided = victories + defeats;
    Snapshot {
        encounters_started: encounter_counters_snapshot()
            .values()
            .map(|c| c.started)
            .sum(),
        victories,
        defeats,
        flees: FLEES.load(Ordering::Relaxed),
        expired: EXPIRED.load(Ordering::Relaxed),
        abandoned: ABANDONED.load(Ordering::Relaxed),
        loot_found: LOOT_FOUND.load(Ordering::Relaxed),
        commands: COMMANDS.load(Ordering::Relaxed),
        command_errors: COMMAND_ERRORS.load(Ordering::Relaxed),
        win_rate: if decided > 0 {
            Some(victories as f64 / decided as f64)
        } else {
            None
        },
    }
}
