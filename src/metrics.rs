//! Process-wide counters for the reward engine and notification fan-out.
//! Exposed through [`snapshot`] for the `status` command.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static TASKS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static XP_GRANTED: AtomicU64 = AtomicU64::new(0);
static GOLD_GRANTED: AtomicU64 = AtomicU64::new(0);
static LEVELS_GAINED: AtomicU64 = AtomicU64::new(0);
static QUEST_ADVANCES: AtomicU64 = AtomicU64::new(0);
static QUESTS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static EVENTS_DELIVERED: AtomicU64 = AtomicU64::new(0);
static EVENTS_DROPPED: AtomicU64 = AtomicU64::new(0);

static GUILD_COUNTERS: OnceLock<Mutex<HashMap<String, GuildCounter>>> = OnceLock::new();

pub fn record_completion(xp: u64, gold: u64, levels_gained: u32) {
    TASKS_COMPLETED.fetch_add(1, Ordering::Relaxed);
    XP_GRANTED.fetch_add(xp, Ordering::Relaxed);
    GOLD_GRANTED.fetch_add(gold, Ordering::Relaxed);
    LEVELS_GAINED.fetch_add(u64::from(levels_gained), Ordering::Relaxed);
}

pub fn record_quest_advance(newly_completed: bool) {
    QUEST_ADVANCES.fetch_add(1, Ordering::Relaxed);
    if newly_completed {
        QUESTS_COMPLETED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_event_delivery(delivered: u64, dropped: u64) {
    EVENTS_DELIVERED.fetch_add(delivered, Ordering::Relaxed);
    EVENTS_DROPPED.fetch_add(dropped, Ordering::Relaxed);
}

/// Membership churn per guild id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GuildCounter {
    pub joins: u64,
    pub leaves: u64,
    pub current_members: u64,
    pub peak_members: u64,
}

fn guild_counter_lock() -> &'static Mutex<HashMap<String, GuildCounter>> {
    GUILD_COUNTERS.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn record_guild_join(guild_id: &str, member_count: usize) -> GuildCounter {
    let mut guard = guild_counter_lock()
        .lock()
        .expect("guild counter mutex poisoned");
    let counter = guard.entry(guild_id.to_string()).or_default();
    counter.joins = counter.joins.saturating_add(1);
    counter.current_members = member_count as u64;
    if counter.current_members > counter.peak_members {
        counter.peak_members = counter.current_members;
    }
    *counter
}

/// Entries are dropped once a guild has no members left, so the map only
/// holds guilds that currently have someone in them.
pub fn record_guild_leave(guild_id: &str, member_count: usize) -> GuildCounter {
    let mut guard = guild_counter_lock()
        .lock()
        .expect("guild counter mutex poisoned");
    let counter = guard.entry(guild_id.to_string()).or_default();
    counter.leaves = counter.leaves.saturating_add(1);
    counter.current_members = member_count as u64;
    let last = *counter;
    if member_count == 0 {
        guard.remove(guild_id);
    }
    last
}

pub fn guild_counters_snapshot() -> HashMap<String, GuildCounter> {
    guild_counter_lock()
        .lock()
        .expect("guild counter mutex poisoned")
        .clone()
}

#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub tasks_completed: u64,
    pub xp_granted: u64,
    pub gold_granted: u64,
    pub levels_gained: u64,
    pub quest_advances: u64,
    pub quests_completed: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        tasks_completed: TASKS_COMPLETED.load(Ordering::Relaxed),
        xp_granted: XP_GRANTED.load(Ordering::Relaxed),
        gold_granted: GOLD_GRANTED.load(Ordering::Relaxed),
        levels_gained: LEVELS_GAINED.load(Ordering::Relaxed),
        quest_advances: QUEST_ADVANCES.load(Ordering::Relaxed),
        quests_completed: QUESTS_COMPLETED.load(Ordering::Relaxed),
        events_delivered: EVENTS_DELIVERED.load(Ordering::Relaxed),
        events_dropped: EVENTS_DROPPED.load(Ordering::Relaxed),
    }
}
