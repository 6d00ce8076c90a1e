use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::game::errors::GameError;
use crate::game::storage::GameStore;
use crate::game::types::UserRecord;

pub const DEFAULT_LEADERBOARD_LIMIT: usize = 100;

/// One ranked row; `rank` starts at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub level: u32,
    pub xp: u64,
    pub gold: u64,
    pub guild_id: Option<String>,
}

fn standing(a: &UserRecord, b: &UserRecord) -> Ordering {
    b.level
        .cmp(&a.level)
        .then_with(|| b.xp.cmp(&a.xp))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Users ranked by level then XP, highest first; ties go to the older account.
pub fn leaderboard(
    store: &GameStore,
    guild_id: Option<&str>,
    limit: usize,
) -> Result<Vec<LeaderboardEntry>, GameError> {
    let mut users: Vec<UserRecord> = store
        .list_users()?
        .into_iter()
        .filter(|u| guild_id.map_or(true, |g| u.guild_id.as_deref() == Some(g)))
        .collect();
    users.sort_by(standing);

    Ok(users
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(idx, u)| LeaderboardEntry {
            rank: idx + 1,
            user_id: u.id,
            username: u.username,
            level: u.level,
            xp: u.xp,
            gold: u.gold,
            guild_id: u.guild_id,
        })
        .collect())
}
