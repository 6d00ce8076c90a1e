//! Guild game model: records, sled persistence, the pure progression rules and
//! the coordinators that tie them to the notification channel.
//!
//! Coordinators persist first and notify second; an operation that fails
//! leaves the store untouched and broadcasts nothing.

pub mod accounts;
pub mod completion;
pub mod errors;
pub mod guild;
pub mod leaderboard;
pub mod progression;
pub mod quest;
pub mod storage;
pub mod tasks;
pub mod types;

pub use accounts::{argon2_hasher, authenticate, get_user, list_users, register_user};
pub use completion::{complete_task, list_completions, user_stats, CompletionReceipt, UserStats};
pub use errors::GameError;
pub use guild::{create_guild, guild_roster, join_guild, leave_guild, list_guilds};
pub use leaderboard::{leaderboard, LeaderboardEntry, DEFAULT_LEADERBOARD_LIMIT};
pub use progression::{
    advance_quest, apply_task_reward, ProgressionRules, QuestAdvance, RewardOutcome,
    DEFAULT_XP_PER_LEVEL,
};
pub use quest::{advance_quest_progress, create_quest, list_quests, NewQuest};
pub use storage::{GameStore, GameStoreBuilder, StoreCounts};
pub use tasks::{create_task, delete_task, list_tasks, NewTask};
pub use types::*;
