//! # Guildquest - Reward and Progression Engine for Guild Task Tracking
//!
//! Guildquest turns household and team chores into a small RPG: users belong
//! to a guild, complete recurring tasks for XP and gold, level up, and push
//! shared guild quests toward their goal. Every change that matters to other
//! players is announced on a notification channel.
//!
//! ## Features
//!
//! - **Task Completion**: Atomic reward grant with immutable reward snapshots per completion.
//! - **Leveling**: Threshold loop (`level * xp_per_level`) that handles multi-level jumps.
//! - **Guild Quests**: Shared counters that flip to completed once the goal is reached.
//! - **Guild Membership**: One guild per user, joined and left in a single transaction.
//! - **Notifications**: Injected fan-out channel with `{"type", "data"}` JSON events.
//! - **Accounts**: Argon2id password hashing and credential checks.
//! - **Persistence**: Sled trees with bincode records and schema versioning.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guildquest::game::{self, GameStore, NewTask, ProgressionRules};
//! use guildquest::notify::{NotificationChannel, NotificationHub};
//!
//! fn main() -> Result<(), guildquest::game::GameError> {
//!     let store = GameStore::open("./data/guildquest.db")?;
//!     let hub = NotificationHub::new();
//!     let mut observer = hub.subscribe();
//!
//!     let guild = game::create_guild(&store, "Household", "")?;
//!     let argon = game::argon2_hasher(None, None, None);
//!     let user = game::register_user(&store, &argon, "alice", "alice@example.com", "hunter2hunter2")?;
//!     game::join_guild(&store, &hub, &guild.id, &user.id)?;
//!
//!     let task = game::create_task(&store, &hub, NewTask {
//!         title: "Dishes".into(),
//!         guild_id: guild.id.clone(),
//!         ..NewTask::default()
//!     })?;
//!     let receipt = game::complete_task(&store, &hub, &ProgressionRules::default(), &task.id, &user.id)?;
//!     println!("{} is level {}", receipt.user.username, receipt.user.level);
//!
//!     for event in observer.drain() {
//!         println!("{}", event.event_type());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Records, storage, progression rules and the operation coordinators
//! - [`notify`] - Notification channel trait and the in-process hub
//! - [`config`] - TOML configuration
//! - [`validation`] - Input validation and sanitization utilities
//! - [`metrics`] - Process-wide counters

pub mod config;
pub mod game;
pub mod metrics;
pub mod notify;
pub mod validation;
