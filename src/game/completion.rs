/// Task completion: the reward path from "user finished a chore" to persisted
/// XP/gold/level and the observer notification.
///
/// The task read, completion insert and user rewrite happen inside one sled
/// transaction over the tasks, users and completions trees, so two completions
/// racing for the same user both land (sled retries the loser) and a missing
/// task or user leaves every tree untouched.
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionResult;
use sled::Transactional;

use crate::game::errors::GameError;
use crate::game::progression::{apply_task_reward, ProgressionRules, RewardOutcome};
use crate::game::storage::{finish, tx_put, tx_require, GameStore};
use crate::game::types::{CompletionFilter, CompletionRecord, PublicUser, TaskRecord, UserRecord};
use crate::metrics;
use crate::notify::{GameEvent, NotificationChannel};

/// What a successful completion hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionReceipt {
    pub completion: CompletionRecord,
    pub user: PublicUser,
    #[serde(skip)]
    pub previous_level: u32,
}

impl CompletionReceipt {
    pub fn leveled_up(&self) -> bool {
        self.user.level > self.previous_level
    }
}

/// Record that `user_id` finished `task_id` and grant the task's reward.
///
/// Every call grants a fresh reward; callers that want one completion per
/// period must check [`GameStore::list_completions`] first.
pub fn complete_task(
    store: &GameStore,
    events: &dyn NotificationChannel,
    rules: &ProgressionRules,
    task_id: &str,
    user_id: &str,
) -> Result<CompletionReceipt, GameError> {
    let result = (
        store.tasks_tree(),
        store.users_tree(),
        store.completions_tree(),
    )
        .transaction(|(tasks, users, completions)| -> ConflictableTransactionResult<_, GameError> {
            let task: TaskRecord = tx_require(tasks, task_id)?;
            let mut user: UserRecord = tx_require(users, user_id)?;

            let outcome = apply_task_reward(rules, &user, &task);
            let completion = CompletionRecord::snapshot(&task, &user.id);
            outcome.apply_to(&mut user);
            user.touch();

            tx_put(completions, &completion)?;
            tx_put(users, &user)?;
            Ok((completion, user, outcome))
        });
    let (completion, user, outcome): (CompletionRecord, UserRecord, RewardOutcome) =
        finish(result)?;
    store.flush_committed();

    metrics::record_completion(
        completion.xp_gained,
        completion.gold_gained,
        outcome.levels_gained,
    );
    info!(
        "User {} completed task {} (+{} xp, +{} gold, level {})",
        user.username, completion.task_id, completion.xp_gained, completion.gold_gained, user.level
    );

    let public = user.public();
    events.broadcast(GameEvent::TaskCompleted {
        completion: completion.clone(),
        user: public.clone(),
    });
    if outcome.leveled_up() {
        info!(
            "User {} leveled up {} -> {}",
            user.username, outcome.previous_level, outcome.level
        );
        events.broadcast(GameEvent::LevelUp {
            user: public.clone(),
            previous_level: outcome.previous_level,
            level: outcome.level,
        });
    }

    Ok(CompletionReceipt {
        completion,
        user: public,
        previous_level: outcome.previous_level,
    })
}

/// Completions matching the filter, newest first.
pub fn list_completions(
    store: &GameStore,
    filter: &CompletionFilter,
) -> Result<Vec<CompletionRecord>, GameError> {
    store.list_completions(filter)
}

/// Lifetime totals for one user, summed from completion snapshots.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStats {
    pub total_tasks: usize,
    pub total_xp: u64,
    pub total_gold: u64,
}

pub fn user_stats(store: &GameStore, user_id: &str) -> Result<UserStats, GameError> {
    let user = store.get_user(user_id)?;
    let completions = store.list_completions(&CompletionFilter {
        user_id: Some(user.id.clone()),
        task_id: None,
    })?;
    let stats = completions
        .iter()
        .fold(UserStats::default(), |mut acc, c| {
            acc.total_tasks += 1;
            acc.total_xp = acc.total_xp.saturating_add(c.xp_gained);
            acc.total_gold = acc.total_gold.saturating_add(c.gold_gained);
            acc
        });
    debug!(
        "Stats for {}: {} tasks, {} xp, {} gold",
        user.username, stats.total_tasks, stats.total_xp, stats.total_gold
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::storage::GameStoreBuilder;
    use crate::game::types::GuildRecord;
    use crate::notify::NotificationHub;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    fn create_user(store: &GameStore, name: &str) -> UserRecord {
        store
            .insert_user(UserRecord::new(name, &format!("{name}@example.com"), "hash"))
            .expect("insert user")
    }

    fn create_task(store: &GameStore, xp: u64, gold: u64) -> TaskRecord {
        let guild = GuildRecord::new("Household", "");
        store.put_guild(guild.clone()).expect("put guild");
        let task = TaskRecord::new("Dishes", &guild.id).with_rewards(xp, gold);
        store.put_task(task.clone()).expect("put task");
        task
    }

    #[test]
    fn test_complete_task_grants_reward() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let user = create_user(&store, "alice");
        let task = create_task(&store, 30, 12);

        let receipt =
            complete_task(&store, &hub, &ProgressionRules::default(), &task.id, &user.id).unwrap();
        assert_eq!(receipt.user.xp, 30);
        assert_eq!(receipt.user.gold, 12);
        assert_eq!(receipt.user.level, 1);
        assert!(!receipt.leveled_up());
        assert_eq!(receipt.completion.xp_gained, 30);

        let stored = store.get_user(&user.id).unwrap();
        assert_eq!((stored.xp, stored.gold), (30, 12));
        assert_eq!(
            store.get_completion(&receipt.completion.id).unwrap(),
            receipt.completion
        );
    }

    #[test]
    fn test_missing_task_is_not_found_and_mutates_nothing() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();
        let user = create_user(&store, "alice");

        let err = complete_task(&store, &hub, &ProgressionRules::default(), "ghost", &user.id)
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.counts().completions, 0);
        assert_eq!(store.get_user(&user.id).unwrap(), user);
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_missing_user_is_not_found() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let task = create_task(&store, 10, 5);
        let err = complete_task(&store, &hub, &ProgressionRules::default(), &task.id, "ghost")
            .unwrap_err();
        assert!(matches!(err, GameError::NotFound { entity: "user", .. }));
        assert_eq!(store.counts().completions, 0);
    }

    #[test]
    fn test_level_up_emits_two_events() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();
        let user = create_user(&store, "alice");
        let task = create_task(&store, 300, 0);

        let receipt =
            complete_task(&store, &hub, &ProgressionRules::default(), &task.id, &user.id).unwrap();
        assert_eq!(receipt.user.level, 3);
        assert_eq!(receipt.user.xp, 0);
        assert!(receipt.leveled_up());

        let events = sub.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type(), "TASK_COMPLETED");
        match &events[1] {
            GameEvent::LevelUp {
                previous_level,
                level,
                ..
            } => assert_eq!((*previous_level, *level), (1, 3)),
            other => panic!("expected level up, got {other:?}"),
        }
    }

    #[test]
    fn test_user_stats_sum_snapshots() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let rules = ProgressionRules::default();
        let user = create_user(&store, "alice");
        let task = create_task(&store, 10, 5);
        for _ in 0..3 {
            complete_task(&store, &hub, &rules, &task.id, &user.id).unwrap();
        }
        let stats = user_stats(&store, &user.id).unwrap();
        assert_eq!(
            stats,
            UserStats {
                total_tasks: 3,
                total_xp: 30,
                total_gold: 15
            }
        );
        assert!(user_stats(&store, "ghost").unwrap_err().is_not_found());
    }
}
