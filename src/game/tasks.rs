/// Task definitions: creation under a guild, listing and deletion.
///
/// Editing or deleting a task never touches existing completions; those carry
/// their own reward snapshot.
use log::info;

use crate::game::errors::GameError;
use crate::game::storage::GameStore;
use crate::game::types::{
    TaskFilter, TaskRecord, TaskType, DEFAULT_TASK_GOLD_REWARD, DEFAULT_TASK_XP_REWARD,
};
use crate::notify::{GameEvent, NotificationChannel};
use crate::validation::{optional_description, require_title};

/// Fields accepted when creating a task. Missing rewards fall back to the
/// defaults in [`TaskRecord::new`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub guild_id: String,
    pub xp_reward: Option<u64>,
    pub gold_reward: Option<u64>,
    pub created_by: Option<String>,
}

pub fn create_task(
    store: &GameStore,
    events: &dyn NotificationChannel,
    request: NewTask,
) -> Result<TaskRecord, GameError> {
    let title = require_title("title", &request.title)?;
    let description = optional_description(&request.description)?;
    if !store.guild_exists(&request.guild_id)? {
        return Err(GameError::not_found("guild", &request.guild_id));
    }

    let xp = request.xp_reward.unwrap_or(DEFAULT_TASK_XP_REWARD);
    let gold = request.gold_reward.unwrap_or(DEFAULT_TASK_GOLD_REWARD);
    let mut task = TaskRecord::new(&title, &request.guild_id)
        .with_description(&description)
        .with_type(request.task_type)
        .with_rewards(xp, gold);
    if let Some(user_id) = &request.created_by {
        task = task.created_by(user_id);
    }

    store.put_task(task.clone())?;
    info!(
        "Task '{}' ({}) created in guild {}: {} xp, {} gold",
        task.title, task.task_type, task.guild_id, task.xp_reward, task.gold_reward
    );
    events.broadcast(GameEvent::NewTask(task.clone()));
    Ok(task)
}

pub fn list_tasks(store: &GameStore, filter: &TaskFilter) -> Result<Vec<TaskRecord>, GameError> {
    store.list_tasks(filter)
}

pub fn delete_task(store: &GameStore, task_id: &str) -> Result<TaskRecord, GameError> {
    let task = store.delete_task(task_id)?;
    info!("Task '{}' deleted", task.title);
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::completion::complete_task;
    use crate::game::progression::ProgressionRules;
    use crate::game::storage::GameStoreBuilder;
    use crate::game::types::{CompletionFilter, GuildRecord, UserRecord};
    use crate::notify::NotificationHub;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, GameStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = GameStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    fn create_guild(store: &GameStore) -> GuildRecord {
        let guild = GuildRecord::new("Household", "");
        store.put_guild(guild.clone()).expect("put guild");
        guild
    }

    fn request(guild_id: &str, title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            guild_id: guild_id.to_string(),
            ..NewTask::default()
        }
    }

    #[test]
    fn test_create_task_defaults_and_event() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let mut sub = hub.subscribe();
        let guild = create_guild(&store);

        let task = create_task(&store, &hub, request(&guild.id, "Dishes")).unwrap();
        assert_eq!(task.task_type, TaskType::Daily);
        assert_eq!((task.xp_reward, task.gold_reward), (10, 5));
        assert_eq!(store.get_task(&task.id).unwrap(), task);

        match sub.try_recv() {
            Some(GameEvent::NewTask(announced)) => assert_eq!(announced.id, task.id),
            other => panic!("expected NEW_TASK, got {other:?}"),
        }
    }

    #[test]
    fn test_create_task_partial_reward_override() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let guild = create_guild(&store);

        let mut gold_only = request(&guild.id, "Windows");
        gold_only.gold_reward = Some(12);
        let task = create_task(&store, &hub, gold_only).unwrap();
        assert_eq!((task.xp_reward, task.gold_reward), (10, 12));

        let mut xp_only = request(&guild.id, "Gutters");
        xp_only.xp_reward = Some(40);
        let task = create_task(&store, &hub, xp_only).unwrap();
        assert_eq!((task.xp_reward, task.gold_reward), (40, 5));
    }

    #[test]
    fn test_create_task_rejects_bad_input() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let guild = create_guild(&store);

        let err = create_task(&store, &hub, request(&guild.id, "")).unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = create_task(&store, &hub, request("ghost", "Dishes")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.counts().tasks, 0);
    }

    #[test]
    fn test_list_and_delete() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let guild = create_guild(&store);
        let mut weekly = request(&guild.id, "Lawn");
        weekly.task_type = TaskType::Weekly;
        create_task(&store, &hub, request(&guild.id, "Dishes")).unwrap();
        let lawn = create_task(&store, &hub, weekly).unwrap();

        let filter = TaskFilter {
            guild_id: None,
            task_type: Some(TaskType::Weekly),
        };
        let listed = list_tasks(&store, &filter).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, lawn.id);

        delete_task(&store, &lawn.id).unwrap();
        assert!(delete_task(&store, &lawn.id).unwrap_err().is_not_found());
        assert_eq!(list_tasks(&store, &TaskFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_completions_keep_reward_snapshot() {
        let (_dir, store) = setup_test_store();
        let hub = NotificationHub::new();
        let rules = ProgressionRules::default();
        let guild = create_guild(&store);
        let user = store
            .insert_user(UserRecord::new("alice", "alice@example.com", "h"))
            .unwrap();
        let mut req = request(&guild.id, "Laundry");
        req.xp_reward = Some(20);
        let task = create_task(&store, &hub, req).unwrap();

        complete_task(&store, &hub, &rules, &task.id, &user.id).unwrap();
        store.put_task(task.clone().with_rewards(50, 5)).unwrap();
        complete_task(&store, &hub, &rules, &task.id, &user.id).unwrap();
        delete_task(&store, &task.id).unwrap();

        let mut gained: Vec<u64> = store
            .list_completions(&CompletionFilter::default())
            .unwrap()
            .iter()
            .map(|c| c.xp_gained)
            .collect();
        gained.sort_unstable();
        assert_eq!(gained, vec![20, 50]);
        assert_eq!(store.get_user(&user.id).unwrap().xp, 70);
    }
}
