/// Integration tests for delivering game events to observers running on
/// their own tasks.
use guildquest::game::{self, GameStoreBuilder, NewTask};
use guildquest::notify::{NotificationChannel, NotificationHub};
use std::sync::Arc;
use tokio::runtime::Runtime;

#[test]
fn observer_task_receives_new_task_event() {
    let rt = Runtime::new().unwrap();
    rt.block_on(async {
        let tmpdir = tempfile::tempdir().unwrap();
        let store = GameStoreBuilder::new(tmpdir.path()).open().unwrap();
        let hub = Arc::new(NotificationHub::new());
        let mut observer = hub.subscribe();

        let watcher = tokio::spawn(async move { observer.recv().await });

        let guild = game::create_guild(&store, "Household", "").unwrap();
        let task = game::create_task(
            &store,
            hub.as_ref(),
            NewTask {
                title: "Dishes".into(),
                guild_id: guild.id,
                ..NewTask::default()
            },
        )
        .unwrap();

        let event = watcher.await.unwrap().expect("event delivered");
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "NEW_TASK");
        assert_eq!(json["data"]["id"], task.id.as_str());
        assert_eq!(json["data"]["task_type"], "daily");
    });
}

#[test]
fn departed_observer_does_not_block_others() {
    let tmpdir = tempfile::tempdir().unwrap();
    let store = GameStoreBuilder::new(tmpdir.path()).open().unwrap();
    let hub = NotificationHub::new();
    let mut stays = hub.subscribe();
    let leaves = hub.subscribe();
    drop(leaves);

    let guild = game::create_guild(&store, "Household", "").unwrap();
    game::create_task(
        &store,
        &hub,
        NewTask {
            title: "Trash".into(),
            guild_id: guild.id,
            ..NewTask::default()
        },
    )
    .unwrap();

    assert_eq!(stays.drain().len(), 1);
    assert_eq!(hub.subscriber_count(), 1);
}

#[test]
fn failed_operation_broadcasts_nothing() {
    let tmpdir = tempfile::tempdir().unwrap();
    let store = GameStoreBuilder::new(tmpdir.path()).open().unwrap();
    let hub = NotificationHub::new();
    let mut observer = hub.subscribe();

    let err = game::create_task(
        &store,
        &hub,
        NewTask {
            title: "Orphan".into(),
            guild_id: "missing".into(),
            ..NewTask::default()
        },
    )
    .unwrap_err();
    assert!(err.is_not_found());
    assert!(game::advance_quest_progress(&store, &hub, "missing").is_err());
    assert!(observer.try_recv().is_none());
}
