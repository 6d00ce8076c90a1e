/// Guild quest lifecycle: creation under a guild and one-step progress advancement.
use log::{debug, info};
use sled::transaction::ConflictableTransactionResult;
use sled::Transactional;

use crate::game::errors::GameError;
use crate::game::progression::{advance_quest, QuestAdvance};
use crate::game::storage::{finish, tx_put, tx_require, GameStore};
use crate::game::types::{GuildRecord, QuestRecord, QuestType};
use crate::metrics;
use crate::notify::{GameEvent, NotificationChannel};
use crate::validation::{optional_description, require_title, InputError};

/// Fields accepted when creating a quest.
#[derive(Debug, Clone, Default)]
pub struct NewQuest {
    pub title: String,
    pub description: String,
    pub quest_type: QuestType,
    pub guild_id: String,
    pub goal: u32,
    pub reward_xp: u64,
    pub reward_gold: u64,
    pub reward_items: Vec<String>,
}

/// Create a quest and register it in its guild's quest set.
pub fn create_quest(store: &GameStore, request: NewQuest) -> Result<QuestRecord, GameError> {
    let title = require_title("title", &request.title)?;
    let description = optional_description(&request.description)?;
    if request.goal == 0 {
        return Err(InputError::NotPositive { field: "goal" }.into());
    }

    let mut quest = QuestRecord::new(&title, &request.guild_id, request.goal)
        .with_description(&description)
        .with_type(request.quest_type)
        .with_rewards(request.reward_xp, request.reward_gold);
    for item in &request.reward_items {
        quest = quest.with_reward_item(item);
    }

    let result = (store.guilds_tree(), store.quests_tree()).transaction(
        |(guilds, quests)| -> ConflictableTransactionResult<(), GameError> {
            let mut guild: GuildRecord = tx_require(guilds, &quest.guild_id)?;
            if !guild.quests.contains(&quest.id) {
                guild.quests.push(quest.id.clone());
            }
            tx_put(quests, &quest)?;
            tx_put(guilds, &guild)?;
            Ok(())
        },
    );
    finish(result)?;
    store.flush_committed();

    info!(
        "Quest '{}' created for guild {} (goal {})",
        quest.title, quest.guild_id, quest.goal
    );
    Ok(quest)
}

/// Apply one progress increment to `quest_id`, persist it, then notify observers.
///
/// Progress keeps counting past the goal; a completed quest stays completed.
pub fn advance_quest_progress(
    store: &GameStore,
    events: &dyn NotificationChannel,
    quest_id: &str,
) -> Result<QuestRecord, GameError> {
    let result = store.quests_tree().transaction(
        |quests| -> ConflictableTransactionResult<(QuestRecord, QuestAdvance), GameError> {
            let mut quest: QuestRecord = tx_require(quests, quest_id)?;
            let advance = advance_quest(&quest);
            advance.apply_to(&mut quest);
            tx_put(quests, &quest)?;
            Ok((quest, advance))
        },
    );
    let (quest, advance) = finish(result)?;
    store.flush_committed();

    metrics::record_quest_advance(advance.newly_completed);
    if advance.newly_completed {
        info!(
            "Quest '{}' completed ({}/{})",
            quest.title, quest.progress, quest.goal
        );
    } else if quest.is_completed() {
        debug!(
            "Quest '{}' already completed, progress {}/{}",
            quest.title, quest.progress, quest.goal
        );
    } else {
        info!(
            "Quest '{}' progress {}/{} ({})",
            quest.title, quest.progress, quest.goal, quest.status
        );
    }

    events.broadcast(GameEvent::QuestProgress(quest.clone()));
    Ok(quest)
}

pub fn list_quests(
    store: &GameStore,
    guild_id: Option<&str>,
) -> Result<Vec<QuestRecord>, GameError> {
    store.list_quests(guild_id)
}
