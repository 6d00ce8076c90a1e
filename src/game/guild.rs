use log::info;
use sled::transaction::ConflictableTransactionResult;
use sled::Transactional;

use crate::game::errors::GameError;
use crate::game::storage::{abort, finish, tx_put, tx_require, GameStore};
use crate::game::types::{GuildRecord, PublicUser, UserRecord};
use crate::metrics;
use crate::notify::{GameEvent, NotificationChannel};
use crate::validation::{optional_description, require_title};

pub fn create_guild(
    store: &GameStore,
    name: &str,
    description: &str,
) -> Result<GuildRecord, GameError> {
    let name = require_title("name", name)?;
    let description = optional_description(description)?;
    let guild = GuildRecord::new(&name, &description);
    store.put_guild(guild.clone())?;
    info!("Guild '{}' created ({})", guild.name, guild.id);
    Ok(guild)
}

pub fn list_guilds(store: &GameStore) -> Result<Vec<GuildRecord>, GameError> {
    store.list_guilds()
}

/// Members of a guild as public user views, in join order. Member ids whose
/// user record has disappeared are skipped.
pub fn guild_roster(store: &GameStore, guild_id: &str) -> Result<Vec<PublicUser>, GameError> {
    let guild = store.get_guild(guild_id)?;
    let mut roster = Vec::with_capacity(guild.members.len());
    for member in &guild.members {
        match store.get_user(member) {
            Ok(user) => roster.push(user.public()),
            Err(err) if err.is_not_found() => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(roster)
}

/// Add `user_id` to `guild_id`.
///
/// The member list and the user's `guild_id` are written in one transaction,
/// so the two sides of the membership never disagree. A user already in any
/// guild gets `Conflict` and nothing changes.
pub fn join_guild(
    store: &GameStore,
    events: &dyn NotificationChannel,
    guild_id: &str,
    user_id: &str,
) -> Result<GuildRecord, GameError> {
    let result = (store.guilds_tree(), store.users_tree()).transaction(
        |(guilds, users)| -> ConflictableTransactionResult<(GuildRecord, UserRecord), GameError> {
            let mut guild: GuildRecord = tx_require(guilds, guild_id)?;
            let mut user: UserRecord = tx_require(users, user_id)?;

            if guild.has_member(&user.id) {
                return Err(abort(GameError::Conflict(format!(
                    "user {} is already a member of guild {}",
                    user.username, guild.name
                ))));
            }
            if let Some(current) = &user.guild_id {
                return Err(abort(GameError::Conflict(format!(
                    "user {} already belongs to guild {}",
                    user.username, current
                ))));
            }

            guild.members.push(user.id.clone());
            user.guild_id = Some(guild.id.clone());
            user.touch();
            tx_put(guilds, &guild)?;
            tx_put(users, &user)?;
            Ok((guild, user))
        },
    );
    let (guild, user) = finish(result)?;
    store.flush_committed();

    metrics::record_guild_join(&guild.id, guild.members.len());
    info!(
        "User {} joined guild '{}' ({} members)",
        user.username,
        guild.name,
        guild.members.len()
    );
    events.broadcast(GameEvent::GuildJoined {
        guild: guild.clone(),
        user: user.public(),
    });
    Ok(guild)
}

/// Remove `user_id` from `guild_id`; `Conflict` when they are not a member.
pub fn leave_guild(
    store: &GameStore,
    events: &dyn NotificationChannel,
    guild_id: &str,
    user_id: &str,
) -> Result<GuildRecord, GameError> {
    let result = (store.guilds_tree(), store.users_tree()).transaction(
        |(guilds, users)| -> ConflictableTransactionResult<(GuildRecord, UserRecord), GameError> {
            let mut guild: GuildRecord = tx_require(guilds, guild_id)?;
            let mut user: UserRecord = tx_require(users, user_id)?;

            if !guild.has_member(&user.id) {
                return Err(abort(GameError::Conflict(format!(
                    "user {} is not a member of guild {}",
                    user.username, guild.name
                ))));
            }

            guild.members.retain(|m| m != &user.id);
            if user.guild_id.as_deref() == Some(guild.id.as_str()) {
                user.guild_id = None;
            }
            user.touch();
            tx_put(guilds, &guild)?;
            tx_put(users, &user)?;
            Ok((guild, user))
        },
    );
    let (guild, user) = finish(result)?;
    store.flush_committed();

    metrics::record_guild_leave(&guild.id, guild.members.len());
    info!("User {} left guild '{}'", user.username, guild.name);
    events.broadcast(GameEvent::GuildLeft {
        guild: guild.clone(),
        user: user.public(),
    });
    Ok(guild)
}
