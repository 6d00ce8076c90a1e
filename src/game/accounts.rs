/// Account registration and credential checks.
///
/// Passwords are hashed with Argon2id; the hash never leaves this module in a
/// [`PublicUser`]. Unknown email and wrong password are indistinguishable to
/// the caller.
use argon2::{Algorithm, Argon2, Params, Version};
use log::{info, warn};
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::game::errors::GameError;
use crate::game::storage::GameStore;
use crate::game::types::{PublicUser, UserRecord};
use crate::validation::{validate_email, validate_password, validate_username, UsernameRules};

/// Build an Argon2id hasher, falling back to the library defaults for any
/// parameter left unset or when the combination is rejected.
pub fn argon2_hasher(
    memory_kib: Option<u32>,
    time_cost: Option<u32>,
    parallelism: Option<u32>,
) -> Argon2<'static> {
    let defaults = Params::DEFAULT;
    let mem = memory_kib.unwrap_or(defaults.m_cost());
    let time = time_cost.unwrap_or(defaults.t_cost());
    let para = parallelism.unwrap_or(defaults.p_cost());
    match Params::new(mem, time, para, None) {
        Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        Err(e) => {
            warn!("Invalid argon2 parameters ({e}); using defaults");
            Argon2::default()
        }
    }
}

pub fn register_user(
    store: &GameStore,
    argon: &Argon2<'_>,
    username: &str,
    email: &str,
    password: &str,
) -> Result<PublicUser, GameError> {
    let username = validate_username(username, &UsernameRules::default())?;
    let email = validate_email(email)?;
    validate_password(password)?;

    let salt = SaltString::generate(&mut rand::thread_rng());
    let hash = argon
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| GameError::PasswordHash(format!("password hash failure: {e}")))?;

    let user = store.insert_user(UserRecord::new(&username, &email, &hash.to_string()))?;
    info!("Registered user {} ({})", user.username, user.id);
    Ok(user.public())
}

pub fn authenticate(
    store: &GameStore,
    argon: &Argon2<'_>,
    email: &str,
    password: &str,
) -> Result<PublicUser, GameError> {
    let Some(user) = store.find_user_by_email(email)? else {
        return Err(GameError::InvalidCredentials);
    };
    let parsed = PasswordHash::new(&user.password_hash)
        .map_err(|e| GameError::PasswordHash(format!("corrupt password hash: {e}")))?;
    if argon.verify_password(password.as_bytes(), &parsed).is_err() {
        warn!("Failed login for {}", user.username);
        return Err(GameError::InvalidCredentials);
    }
    Ok(user.public())
}

pub fn get_user(store: &GameStore, user_id: &str) -> Result<PublicUser, GameError> {
    Ok(store.get_user(user_id)?.public())
}

/// All users, oldest first, optionally restricted to one guild.
pub fn list_users(store: &GameStore, guild_id: Option<&str>) -> Result<Vec<PublicUser>, GameError> {
    let mut users: Vec<UserRecord> = store
        .list_users()?
        .into_iter()
        .filter(|u| guild_id.map_or(true, |g| u.guild_id.as_deref() == Some(g)))
        .collect();
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(users.iter().map(PublicUser::from).collect())
}
