//! Input validation for account fields and free-text record fields

use std::collections::HashSet;

use crate::game::errors::GameError;

/// Username validation errors with helpful messages
#[derive(Debug, thiserror::Error)]
pub enum UsernameError {
    #[error("Username is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Username is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Username cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Username contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Username is a reserved system name")]
    Reserved,
}

/// Errors for the remaining user-supplied fields
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{field} is required")]
    Missing { field: &'static str },

    #[error("{field} is too long (maximum {max} characters)")]
    TooLong { field: &'static str, max: usize },

    #[error("Email address is malformed")]
    InvalidEmail,

    #[error("Password too short (minimum {min} characters)")]
    PasswordTooShort { min: usize },

    #[error("Password too long (maximum {max} characters)")]
    PasswordTooLong { max: usize },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error(transparent)]
    Username(#[from] UsernameError),
}

impl From<InputError> for GameError {
    fn from(err: InputError) -> Self {
        GameError::Validation(err.to_string())
    }
}

impl From<UsernameError> for GameError {
    fn from(err: UsernameError) -> Self {
        GameError::Validation(err.to_string())
    }
}

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;
pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Username validation rules configuration
#[derive(Debug, Clone)]
pub struct UsernameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl Default for UsernameRules {
    fn default() -> Self {
        UsernameRules {
            min_length: 2,
            max_length: 30,
            allow_spaces: false,
            allow_unicode: true,
        }
    }
}

/// Get set of reserved usernames that should not be allowed
fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "operator", "moderator",
        "guest", "anonymous", "guildmaster", "everyone", "null", "undefined",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a username according to the given rules
pub fn validate_username(username: &str, rules: &UsernameRules) -> Result<String, UsernameError> {
    let trimmed = username.trim();

    if trimmed.chars().count() < rules.min_length {
        return Err(UsernameError::TooShort {
            min: rules.min_length,
        });
    }
    if trimmed.chars().count() > rules.max_length {
        return Err(UsernameError::TooLong {
            max: rules.max_length,
        });
    }
    if trimmed != username {
        return Err(UsernameError::InvalidWhitespace);
    }
    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(UsernameError::Reserved);
    }

    let invalid: HashSet<char> = trimmed
        .chars()
        .filter(|&ch| {
            let valid = if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '.' {
                true
            } else if ch == ' ' {
                rules.allow_spaces
            } else if ch.is_alphanumeric() && !ch.is_ascii() {
                rules.allow_unicode
            } else {
                false
            };
            !valid
        })
        .collect();

    if !invalid.is_empty() {
        let mut chars: Vec<char> = invalid.into_iter().collect();
        chars.sort_unstable();
        return Err(UsernameError::InvalidCharacters {
            chars: chars.into_iter().collect(),
        });
    }

    Ok(trimmed.to_string())
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<String, InputError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(InputError::Missing { field: "email" });
    }
    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(InputError::InvalidEmail);
    };
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !trimmed.chars().any(char::is_whitespace);
    if !well_formed {
        return Err(InputError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str) -> Result<(), InputError> {
    if password.is_empty() {
        return Err(InputError::Missing { field: "password" });
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(InputError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(InputError::PasswordTooLong {
            max: MAX_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Required single-line field (task title, guild name, ...). Control characters
/// are stripped before trimming.
pub fn require_title(field: &'static str, value: &str) -> Result<String, InputError> {
    let cleaned = sanitize_text(value).trim().to_string();
    if cleaned.is_empty() {
        return Err(InputError::Missing { field });
    }
    if cleaned.chars().count() > MAX_TITLE_LEN {
        return Err(InputError::TooLong {
            field,
            max: MAX_TITLE_LEN,
        });
    }
    Ok(cleaned)
}

/// Optional free text; newlines and tabs are kept.
pub fn optional_description(value: &str) -> Result<String, InputError> {
    let cleaned = sanitize_text(value).trim().to_string();
    if cleaned.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(InputError::TooLong {
            field: "description",
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(cleaned)
}

/// Remove control characters but keep newlines and tabs
pub fn sanitize_text(content: &str) -> String {
    content
        .chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect()
}
