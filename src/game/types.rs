use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const USER_SCHEMA_VERSION: u8 = 1;
pub const GUILD_SCHEMA_VERSION: u8 = 1;
pub const TASK_SCHEMA_VERSION: u8 = 1;
pub const COMPLETION_SCHEMA_VERSION: u8 = 1;
pub const QUEST_SCHEMA_VERSION: u8 = 1;

pub const DEFAULT_TASK_XP_REWARD: u64 = 10;
pub const DEFAULT_TASK_GOLD_REWARD: u64 = 5;
pub const DEFAULT_ROLE: &str = "member";
pub const DEFAULT_AVATAR: &str = "default";

pub(crate) fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// How often a task is expected to recur.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskType::Daily => "daily",
            TaskType::Weekly => "weekly",
            TaskType::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(TaskType::Daily),
            "weekly" => Ok(TaskType::Weekly),
            "monthly" => Ok(TaskType::Monthly),
            other => Err(format!(
                "unknown task type '{}' (expected daily, weekly or monthly)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestType {
    #[default]
    Team,
    Raid,
}

impl FromStr for QuestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "team" => Ok(QuestType::Team),
            "raid" => Ok(QuestType::Raid),
            other => Err(format!(
                "unknown quest type '{}' (expected team or raid)",
                other
            )),
        }
    }
}

/// Lifecycle of a guild quest. `Active -> Completed` is the only transition the
/// engine performs; `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    #[default]
    Active,
    Completed,
    Failed,
}

impl fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
            QuestStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub level: u32,
    pub xp: u64,
    pub gold: u64,
    pub role: String,
    pub avatar: String,
    /// At most one guild at a time.
    #[serde(default)]
    pub guild_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(username: &str, email: &str, password_hash: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_record_id(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            level: 1,
            xp: 0,
            gold: 0,
            role: DEFAULT_ROLE.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            guild_id: None,
            created_at: now,
            updated_at: now,
            schema_version: USER_SCHEMA_VERSION,
        }
    }

    pub fn with_progress(mut self, level: u32, xp: u64, gold: u64) -> Self {
        self.level = level.max(1);
        self.xp = xp;
        self.gold = gold;
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn public(&self) -> PublicUser {
        PublicUser::from(self)
    }
}

/// User view handed to observers and callers; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub level: u32,
    pub xp: u64,
    pub gold: u64,
    pub role: String,
    pub avatar: String,
    pub guild_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for PublicUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            level: user.level,
            xp: user.xp,
            gold: user.gold,
            role: user.role.clone(),
            avatar: user.avatar.clone(),
            guild_id: user.guild_id.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub quests: Vec<String>,
    pub schema_version: u8,
}

impl GuildRecord {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            id: new_record_id(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            members: Vec::new(),
            quests: Vec::new(),
            schema_version: GUILD_SCHEMA_VERSION,
        }
    }

    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub xp_reward: u64,
    pub gold_reward: u64,
    pub guild_id: String,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl TaskRecord {
    pub fn new(title: &str, guild_id: &str) -> Self {
        Self {
            id: new_record_id(),
            title: title.to_string(),
            description: String::new(),
            task_type: TaskType::default(),
            xp_reward: DEFAULT_TASK_XP_REWARD,
            gold_reward: DEFAULT_TASK_GOLD_REWARD,
            guild_id: guild_id.to_string(),
            created_by: None,
            created_at: Utc::now(),
            schema_version: TASK_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_rewards(mut self, xp_reward: u64, gold_reward: u64) -> Self {
        self.xp_reward = xp_reward;
        self.gold_reward = gold_reward;
        self
    }

    pub fn created_by(mut self, user_id: &str) -> Self {
        self.created_by = Some(user_id.to_string());
        self
    }
}

/// Immutable fact: one user finished one task instance. Rewards are the amounts
/// actually granted, never recomputed from the task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRecord {
    pub id: String,
    pub task_id: String,
    pub user_id: String,
    pub completed_at: DateTime<Utc>,
    pub xp_gained: u64,
    pub gold_gained: u64,
    pub schema_version: u8,
}

impl CompletionRecord {
    pub fn snapshot(task: &TaskRecord, user_id: &str) -> Self {
        Self {
            id: new_record_id(),
            task_id: task.id.clone(),
            user_id: user_id.to_string(),
            completed_at: Utc::now(),
            xp_gained: task.xp_reward,
            gold_gained: task.gold_reward,
            schema_version: COMPLETION_SCHEMA_VERSION,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestRewards {
    pub xp: u64,
    pub gold: u64,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub quest_type: QuestType,
    pub guild_id: String,
    pub progress: u32,
    pub goal: u32,
    pub rewards: QuestRewards,
    pub status: QuestStatus,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl QuestRecord {
    pub fn new(title: &str, guild_id: &str, goal: u32) -> Self {
        Self {
            id: new_record_id(),
            title: title.to_string(),
            description: String::new(),
            quest_type: QuestType::default(),
            guild_id: guild_id.to_string(),
            progress: 0,
            goal,
            rewards: QuestRewards::default(),
            status: QuestStatus::default(),
            created_at: Utc::now(),
            schema_version: QUEST_SCHEMA_VERSION,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_type(mut self, quest_type: QuestType) -> Self {
        self.quest_type = quest_type;
        self
    }

    pub fn with_rewards(mut self, xp: u64, gold: u64) -> Self {
        self.rewards.xp = xp;
        self.rewards.gold = gold;
        self
    }

    pub fn with_reward_item(mut self, item_id: &str) -> Self {
        self.rewards.items.push(item_id.to_string());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == QuestStatus::Completed
    }
}

/// Optional field filter for task listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub guild_id: Option<String>,
    pub task_type: Option<TaskType>,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.guild_id.as_deref().map_or(true, |g| task.guild_id == g)
            && self.task_type.map_or(true, |t| task.task_type == t)
    }
}

/// Optional field filter for completion listings.
#[derive(Debug, Clone, Default)]
pub struct CompletionFilter {
    pub user_id: Option<String>,
    pub task_id: Option<String>,
}

impl CompletionFilter {
    pub fn matches(&self, completion: &CompletionRecord) -> bool {
        self.user_id
            .as_deref()
            .map_or(true, |u| completion.user_id == u)
            && self
                .task_id
                .as_deref()
                .map_or(true, |t| completion.task_id == t)
    }
}
