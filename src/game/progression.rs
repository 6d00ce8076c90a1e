//! Pure reward and quest-advancement rules.
//!
//! Nothing in here touches the store; coordinators feed records in and persist
//! whatever comes back.

use crate::game::types::{QuestRecord, QuestStatus, TaskRecord, UserRecord};

pub const DEFAULT_XP_PER_LEVEL: u64 = 100;

/// Tunables for level thresholds. The XP needed to leave level `n` is
/// `n * xp_per_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressionRules {
    pub xp_per_level: u64,
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            xp_per_level: DEFAULT_XP_PER_LEVEL,
        }
    }
}

impl ProgressionRules {
    pub fn new(xp_per_level: u64) -> Self {
        Self {
            xp_per_level: xp_per_level.max(1),
        }
    }

    pub fn xp_needed(&self, level: u32) -> u64 {
        u64::from(level.max(1)).saturating_mul(self.xp_per_level.max(1))
    }
}

/// Result of granting one task's reward to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardOutcome {
    pub xp: u64,
    pub gold: u64,
    pub level: u32,
    pub previous_level: u32,
    pub levels_gained: u32,
}

impl RewardOutcome {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }

    pub fn apply_to(&self, user: &mut UserRecord) {
        user.xp = self.xp;
        user.gold = self.gold;
        user.level = self.level;
    }
}

/// Grant a task's XP and gold. Every threshold crossed is a level gained, so a
/// large reward can jump several levels; leftover XP carries into the new level.
pub fn apply_task_reward(
    rules: &ProgressionRules,
    user: &UserRecord,
    task: &TaskRecord,
) -> RewardOutcome {
    let previous_level = user.level.max(1);
    let gold = user.gold.saturating_add(task.gold_reward);
    let mut xp = user.xp.saturating_add(task.xp_reward);
    let mut level = previous_level;

    let mut xp_needed = rules.xp_needed(level);
    while xp >= xp_needed && level < u32::MAX {
        xp -= xp_needed;
        level += 1;
        xp_needed = rules.xp_needed(level);
    }

    RewardOutcome {
        xp,
        gold,
        level,
        previous_level,
        levels_gained: level - previous_level,
    }
}

/// Result of a single quest progress increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestAdvance {
    pub progress: u32,
    pub status: QuestStatus,
    /// True only on the increment that moved the quest from active to completed.
    pub newly_completed: bool,
}

impl QuestAdvance {
    pub fn apply_to(&self, quest: &mut QuestRecord) {
        quest.progress = self.progress;
        quest.status = self.status;
    }
}

/// One step of quest progress. Progress is not clamped at the goal, and a
/// completed or failed quest keeps its status.
pub fn advance_quest(quest: &QuestRecord) -> QuestAdvance {
    let progress = quest.progress.saturating_add(1);
    let status = match quest.status {
        QuestStatus::Active if progress >= quest.goal => QuestStatus::Completed,
        other => other,
    };
    QuestAdvance {
        progress,
        status,
        newly_completed: quest.status == QuestStatus::Active && status == QuestStatus::Completed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_at(level: u32, xp: u64, gold: u64) -> UserRecord {
        UserRecord::new("alice", "alice@example.com", "hash").with_progress(level, xp, gold)
    }

    fn task_paying(xp: u64, gold: u64) -> TaskRecord {
        TaskRecord::new("Chore", "g1").with_rewards(xp, gold)
    }

    #[test]
    fn gold_is_added_exactly() {
        let rules = ProgressionRules::default();
        for (start, reward) in [(0u64, 0u64), (5, 5), (1_000, 37), (u64::MAX - 3, 2)] {
            let outcome = apply_task_reward(&rules, &user_at(1, 0, start), &task_paying(0, reward));
            assert_eq!(outcome.gold, start + reward);
        }
    }

    #[test]
    fn small_reward_does_not_level() {
        let outcome = apply_task_reward(
            &ProgressionRules::default(),
            &user_at(1, 80, 0),
            &task_paying(10, 5),
        );
        assert_eq!(outcome.level, 1);
        assert_eq!(outcome.xp, 90);
        assert!(!outcome.leveled_up());
    }

    #[test]
    fn exact_threshold_levels_with_zero_remainder() {
        let outcome = apply_task_reward(
            &ProgressionRules::default(),
            &user_at(1, 90, 0),
            &task_paying(10, 0),
        );
        assert_eq!(outcome.level, 2);
        assert_eq!(outcome.xp, 0);
        assert_eq!(outcome.levels_gained, 1);
    }

    #[test]
    fn reward_of_250_from_level_one_stops_at_level_two() {
        // 100 consumed leaving level 1; the remaining 150 is short of the 200 needed at level 2.
        let outcome = apply_task_reward(
            &ProgressionRules::default(),
            &user_at(1, 0, 0),
            &task_paying(250, 0),
        );
        assert_eq!(outcome.level, 2);
        assert_eq!(outcome.xp, 150);
        assert_eq!(outcome.levels_gained, 1);
    }

    #[test]
    fn large_reward_grants_every_level_crossed() {
        let rules = ProgressionRules::default();
        let outcome = apply_task_reward(&rules, &user_at(1, 0, 0), &task_paying(300, 0));
        assert_eq!(outcome.level, 3);
        assert_eq!(outcome.xp, 0);

        // 100 + 200 + 300 + 400 = 1000, then 50 left over at level 5.
        let outcome = apply_task_reward(&rules, &user_at(1, 0, 0), &task_paying(1_050, 0));
        assert_eq!(outcome.level, 5);
        assert_eq!(outcome.xp, 50);
        assert_eq!(outcome.previous_level, 1);
        assert_eq!(outcome.levels_gained, 4);
        assert!(outcome.leveled_up());
    }

    #[test]
    fn custom_xp_per_level_scales_thresholds() {
        let rules = ProgressionRules::new(10);
        let outcome = apply_task_reward(&rules, &user_at(2, 15, 0), &task_paying(20, 0));
        // 35 xp at level 2 (needs 20) -> level 3 with 15 (needs 30).
        assert_eq!(outcome.level, 3);
        assert_eq!(outcome.xp, 15);
    }

    #[test]
    fn zero_xp_per_level_is_treated_as_one() {
        let rules = ProgressionRules::new(0);
        assert_eq!(rules.xp_per_level, 1);
        // 1 to leave level 1, then 2 to leave level 2
        let outcome = apply_task_reward(&rules, &user_at(1, 0, 0), &task_paying(3, 0));
        assert_eq!((outcome.level, outcome.xp), (3, 0));
        let outcome = apply_task_reward(&rules, &user_at(1, 0, 0), &task_paying(2, 0));
        assert_eq!((outcome.level, outcome.xp), (2, 1));
    }

    #[test]
    fn outcome_applies_to_user() {
        let mut user = user_at(1, 0, 0);
        let outcome = apply_task_reward(&ProgressionRules::default(), &user, &task_paying(120, 9));
        outcome.apply_to(&mut user);
        assert_eq!((user.level, user.xp, user.gold), (2, 20, 9));
    }

    #[test]
    fn quest_completes_when_goal_reached() {
        let mut quest = QuestRecord::new("Spring cleaning", "g1", 5);
        quest.progress = 4;
        let advance = advance_quest(&quest);
        assert_eq!(advance.progress, 5);
        assert_eq!(advance.status, QuestStatus::Completed);
        assert!(advance.newly_completed);
    }

    #[test]
    fn completed_quest_keeps_counting_and_never_reverts() {
        let mut quest = QuestRecord::new("Spring cleaning", "g1", 5);
        quest.progress = 5;
        quest.status = QuestStatus::Completed;
        let advance = advance_quest(&quest);
        assert_eq!(advance.progress, 6);
        assert_eq!(advance.status, QuestStatus::Completed);
        assert!(!advance.newly_completed);
    }

    #[test]
    fn quest_below_goal_stays_active() {
        let quest = QuestRecord::new("Raid the garage", "g1", 3);
        let advance = advance_quest(&quest);
        assert_eq!(advance.progress, 1);
        assert_eq!(advance.status, QuestStatus::Active);
    }

    #[test]
    fn failed_quest_is_terminal() {
        let mut quest = QuestRecord::new("Lost cause", "g1", 2);
        quest.progress = 1;
        quest.status = QuestStatus::Failed;
        let advance = advance_quest(&quest);
        assert_eq!(advance.progress, 2);
        assert_eq!(advance.status, QuestStatus::Failed);
        assert!(!advance.newly_completed);
    }
}
