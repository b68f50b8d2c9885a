//! The immutable game-state snapshot and its accessors.
//!
//! [`GameState`] is the single source of truth. Engine transitions take a
//! `&GameState` and return a new value; callers replace their stored state
//! with the result. Every keyed map is populated with an entry for every
//! config key at construction, so reads never need an "or zero" fallback on
//! the hot path.
//!
//! The consuming `with_*` setters clamp to the valid range and hand back
//! `self` untouched when the write would not change anything.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::data::{
    AchievementKey, ActionKey, Amounts, BuildingKey, EventKey, LoopActionKey, LoopSettings,
    ResourceKey, TechnologyKey, UpgradeKey,
};
use crate::multipliers::Multipliers;

/// Simulated wall-clock time in milliseconds.
pub type Timestamp = u64;

/// One resolved event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHistoryEntry {
    /// Event that was resolved.
    pub event_key: EventKey,
    /// Index of the choice that was applied.
    pub choice_index: usize,
    /// Time of resolution.
    pub timestamp: Timestamp,
    /// Whether the event timed out rather than being answered.
    #[serde(default)]
    pub auto_resolved: bool,
}

/// Random event scheduling state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventState {
    /// The event waiting for a choice, if any.
    pub active_event: Option<EventKey>,
    /// When the active event was drawn.
    pub active_event_start_time: Timestamp,
    /// Earliest time the next event may be drawn.
    pub next_event_time: Timestamp,
    /// Most recent resolutions, oldest first. Bounded by the config cap.
    pub event_history: VecDeque<EventHistoryEntry>,
}

/// The single research slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResearchState {
    /// Technology being researched, if any.
    pub active_research: Option<TechnologyKey>,
    /// When the active research started.
    pub research_start_time: Timestamp,
    /// When the active research completes.
    pub research_end_time: Timestamp,
}

/// Unlock and usage record of a one-shot action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionUnlock {
    /// Whether the action can be used.
    pub unlocked: bool,
    /// When it was unlocked.
    pub unlocked_at: Option<Timestamp>,
    /// When it was last used.
    pub last_used: Option<Timestamp>,
}

/// One-shot action bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionState {
    /// Unlock record per action.
    pub unlocks: BTreeMap<ActionKey, ActionUnlock>,
    /// Time at which each action becomes usable again.
    pub cooldowns: BTreeMap<ActionKey, Timestamp>,
}

/// Progress of one loop action.
///
/// A running entry has `is_active && !is_paused`, a paused entry
/// `!is_active && is_paused`, and a stopped entry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopActionState {
    /// Loop action this entry tracks. Unique within the list.
    pub action_key: LoopActionKey,
    /// Running and occupying a concurrency slot.
    pub is_active: bool,
    /// Paused with progress kept.
    pub is_paused: bool,
    /// Points accumulated towards the current loop.
    pub current_points: f64,
    /// Completed loops since the entry was created.
    pub total_loops_completed: u64,
    /// Start of the current running stint; the eviction order.
    pub started_at: Timestamp,
    /// Last tick that advanced this entry.
    pub last_tick_at: Timestamp,
    /// Whether the current loop's cost has been charged.
    #[serde(default)]
    pub loop_paid: bool,
}

impl LoopActionState {
    /// A stopped entry with no progress.
    #[must_use]
    pub fn new(action_key: impl Into<LoopActionKey>, now: Timestamp) -> Self {
        Self {
            action_key: action_key.into(),
            is_active: false,
            is_paused: false,
            current_points: 0.0,
            total_loops_completed: 0,
            started_at: now,
            last_tick_at: now,
            loop_paid: false,
        }
    }

    /// Advancing each tick.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.is_active && !self.is_paused
    }

    /// Neither running nor paused.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        !self.is_active && !self.is_paused
    }
}

/// A queued "achievement unlocked" notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementNotification {
    /// Achievement that was unlocked.
    pub achievement_key: AchievementKey,
    /// When it was unlocked.
    pub timestamp: Timestamp,
    /// Level reached.
    pub level: u32,
    /// Whether the host has displayed it.
    pub shown: bool,
}

/// Counters that achievements measure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementStats {
    /// Simulated seconds played.
    pub play_time_secs: f64,
    /// Events resolved, any way.
    pub events_resolved: u64,
    /// Events resolved, per event.
    pub events_by_key: BTreeMap<EventKey, u64>,
    /// Loop completions across all loop actions.
    pub loops_completed: u64,
    /// One-shot action uses, per action.
    pub actions_used: BTreeMap<ActionKey, u64>,
    /// Buildings bought.
    pub buildings_bought: u64,
    /// Technologies finished.
    pub research_completed: u64,
    /// Prestige resets performed.
    pub prestige_count: u32,
}

/// Achievement unlocks, progress and notifications.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementState {
    /// Unlocked level per achievement; 0 means locked.
    pub unlocked: BTreeMap<AchievementKey, u32>,
    /// Progress towards the next level, in `0..=1`.
    pub progress: BTreeMap<AchievementKey, f64>,
    /// Pending and shown notifications, oldest first.
    pub notifications: VecDeque<AchievementNotification>,
    /// Sum of level times points over all achievements.
    pub total_points: u64,
    /// Measured counters.
    pub stats: AchievementStats,
    /// Cosmetics granted by rewards.
    pub cosmetics: BTreeSet<String>,
}

/// Complete game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Last update time.
    pub t: Timestamp,
    /// Current balances. Never negative.
    pub resources: BTreeMap<ResourceKey, f64>,
    /// Cumulative production. Never decreases.
    pub lifetime: BTreeMap<ResourceKey, f64>,
    /// Owned count per building.
    pub buildings: BTreeMap<BuildingKey, u32>,
    /// Research level per technology, 0 or 1.
    pub technologies: BTreeMap<TechnologyKey, u8>,
    /// Level per prestige upgrade.
    pub upgrades: BTreeMap<UpgradeKey, u32>,
    /// Manual clicks.
    pub clicks: u64,
    /// Event scheduling.
    pub events: EventState,
    /// Research slot.
    pub research: ResearchState,
    /// One-shot actions.
    #[serde(default)]
    pub actions: ActionState,
    /// Loop actions, in processing order.
    #[serde(default)]
    pub loop_actions: Vec<LoopActionState>,
    /// Loop scheduling parameters.
    #[serde(default)]
    pub loop_settings: LoopSettings,
    /// Achievements.
    #[serde(default)]
    pub achievements: AchievementState,
    /// Persistent multipliers granted by achievement rewards.
    #[serde(default)]
    pub achievement_multipliers: Multipliers,
    /// Save-format version.
    pub version: u32,
}

impl GameState {
    /// Current balance of a resource.
    #[must_use]
    pub fn resource(&self, key: &str) -> f64 {
        self.resources.get(key).copied().unwrap_or(0.0)
    }

    /// Lifetime production of a resource.
    #[must_use]
    pub fn lifetime_of(&self, key: &str) -> f64 {
        self.lifetime.get(key).copied().unwrap_or(0.0)
    }

    /// Owned count of a building.
    #[must_use]
    pub fn building_count(&self, key: &str) -> u32 {
        self.buildings.get(key).copied().unwrap_or(0)
    }

    /// Total owned buildings of every type.
    #[must_use]
    pub fn total_buildings(&self) -> u64 {
        self.buildings.values().map(|&n| u64::from(n)).sum()
    }

    /// Research level of a technology.
    #[must_use]
    pub fn tech_level(&self, key: &str) -> u8 {
        self.technologies.get(key).copied().unwrap_or(0)
    }

    /// Whether a technology has been researched.
    #[must_use]
    pub fn is_researched(&self, key: &str) -> bool {
        self.tech_level(key) > 0
    }

    /// Level of a prestige upgrade.
    #[must_use]
    pub fn upgrade_level(&self, key: &str) -> u32 {
        self.upgrades.get(key).copied().unwrap_or(0)
    }

    /// Unlocked level of an achievement.
    #[must_use]
    pub fn achievement_level(&self, key: &str) -> u32 {
        self.achievements.unlocked.get(key).copied().unwrap_or(0)
    }

    /// True iff every amount in `cost` is covered by the current balance.
    #[must_use]
    pub fn can_afford(&self, cost: &Amounts) -> bool {
        cost.iter().all(|(key, &amount)| amount <= self.resource(key))
    }

    /// Loop action entry for `key`, if one exists.
    #[must_use]
    pub fn loop_action(&self, key: &str) -> Option<&LoopActionState> {
        self.loop_actions.iter().find(|l| l.action_key == key)
    }

    /// Number of loop actions currently running.
    #[must_use]
    pub fn active_loop_count(&self) -> usize {
        self.loop_actions.iter().filter(|l| l.is_active).count()
    }

    /// Set a resource balance, clamped at zero. Unknown keys and
    /// non-finite amounts leave the state untouched.
    #[must_use]
    pub fn with_resource(mut self, key: &str, amount: f64) -> Self {
        if !amount.is_finite() {
            return self;
        }
        if let Some(slot) = self.resources.get_mut(key) {
            *slot = amount.max(0.0);
        }
        self
    }

    /// Set a building count. Unknown keys leave the state untouched.
    #[must_use]
    pub fn with_building_count(mut self, key: &str, count: u32) -> Self {
        if let Some(slot) = self.buildings.get_mut(key) {
            *slot = count;
        }
        self
    }

    /// Set a technology level, clamped to `0..=1`.
    #[must_use]
    pub fn with_tech_level(mut self, key: &str, level: u8) -> Self {
        if let Some(slot) = self.technologies.get_mut(key) {
            *slot = level.min(1);
        }
        self
    }

    /// Set a prestige upgrade level. Unknown keys leave the state untouched.
    #[must_use]
    pub fn with_upgrade_level(mut self, key: &str, level: u32) -> Self {
        if let Some(slot) = self.upgrades.get_mut(key) {
            *slot = level;
        }
        self
    }

    /// Add to a balance; with `count_lifetime` the positive part also
    /// accumulates into the lifetime counter.
    pub(crate) fn add_resource(&mut self, key: &str, amount: f64, count_lifetime: bool) {
        if !amount.is_finite() {
            return;
        }
        let slot = self.resources.entry(key.to_owned()).or_insert(0.0);
        *slot = (*slot + amount).max(0.0);
        if count_lifetime && amount > 0.0 {
            *self.lifetime.entry(key.to_owned()).or_insert(0.0) += amount;
        }
    }

    /// Remove from a balance, clamped at zero.
    pub(crate) fn remove_resource(&mut self, key: &str, amount: f64) {
        if let Some(slot) = self.resources.get_mut(key) {
            if amount.is_finite() {
                *slot = (*slot - amount.abs()).max(0.0);
            }
        }
    }

    /// Add every amount in `gains`.
    pub(crate) fn grant(&mut self, gains: &Amounts, count_lifetime: bool) {
        for (key, &amount) in gains {
            self.add_resource(key, amount, count_lifetime);
        }
    }

    /// Subtract every amount in `cost`, clamped at zero. Callers check
    /// affordability first.
    pub(crate) fn pay(&mut self, cost: &Amounts) {
        for (key, &amount) in cost {
            self.remove_resource(key, amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameConfig;
    use crate::factory::fresh_state;

    fn state() -> GameState {
        let config = GameConfig::builtin().unwrap();
        fresh_state(&config, 0)
    }

    #[test]
    fn test_with_resource_clamps_and_ignores_unknown() {
        let s = state().with_resource("food", -5.0);
        assert_eq!(s.resource("food"), 0.0);

        let before = s.clone();
        let after = s.with_resource("mana", 10.0);
        assert_eq!(after, before);
        assert!(!after.resources.contains_key("mana"));
    }

    #[test]
    fn test_with_resource_noop_returns_equal_state() {
        let s = state().with_resource("food", 42.0);
        let again = s.clone().with_resource("food", 42.0);
        assert_eq!(again, s);
        let nan = s.clone().with_resource("food", f64::NAN);
        assert_eq!(nan, s);
    }

    #[test]
    fn test_tech_level_clamped() {
        let s = state().with_tech_level("masonry", 7);
        assert_eq!(s.tech_level("masonry"), 1);
        assert!(s.is_researched("masonry"));
    }

    #[test]
    fn test_can_afford() {
        let s = state().with_resource("food", 10.0).with_resource("wood", 3.0);
        let mut cost = Amounts::new();
        cost.insert("food".into(), 10.0);
        assert!(s.can_afford(&cost));
        cost.insert("wood".into(), 3.5);
        assert!(!s.can_afford(&cost));
        assert!(s.can_afford(&Amounts::new()));
    }

    #[test]
    fn test_add_and_remove_resource() {
        let mut s = state().with_resource("food", 0.0);
        let lifetime = s.lifetime_of("food");
        s.add_resource("food", 5.0, true);
        s.add_resource("food", 2.0, false);
        assert_eq!(s.resource("food"), 7.0);
        assert_eq!(s.lifetime_of("food"), lifetime + 5.0);

        s.remove_resource("food", 100.0);
        assert_eq!(s.resource("food"), 0.0);
        assert_eq!(s.lifetime_of("food"), lifetime + 5.0);
    }
}
