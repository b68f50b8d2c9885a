//! Data structures for the game's content tables.
//!
//! This module contains pure data structures that define resources,
//! buildings, technologies, prestige upgrades, events, actions and
//! achievements. Everything is designed to be deserialized from RON.
//!
//! **Note:** This module contains no IO. The built-in tables are embedded at
//! compile time; hosts that want other content parse their own RON string
//! with [`GameConfig::from_ron_str`].

mod achievement_data;
mod action_data;
mod building_data;
mod event_data;
mod resource_data;
mod tech_data;
mod upgrade_data;

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

pub use achievement_data::{
    AchievementData, Operator, Requirement, RequirementKind, Reward, RewardKind,
};
pub use action_data::{ActionData, LoopActionData, LoopSettings, UnlockCondition};
pub use building_data::BuildingData;
pub use event_data::{EventChoice, EventData, EventTiming};
pub use resource_data::ResourceData;
pub use tech_data::{TechEffect, TechnologyData};
pub use upgrade_data::{UpgradeCost, UpgradeData, UpgradeEffect};

/// Resource identifier.
pub type ResourceKey = String;
/// Building identifier.
pub type BuildingKey = String;
/// Technology identifier.
pub type TechnologyKey = String;
/// Prestige upgrade identifier.
pub type UpgradeKey = String;
/// Random event identifier.
pub type EventKey = String;
/// One-shot action identifier.
pub type ActionKey = String;
/// Loop action identifier.
pub type LoopActionKey = String;
/// Achievement identifier.
pub type AchievementKey = String;

/// Resource amounts keyed by resource.
pub type Amounts = BTreeMap<ResourceKey, f64>;

/// Built-in content, embedded so the core never touches the filesystem.
const BUILTIN_RON: &str = include_str!("../../../../assets/data/kingdom.ron");

/// Prestige tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeSettings {
    /// Resource that holds the prestige currency.
    pub resource: ResourceKey,
    /// Lifetime counter the gain is computed from.
    pub lifetime_resource: ResourceKey,
    /// `gain = floor(sqrt(lifetime / divisor))`.
    pub divisor: f64,
}

/// Tick orchestrator cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSettings {
    /// Events are checked on ticks where `counter % event_check_every == 0`.
    pub event_check_every: u64,
    /// Achievements are checked on ticks where `counter % achievement_check_every == 0`.
    pub achievement_check_every: u64,
    /// Upper bound on a single `dt`, used for offline catch-up.
    pub max_offline_secs: f64,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            event_check_every: 10,
            achievement_check_every: 20,
            max_offline_secs: 3600.0,
        }
    }
}

/// Achievement notification queue tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Maximum queued notifications; the oldest are dropped first.
    pub max_queued: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self { max_queued: 20 }
    }
}

/// The complete, immutable content and tuning for one game.
///
/// Constructed once at startup and passed by reference into every entry
/// point of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Save-format version. Saves with any other version are rejected.
    pub version: u32,

    /// All resources, in display order.
    pub resources: Vec<ResourceData>,

    /// All buildings.
    pub buildings: Vec<BuildingData>,

    /// All technologies.
    #[serde(default)]
    pub technologies: Vec<TechnologyData>,

    /// All prestige upgrades, in effect-application order.
    #[serde(default)]
    pub upgrades: Vec<UpgradeData>,

    /// All random events.
    #[serde(default)]
    pub events: Vec<EventData>,

    /// All one-shot actions.
    #[serde(default)]
    pub actions: Vec<ActionData>,

    /// All loop actions.
    #[serde(default)]
    pub loop_actions: Vec<LoopActionData>,

    /// All achievements.
    #[serde(default)]
    pub achievements: Vec<AchievementData>,

    /// Base gains of one manual click.
    #[serde(default)]
    pub click_gains: Amounts,

    /// Prestige tuning.
    pub prestige: PrestigeSettings,

    /// Event scheduling.
    #[serde(default)]
    pub event_timing: EventTiming,

    /// Initial loop-action scheduling parameters.
    #[serde(default)]
    pub loop_settings: LoopSettings,

    /// Tick cadence.
    #[serde(default)]
    pub ticks: TickSettings,

    /// Notification queue tuning.
    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl GameConfig {
    /// Parse a configuration from RON text.
    ///
    /// Parsing does not validate; call [`GameConfig::validate`] or let
    /// [`crate::factory::new_game`] do it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::ConfigParse(e.to_string()))
    }

    /// The built-in content tables, parsed and validated.
    pub fn builtin() -> Result<Self> {
        let config = Self::from_ron_str(BUILTIN_RON)?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Find a resource by key.
    #[must_use]
    pub fn resource(&self, key: &str) -> Option<&ResourceData> {
        self.resources.iter().find(|r| r.key == key)
    }

    /// Find a building by key.
    #[must_use]
    pub fn building(&self, key: &str) -> Option<&BuildingData> {
        self.buildings.iter().find(|b| b.key == key)
    }

    /// Find a technology by key.
    #[must_use]
    pub fn technology(&self, key: &str) -> Option<&TechnologyData> {
        self.technologies.iter().find(|t| t.key == key)
    }

    /// Find a prestige upgrade by key.
    #[must_use]
    pub fn upgrade(&self, key: &str) -> Option<&UpgradeData> {
        self.upgrades.iter().find(|u| u.key == key)
    }

    /// Find an event by key.
    #[must_use]
    pub fn event(&self, key: &str) -> Option<&EventData> {
        self.events.iter().find(|e| e.key == key)
    }

    /// Find a one-shot action by key.
    #[must_use]
    pub fn action(&self, key: &str) -> Option<&ActionData> {
        self.actions.iter().find(|a| a.key == key)
    }

    /// Find a loop action by key.
    #[must_use]
    pub fn loop_action(&self, key: &str) -> Option<&LoopActionData> {
        self.loop_actions.iter().find(|a| a.key == key)
    }

    /// Find an achievement by key.
    #[must_use]
    pub fn achievement(&self, key: &str) -> Option<&AchievementData> {
        self.achievements.iter().find(|a| a.key == key)
    }

    /// Whether `key` names a resource.
    #[must_use]
    pub fn is_resource(&self, key: &str) -> bool {
        self.resource(key).is_some()
    }

    /// Return `Err(InvalidConfig)` listing every problem, if any.
    pub fn ensure_valid(&self) -> Result<()> {
        for warning in self.inert_requirements() {
            tracing::warn!(category = "validation", op = "ensure_valid", "{warning}");
        }
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidConfig { errors })
        }
    }

    /// Validate internal consistency of the content tables.
    ///
    /// Checks for:
    /// - Duplicate keys within each table
    /// - Amount maps that reference unknown resources
    /// - Dangling technology, building and action references
    /// - Cost curves that do not grow, intervals that are inverted
    /// - Events and achievements that can never resolve
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        check_unique("resource", self.resources.iter().map(|r| &r.key), &mut errors);
        check_unique("building", self.buildings.iter().map(|b| &b.key), &mut errors);
        check_unique("technology", self.technologies.iter().map(|t| &t.key), &mut errors);
        check_unique("upgrade", self.upgrades.iter().map(|u| &u.key), &mut errors);
        check_unique("event", self.events.iter().map(|e| &e.key), &mut errors);
        check_unique("action", self.actions.iter().map(|a| &a.key), &mut errors);
        check_unique("loop action", self.loop_actions.iter().map(|a| &a.key), &mut errors);
        check_unique("achievement", self.achievements.iter().map(|a| &a.key), &mut errors);

        for resource in &self.resources {
            if !(resource.initial >= 0.0) || !resource.initial.is_finite() {
                errors.push(format!(
                    "Resource '{}' has invalid initial amount {}",
                    resource.key, resource.initial
                ));
            }
        }

        if !self.is_resource(&self.prestige.resource) {
            errors.push(format!(
                "Prestige resource '{}' is not a resource",
                self.prestige.resource
            ));
        }
        if !self.is_resource(&self.prestige.lifetime_resource) {
            errors.push(format!(
                "Prestige lifetime resource '{}' is not a resource",
                self.prestige.lifetime_resource
            ));
        }
        if !(self.prestige.divisor > 0.0) {
            errors.push(format!(
                "Prestige divisor must be positive, got {}",
                self.prestige.divisor
            ));
        }

        self.check_amounts("click gains", &self.click_gains, &mut errors);

        for building in &self.buildings {
            let owner = format!("building '{}'", building.key);
            if !(building.cost_scale > 1.0) {
                errors.push(format!(
                    "Building '{}' cost_scale must be > 1, got {}",
                    building.key, building.cost_scale
                ));
            }
            self.check_amounts(&owner, &building.base_cost, &mut errors);
            self.check_amounts(&owner, &building.produces, &mut errors);
            self.check_amounts(&owner, &building.consumes, &mut errors);
        }

        for tech in &self.technologies {
            let owner = format!("technology '{}'", tech.key);
            self.check_amounts(&owner, &tech.cost, &mut errors);
            if !(tech.research_secs >= 0.0) {
                errors.push(format!(
                    "Technology '{}' has negative research time",
                    tech.key
                ));
            }
            for prereq in &tech.prerequisites {
                if self.technology(prereq).is_none() {
                    errors.push(format!(
                        "Technology '{}' requires unknown technology '{}'",
                        tech.key, prereq
                    ));
                }
            }
            if tech.requires(&tech.key) {
                errors.push(format!("Technology '{}' requires itself", tech.key));
            }
            match &tech.effect {
                Some(TechEffect::GrantResources { amounts }) => {
                    self.check_amounts(&owner, amounts, &mut errors);
                }
                Some(TechEffect::UnlockAction { action }) if self.action(action).is_none() => {
                    errors.push(format!(
                        "Technology '{}' unlocks unknown action '{}'",
                        tech.key, action
                    ));
                }
                _ => {}
            }
        }

        for upgrade in &self.upgrades {
            if upgrade.max_level == 0 {
                errors.push(format!("Upgrade '{}' has max_level 0", upgrade.key));
            }
            match &upgrade.effect {
                UpgradeEffect::Production {
                    resource: Some(key),
                    ..
                }
                | UpgradeEffect::Consumption {
                    resource: Some(key),
                    ..
                }
                | UpgradeEffect::StartingResources { resource: key, .. }
                    if !self.is_resource(key) =>
                {
                    errors.push(format!(
                        "Upgrade '{}' references unknown resource '{}'",
                        upgrade.key, key
                    ));
                }
                _ => {}
            }
        }

        let timing = &self.event_timing;
        if timing.initial_min_secs > timing.initial_max_secs {
            errors.push("Event initial_min_secs exceeds initial_max_secs".to_string());
        }
        if timing.min_interval_secs > timing.max_interval_secs {
            errors.push("Event min_interval_secs exceeds max_interval_secs".to_string());
        }
        let total_weight: f64 = self.events.iter().map(|e| e.weight.max(0.0)).sum();
        if !self.events.is_empty() && total_weight <= 0.0 {
            errors.push("Event weights sum to zero".to_string());
        }
        for event in &self.events {
            if event.choices.is_empty() {
                errors.push(format!("Event '{}' has no choices", event.key));
            } else if event.default_choice >= event.choices.len() {
                errors.push(format!(
                    "Event '{}' default choice {} is out of range",
                    event.key, event.default_choice
                ));
            }
            if event.weight < 0.0 {
                errors.push(format!("Event '{}' has negative weight", event.key));
            }
            let owner = format!("event '{}'", event.key);
            for choice in &event.choices {
                self.check_amounts(&owner, &choice.requires, &mut errors);
                self.check_amounts(&owner, &choice.gives, &mut errors);
                self.check_amounts(&owner, &choice.takes, &mut errors);
            }
        }

        for action in &self.actions {
            let owner = format!("action '{}'", action.key);
            self.check_amounts(&owner, &action.cost, &mut errors);
            self.check_amounts(&owner, &action.gains, &mut errors);
            self.check_conditions(&owner, &action.unlock, &mut errors);
        }

        if self.loop_settings.max_concurrent_actions == 0 {
            errors.push("Loop max_concurrent_actions must be at least 1".to_string());
        }
        if !(self.loop_settings.base_points_per_tick > 0.0) {
            errors.push("Loop base_points_per_tick must be positive".to_string());
        }
        for action in &self.loop_actions {
            let owner = format!("loop action '{}'", action.key);
            if !(action.loop_points_required > 0.0) {
                errors.push(format!(
                    "Loop action '{}' loop_points_required must be positive",
                    action.key
                ));
            }
            self.check_amounts(&owner, &action.cost, &mut errors);
            self.check_amounts(&owner, &action.gains, &mut errors);
            self.check_conditions(&owner, &action.unlock, &mut errors);
        }

        for achievement in &self.achievements {
            if achievement.requirements.is_empty() {
                errors.push(format!(
                    "Achievement '{}' has no requirements",
                    achievement.key
                ));
            }
            if achievement.repeatable && achievement.max_level == Some(0) {
                errors.push(format!(
                    "Achievement '{}' has max_level 0",
                    achievement.key
                ));
            }
        }

        if self.ticks.event_check_every == 0 || self.ticks.achievement_check_every == 0 {
            errors.push("Tick check cadences must be at least 1".to_string());
        }
        if !(self.ticks.max_offline_secs > 0.0) {
            errors.push("max_offline_secs must be positive".to_string());
        }

        errors
    }

    /// Achievement requirements with an unknown kind or operator.
    ///
    /// These parse and validate, but never count as met.
    #[must_use]
    pub fn inert_requirements(&self) -> Vec<String> {
        self.achievements
            .iter()
            .flat_map(|a| a.requirements.iter().map(move |req| (a, req)))
            .filter(|(_, req)| req.kind == RequirementKind::Unknown || req.operator == Operator::Unknown)
            .map(|(a, req)| {
                format!(
                    "Achievement '{}' requirement on '{}' is unknown and treated as unmet",
                    a.key, req.target
                )
            })
            .collect()
    }

    fn check_amounts(&self, owner: &str, amounts: &Amounts, errors: &mut Vec<String>) {
        for (key, value) in amounts {
            if !self.is_resource(key) {
                errors.push(format!("{owner} references unknown resource '{key}'"));
            }
            if !value.is_finite() {
                errors.push(format!("{owner} has non-finite amount for '{key}'"));
            }
        }
    }

    fn check_conditions(&self, owner: &str, conditions: &[UnlockCondition], errors: &mut Vec<String>) {
        for condition in conditions {
            match condition {
                UnlockCondition::Resource { key, .. } if !self.is_resource(key) => {
                    errors.push(format!("{owner} unlock references unknown resource '{key}'"));
                }
                UnlockCondition::Building { key, .. } if self.building(key).is_none() => {
                    errors.push(format!("{owner} unlock references unknown building '{key}'"));
                }
                UnlockCondition::Technology { key } if self.technology(key).is_none() => {
                    errors.push(format!(
                        "{owner} unlock references unknown technology '{key}'"
                    ));
                }
                _ => {}
            }
        }
    }
}

fn check_unique<'a>(kind: &str, keys: impl Iterator<Item = &'a String>, errors: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key.as_str()) {
            errors.push(format!("Duplicate {kind} key '{key}'"));
        }
    }
}
