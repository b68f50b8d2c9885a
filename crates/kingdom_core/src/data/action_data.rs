//! One-shot and looping action definitions.

use serde::{Deserialize, Serialize};

use super::{ActionKey, Amounts, BuildingKey, LoopActionKey, ResourceKey, TechnologyKey};

/// A threshold that must hold before an action can be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnlockCondition {
    /// Hold at least `amount` of a resource.
    Resource {
        /// Resource key.
        key: ResourceKey,
        /// Minimum balance.
        amount: f64,
    },
    /// Own at least `count` of a building.
    Building {
        /// Building key.
        key: BuildingKey,
        /// Minimum count.
        count: u32,
    },
    /// Have researched a technology.
    Technology {
        /// Technology key.
        key: TechnologyKey,
    },
    /// Hold at least `amount` of the prestige resource.
    Prestige {
        /// Minimum prestige balance.
        amount: f64,
    },
}

/// Data-driven one-shot action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    /// Unique string identifier for this action.
    pub key: ActionKey,

    /// Localization key for the display name.
    pub name: String,

    /// Paid on use.
    #[serde(default)]
    pub cost: Amounts,

    /// Granted on use.
    #[serde(default)]
    pub gains: Amounts,

    /// Seconds before the action can be used again.
    #[serde(default)]
    pub cooldown_secs: f64,

    /// Conditions that unlock the action.
    #[serde(default)]
    pub unlock: Vec<UnlockCondition>,

    /// Whether a fresh game already has this action unlocked.
    #[serde(default)]
    pub unlocked_by_default: bool,
}

impl ActionData {
    /// Cooldown in milliseconds of simulated time.
    #[must_use]
    pub fn cooldown_ms(&self) -> u64 {
        (self.cooldown_secs.max(0.0) * 1000.0).round() as u64
    }
}

/// Data-driven loop action definition.
///
/// # Example RON
///
/// ```ron
/// LoopActionData(
///     key: "chop_wood",
///     name: "loop.chop_wood.name",
///     loop_points_required: 1500.0,
///     cost: { "food": 2.0 },
///     gains: { "wood": 6.0 },
///     unlock: [Building(key: "farm", count: 1)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopActionData {
    /// Unique string identifier for this loop action.
    pub key: LoopActionKey,

    /// Localization key for the display name.
    pub name: String,

    /// Points needed to complete one loop.
    pub loop_points_required: f64,

    /// Paid once at the start of every loop.
    #[serde(default)]
    pub cost: Amounts,

    /// Granted on completing a loop.
    #[serde(default)]
    pub gains: Amounts,

    /// Conditions that unlock the loop action.
    #[serde(default)]
    pub unlock: Vec<UnlockCondition>,
}

/// Global loop-action scheduling parameters.
///
/// Copied into every fresh game state; technologies may raise them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Maximum number of loop actions running at once.
    pub max_concurrent_actions: u32,
    /// Points every running loop action gains per tick.
    pub base_points_per_tick: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            max_concurrent_actions: 1,
            base_points_per_tick: 100.0,
        }
    }
}
