//! Achievement definitions: typed requirements and rewards.
//!
//! Kinds and operators carry an `Unknown` fallback so content written for a
//! newer engine still loads. The achievement engine treats unknown
//! requirements as unmet and unknown rewards as no-ops.

use serde::{Deserialize, Serialize};

use super::AchievementKey;

/// What a requirement measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementKind {
    /// Current balance of `target`.
    Resource,
    /// Owned count of building `target`, or of all buildings for `*`.
    Building,
    /// Research level of technology `target`.
    Technology,
    /// Completions of loop action `target` or uses of one-shot action `target`.
    Action,
    /// Resolutions of event `target`, or of all events for `*`.
    Event,
    /// Manual clicks.
    Click,
    /// Prestige resets for target `count`, otherwise the prestige balance.
    Prestige,
    /// Simulated seconds played.
    Time,
    /// Minimum over a `+`-separated list of building, resource or technology keys.
    Combo,
    /// Anything this engine does not understand.
    #[serde(other)]
    Unknown,
}

/// Comparison between the measured value and the requirement value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operator {
    /// `current >= value`.
    #[default]
    Gte,
    /// `current > value`.
    Gt,
    /// `current <= value`.
    Lte,
    /// `current < value`.
    Lt,
    /// `current == value` within a small tolerance.
    Eq,
    /// Anything this engine does not understand.
    #[serde(other)]
    Unknown,
}

/// A single typed condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// What is measured.
    pub kind: RequirementKind,

    /// Key the measurement refers to (meaning depends on `kind`).
    #[serde(default)]
    pub target: String,

    /// Threshold.
    pub value: f64,

    /// Comparison, `Gte` when omitted.
    #[serde(default)]
    pub operator: Operator,
}

/// What a reward does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RewardKind {
    /// Add `value` of resource `target`.
    Resource,
    /// Multiply the persistent multiplier named by `target` by `value`.
    Multiplier,
    /// Unlock one-shot action `target`.
    Unlock,
    /// Record cosmetic `target`.
    Cosmetic,
    /// Anything this engine does not understand.
    #[serde(other)]
    Unknown,
}

/// A single typed reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    /// What the reward does.
    pub kind: RewardKind,

    /// Key the reward refers to.
    #[serde(default)]
    pub target: String,

    /// Amount or factor.
    #[serde(default)]
    pub value: f64,
}

/// Data-driven achievement definition.
///
/// # Example RON
///
/// ```ron
/// AchievementData(
///     key: "farmer",
///     name: "achievement.farmer.name",
///     points: 10,
///     requirements: [Requirement(kind: Building, target: "farm", value: 10.0)],
///     rewards: [Reward(kind: Multiplier, target: "production:food", value: 1.1)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementData {
    /// Unique string identifier for this achievement.
    pub key: AchievementKey,

    /// Localization key for the display name.
    pub name: String,

    /// Points awarded per unlocked level.
    #[serde(default)]
    pub points: u32,

    /// Every requirement must hold.
    pub requirements: Vec<Requirement>,

    /// Applied on every unlock.
    #[serde(default)]
    pub rewards: Vec<Reward>,

    /// Hidden from the UI until unlocked.
    #[serde(default)]
    pub hidden: bool,

    /// Can be unlocked again at increasing thresholds.
    #[serde(default)]
    pub repeatable: bool,

    /// Highest level of a repeatable achievement; unbounded when `None`.
    #[serde(default)]
    pub max_level: Option<u32>,
}

impl AchievementData {
    /// Highest level this achievement can reach.
    #[must_use]
    pub fn level_cap(&self) -> u32 {
        if self.repeatable {
            self.max_level.unwrap_or(u32::MAX)
        } else {
            1
        }
    }
}
