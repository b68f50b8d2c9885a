//! Tech tree data structures for data-driven technology definitions.

use serde::{Deserialize, Serialize};

use super::{ActionKey, Amounts, TechnologyKey};

/// Effect applied once when a technology finishes researching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TechEffect {
    /// Add a lump sum of resources.
    GrantResources {
        /// Amounts to add.
        amounts: Amounts,
    },

    /// Unlock a one-shot action.
    UnlockAction {
        /// Action to unlock.
        action: ActionKey,
    },

    /// Allow more loop actions to run at once.
    RaiseLoopCap {
        /// Extra concurrent slots.
        amount: u32,
    },

    /// Make every running loop action progress faster.
    AddPointsPerTick {
        /// Extra points per tick.
        amount: f64,
    },
}

/// Data-driven technology definition.
///
/// # Example RON
///
/// ```ron
/// TechnologyData(
///     key: "logistics",
///     name: "tech.logistics.name",
///     cost: { "gold": 100.0, "knowledge": 20.0 },
///     research_secs: 120.0,
///     prerequisites: ["masonry"],
///     effect: Some(RaiseLoopCap(amount: 1)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyData {
    /// Unique string identifier for this technology.
    pub key: TechnologyKey,

    /// Localization key for the technology's display name.
    pub name: String,

    /// Resources paid when research starts.
    #[serde(default)]
    pub cost: Amounts,

    /// Research time in simulated seconds.
    pub research_secs: f64,

    /// Technologies that must be researched first.
    #[serde(default)]
    pub prerequisites: Vec<TechnologyKey>,

    /// Effect applied on completion.
    #[serde(default)]
    pub effect: Option<TechEffect>,
}

impl TechnologyData {
    /// Check if this technology has a specific prerequisite.
    #[must_use]
    pub fn requires(&self, key: &str) -> bool {
        self.prerequisites.iter().any(|t| t == key)
    }

    /// Research duration in milliseconds of simulated time.
    #[must_use]
    pub fn research_ms(&self) -> u64 {
        (self.research_secs.max(0.0) * 1000.0).round() as u64
    }
}
