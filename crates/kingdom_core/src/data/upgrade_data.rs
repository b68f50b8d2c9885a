//! Prestige upgrade definitions.
//!
//! Upgrades are bought with the prestige resource and survive prestige
//! resets. Their effects are folded into the multiplier accumulator by
//! [`crate::multipliers::get_multipliers`].

use serde::{Deserialize, Serialize};

use super::{ResourceKey, UpgradeKey};

/// Price curve of an upgrade as a function of its current level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpgradeCost {
    /// `base * growth^level`.
    Exponential {
        /// Price of level 1.
        base: f64,
        /// Growth per level.
        growth: f64,
    },
    /// `base + step * level`.
    Linear {
        /// Price of level 1.
        base: f64,
        /// Increase per level.
        step: f64,
    },
}

impl UpgradeCost {
    /// Raw (unrounded) price of buying the next level when at `level`.
    #[must_use]
    pub fn at(&self, level: u32) -> f64 {
        match *self {
            Self::Exponential { base, growth } => {
                base * growth.powi(level.min(i32::MAX as u32) as i32)
            }
            Self::Linear { base, step } => base + step * f64::from(level),
        }
    }
}

/// What an upgrade does per level.
///
/// Multiplicative variants are pure products so their stacking order never
/// matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UpgradeEffect {
    /// Click gains `*= 1 + per_level * level`.
    ClickGain {
        /// Bonus per level.
        per_level: f64,
    },
    /// Building costs `*= (1 - per_level)^level`.
    CostReduction {
        /// Reduction per level.
        per_level: f64,
    },
    /// Production `*= 1 + per_level * level` for one resource or all of them.
    Production {
        /// Affected resource; `None` means every resource.
        #[serde(default)]
        resource: Option<ResourceKey>,
        /// Bonus per level.
        per_level: f64,
    },
    /// Consumption `*= (1 - per_level)^level` for one resource or all of them.
    Consumption {
        /// Affected resource; `None` means every resource.
        #[serde(default)]
        resource: Option<ResourceKey>,
        /// Reduction per level.
        per_level: f64,
    },
    /// A fresh run after prestige starts with `per_level * level` extra.
    StartingResources {
        /// Resource granted.
        resource: ResourceKey,
        /// Amount per level.
        per_level: f64,
    },
}

/// Data-driven prestige upgrade definition.
///
/// # Example RON
///
/// ```ron
/// UpgradeData(
///     key: "fertile_lands",
///     name: "upgrade.fertile_lands.name",
///     max_level: 10,
///     cost: Exponential(base: 1.0, growth: 1.5),
///     effect: Production(resource: Some("food"), per_level: 0.1),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Unique string identifier for this upgrade.
    pub key: UpgradeKey,

    /// Localization key for the display name.
    pub name: String,

    /// Highest purchasable level.
    pub max_level: u32,

    /// Price curve in prestige currency.
    pub cost: UpgradeCost,

    /// Effect per level.
    pub effect: UpgradeEffect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_cost() {
        let cost = UpgradeCost::Exponential {
            base: 2.0,
            growth: 3.0,
        };
        assert_eq!(cost.at(0), 2.0);
        assert_eq!(cost.at(2), 18.0);
    }

    #[test]
    fn test_linear_cost() {
        let cost = UpgradeCost::Linear {
            base: 5.0,
            step: 2.5,
        };
        assert_eq!(cost.at(0), 5.0);
        assert_eq!(cost.at(4), 15.0);
    }
}
