//! Building data structures for data-driven building definitions.

use serde::{Deserialize, Serialize};

use super::{Amounts, BuildingKey};

/// Data-driven building definition.
///
/// Each owned copy of a building produces `produces` and consumes `consumes`
/// per second. The price of the next copy grows geometrically with the
/// number already owned.
///
/// # Example RON
///
/// ```ron
/// BuildingData(
///     key: "lumber_mill",
///     name: "building.lumber_mill.name",
///     base_cost: { "food": 15.0 },
///     cost_scale: 1.15,
///     produces: { "wood": 0.8 },
///     consumes: { "food": 0.2 },
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Unique string identifier for this building type.
    pub key: BuildingKey,

    /// Localization key for the building's display name.
    pub name: String,

    /// Price of the first copy.
    pub base_cost: Amounts,

    /// Geometric growth of the price per owned copy. Must be > 1.
    #[serde(default = "default_cost_scale")]
    pub cost_scale: f64,

    /// Per-second production of one copy.
    #[serde(default)]
    pub produces: Amounts,

    /// Per-second consumption of one copy.
    #[serde(default)]
    pub consumes: Amounts,
}

/// Default price growth for buildings without an explicit scale.
const fn default_cost_scale() -> f64 {
    1.15
}

impl BuildingData {
    /// Price of the next copy when `owned` copies exist, scaled by
    /// `cost_multiplier` and rounded up per resource.
    #[must_use]
    pub fn cost_at(&self, owned: u32, cost_multiplier: f64) -> Amounts {
        let growth = self.cost_scale.powi(owned.min(i32::MAX as u32) as i32);
        self.base_cost
            .iter()
            .map(|(key, base)| (key.clone(), (base * growth * cost_multiplier).ceil()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farm() -> BuildingData {
        BuildingData {
            key: "farm".into(),
            name: "Farm".into(),
            base_cost: [("gold".to_string(), 10.0)].into_iter().collect(),
            cost_scale: 1.15,
            produces: [("food".to_string(), 1.0)].into_iter().collect(),
            consumes: Amounts::new(),
        }
    }

    #[test]
    fn test_cost_grows_with_ownership() {
        let farm = farm();
        assert_eq!(farm.cost_at(0, 1.0)["gold"], 10.0);
        // 10 * 1.15^3 = 15.20875
        assert_eq!(farm.cost_at(3, 1.0)["gold"], 16.0);
        assert!(farm.cost_at(10, 1.0)["gold"] > farm.cost_at(9, 1.0)["gold"]);
    }

    #[test]
    fn test_cost_multiplier_applies_before_rounding() {
        let farm = farm();
        // 10 * 0.5 = 5
        assert_eq!(farm.cost_at(0, 0.5)["gold"], 5.0);
        // 10 * 1.15 * 0.9 = 10.35 -> 11
        assert_eq!(farm.cost_at(1, 0.9)["gold"], 11.0);
    }
}
