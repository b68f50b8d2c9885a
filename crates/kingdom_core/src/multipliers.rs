//! Multiplier composition.
//!
//! [`get_multipliers`] starts from identity, applies every owned prestige
//! upgrade in config order and finally folds in the persistent achievement
//! multipliers stored on the state. All effects are products, so the result
//! does not depend on application order. The value is cheap to rebuild and is
//! recomputed on every query instead of being cached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::data::{GameConfig, ResourceKey, UpgradeEffect};
use crate::state::GameState;

/// Composed scalar factors applied to clicks, costs, production and
/// consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Multipliers {
    /// Factor on manual click gains.
    pub click_gain: f64,
    /// Factor on building costs.
    pub cost: f64,
    /// Factor on building production, per resource. Missing keys mean 1.
    pub prod_mul: BTreeMap<ResourceKey, f64>,
    /// Factor on building consumption, per resource. Missing keys mean 1.
    pub use_mul: BTreeMap<ResourceKey, f64>,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self {
            click_gain: 1.0,
            cost: 1.0,
            prod_mul: BTreeMap::new(),
            use_mul: BTreeMap::new(),
        }
    }
}

impl Multipliers {
    /// Identity with an explicit entry for every configured resource.
    #[must_use]
    pub fn identity(config: &GameConfig) -> Self {
        let ones: BTreeMap<ResourceKey, f64> = config
            .resources
            .iter()
            .map(|r| (r.key.clone(), 1.0))
            .collect();
        Self {
            click_gain: 1.0,
            cost: 1.0,
            prod_mul: ones.clone(),
            use_mul: ones,
        }
    }

    /// Production factor of a resource.
    #[must_use]
    pub fn production(&self, key: &str) -> f64 {
        self.prod_mul.get(key).copied().unwrap_or(1.0)
    }

    /// Consumption factor of a resource.
    #[must_use]
    pub fn consumption(&self, key: &str) -> f64 {
        self.use_mul.get(key).copied().unwrap_or(1.0)
    }

    /// Multiply production of one resource, or of every tracked resource.
    pub fn scale_production(&mut self, key: Option<&str>, factor: f64) {
        scale_entries(&mut self.prod_mul, key, factor);
    }

    /// Multiply consumption of one resource, or of every tracked resource.
    pub fn scale_consumption(&mut self, key: Option<&str>, factor: f64) {
        scale_entries(&mut self.use_mul, key, factor);
    }

    /// Fold `other` into `self` by multiplication.
    pub fn compose(&mut self, other: &Self) {
        self.click_gain *= other.click_gain;
        self.cost *= other.cost;
        for (key, factor) in &other.prod_mul {
            *self.prod_mul.entry(key.clone()).or_insert(1.0) *= factor;
        }
        for (key, factor) in &other.use_mul {
            *self.use_mul.entry(key.clone()).or_insert(1.0) *= factor;
        }
    }

    /// Every factor is finite and positive.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        ok(self.click_gain)
            && ok(self.cost)
            && self.prod_mul.values().all(|&v| ok(v))
            && self.use_mul.values().all(|&v| ok(v))
    }

    /// Add an identity entry for every configured resource that is missing.
    pub(crate) fn fill_missing(&mut self, config: &GameConfig) {
        for resource in &config.resources {
            self.prod_mul.entry(resource.key.clone()).or_insert(1.0);
            self.use_mul.entry(resource.key.clone()).or_insert(1.0);
        }
    }
}

fn scale_entries(map: &mut BTreeMap<ResourceKey, f64>, key: Option<&str>, factor: f64) {
    match key {
        Some(key) => *map.entry(key.to_owned()).or_insert(1.0) *= factor,
        None => map.values_mut().for_each(|v| *v *= factor),
    }
}

/// Apply one upgrade effect at `level` to the accumulator.
pub fn apply_upgrade_effect(effect: &UpgradeEffect, level: u32, acc: &mut Multipliers) {
    if level == 0 {
        return;
    }
    let linear = |per_level: f64| 1.0 + per_level * f64::from(level);
    let decay = |per_level: f64| (1.0 - per_level).powi(level.min(i32::MAX as u32) as i32);
    match effect {
        UpgradeEffect::ClickGain { per_level } => acc.click_gain *= linear(*per_level),
        UpgradeEffect::CostReduction { per_level } => acc.cost *= decay(*per_level),
        UpgradeEffect::Production {
            resource,
            per_level,
        } => acc.scale_production(resource.as_deref(), linear(*per_level)),
        UpgradeEffect::Consumption {
            resource,
            per_level,
        } => acc.scale_consumption(resource.as_deref(), decay(*per_level)),
        UpgradeEffect::StartingResources { .. } => {}
    }
}

/// Compose every active multiplier for `state`.
///
/// Falls back to identity, with a warning, if the composition is not
/// finite and positive.
#[must_use]
pub fn get_multipliers(config: &GameConfig, state: &GameState) -> Multipliers {
    let mut acc = Multipliers::identity(config);
    for upgrade in &config.upgrades {
        apply_upgrade_effect(&upgrade.effect, state.upgrade_level(&upgrade.key), &mut acc);
    }
    acc.compose(&state.achievement_multipliers);

    if acc.is_valid() {
        acc
    } else {
        tracing::warn!(
            category = "calculation",
            op = "get_multipliers",
            "Composed multipliers are not finite and positive; using identity"
        );
        Multipliers::identity(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::fresh_state;

    fn config() -> GameConfig {
        GameConfig::builtin().unwrap()
    }

    #[test]
    fn test_fresh_state_has_identity_multipliers() {
        let config = config();
        let state = fresh_state(&config, 0);
        assert_eq!(get_multipliers(&config, &state), Multipliers::identity(&config));
    }

    #[test]
    fn test_upgrade_effects_stack() {
        let config = config();
        let state = fresh_state(&config, 0)
            .with_upgrade_level("fertile_lands", 2)
            .with_upgrade_level("efficient_tools", 1)
            .with_upgrade_level("strong_arms", 4);
        let m = get_multipliers(&config, &state);

        // fertile_lands: +10% food per level
        assert!((m.production("food") - 1.2).abs() < 1e-9);
        assert_eq!(m.production("wood"), 1.0);
        // efficient_tools: -5% cost per level
        assert!((m.cost - 0.95).abs() < 1e-9);
        // strong_arms: +25% click per level
        assert!((m.click_gain - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_achievement_multipliers_compose() {
        let config = config();
        let mut state = fresh_state(&config, 0).with_upgrade_level("fertile_lands", 1);
        state.achievement_multipliers.scale_production(Some("food"), 2.0);
        state.achievement_multipliers.click_gain = 3.0;

        let m = get_multipliers(&config, &state);
        assert!((m.production("food") - 2.2).abs() < 1e-9);
        assert!((m.click_gain - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_order_does_not_matter() {
        let a = UpgradeEffect::Production {
            resource: None,
            per_level: 0.3,
        };
        let b = UpgradeEffect::Production {
            resource: Some("food".into()),
            per_level: 0.5,
        };
        let config = config();

        let mut forward = Multipliers::identity(&config);
        apply_upgrade_effect(&a, 2, &mut forward);
        apply_upgrade_effect(&b, 3, &mut forward);

        let mut backward = Multipliers::identity(&config);
        apply_upgrade_effect(&b, 3, &mut backward);
        apply_upgrade_effect(&a, 2, &mut backward);

        for key in forward.prod_mul.keys() {
            assert!((forward.production(key) - backward.production(key)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_composition_falls_back_to_identity() {
        let config = config();
        let mut state = fresh_state(&config, 0);
        state.achievement_multipliers.cost = f64::NAN;
        assert_eq!(get_multipliers(&config, &state), Multipliers::identity(&config));
    }
}
