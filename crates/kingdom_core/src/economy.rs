//! Economy calculations and purchases.
//!
//! Building and upgrade cost curves, affordability, per-second production,
//! click gains and the resource integration stage of the tick pipeline.
//!
//! Calculators never fail: an unknown key logs a validation warning and
//! yields an empty or zero value, so one bad content entry cannot stall the
//! frame loop.

use crate::data::{Amounts, GameConfig};
use crate::error::{log_error, recover, GameError, Result};
use crate::multipliers::{get_multipliers, Multipliers};
use crate::state::GameState;

/// Price of the next copy of a building.
#[must_use]
pub fn building_cost(config: &GameConfig, state: &GameState, key: &str) -> Amounts {
    let multipliers = get_multipliers(config, state);
    building_cost_with(config, state, key, &multipliers)
}

/// Price of the next copy of a building under precomputed multipliers.
#[must_use]
pub fn building_cost_with(
    config: &GameConfig,
    state: &GameState,
    key: &str,
    multipliers: &Multipliers,
) -> Amounts {
    match config.building(key) {
        Some(building) => building.cost_at(state.building_count(key), multipliers.cost),
        None => {
            log_error("building_cost", &GameError::unknown("building", key));
            Amounts::new()
        }
    }
}

/// True iff every amount in `cost` is covered by the current balance.
#[must_use]
pub fn can_afford(state: &GameState, cost: &Amounts) -> bool {
    state.can_afford(cost)
}

/// First resource in `cost` the balance does not cover.
pub(crate) fn check_affordable(state: &GameState, cost: &Amounts) -> Result<()> {
    match cost.iter().find(|(key, &amount)| amount > state.resource(key)) {
        Some((key, &required)) => Err(GameError::InsufficientResources {
            resource: key.clone(),
            required,
            available: state.resource(key),
        }),
        None => Ok(()),
    }
}

/// Net per-second change of every resource from owned buildings.
#[must_use]
pub fn per_second(config: &GameConfig, state: &GameState) -> Amounts {
    per_second_with(config, state, &get_multipliers(config, state))
}

/// Net per-second change under precomputed multipliers.
///
/// Every configured resource has an entry, zero when nothing touches it.
#[must_use]
pub fn per_second_with(config: &GameConfig, state: &GameState, multipliers: &Multipliers) -> Amounts {
    let mut rates: Amounts = config
        .resources
        .iter()
        .map(|r| (r.key.clone(), 0.0))
        .collect();

    for building in &config.buildings {
        let owned = state.building_count(&building.key);
        if owned == 0 {
            continue;
        }
        let n = f64::from(owned);
        for (key, base) in &building.produces {
            *rates.entry(key.clone()).or_insert(0.0) += base * n * multipliers.production(key);
        }
        for (key, base) in &building.consumes {
            *rates.entry(key.clone()).or_insert(0.0) -= base * n * multipliers.consumption(key);
        }
    }
    rates
}

/// Resources gained by one manual click.
#[must_use]
pub fn click_gains(config: &GameConfig, state: &GameState) -> Amounts {
    let multipliers = get_multipliers(config, state);
    config
        .click_gains
        .iter()
        .map(|(key, base)| (key.clone(), base * multipliers.click_gain))
        .collect()
}

/// Prestige price of the next level of an upgrade currently at `level`.
#[must_use]
pub fn upgrade_cost(config: &GameConfig, key: &str, level: u32) -> f64 {
    match config.upgrade(key) {
        Some(upgrade) => {
            let cost = upgrade.cost.at(level).ceil();
            if cost.is_finite() && cost >= 0.0 {
                cost
            } else {
                log_error(
                    "upgrade_cost",
                    &GameError::Calculation(format!("upgrade '{key}' cost is {cost}")),
                );
                0.0
            }
        }
        None => {
            log_error("upgrade_cost", &GameError::unknown("upgrade", key));
            0.0
        }
    }
}

/// Whether the next level of an upgrade can be bought right now.
#[must_use]
pub fn can_buy_upgrade(config: &GameConfig, state: &GameState, key: &str) -> bool {
    let Some(upgrade) = config.upgrade(key) else {
        return false;
    };
    let level = state.upgrade_level(key);
    level < upgrade.max_level
        && state.resource(&config.prestige.resource) >= upgrade_cost(config, key, level)
}

/// Buy one copy of a building.
pub fn try_buy_building(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    if config.building(key).is_none() {
        return Err(GameError::unknown("building", key));
    }
    let cost = building_cost(config, state, key);
    check_affordable(state, &cost)?;

    let mut next = state.clone();
    next.pay(&cost);
    *next.buildings.entry(key.to_owned()).or_insert(0) += 1;
    next.achievements.stats.buildings_bought += 1;
    Ok(next)
}

/// Buy one copy of a building, or log and return the state unchanged.
#[must_use]
pub fn buy_building(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("buy_building", state, try_buy_building(config, state, key))
}

/// Buy the next level of a prestige upgrade.
pub fn try_buy_upgrade(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    let upgrade = config
        .upgrade(key)
        .ok_or_else(|| GameError::unknown("upgrade", key))?;
    let level = state.upgrade_level(key);
    if level >= upgrade.max_level {
        return Err(GameError::InvalidState(format!(
            "Upgrade '{key}' is already at max level {}",
            upgrade.max_level
        )));
    }

    let prestige = &config.prestige.resource;
    let cost = upgrade_cost(config, key, level);
    let available = state.resource(prestige);
    if available < cost {
        return Err(GameError::InsufficientResources {
            resource: prestige.clone(),
            required: cost,
            available,
        });
    }

    let mut next = state.clone();
    next.remove_resource(prestige, cost);
    next.upgrades.insert(key.to_owned(), level + 1);
    Ok(next)
}

/// Buy the next level of an upgrade, or log and return the state unchanged.
#[must_use]
pub fn buy_upgrade(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("buy_upgrade", state, try_buy_upgrade(config, state, key))
}

/// Perform one manual click.
#[must_use]
pub fn click_action(config: &GameConfig, state: &GameState) -> GameState {
    let gains = click_gains(config, state);
    let mut next = state.clone();
    next.grant(&gains, true);
    next.clicks += 1;
    next
}

/// Integrate building production over `dt` seconds.
///
/// Production is added in full and counted towards lifetime totals.
/// Consumption is clamped so no balance drops below zero.
pub(crate) fn integrate_production(config: &GameConfig, state: &mut GameState, dt: f64) {
    let rates = per_second(config, state);
    for (key, rate) in rates {
        let delta = rate * dt;
        if delta >= 0.0 {
            state.add_resource(&key, delta, true);
        } else {
            let have = state.resource(&key);
            let allowed = (-have).max(delta);
            state.add_resource(&key, allowed, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::fresh_state;

    fn setup() -> (GameConfig, GameState) {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0);
        (config, state)
    }

    #[test]
    fn test_building_cost_scales() {
        let (config, state) = setup();
        let base = building_cost(&config, &state, "farm");
        let state = state.with_building_count("farm", 3);
        let scaled = building_cost(&config, &state, "farm");
        for (key, amount) in &base {
            assert!(scaled[key] > *amount);
        }
    }

    #[test]
    fn test_unknown_building_cost_is_empty() {
        let (config, state) = setup();
        assert!(building_cost(&config, &state, "castle").is_empty());
    }

    #[test]
    fn test_buy_building_pays_and_counts() {
        let (config, state) = setup();
        let cost = building_cost(&config, &state, "farm");
        let mut state = state;
        for (key, amount) in &cost {
            state = state.with_resource(key, *amount + 1.0);
        }

        let next = try_buy_building(&config, &state, "farm").unwrap();
        assert_eq!(next.building_count("farm"), 1);
        assert_eq!(next.achievements.stats.buildings_bought, 1);
        for (key, amount) in &cost {
            assert!((next.resource(key) - (state.resource(key) - amount)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_buy_building_unaffordable_is_unchanged() {
        let (config, state) = setup();
        let broke = config
            .resources
            .iter()
            .fold(state, |s, r| s.with_resource(&r.key, 0.0));
        let err = try_buy_building(&config, &broke, "farm").unwrap_err();
        assert!(matches!(err, GameError::InsufficientResources { .. }));
        assert_eq!(buy_building(&config, &broke, "farm"), broke);
    }

    #[test]
    fn test_per_second_production_and_consumption() {
        let (config, state) = setup();
        let state = state
            .with_building_count("farm", 2)
            .with_building_count("lumber_mill", 1);
        let rates = per_second(&config, &state);

        let farm = config.building("farm").unwrap();
        let mill = config.building("lumber_mill").unwrap();
        let expected_food = farm.produces["food"] * 2.0 - mill.consumes["food"];
        assert!((rates["food"] - expected_food).abs() < 1e-9);
        assert!((rates["wood"] - mill.produces["wood"]).abs() < 1e-9);
        assert_eq!(rates["gold"], 0.0);
    }

    #[test]
    fn test_consumption_clamps_at_zero() {
        let (config, state) = setup();
        let mut state = state
            .with_building_count("lumber_mill", 10)
            .with_resource("food", 1.0);
        integrate_production(&config, &mut state, 100.0);
        assert_eq!(state.resource("food"), 0.0);
        assert!(state.resource("wood") > 0.0);
    }

    #[test]
    fn test_click_action() {
        let (config, state) = setup();
        let food = state.resource("food");
        let next = click_action(&config, &state);
        assert_eq!(next.clicks, 1);
        assert!((next.resource("food") - food - config.click_gains["food"]).abs() < 1e-9);
        assert!(next.lifetime_of("food") > 0.0);

        let boosted = state.with_upgrade_level("strong_arms", 4);
        let gains = click_gains(&config, &boosted);
        assert!((gains["food"] - config.click_gains["food"] * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_upgrade_purchase() {
        let (config, state) = setup();
        assert!(!can_buy_upgrade(&config, &state, "fertile_lands"));

        let price = upgrade_cost(&config, "fertile_lands", 0);
        let state = state.with_resource("prestige", price);
        assert!(can_buy_upgrade(&config, &state, "fertile_lands"));

        let next = try_buy_upgrade(&config, &state, "fertile_lands").unwrap();
        assert_eq!(next.upgrade_level("fertile_lands"), 1);
        assert_eq!(next.resource("prestige"), 0.0);
    }

    #[test]
    fn test_upgrade_max_level() {
        let (config, state) = setup();
        let max = config.upgrade("efficient_tools").unwrap().max_level;
        let state = state
            .with_upgrade_level("efficient_tools", max)
            .with_resource("prestige", 1.0e9);
        assert!(!can_buy_upgrade(&config, &state, "efficient_tools"));
        assert!(matches!(
            try_buy_upgrade(&config, &state, "efficient_tools"),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_upgrade_cost_rounds_up() {
        let (config, _) = setup();
        let raw = config.upgrade("fertile_lands").unwrap().cost.at(3);
        assert_eq!(upgrade_cost(&config, "fertile_lands", 3), raw.ceil());
        assert_eq!(upgrade_cost(&config, "nope", 3), 0.0);
    }
}
