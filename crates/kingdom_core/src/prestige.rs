//! Prestige reset.
//!
//! A reset exchanges lifetime production for prestige currency. The new
//! state comes from the factory; only the prestige balance (plus the gain),
//! upgrade levels, the simulated clock and the whole achievement record
//! (unlocks, progress, notifications, counters and earned multipliers) carry
//! over.

use rand::Rng;

use crate::data::{GameConfig, UpgradeEffect};
use crate::error::{recover, GameError, Result};
use crate::events::random_delay_ms;
use crate::factory::fresh_state;
use crate::state::GameState;

/// Prestige currency a reset would award right now.
///
/// `floor(sqrt(lifetime / divisor))` over the configured lifetime resource.
#[must_use]
pub fn prestige_gain(config: &GameConfig, state: &GameState) -> f64 {
    let settings = &config.prestige;
    let lifetime = state.lifetime_of(&settings.lifetime_resource);
    if !(settings.divisor > 0.0) || !(lifetime > 0.0) {
        return 0.0;
    }
    let gain = (lifetime / settings.divisor).sqrt().floor();
    if gain.is_finite() {
        gain
    } else {
        0.0
    }
}

/// Perform a prestige reset.
pub fn try_do_prestige<R: Rng + ?Sized>(config: &GameConfig, state: &GameState, rng: &mut R) -> Result<GameState> {
    let prestige = &config.prestige.resource;
    if !config.is_resource(prestige) {
        return Err(GameError::unknown("resource", prestige));
    }
    let gain = prestige_gain(config, state);
    let balance = state.resource(prestige) + gain;

    let now = state.t;
    let mut next = fresh_state(config, now);
    let timing = &config.event_timing;
    next.events.next_event_time =
        now + random_delay_ms(rng, timing.initial_min_secs, timing.initial_max_secs);

    for (key, &level) in &state.upgrades {
        if let Some(slot) = next.upgrades.get_mut(key) {
            *slot = level;
        }
    }
    next.achievements = state.achievements.clone();
    next.achievement_multipliers = state.achievement_multipliers.clone();
    next.achievements.stats.prestige_count += 1;

    if let Some(slot) = next.resources.get_mut(prestige) {
        *slot = balance;
    }
    for upgrade in &config.upgrades {
        if let UpgradeEffect::StartingResources {
            resource,
            per_level,
        } = &upgrade.effect
        {
            let level = next.upgrade_level(&upgrade.key);
            next.add_resource(resource, per_level * f64::from(level), false);
        }
    }

    tracing::debug!(
        gain,
        balance,
        prestige_count = next.achievements.stats.prestige_count,
        "Prestige reset"
    );
    Ok(next)
}

/// Perform a prestige reset, or log and return the state unchanged.
#[must_use]
pub fn do_prestige<R: Rng + ?Sized>(config: &GameConfig, state: &GameState, rng: &mut R) -> GameState {
    recover("do_prestige", state, try_do_prestige(config, state, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (GameConfig, GameState, ChaCha8Rng) {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0);
        (config, state, ChaCha8Rng::seed_from_u64(11))
    }

    #[test]
    fn test_gain_from_lifetime() {
        let (config, mut state, _) = setup();
        state.lifetime.insert("food".into(), 4_000.0);
        assert_eq!(prestige_gain(&config, &state), 2.0);
        state.lifetime.insert("food".into(), 999.0);
        assert_eq!(prestige_gain(&config, &state), 0.0);
    }

    #[test]
    fn test_reset_keeps_prestige_and_upgrades() {
        let (config, state, mut rng) = setup();
        let mut state = state
            .with_building_count("farm", 12)
            .with_tech_level("masonry", 1)
            .with_upgrade_level("fertile_lands", 3)
            .with_resource("prestige", 5.0)
            .with_resource("wood", 900.0);
        state.lifetime.insert("food".into(), 9_000.0);
        state.clicks = 40;
        state.t = 77_000;

        let next = try_do_prestige(&config, &state, &mut rng).unwrap();
        assert_eq!(next.resource("prestige"), 8.0);
        assert_eq!(next.upgrade_level("fertile_lands"), 3);
        assert_eq!(next.building_count("farm"), 0);
        assert!(!next.is_researched("masonry"));
        assert_eq!(next.clicks, 0);
        assert_eq!(next.lifetime_of("food"), 0.0);
        assert_eq!(next.t, 77_000);
        assert_eq!(next.resource("wood"), config.resource("wood").unwrap().initial);
        assert_eq!(next.achievements.stats.prestige_count, 1);
    }

    #[test]
    fn test_achievements_survive() {
        let (config, mut state, mut rng) = setup();
        state.achievements.unlocked.insert("first_click".into(), 1);
        state.achievement_multipliers.click_gain = 1.5;

        let next = try_do_prestige(&config, &state, &mut rng).unwrap();
        assert_eq!(next.achievement_level("first_click"), 1);
        assert_eq!(next.achievement_multipliers.click_gain, 1.5);
    }

    #[test]
    fn test_starting_resources_upgrade() {
        let (config, state, mut rng) = setup();
        let state = state.with_upgrade_level("head_start", 2);
        let next = try_do_prestige(&config, &state, &mut rng).unwrap();
        let initial = config.resource("food").unwrap().initial;
        assert_eq!(next.resource("food"), initial + 100.0);
    }

    #[test]
    fn test_fresh_state_prestige_is_default() {
        let (config, state, mut rng) = setup();
        let next = try_do_prestige(&config, &state, &mut rng).unwrap();
        assert_eq!(next.resource("prestige"), 0.0);
        assert_eq!(next.upgrades, state.upgrades);
        assert_eq!(next.resources, state.resources);
        assert_eq!(next.buildings, state.buildings);
    }
}
