//! Technology research with a single active slot.

use crate::data::{GameConfig, TechEffect, TechnologyData};
use crate::economy::check_affordable;
use crate::error::{recover, GameError, Result};
use crate::actions::unlock_action;
use crate::state::{GameState, Timestamp};

/// Whether every prerequisite of `tech` has been researched.
#[must_use]
pub fn prerequisites_met(state: &GameState, tech: &TechnologyData) -> bool {
    tech.prerequisites.iter().all(|p| state.is_researched(p))
}

/// Technologies that could be started right now, ignoring cost.
pub fn available_technologies<'a>(
    config: &'a GameConfig,
    state: &'a GameState,
) -> impl Iterator<Item = &'a TechnologyData> + 'a {
    config
        .technologies
        .iter()
        .filter(move |t| !state.is_researched(&t.key) && prerequisites_met(state, t))
}

/// Fraction of the active research that has elapsed, `0` when idle.
#[must_use]
pub fn research_progress(state: &GameState) -> f64 {
    let research = &state.research;
    if research.active_research.is_none() {
        return 0.0;
    }
    let total = research.research_end_time.saturating_sub(research.research_start_time);
    if total == 0 {
        return 1.0;
    }
    let done = state.t.saturating_sub(research.research_start_time);
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

/// Start researching a technology.
pub fn try_research_technology(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    let tech = config
        .technology(key)
        .ok_or_else(|| GameError::unknown("technology", key))?;
    if let Some(active) = &state.research.active_research {
        return Err(GameError::InvalidState(format!(
            "Already researching '{active}'"
        )));
    }
    if state.is_researched(key) {
        return Err(GameError::InvalidState(format!(
            "Technology '{key}' is already researched"
        )));
    }
    if let Some(missing) = tech.prerequisites.iter().find(|p| !state.is_researched(p)) {
        return Err(GameError::InvalidState(format!(
            "Technology '{key}' requires '{missing}'"
        )));
    }
    check_affordable(state, &tech.cost)?;

    let mut next = state.clone();
    next.pay(&tech.cost);
    let now = next.t;
    next.research.active_research = Some(tech.key.clone());
    next.research.research_start_time = now;
    next.research.research_end_time = now + tech.research_ms();
    tracing::debug!(technology = %tech.key, ends_at = next.research.research_end_time, "Research started");
    Ok(next)
}

/// Start researching, or log and return the state unchanged.
#[must_use]
pub fn research_technology(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("research_technology", state, try_research_technology(config, state, key))
}

/// Abort the active research and refund its cost in full.
pub fn try_cancel_research(config: &GameConfig, state: &GameState) -> Result<GameState> {
    let key = state
        .research
        .active_research
        .as_deref()
        .ok_or_else(|| GameError::InvalidState("No research is active".into()))?;
    let mut next = state.clone();
    if let Some(tech) = config.technology(key) {
        next.grant(&tech.cost, false);
    }
    next.research.active_research = None;
    Ok(next)
}

/// Abort the active research, or log and return the state unchanged.
#[must_use]
pub fn cancel_research(config: &GameConfig, state: &GameState) -> GameState {
    recover("cancel_research", state, try_cancel_research(config, state))
}

/// Apply a technology's completion effect.
fn apply_tech_effect(config: &GameConfig, state: &mut GameState, effect: &TechEffect, now: Timestamp) {
    match effect {
        TechEffect::GrantResources { amounts } => state.grant(amounts, false),
        TechEffect::UnlockAction { action } => {
            if config.action(action).is_some() {
                unlock_action(state, action, now);
            } else {
                crate::error::log_error("apply_tech_effect", &GameError::unknown("action", action));
            }
        }
        TechEffect::RaiseLoopCap { amount } => {
            let settings = &mut state.loop_settings;
            settings.max_concurrent_actions = settings.max_concurrent_actions.saturating_add(*amount);
        }
        TechEffect::AddPointsPerTick { amount } => {
            state.loop_settings.base_points_per_tick += amount.max(0.0);
        }
    }
}

/// Research stage of the tick pipeline.
pub(crate) fn process_research(config: &GameConfig, state: &mut GameState, now: Timestamp) {
    let Some(key) = state.research.active_research.clone() else {
        return;
    };
    if now < state.research.research_end_time {
        return;
    }

    state.research.active_research = None;
    let Some(tech) = config.technology(&key) else {
        tracing::warn!(category = "state", op = "process_research", technology = %key, "Active research is not configured; clearing");
        return;
    };
    state.technologies.insert(key.clone(), 1);
    if let Some(effect) = &tech.effect {
        apply_tech_effect(config, state, effect, now);
    }
    state.achievements.stats.research_completed += 1;
    tracing::debug!(technology = %key, "Research complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::fresh_state;

    fn setup() -> (GameConfig, GameState) {
        let config = GameConfig::builtin().unwrap();
        let mut state = fresh_state(&config, 0);
        for r in &config.resources {
            state = state.with_resource(&r.key, 10_000.0);
        }
        (config, state)
    }

    #[test]
    fn test_research_lifecycle() {
        let (config, state) = setup();
        let tech = config.technology("masonry").unwrap().clone();

        let started = try_research_technology(&config, &state, "masonry").unwrap();
        assert_eq!(started.research.active_research.as_deref(), Some("masonry"));
        assert_eq!(started.research.research_end_time, tech.research_ms());
        for (key, amount) in &tech.cost {
            assert!((started.resource(key) - (10_000.0 - amount)).abs() < 1e-9);
        }

        let mut running = started.clone();
        process_research(&config, &mut running, tech.research_ms() - 1);
        assert!(!running.is_researched("masonry"));

        process_research(&config, &mut running, tech.research_ms());
        assert!(running.is_researched("masonry"));
        assert!(running.research.active_research.is_none());
        assert_eq!(running.achievements.stats.research_completed, 1);
    }

    #[test]
    fn test_only_one_active_research() {
        let (config, state) = setup();
        let started = try_research_technology(&config, &state, "masonry").unwrap();
        assert!(matches!(
            try_research_technology(&config, &started, "trade_routes"),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_prerequisites_enforced() {
        let (config, state) = setup();
        assert!(try_research_technology(&config, &state, "logistics").is_err());
        let state = state.with_tech_level("masonry", 1);
        assert!(try_research_technology(&config, &state, "logistics").is_ok());
    }

    #[test]
    fn test_already_researched_rejected() {
        let (config, state) = setup();
        let state = state.with_tech_level("masonry", 1);
        assert_eq!(research_technology(&config, &state, "masonry"), state);
    }

    #[test]
    fn test_cancel_refunds() {
        let (config, state) = setup();
        let started = try_research_technology(&config, &state, "masonry").unwrap();
        let cancelled = try_cancel_research(&config, &started).unwrap();
        assert!(cancelled.research.active_research.is_none());
        assert_eq!(cancelled.resources, state.resources);
    }

    #[test]
    fn test_effects_apply_on_completion() {
        let (config, state) = setup();

        let mut s = try_research_technology(&config, &state, "masonry").unwrap();
        let end = s.research.research_end_time;
        process_research(&config, &mut s, end);
        assert!(s.actions.unlocks["quarry_expedition"].unlocked);
        assert_eq!(s.actions.unlocks["quarry_expedition"].unlocked_at, Some(end));

        let cap = s.loop_settings.max_concurrent_actions;
        s.t = end;
        let mut s = try_research_technology(&config, &s, "logistics").unwrap();
        let end = s.research.research_end_time;
        process_research(&config, &mut s, end);
        assert_eq!(s.loop_settings.max_concurrent_actions, cap + 1);

        let gold = s.resource("gold");
        s.t = end;
        let mut s = try_research_technology(&config, &s, "trade_routes").unwrap();
        let paid = config.technology("trade_routes").unwrap().cost.get("gold").copied().unwrap_or(0.0);
        let end = s.research.research_end_time;
        process_research(&config, &mut s, end);
        assert!((s.resource("gold") - (gold - paid + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn test_points_per_tick_effect() {
        let (config, mut state) = setup();
        let base = state.loop_settings.base_points_per_tick;

        apply_tech_effect(&config, &mut state, &TechEffect::AddPointsPerTick { amount: 25.0 }, 0);
        assert!((state.loop_settings.base_points_per_tick - (base + 25.0)).abs() < 1e-9);

        apply_tech_effect(&config, &mut state, &TechEffect::AddPointsPerTick { amount: -50.0 }, 0);
        assert!((state.loop_settings.base_points_per_tick - (base + 25.0)).abs() < 1e-9);
    }

    #[test]
    fn test_progress() {
        let (config, state) = setup();
        assert_eq!(research_progress(&state), 0.0);
        let mut s = try_research_technology(&config, &state, "masonry").unwrap();
        s.t = s.research.research_end_time / 2;
        assert!((research_progress(&s) - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_available_technologies() {
        let (config, state) = setup();
        let keys: Vec<_> = available_technologies(&config, &state).map(|t| t.key.as_str()).collect();
        assert!(keys.contains(&"masonry"));
        assert!(!keys.contains(&"logistics"));
    }
}
