//! One-shot actions with unlock conditions and cooldowns.

use crate::data::{GameConfig, UnlockCondition};
use crate::economy::check_affordable;
use crate::error::{recover, GameError, Result};
use crate::state::{ActionUnlock, GameState, Timestamp};

/// Whether every unlock condition holds against `state`.
///
/// An empty list is always met.
pub(crate) fn conditions_met(config: &GameConfig, state: &GameState, conditions: &[UnlockCondition]) -> bool {
    conditions.iter().all(|condition| match condition {
        UnlockCondition::Resource { key, amount } => state.resource(key) >= *amount,
        UnlockCondition::Building { key, count } => state.building_count(key) >= *count,
        UnlockCondition::Technology { key } => state.is_researched(key),
        UnlockCondition::Prestige { amount } => state.resource(&config.prestige.resource) >= *amount,
    })
}

/// Mark a one-shot action unlocked, keeping its first unlock time.
pub(crate) fn unlock_action(state: &mut GameState, key: &str, now: Timestamp) {
    let entry = state
        .actions
        .unlocks
        .entry(key.to_owned())
        .or_insert_with(ActionUnlock::default);
    if !entry.unlocked {
        entry.unlocked = true;
        entry.unlocked_at = Some(now);
    }
}

/// Whether a one-shot action is usable, either already unlocked or with its
/// conditions currently met.
#[must_use]
pub fn is_action_unlocked(config: &GameConfig, state: &GameState, key: &str) -> bool {
    let Some(action) = config.action(key) else {
        return false;
    };
    let recorded = state.actions.unlocks.get(key).is_some_and(|u| u.unlocked);
    recorded || (!action.unlock.is_empty() && conditions_met(config, state, &action.unlock))
}

/// Milliseconds until the action is off cooldown, `0` when ready.
#[must_use]
pub fn action_ready_in(state: &GameState, key: &str) -> u64 {
    state
        .actions
        .cooldowns
        .get(key)
        .map_or(0, |&ready_at| ready_at.saturating_sub(state.t))
}

/// Use a one-shot action.
///
/// Checks unlock, cooldown and cost in that order, then pays, grants the
/// gains and starts the cooldown.
pub fn try_perform_action(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    let action = config
        .action(key)
        .ok_or_else(|| GameError::unknown("action", key))?;
    if !is_action_unlocked(config, state, key) {
        return Err(GameError::Locked {
            kind: "action",
            key: key.to_owned(),
        });
    }
    let remaining_ms = action_ready_in(state, key);
    if remaining_ms > 0 {
        return Err(GameError::OnCooldown {
            key: key.to_owned(),
            remaining_ms,
        });
    }
    check_affordable(state, &action.cost)?;

    let mut next = state.clone();
    let now = next.t;
    unlock_action(&mut next, key, now);
    next.pay(&action.cost);
    next.grant(&action.gains, true);
    if let Some(unlock) = next.actions.unlocks.get_mut(key) {
        unlock.last_used = Some(now);
    }
    next.actions
        .cooldowns
        .insert(key.to_owned(), now + action.cooldown_ms());
    *next
        .achievements
        .stats
        .actions_used
        .entry(key.to_owned())
        .or_insert(0) += 1;
    tracing::debug!(action = %key, "Action performed");
    Ok(next)
}

/// Use a one-shot action, or log and return the state unchanged.
#[must_use]
pub fn perform_action(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("perform_action", state, try_perform_action(config, state, key))
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
    fn test_perform_grants_and_starts_cooldown() {
        let (config, state) = setup();
        let forage = config.action("forage").unwrap();
        let food = state.resource("food");

        let next = try_perform_action(&config, &state, "forage").unwrap();
        assert!((next.resource("food") - food - forage.gains["food"]).abs() < 1e-9);
        assert_eq!(next.actions.cooldowns["forage"], forage.cooldown_ms());
        assert_eq!(next.actions.unlocks["forage"].last_used, Some(0));
        assert_eq!(next.achievements.stats.actions_used["forage"], 1);
        assert_eq!(action_ready_in(&next, "forage"), forage.cooldown_ms());
    }

    #[test]
    fn test_cooldown_blocks_until_elapsed() {
        let (config, state) = setup();
        let mut next = try_perform_action(&config, &state, "forage").unwrap();
        let err = try_perform_action(&config, &next, "forage").unwrap_err();
        assert!(matches!(err, GameError::OnCooldown { .. }));

        next.t = next.actions.cooldowns["forage"];
        assert_eq!(action_ready_in(&next, "forage"), 0);
        assert!(try_perform_action(&config, &next, "forage").is_ok());
    }

    #[test]
    fn test_locked_action_rejected() {
        let (config, state) = setup();
        let state = state.with_resource("food", 1_000.0);
        assert!(!is_action_unlocked(&config, &state, "quarry_expedition"));
        assert!(matches!(
            try_perform_action(&config, &state, "quarry_expedition"),
            Err(GameError::Locked { .. })
        ));
        assert_eq!(perform_action(&config, &state, "quarry_expedition"), state);
    }

    #[test]
    fn test_conditions_unlock_on_use() {
        let (config, state) = setup();
        let state = state.with_resource("gold", 1_000.0);
        assert!(!is_action_unlocked(&config, &state, "royal_decree"));

        let state = state.with_resource("prestige", 1.0);
        assert!(is_action_unlocked(&config, &state, "royal_decree"));
        let next = try_perform_action(&config, &state, "royal_decree").unwrap();
        assert!(next.actions.unlocks["royal_decree"].unlocked);

        // stays unlocked after the condition stops holding
        let spent = next.with_resource("prestige", 0.0);
        assert!(is_action_unlocked(&config, &spent, "royal_decree"));
    }

    #[test]
    fn test_unaffordable_action_rejected() {
        let (config, mut state) = setup();
        unlock_action(&mut state, "quarry_expedition", 0);
        let state = state.with_resource("food", 0.0);
        assert!(matches!(
            try_perform_action(&config, &state, "quarry_expedition"),
            Err(GameError::InsufficientResources { .. })
        ));
    }

    #[test]
    fn test_unknown_action() {
        let (config, state) = setup();
        assert!(matches!(
            try_perform_action(&config, &state, "teleport"),
            Err(GameError::UnknownKey { .. })
        ));
    }
}
