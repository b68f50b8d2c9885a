//! Repeating loop actions under a concurrency cap.
//!
//! Each entry races towards its action's `loop_points_required`, gaining
//! `base_points_per_tick` on every tick while running. At most
//! `max_concurrent_actions` entries run at once; starting another evicts
//! (pauses) the running entry that started earliest.
//!
//! A loop's cost is charged once, when the loop begins. Completing a loop
//! grants its gains and immediately tries to pay for the next one; if that
//! fails the entry is paused with zero points instead of erroring.

use crate::actions::conditions_met;
use crate::data::{GameConfig, LoopActionData};
use crate::economy::check_affordable;
use crate::error::{recover, GameError, Result};
use crate::state::{GameState, LoopActionState, Timestamp};

/// Whether a loop action's unlock conditions hold.
#[must_use]
pub fn is_loop_action_unlocked(config: &GameConfig, state: &GameState, key: &str) -> bool {
    config
        .loop_action(key)
        .is_some_and(|action| conditions_met(config, state, &action.unlock))
}

/// Fraction of the current loop completed, `0` for unknown or absent entries.
#[must_use]
pub fn loop_progress(config: &GameConfig, state: &GameState, key: &str) -> f64 {
    match (config.loop_action(key), state.loop_action(key)) {
        (Some(action), Some(entry)) if action.loop_points_required > 0.0 => {
            (entry.current_points / action.loop_points_required).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

fn lookup<'a>(config: &'a GameConfig, key: &str) -> Result<&'a LoopActionData> {
    config
        .loop_action(key)
        .ok_or_else(|| GameError::unknown("loop action", key))
}

fn entry_index(state: &GameState, key: &str) -> Option<usize> {
    state.loop_actions.iter().position(|l| l.action_key == key)
}

/// Pause running entries, oldest first, until one more fits under the cap.
fn make_room(state: &mut GameState, now: Timestamp) {
    let cap = state.loop_settings.max_concurrent_actions as usize;
    while state.active_loop_count() >= cap {
        let oldest = state
            .loop_actions
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_running())
            .min_by_key(|(i, l)| (l.started_at, *i))
            .map(|(i, _)| i);
        let Some(index) = oldest else {
            break;
        };
        let evicted = &mut state.loop_actions[index];
        evicted.is_active = false;
        evicted.is_paused = true;
        evicted.last_tick_at = now;
        tracing::debug!(loop_action = %evicted.action_key, "Loop action evicted");
    }
}

/// Start a loop action, or resume it if paused.
///
/// Starting an action that is already running is a no-op. If the loop has
/// not been paid for yet the cost must be affordable; it is charged here.
pub fn try_start_loop_action(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    let action = lookup(config, key)?;
    let existing = entry_index(state, key);
    if existing.is_some_and(|i| state.loop_actions[i].is_running()) {
        return Ok(state.clone());
    }
    if !conditions_met(config, state, &action.unlock) {
        return Err(GameError::Locked {
            kind: "loop action",
            key: key.to_owned(),
        });
    }
    let paid = existing.is_some_and(|i| state.loop_actions[i].loop_paid);
    if !paid {
        check_affordable(state, &action.cost)?;
    }

    let mut next = state.clone();
    let now = next.t;
    make_room(&mut next, now);
    if !paid {
        next.pay(&action.cost);
    }

    let index = match existing {
        Some(i) => i,
        None => {
            next.loop_actions.push(LoopActionState::new(key, now));
            next.loop_actions.len() - 1
        }
    };
    let entry = &mut next.loop_actions[index];
    entry.is_active = true;
    entry.is_paused = false;
    entry.loop_paid = true;
    entry.started_at = now;
    entry.last_tick_at = now;
    tracing::debug!(loop_action = %key, "Loop action started");
    Ok(next)
}

/// Start a loop action, or log and return the state unchanged.
#[must_use]
pub fn start_loop_action(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("start_loop_action", state, try_start_loop_action(config, state, key))
}

/// Stop a loop action, forfeiting the current loop's progress.
pub fn try_stop_loop_action(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    lookup(config, key)?;
    let index = entry_index(state, key).ok_or_else(|| {
        GameError::InvalidState(format!("Loop action '{key}' has never been started"))
    })?;
    let mut next = state.clone();
    let now = next.t;
    let entry = &mut next.loop_actions[index];
    entry.is_active = false;
    entry.is_paused = false;
    entry.current_points = 0.0;
    entry.loop_paid = false;
    entry.last_tick_at = now;
    Ok(next)
}

/// Stop a loop action, or log and return the state unchanged.
#[must_use]
pub fn stop_loop_action(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("stop_loop_action", state, try_stop_loop_action(config, state, key))
}

/// Pause a running loop action, keeping its points.
pub fn try_pause_loop_action(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    lookup(config, key)?;
    let index = entry_index(state, key)
        .filter(|&i| state.loop_actions[i].is_running())
        .ok_or_else(|| GameError::InvalidState(format!("Loop action '{key}' is not running")))?;
    let mut next = state.clone();
    let now = next.t;
    let entry = &mut next.loop_actions[index];
    entry.is_active = false;
    entry.is_paused = true;
    entry.last_tick_at = now;
    Ok(next)
}

/// Pause a loop action, or log and return the state unchanged.
#[must_use]
pub fn pause_loop_action(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("pause_loop_action", state, try_pause_loop_action(config, state, key))
}

/// Resume a paused loop action.
pub fn try_resume_loop_action(config: &GameConfig, state: &GameState, key: &str) -> Result<GameState> {
    lookup(config, key)?;
    let paused = entry_index(state, key).is_some_and(|i| state.loop_actions[i].is_paused);
    if !paused {
        return Err(GameError::InvalidState(format!(
            "Loop action '{key}' is not paused"
        )));
    }
    try_start_loop_action(config, state, key)
}

/// Resume a loop action, or log and return the state unchanged.
#[must_use]
pub fn resume_loop_action(config: &GameConfig, state: &GameState, key: &str) -> GameState {
    recover("resume_loop_action", state, try_resume_loop_action(config, state, key))
}

/// Loop stage of the tick pipeline.
///
/// Entries are advanced in list order so earlier completions can fund the
/// next loop of later entries within the same tick.
pub(crate) fn process_loop_actions(config: &GameConfig, state: &mut GameState, now: Timestamp) {
    let points = state.loop_settings.base_points_per_tick;
    for index in 0..state.loop_actions.len() {
        if !state.loop_actions[index].is_running() {
            continue;
        }
        let key = state.loop_actions[index].action_key.clone();
        let Some(action) = config.loop_action(&key) else {
            tracing::warn!(
                category = "validation",
                op = "process_loop_actions",
                loop_action = %key,
                "Loop action is not configured; pausing"
            );
            let entry = &mut state.loop_actions[index];
            entry.is_active = false;
            entry.is_paused = true;
            continue;
        };

        let entry = &mut state.loop_actions[index];
        entry.current_points += points;
        entry.last_tick_at = now;
        if entry.current_points < action.loop_points_required {
            continue;
        }
        entry.current_points = 0.0;
        entry.total_loops_completed += 1;
        entry.loop_paid = false;

        state.grant(&action.gains, true);
        state.achievements.stats.loops_completed += 1;

        let affordable = state.can_afford(&action.cost);
        if affordable {
            state.pay(&action.cost);
        }
        let entry = &mut state.loop_actions[index];
        if affordable {
            entry.loop_paid = true;
        } else {
            entry.is_active = false;
            entry.is_paused = true;
            tracing::debug!(loop_action = %key, "Next loop unaffordable; pausing");
        }
    }
}
