//! Random event scheduling.
//!
//! The scheduler is a two-state machine:
//!
//! - **Idle**: no active event; a new one is drawn once `now >= next_event_time`.
//! - **Active**: one event is waiting for a choice. It resolves when the
//!   player picks an affordable choice, or on its own with the default
//!   choice once `auto_resolve_secs` have passed.
//!
//! Every resolution appends to a bounded history (oldest evicted first) and
//! schedules the next draw a uniform random interval later.

use rand::Rng;

use crate::data::{EventChoice, EventData, GameConfig};
use crate::error::{recover, GameError, Result};
use crate::state::{EventHistoryEntry, GameState, Timestamp};

/// Uniform random delay between `min_secs` and `max_secs`, in milliseconds.
pub(crate) fn random_delay_ms<R: Rng + ?Sized>(rng: &mut R, min_secs: f64, max_secs: f64) -> u64 {
    let min = (min_secs.max(0.0) * 1000.0) as u64;
    let max = (max_secs.max(0.0) * 1000.0) as u64;
    if max <= min {
        min
    } else {
        rng.gen_range(min..=max)
    }
}

/// Draw an event by weight.
///
/// Walks the list subtracting weights from a uniform draw in
/// `[0, total)`; falls back to the first event if rounding exhausts the
/// list. Returns `None` when no event has a positive weight.
pub fn select_weighted_event<'a, R: Rng + ?Sized>(
    events: &'a [EventData],
    rng: &mut R,
) -> Option<&'a EventData> {
    let total: f64 = events.iter().map(|e| e.weight.max(0.0)).sum();
    if !(total > 0.0) || !total.is_finite() {
        return None;
    }
    let mut remaining = rng.gen::<f64>() * total;
    for event in events {
        let weight = event.weight.max(0.0);
        if weight == 0.0 {
            continue;
        }
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(event);
        }
    }
    events.iter().find(|e| e.weight > 0.0)
}

/// The active event's definition, if an event is active.
#[must_use]
pub fn active_event<'a>(config: &'a GameConfig, state: &GameState) -> Option<&'a EventData> {
    state
        .events
        .active_event
        .as_deref()
        .and_then(|key| config.event(key))
}

/// Whether `choice` can be selected with the current balance.
#[must_use]
pub fn can_choose(state: &GameState, choice: &EventChoice) -> bool {
    state.can_afford(&choice.requires)
}

/// Apply `gives` and `takes` of a choice.
fn apply_choice(state: &mut GameState, choice: &EventChoice) {
    state.grant(&choice.gives, true);
    state.pay(&choice.takes);
}

/// Record a resolution, clear the active event and schedule the next one.
fn finish_event<R: Rng + ?Sized>(
    config: &GameConfig,
    state: &mut GameState,
    event_key: String,
    choice_index: usize,
    auto_resolved: bool,
    now: Timestamp,
    rng: &mut R,
) {
    let timing = &config.event_timing;
    let history = &mut state.events.event_history;
    history.push_back(EventHistoryEntry {
        event_key: event_key.clone(),
        choice_index,
        timestamp: now,
        auto_resolved,
    });
    while history.len() > timing.history_cap {
        history.pop_front();
    }

    let stats = &mut state.achievements.stats;
    stats.events_resolved += 1;
    *stats.events_by_key.entry(event_key).or_insert(0) += 1;

    state.events.active_event = None;
    state.events.next_event_time =
        now + random_delay_ms(rng, timing.min_interval_secs, timing.max_interval_secs);
}

/// Resolve the active event with the choice at `choice_index`.
pub fn try_make_event_choice<R: Rng + ?Sized>(
    config: &GameConfig,
    state: &GameState,
    choice_index: usize,
    rng: &mut R,
) -> Result<GameState> {
    let key = state
        .events
        .active_event
        .as_deref()
        .ok_or_else(|| GameError::InvalidState("No event is active".into()))?;
    let event = config
        .event(key)
        .ok_or_else(|| GameError::unknown("event", key))?;
    let choice = event
        .choices
        .get(choice_index)
        .ok_or_else(|| GameError::InvalidParameter {
            name: "choice_index",
            value: choice_index.to_string(),
        })?;
    crate::economy::check_affordable(state, &choice.requires)?;

    let mut next = state.clone();
    apply_choice(&mut next, choice);
    let now = next.t;
    finish_event(config, &mut next, event.key.clone(), choice_index, false, now, rng);
    tracing::debug!(event = %event.key, choice_index, "Event resolved");
    Ok(next)
}

/// Resolve the active event, or log and return the state unchanged.
#[must_use]
pub fn make_event_choice<R: Rng + ?Sized>(
    config: &GameConfig,
    state: &GameState,
    choice_index: usize,
    rng: &mut R,
) -> GameState {
    recover(
        "make_event_choice",
        state,
        try_make_event_choice(config, state, choice_index, rng),
    )
}

/// Event stage of the tick pipeline.
///
/// Auto-resolves a timed-out event, or draws a new one when idle and due.
pub(crate) fn process_events<R: Rng + ?Sized>(
    config: &GameConfig,
    state: &mut GameState,
    now: Timestamp,
    rng: &mut R,
) {
    if let Some(key) = state.events.active_event.clone() {
        let timeout = (config.event_timing.auto_resolve_secs.max(0.0) * 1000.0) as u64;
        if now.saturating_sub(state.events.active_event_start_time) <= timeout {
            return;
        }
        let Some(event) = config.event(&key) else {
            tracing::warn!(category = "state", op = "process_events", event = %key, "Active event is not configured; clearing");
            finish_event(config, state, key, 0, true, now, rng);
            return;
        };
        let index = event.default_choice;
        if let Some(choice) = event.choices.get(index) {
            if can_choose(state, choice) {
                apply_choice(state, choice);
            }
        }
        finish_event(config, state, key, index, true, now, rng);
        tracing::debug!(event = %event.key, "Event auto-resolved");
        return;
    }

    if now < state.events.next_event_time {
        return;
    }
    match select_weighted_event(&config.events, rng) {
        Some(event) => {
            state.events.active_event = Some(event.key.clone());
            state.events.active_event_start_time = now;
            tracing::debug!(event = %event.key, "Event activated");
        }
        None => {
            // Nothing can fire; try again after a normal interval.
            let timing = &config.event_timing;
            state.events.next_event_time =
                now + random_delay_ms(rng, timing.min_interval_secs, timing.max_interval_secs);
        }
    }
}
