//! Construction of fresh game states.

use rand::Rng;

use crate::data::GameConfig;
use crate::error::Result;
use crate::events::random_delay_ms;
use crate::multipliers::Multipliers;
use crate::state::{
    AchievementState, ActionState, ActionUnlock, EventState, GameState, ResearchState, Timestamp,
};

/// Build a state with every map populated from config defaults.
///
/// Does not validate the config and does not draw randomness: the first
/// event is scheduled at the earliest allowed time. Used as the template
/// for save migration and by [`new_game`].
#[must_use]
pub fn fresh_state(config: &GameConfig, now: Timestamp) -> GameState {
    let resources = config
        .resources
        .iter()
        .map(|r| (r.key.clone(), r.initial.max(0.0)))
        .collect();
    let lifetime = config
        .resources
        .iter()
        .map(|r| (r.key.clone(), 0.0))
        .collect();
    let buildings = config.buildings.iter().map(|b| (b.key.clone(), 0)).collect();
    let technologies = config
        .technologies
        .iter()
        .map(|t| (t.key.clone(), 0))
        .collect();
    let upgrades = config.upgrades.iter().map(|u| (u.key.clone(), 0)).collect();

    let unlocks = config
        .actions
        .iter()
        .map(|a| {
            let unlock = ActionUnlock {
                unlocked: a.unlocked_by_default,
                unlocked_at: a.unlocked_by_default.then_some(now),
                last_used: None,
            };
            (a.key.clone(), unlock)
        })
        .collect();

    let achievements = AchievementState {
        unlocked: config
            .achievements
            .iter()
            .map(|a| (a.key.clone(), 0))
            .collect(),
        progress: config
            .achievements
            .iter()
            .map(|a| (a.key.clone(), 0.0))
            .collect(),
        ..AchievementState::default()
    };

    let first_event = now + (config.event_timing.initial_min_secs.max(0.0) * 1000.0) as u64;

    GameState {
        t: now,
        resources,
        lifetime,
        buildings,
        technologies,
        upgrades,
        clicks: 0,
        events: EventState {
            next_event_time: first_event,
            ..EventState::default()
        },
        research: ResearchState::default(),
        actions: ActionState {
            unlocks,
            cooldowns: Default::default(),
        },
        loop_actions: Vec::new(),
        loop_settings: config.loop_settings,
        achievements,
        achievement_multipliers: Multipliers::identity(config),
        version: config.version,
    }
}

/// Start a new game.
///
/// Validates the config (a malformed config is a fatal startup error) and
/// schedules the first random event within the configured initial window.
pub fn new_game<R: Rng + ?Sized>(config: &GameConfig, now: Timestamp, rng: &mut R) -> Result<GameState> {
    config.ensure_valid()?;
    let mut state = fresh_state(config, now);
    let timing = &config.event_timing;
    state.events.next_event_time =
        now + random_delay_ms(rng, timing.initial_min_secs, timing.initial_max_secs);
    tracing::debug!(
        next_event_time = state.events.next_event_time,
        "New game created"
    );
    Ok(state)
}
