//! The tick orchestrator.
//!
//! [`tick`] advances a state by `dt` seconds through a fixed pipeline:
//!
//! 1. Resource integration (every tick)
//! 2. Event scheduling (ticks where `counter % event_check_every == 0`)
//! 3. Research completion (every tick)
//! 4. Loop actions (every tick)
//! 5. Achievements (ticks where `counter % achievement_check_every == 0`)
//!
//! # Determinism
//!
//! Given the same config, state, `dt`, tick counter and RNG state, the output
//! is identical:
//! - The only randomness is the event draw, taken from the caller's RNG
//! - All keyed collections are ordered maps
//! - Loop actions are processed in list order
//!
//! Offline catch-up feeds one large, clamped `dt` through the same pipeline.
//! Production is linear in `dt`, so one long tick integrates the same
//! resources as many short ones while no other boundary is crossed.
//!
//! # Example
//!
//! ```
//! use kingdom_core::data::GameConfig;
//! use kingdom_core::simulation::Simulation;
//!
//! let config = GameConfig::builtin().unwrap();
//! let mut sim = Simulation::new(config, 42).unwrap();
//! sim.step(0.1);
//! assert_eq!(sim.get_tick(), 1);
//! assert_eq!(sim.state().t, 100);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::achievements::process_achievements;
use crate::data::GameConfig;
use crate::economy::integrate_production;
use crate::error::{GameError, Result};
use crate::events::process_events;
use crate::factory::new_game;
use crate::loop_actions::process_loop_actions;
use crate::persistence;
use crate::research::process_research;
use crate::state::GameState;

/// Advance `state` by `dt` seconds.
///
/// A negative or non-finite `dt` is logged and the state is returned
/// unchanged. `dt` is clamped to `ticks.max_offline_secs`.
#[must_use]
pub fn tick<R: Rng + ?Sized>(
    config: &GameConfig,
    state: &GameState,
    dt: f64,
    tick_counter: u64,
    rng: &mut R,
) -> GameState {
    if !dt.is_finite() || dt < 0.0 {
        crate::error::log_error(
            "tick",
            &GameError::InvalidParameter {
                name: "dt",
                value: dt.to_string(),
            },
        );
        return state.clone();
    }
    let dt = dt.min(config.ticks.max_offline_secs);
    let now = state.t + (dt * 1000.0).round() as u64;

    let mut next = state.clone();
    integrate_production(config, &mut next, dt);
    next.achievements.stats.play_time_secs += dt;
    next.t = now;

    if tick_counter % config.ticks.event_check_every.max(1) == 0 {
        process_events(config, &mut next, now, rng);
    }
    process_research(config, &mut next, now);
    process_loop_actions(config, &mut next, now);
    if tick_counter % config.ticks.achievement_check_every.max(1) == 0 {
        process_achievements(config, &mut next, now);
    }

    #[cfg(feature = "debug-validation")]
    {
        for violation in check_invariants(config, &next) {
            tracing::error!(category = "state", op = "tick", tick_counter, "{violation}");
        }
    }
    #[cfg(debug_assertions)]
    tracing::trace!(tick_counter, hash = persistence::state_hash(&next), "Tick complete");

    next
}

/// Apply `elapsed` seconds of offline time as a single clamped tick.
///
/// Runs every stage, including the frame-skipped ones.
#[must_use]
pub fn catch_up<R: Rng + ?Sized>(config: &GameConfig, state: &GameState, elapsed: f64, rng: &mut R) -> GameState {
    tick(config, state, elapsed, 0, rng)
}

/// Structural invariants a reachable state satisfies.
///
/// Returns one message per violation; empty when the state is sound.
#[must_use]
pub fn check_invariants(config: &GameConfig, state: &GameState) -> Vec<String> {
    let mut violations = Vec::new();
    for (key, &amount) in &state.resources {
        if !(amount >= 0.0) || !amount.is_finite() {
            violations.push(format!("Resource '{key}' is {amount}"));
        }
    }
    for (key, &amount) in &state.lifetime {
        if !(amount >= 0.0) {
            violations.push(format!("Lifetime '{key}' is {amount}"));
        }
    }
    if state.events.event_history.len() > config.event_timing.history_cap {
        violations.push(format!(
            "Event history holds {} entries",
            state.events.event_history.len()
        ));
    }
    let running = state.active_loop_count();
    if running > state.loop_settings.max_concurrent_actions as usize {
        violations.push(format!(
            "{running} loop actions running, cap is {}",
            state.loop_settings.max_concurrent_actions
        ));
    }
    for (i, entry) in state.loop_actions.iter().enumerate() {
        if state.loop_actions[..i]
            .iter()
            .any(|other| other.action_key == entry.action_key)
        {
            violations.push(format!("Duplicate loop action '{}'", entry.action_key));
        }
        if entry.is_active && entry.is_paused {
            violations.push(format!("Loop action '{}' is both active and paused", entry.action_key));
        }
    }
    for achievement in &config.achievements {
        let level = state.achievement_level(&achievement.key);
        if level > achievement.level_cap() {
            violations.push(format!(
                "Achievement '{}' at level {level} exceeds its cap",
                achievement.key
            ));
        }
    }
    violations
}

/// A self-contained game: config, state, tick counter and a seeded RNG.
///
/// Hosts that do not want to thread the RNG and counter themselves drive
/// the game through this type.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: GameConfig,
    state: GameState,
    tick: u64,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Start a new game from `config`, seeding the RNG with `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config fails validation.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = new_game(&config, 0, &mut rng)?;
        Ok(Self {
            config,
            state,
            tick: 0,
            rng,
        })
    }

    /// Continue from an existing state, e.g. one loaded from a save.
    #[must_use]
    pub fn from_state(config: GameConfig, state: GameState, seed: u64) -> Self {
        Self {
            config,
            state,
            tick: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// The content tables.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Ticks stepped so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Advance by `dt` seconds and bump the tick counter.
    pub fn step(&mut self, dt: f64) {
        self.state = tick(&self.config, &self.state, dt, self.tick, &mut self.rng);
        self.tick += 1;
    }

    /// Apply offline time without touching the tick counter.
    pub fn catch_up(&mut self, elapsed: f64) {
        self.state = catch_up(&self.config, &self.state, elapsed, &mut self.rng);
    }

    /// Run a transition against the current state and store the result.
    ///
    /// ```
    /// use kingdom_core::data::GameConfig;
    /// use kingdom_core::economy::click_action;
    /// use kingdom_core::simulation::Simulation;
    ///
    /// let mut sim = Simulation::new(GameConfig::builtin().unwrap(), 1).unwrap();
    /// sim.apply(|config, state, _| click_action(config, state));
    /// assert_eq!(sim.state().clicks, 1);
    /// ```
    pub fn apply<F>(&mut self, transition: F)
    where
        F: FnOnce(&GameConfig, &GameState, &mut ChaCha8Rng) -> GameState,
    {
        self.state = transition(&self.config, &self.state, &mut self.rng);
    }

    /// Hash of the current state for desync and regression checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        persistence::state_hash(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::fresh_state;
    use crate::loop_actions::try_start_loop_action;

    fn setup() -> (GameConfig, GameState, ChaCha8Rng) {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0);
        (config, state, ChaCha8Rng::seed_from_u64(5))
    }

    #[test]
    fn test_tick_advances_clock_and_resources() {
        let (config, state, mut rng) = setup();
        let state = state.with_building_count("farm", 2);
        let next = tick(&config, &state, 1.5, 1, &mut rng);

        assert_eq!(next.t, 1_500);
        assert!((next.achievements.stats.play_time_secs - 1.5).abs() < 1e-9);
        let farm = config.building("farm").unwrap().produces["food"];
        assert!((next.resource("food") - state.resource("food") - farm * 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_dt_is_noop() {
        let (config, state, mut rng) = setup();
        assert_eq!(tick(&config, &state, -1.0, 0, &mut rng), state);
        assert_eq!(tick(&config, &state, f64::NAN, 0, &mut rng), state);
        assert_eq!(tick(&config, &state, f64::INFINITY, 0, &mut rng), state);
    }

    #[test]
    fn test_dt_clamped_to_offline_cap() {
        let (config, state, mut rng) = setup();
        let cap = config.ticks.max_offline_secs;
        let next = catch_up(&config, &state, cap * 10.0, &mut rng);
        assert_eq!(next.t, (cap * 1000.0) as u64);
    }

    #[test]
    fn test_event_check_is_frame_skipped() {
        let (config, mut state, mut rng) = setup();
        state.t = state.events.next_event_time;
        let every = config.ticks.event_check_every;
        assert!(every > 1);

        let skipped = tick(&config, &state, 0.0, 1, &mut rng);
        assert!(skipped.events.active_event.is_none());

        let checked = tick(&config, &state, 0.0, every, &mut rng);
        assert!(checked.events.active_event.is_some());
    }

    #[test]
    fn test_achievements_checked_on_cadence() {
        let (config, mut state, mut rng) = setup();
        state.clicks = 1;
        let skipped = tick(&config, &state, 0.1, 1, &mut rng);
        assert_eq!(skipped.achievement_level("first_click"), 0);
        let checked = tick(&config, &state, 0.1, config.ticks.achievement_check_every, &mut rng);
        assert_eq!(checked.achievement_level("first_click"), 1);
    }

    #[test]
    fn test_loop_completes_in_ten_ticks() {
        let (config, state, mut rng) = setup();
        let mut s = try_start_loop_action(&config, &state, "gather_berries").unwrap();
        for counter in 1..=9 {
            s = tick(&config, &s, 0.1, counter, &mut rng);
        }
        assert_eq!(s.loop_action("gather_berries").unwrap().total_loops_completed, 0);
        s = tick(&config, &s, 0.1, 10, &mut rng);
        assert_eq!(s.loop_action("gather_berries").unwrap().total_loops_completed, 1);
    }

    #[test]
    fn test_simulation_is_deterministic() {
        let config = GameConfig::builtin().unwrap();
        let mut a = Simulation::new(config.clone(), 99).unwrap();
        let mut b = Simulation::new(config, 99).unwrap();
        for _ in 0..2_000 {
            a.step(0.1);
            b.step(0.1);
        }
        assert_eq!(a.state(), b.state());
        assert_eq!(a.state_hash(), b.state_hash());
        assert!(check_invariants(a.config(), a.state()).is_empty());
    }

    #[test]
    fn test_invariant_violations_reported() {
        let (config, mut state, _) = setup();
        state.resources.insert("food".into(), -1.0);
        state.loop_settings.max_concurrent_actions = 0;
        let mut entry = crate::state::LoopActionState::new("gather_berries", 0);
        entry.is_active = true;
        state.loop_actions.push(entry);
        let violations = check_invariants(&config, &state);
        assert_eq!(violations.len(), 2);
    }
}
