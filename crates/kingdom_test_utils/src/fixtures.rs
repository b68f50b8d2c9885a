//! Test fixtures and helpers.
//!
//! Pre-built configs, states and scripted player commands for consistent
//! testing.

use kingdom_core::data::GameConfig;
use kingdom_core::factory::fresh_state;
use kingdom_core::state::GameState;
use kingdom_core::{achievements, actions, economy, events, loop_actions, prestige, research, simulation};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A deliberately small content table: one building, one loop action, no
/// events. Useful when a test needs exact numbers.
pub const TINY_CONFIG_RON: &str = r#"(
    version: 1,
    resources: [
        (key: "food", name: "Food"),
        (key: "gold", name: "Gold", initial: 100.0),
        (key: "prestige", name: "Prestige"),
    ],
    buildings: [
        (
            key: "mint",
            name: "Mint",
            base_cost: {"gold": 10.0},
            cost_scale: 1.15,
            produces: {"gold": 2.0},
            consumes: {"food": 1.0},
        ),
    ],
    loop_actions: [
        (key: "drill", name: "Drill", loop_points_required: 1000.0, gains: {"food": 3.0}),
    ],
    click_gains: {"food": 1.0},
    prestige: (resource: "prestige", lifetime_resource: "food", divisor: 1000.0),
    loop_settings: (max_concurrent_actions: 1, base_points_per_tick: 100.0),
)"#;

/// The built-in content tables.
///
/// # Panics
///
/// Panics if the embedded content fails to parse or validate.
#[must_use]
pub fn builtin_config() -> GameConfig {
    GameConfig::builtin().expect("built-in config must be valid")
}

/// The small fixture config from [`TINY_CONFIG_RON`].
///
/// # Panics
///
/// Panics if the fixture fails to parse or validate.
#[must_use]
pub fn tiny_config() -> GameConfig {
    let config = GameConfig::from_ron_str(TINY_CONFIG_RON).expect("tiny config must parse");
    config.ensure_valid().expect("tiny config must be valid");
    config
}

/// A fresh state at time zero.
#[must_use]
pub fn fresh(config: &GameConfig) -> GameState {
    fresh_state(config, 0)
}

/// A fresh state with every resource set to `amount`.
#[must_use]
pub fn rich_state(config: &GameConfig, amount: f64) -> GameState {
    config
        .resources
        .iter()
        .fold(fresh(config), |state, r| state.with_resource(&r.key, amount))
}

/// A seeded RNG.
#[must_use]
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// One scripted player intent. Indices wrap around the relevant config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Manual click.
    Click,
    /// Buy a building.
    BuyBuilding(usize),
    /// Buy a prestige upgrade level.
    BuyUpgrade(usize),
    /// Start researching a technology.
    Research(usize),
    /// Cancel the active research.
    CancelResearch,
    /// Use a one-shot action.
    PerformAction(usize),
    /// Start a loop action.
    StartLoop(usize),
    /// Stop a loop action.
    StopLoop(usize),
    /// Pause a loop action.
    PauseLoop(usize),
    /// Resume a loop action.
    ResumeLoop(usize),
    /// Answer the active event.
    ChooseEvent(usize),
    /// Evaluate achievements immediately.
    CheckAchievements,
    /// Reset for prestige.
    Prestige,
    /// Advance time by `dt` seconds.
    Tick(f64),
}

fn key_at<T>(items: &[T], index: usize, key: impl Fn(&T) -> &str) -> Option<&str> {
    if items.is_empty() {
        None
    } else {
        Some(key(&items[index % items.len()]))
    }
}

/// Apply one command through the infallible transition API.
///
/// `counter` is the host tick counter and is advanced by `Tick` commands.
pub fn apply_command(
    config: &GameConfig,
    state: &GameState,
    command: &Command,
    counter: &mut u64,
    rng: &mut ChaCha8Rng,
) -> GameState {
    let building = |i| key_at(&config.buildings, i, |b| &b.key);
    let upgrade = |i| key_at(&config.upgrades, i, |u| &u.key);
    let tech = |i| key_at(&config.technologies, i, |t| &t.key);
    let action = |i| key_at(&config.actions, i, |a| &a.key);
    let looped = |i| key_at(&config.loop_actions, i, |a| &a.key);

    match command {
        Command::Click => economy::click_action(config, state),
        Command::BuyBuilding(i) => building(*i).map_or_else(|| state.clone(), |k| economy::buy_building(config, state, k)),
        Command::BuyUpgrade(i) => upgrade(*i).map_or_else(|| state.clone(), |k| economy::buy_upgrade(config, state, k)),
        Command::Research(i) => tech(*i).map_or_else(|| state.clone(), |k| research::research_technology(config, state, k)),
        Command::CancelResearch => research::cancel_research(config, state),
        Command::PerformAction(i) => action(*i).map_or_else(|| state.clone(), |k| actions::perform_action(config, state, k)),
        Command::StartLoop(i) => looped(*i).map_or_else(|| state.clone(), |k| loop_actions::start_loop_action(config, state, k)),
        Command::StopLoop(i) => looped(*i).map_or_else(|| state.clone(), |k| loop_actions::stop_loop_action(config, state, k)),
        Command::PauseLoop(i) => looped(*i).map_or_else(|| state.clone(), |k| loop_actions::pause_loop_action(config, state, k)),
        Command::ResumeLoop(i) => looped(*i).map_or_else(|| state.clone(), |k| loop_actions::resume_loop_action(config, state, k)),
        Command::ChooseEvent(i) => events::make_event_choice(config, state, *i, rng),
        Command::CheckAchievements => achievements::check_achievements(config, state),
        Command::Prestige => prestige::do_prestige(config, state, rng),
        Command::Tick(dt) => {
            let next = simulation::tick(config, state, *dt, *counter, rng);
            *counter += 1;
            next
        }
    }
}

/// Parse a RON list of commands, e.g. `[Click, BuyBuilding(0), Tick(1.0)]`.
///
/// # Panics
///
/// Panics if the script does not parse.
#[must_use]
pub fn parse_script(text: &str) -> Vec<Command> {
    ron::from_str(text).expect("script must be a RON list of commands")
}

/// Apply a whole script, returning the final state.
pub fn run_script(config: &GameConfig, state: &GameState, script: &[Command], seed: u64) -> GameState {
    let mut rng = seeded_rng(seed);
    let mut counter = 0;
    let end = script.iter().fold(state.clone(), |s, command| {
        apply_command(config, &s, command, &mut counter, &mut rng)
    });
    tracing::debug!(commands = script.len(), ticks = counter, t = end.t, "Script finished");
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiny_config_loads() {
        let config = tiny_config();
        assert_eq!(config.buildings.len(), 1);
        assert!(config.events.is_empty());
    }

    #[test]
    fn test_rich_state() {
        let config = builtin_config();
        let state = rich_state(&config, 500.0);
        assert!(state.resources.values().all(|&v| v == 500.0));
    }

    #[test]
    fn test_script_runs() {
        let config = builtin_config();
        let script = parse_script("[Click, Click, Tick(1.0)]");
        assert_eq!(script[2], Command::Tick(1.0));
        let state = run_script(&config, &fresh(&config), &script, 1);
        assert_eq!(state.clicks, 2);
        assert_eq!(state.t, 1_000);
    }
}
