//! Headless simulation with scripted players.
//!
//! Drives a [`Simulation`] at a fixed step the way a host frame loop
//! would, letting a [`Strategy`] issue player intents before each step.

use std::collections::BTreeMap;

use kingdom_core::achievements::total_points;
use kingdom_core::actions::{action_ready_in, is_action_unlocked, perform_action};
use kingdom_core::data::{Amounts, GameConfig};
use kingdom_core::economy::{buy_building, building_cost, can_afford, click_action};
use kingdom_core::events::{active_event, can_choose, make_event_choice};
use kingdom_core::loop_actions::{is_loop_action_unlocked, start_loop_action};
use kingdom_core::prestige::prestige_gain;
use kingdom_core::research::{available_technologies, research_technology};
use kingdom_core::simulation::Simulation;
use kingdom_core::state::GameState;
use serde::{Deserialize, Serialize};

/// How the scripted player behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Never acts; events auto-resolve.
    #[default]
    Idle,
    /// Clicks every step and spends everything as soon as it can.
    Greedy,
}

/// Parameters of one headless run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// Simulated seconds to run.
    pub seconds: f64,
    /// Step length in seconds.
    pub dt: f64,
    /// RNG seed.
    pub seed: u64,
    /// Scripted player.
    pub strategy: Strategy,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            seconds: 600.0,
            dt: 0.1,
            seed: 0,
            strategy: Strategy::Idle,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Parameters the run used.
    pub options: SimulationOptions,
    /// Steps taken.
    pub ticks: u64,
    /// Final simulated clock, in milliseconds.
    pub final_time_ms: u64,
    /// Final balances.
    pub resources: Amounts,
    /// Lifetime totals.
    pub lifetime: Amounts,
    /// Building counts.
    pub buildings: BTreeMap<String, u32>,
    /// Researched technologies.
    pub technologies: Vec<String>,
    /// Completed loops per loop action.
    pub loops: BTreeMap<String, u64>,
    /// Achievements with their levels, unlocked ones only.
    pub achievements: BTreeMap<String, u32>,
    /// Achievement points.
    pub achievement_points: u64,
    /// Events resolved.
    pub events_resolved: u64,
    /// Manual clicks.
    pub clicks: u64,
    /// Prestige a reset would award now.
    pub prestige_gain: f64,
    /// Final state hash, for determinism checks.
    pub final_state_hash: u64,
}

impl SimulationReport {
    fn collect(config: &GameConfig, sim: &Simulation, options: &SimulationOptions) -> Self {
        let state = sim.state();
        Self {
            options: options.clone(),
            ticks: sim.get_tick(),
            final_time_ms: state.t,
            resources: state.resources.clone(),
            lifetime: state.lifetime.clone(),
            buildings: state.buildings.clone(),
            technologies: state
                .technologies
                .iter()
                .filter(|(_, &level)| level > 0)
                .map(|(key, _)| key.clone())
                .collect(),
            loops: state
                .loop_actions
                .iter()
                .map(|entry| (entry.action_key.clone(), entry.total_loops_completed))
                .collect(),
            achievements: state
                .achievements
                .unlocked
                .iter()
                .filter(|(_, &level)| level > 0)
                .map(|(key, &level)| (key.clone(), level))
                .collect(),
            achievement_points: total_points(config, state),
            events_resolved: state.achievements.stats.events_resolved,
            clicks: state.clicks,
            prestige_gain: prestige_gain(config, state),
            final_state_hash: sim.state_hash(),
        }
    }

    /// Render as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Cheapest building the state can afford right now, by total cost.
fn cheapest_affordable_building<'a>(config: &'a GameConfig, state: &GameState) -> Option<&'a str> {
    config
        .buildings
        .iter()
        .map(|b| (b.key.as_str(), building_cost(config, state, &b.key)))
        .filter(|(_, cost)| can_afford(state, cost))
        .min_by(|(_, a), (_, b)| {
            let a: f64 = a.values().sum();
            let b: f64 = b.values().sum();
            a.total_cmp(&b)
        })
        .map(|(key, _)| key)
}

/// One greedy decision pass.
fn greedy_turn(sim: &mut Simulation) {
    sim.apply(|config, state, _| click_action(config, state));

    sim.apply(|config, state, rng| {
        let choice = active_event(config, state)
            .and_then(|event| event.choices.iter().position(|c| can_choose(state, c)));
        match choice {
            Some(index) => make_event_choice(config, state, index, rng),
            None => state.clone(),
        }
    });

    sim.apply(|config, state, _| {
        let mut next = state.clone();
        while let Some(key) = cheapest_affordable_building(config, &next) {
            let bought = buy_building(config, &next, key);
            if bought == next {
                break;
            }
            next = bought;
        }
        next
    });

    sim.apply(|config, state, _| {
        if state.research.active_research.is_some() {
            return state.clone();
        }
        let affordable = available_technologies(config, state).find(|t| can_afford(state, &t.cost));
        match affordable {
            Some(tech) => research_technology(config, state, &tech.key),
            None => state.clone(),
        }
    });

    sim.apply(|config, state, _| {
        let mut next = state.clone();
        for action in &config.loop_actions {
            let cap = next.loop_settings.max_concurrent_actions as usize;
            if next.active_loop_count() >= cap {
                break;
            }
            let running = next.loop_action(&action.key).is_some_and(|e| e.is_running());
            if !running && is_loop_action_unlocked(config, &next, &action.key) && can_afford(&next, &action.cost) {
                next = start_loop_action(config, &next, &action.key);
            }
        }
        next
    });

    sim.apply(|config, state, _| {
        config.actions.iter().fold(state.clone(), |s, action| {
            let usable = is_action_unlocked(config, &s, &action.key)
                && action_ready_in(&s, &action.key) == 0
                && can_afford(&s, &action.cost);
            if usable {
                perform_action(config, &s, &action.key)
            } else {
                s
            }
        })
    });
}

/// Run one headless session.
///
/// # Errors
///
/// Returns an error if the config fails validation.
pub fn run_simulation(
    config: &GameConfig,
    options: &SimulationOptions,
) -> Result<SimulationReport, crate::ToolError> {
    let dt = if options.dt > 0.0 && options.dt.is_finite() { options.dt } else { 0.1 };
    let steps = (options.seconds.max(0.0) / dt).round() as u64;
    let mut sim = Simulation::new(config.clone(), options.seed)?;

    tracing::info!(steps, dt, seed = options.seed, strategy = ?options.strategy, "Simulation started");
    for step in 0..steps {
        if options.strategy == Strategy::Greedy {
            greedy_turn(&mut sim);
        }
        sim.step(dt);
        if step > 0 && step % 10_000 == 0 {
            tracing::debug!(step, hash = sim.state_hash(), "Progress");
        }
    }

    let report = SimulationReport::collect(config, &sim, options);
    tracing::info!(
        ticks = report.ticks,
        hash = report.final_state_hash,
        "Simulation finished"
    );
    Ok(report)
}
