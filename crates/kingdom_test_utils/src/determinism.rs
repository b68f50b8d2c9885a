//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, offline catch-up and save/load all assume the tick pipeline is a
//! pure function of (config, state, dt, tick counter, RNG state). Sources of
//! non-determinism include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every keyed collection in the state is a `BTreeMap`.
//!
//! - **System randomness**: No calls to `thread_rng()`. Event draws use the
//!   caller's seeded `ChaCha8Rng`.
//!
//! - **Wall-clock time**: The core never reads the clock. Time only moves
//!   through `dt`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual stages (production, events, loops)
//! 2. **Property tests**: Random command scripts still replay identically
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations on threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use kingdom_core::persistence;
use kingdom_core::simulation::Simulation;

/// Step length used by the simulation helpers, in seconds.
pub const STEP_SECS: f64 = 0.1;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create the initial simulation
/// * `step` - Function to advance the simulation by one tick
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use kingdom_core::data::GameConfig;
/// use kingdom_core::simulation::Simulation;
/// use kingdom_test_utils::determinism::verify_determinism;
///
/// let config = GameConfig::builtin().unwrap();
/// let result = verify_determinism(
///     3,
///     100,
///     || Simulation::new(config.clone(), 7).unwrap(),
///     |sim| sim.step(0.1),
///     Simulation::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run two copies of a [`Simulation`] for `num_ticks` steps of
/// [`STEP_SECS`] and compare the final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| sim.step(STEP_SECS),
        Simulation::state_hash,
    )
    .is_deterministic
}

/// Run `num_sims` simulations on scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.step(STEP_SECS);
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` if they diverge at that
/// tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.step(STEP_SECS);
        sim2.step(STEP_SECS);

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Verify that the JSON save, the base64 export and the binary snapshot all
/// restore the state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..num_ticks {
        sim.step(STEP_SECS);
    }
    let state = sim.state();
    let hash_before = sim.state_hash();

    let Ok(json) = persistence::serialize(state) else {
        return false;
    };
    let Ok(from_json) = persistence::load(sim.config(), &json) else {
        return false;
    };

    let Ok(exported) = persistence::export(state) else {
        return false;
    };
    let Some(from_export) = persistence::import(sim.config(), &exported) else {
        return false;
    };

    let Ok(bytes) = persistence::to_bytes(state) else {
        return false;
    };
    let Ok(from_bytes) = persistence::from_bytes(&bytes) else {
        return false;
    };

    [from_json, from_export, from_bytes]
        .iter()
        .all(|restored| persistence::state_hash(restored) == hash_before)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the transition functions.
pub mod strategies {
    use proptest::prelude::*;

    use crate::fixtures::Command;

    /// A frame-sized step, 0 to 1 second.
    pub fn arb_dt() -> impl Strategy<Value = f64> {
        (0u32..=1000u32).prop_map(|ms| f64::from(ms) / 1000.0)
    }

    /// An offline gap, up to two hours.
    pub fn arb_offline_secs() -> impl Strategy<Value = f64> {
        0.0f64..7200.0
    }

    /// Any RNG seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Table indices wrap, so a small range covers every entry.
    fn arb_index() -> impl Strategy<Value = usize> {
        0usize..8
    }

    /// Any single player command. Ticks are weighted up so scripts make
    /// progress.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            4 => arb_dt().prop_map(Command::Tick),
            3 => Just(Command::Click),
            2 => arb_index().prop_map(Command::BuyBuilding),
            1 => arb_index().prop_map(Command::BuyUpgrade),
            1 => arb_index().prop_map(Command::Research),
            1 => Just(Command::CancelResearch),
            1 => arb_index().prop_map(Command::PerformAction),
            2 => arb_index().prop_map(Command::StartLoop),
            1 => arb_index().prop_map(Command::StopLoop),
            1 => arb_index().prop_map(Command::PauseLoop),
            1 => arb_index().prop_map(Command::ResumeLoop),
            1 => (0usize..3).prop_map(Command::ChooseEvent),
            1 => Just(Command::CheckAchievements),
        ]
    }

    /// A script of commands without prestige resets.
    pub fn arb_commands(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(arb_command(), 0..max_len)
    }

    /// A script that may also prestige.
    pub fn arb_commands_with_prestige(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        proptest::collection::vec(
            prop_oneof![20 => arb_command(), 1 => Just(Command::Prestige)],
            0..max_len,
        )
    }
}
