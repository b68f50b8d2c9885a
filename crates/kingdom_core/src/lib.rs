//! # Kingdom Core
//!
//! Deterministic simulation core for an idle kingdom-building game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO (the built-in content is embedded at compile time)
//! - No system randomness (callers pass a seeded RNG)
//! - No internal threading
//!
//! Every transition takes the current [`state::GameState`] by reference and
//! returns a new one, so hosts own a single state value and replace it with
//! each result. This enables:
//! - Offline catch-up through the same tick pipeline
//! - Save, export and import of plain JSON
//! - Determinism testing and headless simulation
//!
//! ## Crate Structure
//!
//! - [`data`] - Content tables and tuning, loaded from RON
//! - [`state`] - The game state snapshot and accessors
//! - [`multipliers`] - Multiplier composition
//! - [`economy`] - Costs, production, purchases and clicks
//! - [`events`] - Random event scheduling
//! - [`research`] - Technology research
//! - [`actions`] - One-shot actions
//! - [`loop_actions`] - Repeating actions under a concurrency cap
//! - [`achievements`] - Achievement evaluation and rewards
//! - [`prestige`] - Prestige reset
//! - [`simulation`] - The tick pipeline
//! - [`persistence`] - Save, load, export and import

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod achievements;
pub mod actions;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod factory;
pub mod loop_actions;
pub mod multipliers;
pub mod persistence;
pub mod prestige;
pub mod research;
pub mod simulation;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::achievements::{check_achievements, clear_shown_notifications, mark_notifications_shown};
    pub use crate::actions::{perform_action, try_perform_action};
    pub use crate::data::{Amounts, GameConfig};
    pub use crate::economy::{
        buy_building, buy_upgrade, click_action, try_buy_building, try_buy_upgrade,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::events::{make_event_choice, try_make_event_choice};
    pub use crate::factory::{fresh_state, new_game};
    pub use crate::loop_actions::{
        pause_loop_action, resume_loop_action, start_loop_action, stop_loop_action,
    };
    pub use crate::multipliers::{get_multipliers, Multipliers};
    pub use crate::persistence::{deserialize, export, import, serialize, PersistError};
    pub use crate::prestige::{do_prestige, prestige_gain};
    pub use crate::research::{cancel_research, research_technology};
    pub use crate::simulation::{catch_up, tick, Simulation};
    pub use crate::state::{GameState, Timestamp};
}
