//! Random event definitions.

use serde::{Deserialize, Serialize};

use super::{Amounts, EventKey};

/// One option the player can pick while an event is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventChoice {
    /// Localization key for the button label.
    pub label: String,

    /// Balance the player must hold for the choice to be selectable.
    /// Not spent by itself.
    #[serde(default)]
    pub requires: Amounts,

    /// Added to the balance.
    #[serde(default)]
    pub gives: Amounts,

    /// Removed from the balance, clamped at zero. The sign is ignored.
    #[serde(default)]
    pub takes: Amounts,
}

/// Data-driven random event definition.
///
/// # Example RON
///
/// ```ron
/// EventData(
///     key: "storm",
///     name: "event.storm.name",
///     weight: 2.0,
///     choices: [
///         EventChoice(label: "event.storm.shelter", takes: { "food": 20.0 }),
///     ],
///     default_choice: 0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Unique string identifier for this event.
    pub key: EventKey,

    /// Localization key for the display name.
    pub name: String,

    /// Relative draw weight. Zero disables the event.
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Options offered to the player.
    pub choices: Vec<EventChoice>,

    /// Choice applied when the event times out.
    #[serde(default)]
    pub default_choice: usize,
}

const fn default_weight() -> f64 {
    1.0
}

/// Scheduling parameters for the event system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventTiming {
    /// Earliest first event after a new game, in seconds.
    pub initial_min_secs: f64,
    /// Latest first event after a new game, in seconds.
    pub initial_max_secs: f64,
    /// Shortest gap between events, in seconds.
    pub min_interval_secs: f64,
    /// Longest gap between events, in seconds.
    pub max_interval_secs: f64,
    /// An unanswered event resolves itself after this many seconds.
    pub auto_resolve_secs: f64,
    /// Maximum number of retained history entries.
    pub history_cap: usize,
}

impl Default for EventTiming {
    fn default() -> Self {
        Self {
            initial_min_secs: 30.0,
            initial_max_secs: 90.0,
            min_interval_secs: 120.0,
            max_interval_secs: 300.0,
            auto_resolve_secs: 60.0,
            history_cap: 50,
        }
    }
}
