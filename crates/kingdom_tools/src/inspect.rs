//! Save inspection.

use std::collections::BTreeMap;
use std::path::Path;

use kingdom_core::achievements::{pending_notifications, total_points};
use kingdom_core::data::{Amounts, GameConfig};
use kingdom_core::persistence::{self, PersistError};
use kingdom_core::prestige::prestige_gain;
use kingdom_core::research::research_progress;
use kingdom_core::state::GameState;
use serde::{Deserialize, Serialize};

use crate::ToolError;

/// Human-oriented summary of a save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveSummary {
    /// Save-format version.
    pub version: u32,
    /// Simulated clock, in milliseconds.
    pub time_ms: u64,
    /// Simulated seconds played.
    pub play_time_secs: f64,
    /// Balances.
    pub resources: Amounts,
    /// Owned buildings, non-zero only.
    pub buildings: BTreeMap<String, u32>,
    /// Researched technologies.
    pub technologies: Vec<String>,
    /// Active research and its progress.
    pub research: Option<(String, f64)>,
    /// Running loop actions.
    pub running_loops: Vec<String>,
    /// Active random event.
    pub active_event: Option<String>,
    /// Unlocked achievements.
    pub achievements_unlocked: usize,
    /// Achievement points.
    pub achievement_points: u64,
    /// Notifications not yet shown.
    pub pending_notifications: usize,
    /// Prestige resets so far.
    pub prestige_count: u32,
    /// Prestige a reset would award now.
    pub prestige_gain: f64,
    /// State hash.
    pub state_hash: u64,
}

impl SaveSummary {
    /// Summarize a loaded state.
    #[must_use]
    pub fn new(config: &GameConfig, state: &GameState) -> Self {
        Self {
            version: state.version,
            time_ms: state.t,
            play_time_secs: state.achievements.stats.play_time_secs,
            resources: state.resources.clone(),
            buildings: state
                .buildings
                .iter()
                .filter(|(_, &n)| n > 0)
                .map(|(k, &n)| (k.clone(), n))
                .collect(),
            technologies: state
                .technologies
                .iter()
                .filter(|(_, &level)| level > 0)
                .map(|(k, _)| k.clone())
                .collect(),
            research: state
                .research
                .active_research
                .clone()
                .map(|key| (key, research_progress(state))),
            running_loops: state
                .loop_actions
                .iter()
                .filter(|e| e.is_running())
                .map(|e| e.action_key.clone())
                .collect(),
            active_event: state.events.active_event.clone(),
            achievements_unlocked: state.achievements.unlocked.values().filter(|&&l| l > 0).count(),
            achievement_points: total_points(config, state),
            pending_notifications: pending_notifications(state).count(),
            prestige_count: state.achievements.stats.prestige_count,
            prestige_gain: prestige_gain(config, state),
            state_hash: persistence::state_hash(state),
        }
    }
}

/// Load a save from text: a base64 export string or a raw JSON save.
///
/// # Errors
///
/// Returns the JSON error for text that looks like JSON, the import error
/// otherwise.
pub fn load_save(config: &GameConfig, text: &str) -> Result<GameState, PersistError> {
    let text = text.trim();
    if text.starts_with('{') {
        persistence::load(config, text)
    } else {
        persistence::try_import(config, text)
    }
}

/// Read and summarize a save file.
///
/// # Errors
///
/// Returns an error if the file is missing or the save is rejected.
pub fn inspect_file(config: &GameConfig, path: &Path) -> Result<SaveSummary, ToolError> {
    if !path.exists() {
        return Err(ToolError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    let state = load_save(config, &text)?;
    tracing::debug!(file = %path.display(), version = state.version, "Save loaded");
    Ok(SaveSummary::new(config, &state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kingdom_core::factory::fresh_state;

    #[test]
    fn test_load_save_accepts_both_forms() {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0).with_building_count("farm", 2);

        let json = persistence::serialize(&state).unwrap();
        let exported = persistence::export(&state).unwrap();
        assert_eq!(load_save(&config, &json).unwrap(), state);
        assert_eq!(load_save(&config, &format!("  {exported}\n")).unwrap(), state);
    }

    #[test]
    fn test_version_mismatch_is_reported() {
        let config = GameConfig::builtin().unwrap();
        let mut state = fresh_state(&config, 0);
        state.version = 1;
        let json = persistence::serialize(&state).unwrap();
        assert!(matches!(
            load_save(&config, &json),
            Err(PersistError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_summary_lists_owned_only() {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0).with_building_count("farm", 2);
        let summary = SaveSummary::new(&config, &state);
        assert_eq!(summary.buildings.len(), 1);
        assert_eq!(summary.buildings["farm"], 2);
        assert!(summary.research.is_none());
        assert_eq!(summary.version, config.version);
    }
}
