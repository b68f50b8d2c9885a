//! Save, load, export and import.
//!
//! The save blob is the JSON encoding of [`GameState`]. Loading is gated on
//! the blob's `version` matching the config; a mismatch is treated as "no
//! save". Older saves of the current version may lack fields added later, so
//! loading migrates in two phases:
//!
//! 1. [`migrate_value`] fills every field missing from the JSON with the
//!    value from a freshly built default state. Present values are never
//!    overwritten.
//! 2. [`migrate`] repairs the typed state: maps gain entries for every
//!    config key, the event history is cut to its cap, duplicate loop
//!    entries are dropped and running loops beyond the cap are paused.
//!
//! Both phases are idempotent.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

use crate::data::GameConfig;
use crate::factory::fresh_state;
use crate::multipliers::Multipliers;
use crate::state::{ActionUnlock, GameState};

/// Errors raised while reading or writing save data.
#[derive(Debug, Error)]
pub enum PersistError {
    /// JSON encoding or decoding failed.
    #[error("Invalid save JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Export string is not valid base64.
    #[error("Invalid export string: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded export is not UTF-8.
    #[error("Export is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Binary snapshot encoding or decoding failed.
    #[error("Invalid binary snapshot: {0}")]
    Bincode(#[from] bincode::Error),

    /// The save was written by a different format version.
    #[error("Save version {found:?} does not match expected version {expected}")]
    VersionMismatch {
        /// Version found in the save, if any.
        found: Option<u64>,
        /// Version of the running config.
        expected: u32,
    },

    /// The save's top level is not a JSON object.
    #[error("Save is not a JSON object")]
    NotAnObject,
}

/// Encode a state as JSON.
///
/// # Errors
///
/// Returns an error if the state holds a value JSON cannot represent.
pub fn serialize(state: &GameState) -> Result<String, PersistError> {
    Ok(serde_json::to_string(state)?)
}

/// Decode, version-gate and migrate a JSON save.
///
/// # Errors
///
/// Returns an error if the text is not a JSON object, carries a different
/// version, or does not decode as a state after migration.
pub fn load(config: &GameConfig, text: &str) -> Result<GameState, PersistError> {
    let mut value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(PersistError::NotAnObject);
    }
    let found = value.get("version").and_then(Value::as_u64);
    if found != Some(u64::from(config.version)) {
        return Err(PersistError::VersionMismatch {
            found,
            expected: config.version,
        });
    }
    migrate_value(config, &mut value)?;
    let state: GameState = serde_json::from_value(value)?;
    Ok(migrate(config, &state))
}

/// [`load`], logging failures and returning `None` instead.
#[must_use]
pub fn deserialize(config: &GameConfig, text: &str) -> Option<GameState> {
    match load(config, text) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(category = "validation", op = "deserialize", "{err}");
            None
        }
    }
}

/// Fill fields missing from a raw save with fresh defaults.
///
/// # Errors
///
/// Returns an error if the default template cannot be encoded.
pub fn migrate_value(config: &GameConfig, value: &mut Value) -> Result<(), PersistError> {
    let template = serde_json::to_value(fresh_state(config, 0))?;
    fill_missing(value, &template);
    Ok(())
}

fn fill_missing(target: &mut Value, template: &Value) {
    let (Value::Object(target), Value::Object(template)) = (target, template) else {
        return;
    };
    for (key, default) in template {
        match target.get_mut(key) {
            Some(present) => fill_missing(present, default),
            None => {
                target.insert(key.clone(), default.clone());
            }
        }
    }
}

/// Repair a decoded state against the config.
#[must_use]
pub fn migrate(config: &GameConfig, state: &GameState) -> GameState {
    let mut next = state.clone();

    for resource in &config.resources {
        next.resources.entry(resource.key.clone()).or_insert(0.0);
        next.lifetime.entry(resource.key.clone()).or_insert(0.0);
    }
    for amount in next.resources.values_mut().chain(next.lifetime.values_mut()) {
        if !amount.is_finite() || *amount < 0.0 {
            *amount = 0.0;
        }
    }
    for building in &config.buildings {
        next.buildings.entry(building.key.clone()).or_insert(0);
    }
    for tech in &config.technologies {
        next.technologies.entry(tech.key.clone()).or_insert(0);
    }
    for level in next.technologies.values_mut() {
        *level = (*level).min(1);
    }
    for upgrade in &config.upgrades {
        next.upgrades.entry(upgrade.key.clone()).or_insert(0);
    }
    let now = next.t;
    for action in &config.actions {
        next.actions
            .unlocks
            .entry(action.key.clone())
            .or_insert_with(|| ActionUnlock {
                unlocked: action.unlocked_by_default,
                unlocked_at: action.unlocked_by_default.then_some(now),
                last_used: None,
            });
    }
    for achievement in &config.achievements {
        let level = next
            .achievements
            .unlocked
            .entry(achievement.key.clone())
            .or_insert(0);
        *level = (*level).min(achievement.level_cap());
        next.achievements
            .progress
            .entry(achievement.key.clone())
            .or_insert(0.0);
    }

    next.achievement_multipliers.fill_missing(config);
    if !next.achievement_multipliers.is_valid() {
        tracing::warn!(category = "state", op = "migrate", "Saved achievement multipliers are invalid; resetting");
        next.achievement_multipliers = Multipliers::identity(config);
    }

    let history = &mut next.events.event_history;
    while history.len() > config.event_timing.history_cap {
        history.pop_front();
    }

    if next.loop_settings.max_concurrent_actions == 0 || !(next.loop_settings.base_points_per_tick > 0.0) {
        next.loop_settings = config.loop_settings;
    }
    let mut seen = std::collections::BTreeSet::new();
    next.loop_actions.retain(|l| seen.insert(l.action_key.clone()));
    let cap = next.loop_settings.max_concurrent_actions as usize;
    let mut running = 0;
    for entry in &mut next.loop_actions {
        if entry.is_active && entry.is_paused {
            entry.is_active = false;
        }
        if entry.is_active {
            running += 1;
            if running > cap {
                entry.is_active = false;
                entry.is_paused = true;
            }
        }
        if !entry.current_points.is_finite() || entry.current_points < 0.0 {
            entry.current_points = 0.0;
        }
    }

    next.version = config.version;
    next
}

/// Encode a state as a base64 export string.
///
/// # Errors
///
/// Returns an error if the state cannot be encoded as JSON.
pub fn export(state: &GameState) -> Result<String, PersistError> {
    Ok(STANDARD.encode(serialize(state)?))
}

/// Decode an export string produced by [`export`].
///
/// # Errors
///
/// Returns an error for invalid base64, non-UTF-8 payloads and every
/// failure of [`load`].
pub fn try_import(config: &GameConfig, text: &str) -> Result<GameState, PersistError> {
    let bytes = STANDARD.decode(text.trim())?;
    let json = String::from_utf8(bytes)?;
    load(config, &json)
}

/// [`try_import`], logging failures and returning `None` instead.
#[must_use]
pub fn import(config: &GameConfig, text: &str) -> Option<GameState> {
    match try_import(config, text) {
        Ok(state) => Some(state),
        Err(err) => {
            tracing::warn!(category = "validation", op = "import", "{err}");
            None
        }
    }
}

/// Compact binary snapshot of a state.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn to_bytes(state: &GameState) -> Result<Vec<u8>, PersistError> {
    Ok(bincode::serialize(state)?)
}

/// Decode a snapshot written by [`to_bytes`]. No migration is applied.
///
/// # Errors
///
/// Returns an error if the bytes are not a valid snapshot.
pub fn from_bytes(bytes: &[u8]) -> Result<GameState, PersistError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Hash of a state's binary snapshot.
///
/// Two equal states hash equally. Returns 0 if the state cannot be encoded.
#[must_use]
pub fn state_hash(state: &GameState) -> u64 {
    match to_bytes(state) {
        Ok(bytes) => {
            let mut hasher = DefaultHasher::new();
            bytes.hash(&mut hasher);
            hasher.finish()
        }
        Err(err) => {
            tracing::warn!(category = "state", op = "state_hash", "{err}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LoopActionState;

    fn setup() -> (GameConfig, GameState) {
        let config = GameConfig::builtin().unwrap();
        let state = fresh_state(&config, 0)
            .with_building_count("farm", 3)
            .with_resource("gold", 12.5);
        (config, state)
    }

    #[test]
    fn test_save_and_load() {
        let (config, state) = setup();
        let text = serialize(&state).unwrap();
        assert_eq!(load(&config, &text).unwrap(), state);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let (config, mut state) = setup();
        state.version = config.version + 1;
        let text = serialize(&state).unwrap();
        assert!(matches!(
            load(&config, &text),
            Err(PersistError::VersionMismatch { .. })
        ));
        assert!(deserialize(&config, &text).is_none());
    }

    #[test]
    fn test_garbage_rejected() {
        let (config, _) = setup();
        assert!(deserialize(&config, "not json").is_none());
        assert!(matches!(load(&config, "[1, 2]"), Err(PersistError::NotAnObject)));
        assert!(import(&config, "%%%").is_none());
    }

    #[test]
    fn test_missing_fields_are_backfilled() {
        let (config, state) = setup();
        let mut value = serde_json::to_value(&state).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("achievements");
        obj.remove("achievement_multipliers");
        obj.remove("loop_actions");
        obj["resources"].as_object_mut().unwrap().remove("stone");

        let loaded = load(&config, &value.to_string()).unwrap();
        assert_eq!(loaded.achievements.unlocked.len(), config.achievements.len());
        assert_eq!(loaded.achievement_multipliers, Multipliers::identity(&config));
        assert!(loaded.resources.contains_key("stone"));
        assert_eq!(loaded.building_count("farm"), 3);
        assert_eq!(loaded.resource("gold"), 12.5);
    }

    #[test]
    fn test_migrate_repairs_structure() {
        let (config, mut state) = setup();
        state.loop_settings.max_concurrent_actions = 1;
        for key in ["gather_berries", "chop_wood", "gather_berries"] {
            let mut entry = LoopActionState::new(key, 0);
            entry.is_active = true;
            state.loop_actions.push(entry);
        }
        state.resources.insert("food".into(), -3.0);
        state.resources.remove("wood");

        let fixed = migrate(&config, &state);
        assert_eq!(fixed.loop_actions.len(), 2);
        assert_eq!(fixed.active_loop_count(), 1);
        assert!(fixed.loop_action("chop_wood").unwrap().is_paused);
        assert_eq!(fixed.resource("food"), 0.0);
        assert!(fixed.resources.contains_key("wood"));
        assert_eq!(migrate(&config, &fixed), fixed);
    }

    #[test]
    fn test_export_import() {
        let (config, state) = setup();
        let code = export(&state).unwrap();
        assert!(!code.contains('{'));
        assert_eq!(import(&config, &code).unwrap(), state);
        assert_eq!(import(&config, &format!("  {code}\n")).unwrap(), state);
    }

    #[test]
    fn test_import_version_mismatch_is_none() {
        let (config, mut state) = setup();
        state.version = 1;
        assert_ne!(config.version, 1);
        let code = export(&state).unwrap();
        assert!(import(&config, &code).is_none());
    }

    #[test]
    fn test_binary_snapshot_and_hash() {
        let (_, state) = setup();
        let bytes = to_bytes(&state).unwrap();
        assert_eq!(from_bytes(&bytes).unwrap(), state);
        assert_eq!(state_hash(&state), state_hash(&state.clone()));
        let other = state.clone().with_resource("gold", 13.0);
        assert_ne!(state_hash(&state), state_hash(&other));
    }
}
