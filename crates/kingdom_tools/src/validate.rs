//! Content validation utilities.

use std::path::{Path, PathBuf};

use kingdom_core::data::GameConfig;

use crate::ToolError;

/// Parse a RON content file without validating it.
///
/// Parse errors carry the line and column reported by `ron`.
pub fn load_config_file(path: &Path) -> Result<GameConfig, ToolError> {
    if !path.exists() {
        return Err(ToolError::NotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(ron::from_str(&text)?)
}

/// Parse `path` when given, otherwise use the built-in content. Either way
/// the result is validated.
pub fn load_config(path: Option<&Path>) -> Result<GameConfig, ToolError> {
    let config = match path {
        Some(path) => load_config_file(path)?,
        None => GameConfig::builtin()?,
    };
    config.ensure_valid()?;
    Ok(config)
}

/// Parse and validate one content file.
///
/// # Errors
///
/// Returns an error if the file is missing, fails to parse or fails
/// validation.
pub fn validate_file(path: &Path) -> Result<GameConfig, ToolError> {
    let config = load_config_file(path)?;
    let errors = config.validate();
    for error in &errors {
        tracing::warn!(file = %path.display(), "{error}");
    }
    config.ensure_valid()?;
    tracing::debug!(
        file = %path.display(),
        resources = config.resources.len(),
        buildings = config.buildings.len(),
        achievements = config.achievements.len(),
        "Content file valid"
    );
    Ok(config)
}

/// Validate every `.ron` file in a directory, or a single file.
///
/// Every file is checked even after a failure; the first error is returned.
/// On success, returns the number of files validated.
///
/// # Errors
///
/// Returns an error if the path is missing or any data file fails
/// validation.
pub fn validate_data_directory(path: &Path) -> Result<usize, ToolError> {
    if path.is_file() {
        return validate_file(path).map(|_| 1);
    }
    if !path.is_dir() {
        return Err(ToolError::NotFound(path.display().to_string()));
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();

    let mut first_error = None;
    for file in &files {
        if let Err(e) = validate_file(file) {
            tracing::error!(file = %file.display(), "{e}");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(files.len()),
    }
}
