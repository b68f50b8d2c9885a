//! Resource definitions.

use serde::{Deserialize, Serialize};

use super::ResourceKey;

/// Data-driven resource definition.
///
/// # Example RON
///
/// ```ron
/// ResourceData(
///     key: "food",
///     name: "resource.food.name",
///     initial: 10.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Unique string identifier for this resource.
    pub key: ResourceKey,

    /// Localization key for the display name.
    pub name: String,

    /// Amount a fresh game starts with.
    #[serde(default)]
    pub initial: f64,
}
