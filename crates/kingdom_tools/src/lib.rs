//! # Kingdom Development Tools
//!
//! Command-line tools for development:
//! - Content validators
//! - Headless simulation with scripted players
//! - Save inspection

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod inspect;
pub mod simulate;
pub mod validate;

pub use error::ToolError;
