//! Render settings
//!
//! Environment variables:
//!
//! | Variable | Field | Values |
//! |----------|-------|--------|
//! | `VISTA_INCLUDE_NIL` | `include_nil` | `true`/`false`/`1`/`0` |
//! | `VISTA_MAX_DEPTH` | `max_depth` | positive integer |
//! | `VISTA_EXPANSION_CYCLES` | `expansion_cycles` | `link`/`error` |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Environment variable for [`RenderSettings::include_nil`]
pub const ENV_INCLUDE_NIL: &str = "VISTA_INCLUDE_NIL";
/// Environment variable for [`RenderSettings::max_depth`]
pub const ENV_MAX_DEPTH: &str = "VISTA_MAX_DEPTH";
/// Environment variable for [`RenderSettings::expansion_cycles`]
pub const ENV_EXPANSION_CYCLES: &str = "VISTA_EXPANSION_CYCLES";

/// Default nesting budget for one render call
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// What the field expander does when a (node, mask) pair is reached again while it is still
/// being expanded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
	/// Close the cycle: the inner occurrence reuses the ancestor's selection-tree handle
	#[default]
	Link,
	/// Fail with a circular expansion error naming the chain
	Error,
}

impl FromStr for CyclePolicy {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"link" => Ok(Self::Link),
			"error" => Ok(Self::Error),
			_ => Err(SettingsError::InvalidValue {
				key: ENV_EXPANSION_CYCLES.to_string(),
				value: s.to_string(),
			}),
		}
	}
}

impl fmt::Display for CyclePolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Link => f.write_str("link"),
			Self::Error => f.write_str("error"),
		}
	}
}

/// Renderer and expander configuration
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
	/// Emit `null` for nil attributes instead of omitting them
	#[serde(default)]
	pub include_nil: bool,

	/// Maximum nested render calls before a circular rendering error
	#[serde(default = "default_max_depth")]
	pub max_depth: usize,

	/// Structural cycle handling during field expansion
	#[serde(default)]
	pub expansion_cycles: CyclePolicy,
}

fn default_max_depth() -> usize {
	DEFAULT_MAX_DEPTH
}

impl Default for RenderSettings {
	fn default() -> Self {
		Self {
			include_nil: false,
			max_depth: DEFAULT_MAX_DEPTH,
			expansion_cycles: CyclePolicy::default(),
		}
	}
}

impl RenderSettings {
	/// Create new settings with defaults
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_include_nil(mut self, include_nil: bool) -> Self {
		self.include_nil = include_nil;
		self
	}

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth;
		self
	}

	pub fn with_expansion_cycles(mut self, policy: CyclePolicy) -> Self {
		self.expansion_cycles = policy;
		self
	}

	/// Validate settings
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.max_depth == 0 {
			return Err(SettingsError::Validation(
				"max_depth must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	/// Load settings from environment variables, defaulting whatever is unset
	pub fn from_env() -> Result<Self, SettingsError> {
		let mut settings = Self::default();

		if let Ok(value) = std::env::var(ENV_INCLUDE_NIL) {
			settings.include_nil = parse_bool(ENV_INCLUDE_NIL, &value)?;
		}

		if let Ok(value) = std::env::var(ENV_MAX_DEPTH) {
			settings.max_depth = value.trim().parse().map_err(|_| SettingsError::InvalidValue {
				key: ENV_MAX_DEPTH.to_string(),
				value: value.clone(),
			})?;
		}

		if let Ok(value) = std::env::var(ENV_EXPANSION_CYCLES) {
			settings.expansion_cycles = value.parse()?;
		}

		settings.validate()?;
		tracing::debug!(?settings, "loaded render settings from environment");
		Ok(settings)
	}

	/// Parse settings from a TOML document
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		let settings: Self = toml::from_str(source)?;
		settings.validate()?;
		Ok(settings)
	}
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" => Ok(true),
		"false" | "0" | "no" | "" => Ok(false),
		_ => Err(SettingsError::InvalidValue {
			key: key.to_string(),
			value: value.to_string(),
		}),
	}
}

/// Settings could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Invalid value for {key}: {value:?}")]
	InvalidValue { key: String, value: String },

	#[error("Parse error: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("Validation error: {0}")]
	Validation(String),
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serial_test::serial;
	use std::env;

	fn clear_env() {
		// SAFETY: Removing environment variables is unsafe in multi-threaded programs.
		// Callers are #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::remove_var(ENV_INCLUDE_NIL);
			env::remove_var(ENV_MAX_DEPTH);
			env::remove_var(ENV_EXPANSION_CYCLES);
		}
	}

	#[rstest]
	fn test_default_settings() {
		let settings = RenderSettings::default();

		assert!(!settings.include_nil);
		assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
		assert_eq!(settings.expansion_cycles, CyclePolicy::Link);
		assert!(settings.validate().is_ok());
	}

	#[rstest]
	#[serial]
	fn test_from_env_reads_every_variable() {
		// Arrange
		clear_env();
		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::set_var(ENV_INCLUDE_NIL, "1");
			env::set_var(ENV_MAX_DEPTH, "32");
			env::set_var(ENV_EXPANSION_CYCLES, "Error");
		}

		// Act
		let settings = RenderSettings::from_env();
		clear_env();

		// Assert
		let settings = settings.unwrap();
		assert!(settings.include_nil);
		assert_eq!(settings.max_depth, 32);
		assert_eq!(settings.expansion_cycles, CyclePolicy::Error);
	}

	#[rstest]
	#[serial]
	fn test_from_env_defaults_when_unset() {
		clear_env();

		let settings = RenderSettings::from_env().unwrap();

		assert_eq!(settings, RenderSettings::default());
	}

	#[rstest]
	#[case(ENV_INCLUDE_NIL, "maybe")]
	#[case(ENV_MAX_DEPTH, "deep")]
	#[case(ENV_MAX_DEPTH, "0")]
	#[case(ENV_EXPANSION_CYCLES, "ignore")]
	#[serial]
	fn test_from_env_rejects_invalid_values(#[case] key: &str, #[case] value: &str) {
		clear_env();
		// SAFETY: Setting environment variables is unsafe in multi-threaded programs.
		// This test uses #[serial] to ensure exclusive access to environment variables.
		unsafe {
			env::set_var(key, value);
		}

		let result = RenderSettings::from_env();
		clear_env();

		assert!(result.is_err());
	}

	#[rstest]
	fn test_from_toml_fills_defaults() {
		let settings = RenderSettings::from_toml_str("max_depth = 64").unwrap();

		assert_eq!(settings.max_depth, 64);
		assert!(!settings.include_nil);
		assert_eq!(settings.expansion_cycles, CyclePolicy::Link);
	}

	#[rstest]
	fn test_from_toml_rejects_bad_documents() {
		assert!(matches!(
			RenderSettings::from_toml_str("expansion_cycles = \"sometimes\""),
			Err(SettingsError::Parse(_))
		));
		assert!(matches!(
			RenderSettings::from_toml_str("max_depth = 0"),
			Err(SettingsError::Validation(_))
		));
	}

	#[rstest]
	fn test_builders() {
		let settings = RenderSettings::new()
			.with_include_nil(true)
			.with_max_depth(8)
			.with_expansion_cycles(CyclePolicy::Error);

		assert!(settings.include_nil);
		assert_eq!(settings.max_depth, 8);
		assert_eq!(settings.expansion_cycles.to_string(), "error");
	}
}
