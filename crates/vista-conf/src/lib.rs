//! # vista-conf
//!
//! Settings for Vista's field expander and renderer.
//!
//! Settings can be built in code, loaded from `VISTA_*` environment variables or parsed from
//! a TOML document. Every loader fills unspecified values with defaults.
//!
//! ## Examples
//!
//! ```
//! use vista_conf::{CyclePolicy, RenderSettings};
//!
//! let settings = RenderSettings::from_toml_str(
//!     r#"
//! include_nil = true
//! expansion_cycles = "error"
//! "#,
//! )
//! .unwrap();
//!
//! assert!(settings.include_nil);
//! assert_eq!(settings.max_depth, 128);
//! assert_eq!(settings.expansion_cycles, CyclePolicy::Error);
//! ```

pub mod settings;

pub use settings::{CyclePolicy, RenderSettings, SettingsError};
