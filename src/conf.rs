//! Settings module.
//!
//! # Examples
//!
//! ```
//! use vista::conf::RenderSettings;
//!
//! let settings = RenderSettings::new().with_include_nil(true);
//! assert!(settings.validate().is_ok());
//! ```

pub use vista_conf::*;
