//! Core types module.
//!
//! Schemas, values, selection trees, context paths and errors.
//!
//! # Examples
//!
//! ```
//! use vista::core::{Context, FieldMask};
//!
//! let mask = FieldMask::names(["name"]);
//! assert!(mask.wants("name"));
//! assert_eq!(Context::root().child("name").humanize(), "$.name");
//! ```

pub use vista_core::*;
