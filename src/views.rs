//! Views module.
//!
//! Views, the schema registry, field expansion and rendering.
//!
//! # Examples
//!
//! ```
//! use vista::views::{MASTER_VIEW, RegistryBuilder};
//!
//! let mut builder = RegistryBuilder::new();
//! let person = builder.blueprint("Person");
//! let registry = builder.finalize().unwrap();
//! assert!(registry.view(person, MASTER_VIEW).is_some());
//! ```

pub use vista_views::*;
