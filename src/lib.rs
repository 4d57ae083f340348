//! # Vista
//!
//! Named views, field expansion and cycle-safe rendering for attribute-bearing object graphs.
//!
//! Vista turns live objects into plain JSON. Schemas declare typed attributes; views declare
//! which attributes to show and which view of a related schema to use for each. Requests
//! can also name fields directly with a [`FieldMask`].
//!
//! ## Crates
//!
//! - [`core`]: schemas, values, selection trees, context paths and errors
//! - [`views`]: views, the registry, the field expander and the renderer
//! - [`conf`]: renderer and expander settings (feature `conf`, enabled by default)
//!
//! ## Feature Flags
//!
//! - `conf` (default): exposes the [`conf`] module and the settings re-exports. The settings
//!   crate itself is always linked, because [`views`] registries carry a `RenderSettings`.
//!
//! ## Quick Example
//!
//! ```
//! use serde_json::json;
//! use vista::prelude::*;
//!
//! let mut builder = RegistryBuilder::new();
//! let person = builder.blueprint("Person");
//! builder
//!     .attributes(person, |attrs| {
//!         attrs.attribute("name", TypeRef::string());
//!         attrs.attribute("email", TypeRef::string());
//!     })
//!     .unwrap();
//! builder.view(person, ViewBuilder::new("default").attribute("name").attribute("email"));
//! let registry = builder.finalize().unwrap();
//!
//! let bob = Datum::from(registry.record(person).with("name", "Bob").with("email", Datum::Null));
//!
//! assert_eq!(registry.render(&bob, &RenderOptions::new()).unwrap(), json!({"name": "Bob"}));
//! ```

#[cfg(feature = "conf")]
pub mod conf;
pub mod core;
pub mod views;

#[cfg(feature = "conf")]
pub use vista_conf::{CyclePolicy, RenderSettings, SettingsError};

pub use vista_core::{
	Context, Datum, Dumpable, Error, FieldArena, FieldId, FieldMask, Record, Resource, Result,
	SchemaId, TypeRef,
};

pub use vista_views::{
	CollectionView, FieldExpander, RegistryBuilder, RenderOptions, Renderer, SchemaRegistry,
	View, ViewBuilder,
};

/// Prelude module for convenient imports
///
/// Import everything commonly needed with:
/// ```
/// use vista::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		CollectionView, Context, Datum, Dumpable, Error, FieldExpander, FieldMask, Record,
		RegistryBuilder, RenderOptions, Renderer, Resource, Result, SchemaId, SchemaRegistry,
		TypeRef, View, ViewBuilder,
	};

	pub use vista_core::{Accessors, AttributeOptions, SchemaKind};
	pub use vista_views::{DEFAULT_VIEW, Expandable, MASTER_VIEW};

	#[cfg(feature = "conf")]
	pub use crate::{CyclePolicy, RenderSettings};
}
