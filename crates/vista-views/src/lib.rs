//! # vista-views
//!
//! Named views over schema nodes, cycle-safe field expansion and cached rendering.
//!
//! ## Overview
//!
//! - [`ViewBuilder`] declares a view; [`RegistryBuilder::finalize`] freezes every declared
//!   view into an immutable [`View`] owned by a [`SchemaRegistry`]
//! - [`FieldExpander`] turns a view, collection view or type plus a requested
//!   [`FieldMask`](vista_core::FieldMask) into a canonical selection tree
//! - [`Renderer`] produces JSON from a live object graph guided by a selection tree,
//!   caching Blueprint renders and rejecting data cycles
//! - [`ViewDumper`] is the view-driven alternative that walks view contents directly
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use vista_core::{AttributeOptions, Datum, TypeRef};
//! use vista_views::{RegistryBuilder, RenderOptions, ViewBuilder};
//!
//! let mut builder = RegistryBuilder::new();
//! let person = builder.blueprint("Person");
//! let address = builder.blueprint("Address");
//! builder
//!     .attributes(address, |attrs| {
//!         attrs.attribute("street", TypeRef::string());
//!         attrs.attribute("state", TypeRef::string());
//!     })
//!     .unwrap();
//! builder
//!     .attributes(person, |attrs| {
//!         attrs.attribute("name", TypeRef::string());
//!         attrs.attribute("address", TypeRef::structure(address));
//!     })
//!     .unwrap();
//! builder.view(address, ViewBuilder::new("default").attribute("street").attribute("state"));
//! builder.view(address, ViewBuilder::new("state").attribute("state"));
//! builder.view(
//!     person,
//!     ViewBuilder::new("default")
//!         .attribute("name")
//!         .attribute_with("address", AttributeOptions::new().view("state")),
//! );
//! let registry = builder.finalize().unwrap();
//!
//! let home = registry.record(address).with("street", "1 Main St").with("state", "CA");
//! let bob = Datum::from(registry.record(person).with("name", "Bob").with("address", home));
//!
//! assert_eq!(
//!     registry.render(&bob, &RenderOptions::new()).unwrap(),
//!     json!({"name": "Bob", "address": {"state": "CA"}})
//! );
//! ```

pub mod collection_view;
pub mod describe;
pub mod dumper;
pub mod expander;
pub mod registry;
pub mod renderer;
pub mod view;

pub use collection_view::{CollectionMember, CollectionView};
pub use describe::{EntryDescription, SchemaDescription, ViewDescription, ViewType};
pub use dumper::ViewDumper;
pub use expander::{Expandable, FieldExpander};
pub use registry::{RegistryBuilder, RenderOptions, SchemaRegistry};
pub use renderer::{RenderEvent, RenderObserver, Renderer};
pub use view::{DEFAULT_VIEW, MASTER_VIEW, View, ViewBuilder, ViewEntry, ViewOptions};
