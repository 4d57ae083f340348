//! # vista-core
//!
//! Foundational types shared by every Vista crate.
//!
//! ## Contents
//!
//! - **Schema adapter**: typed attribute declarations ([`TypeRef`], [`Attribute`]) and the
//!   [`SchemaTable`] that owns every schema node
//! - **Data model**: [`Datum`] values, the [`Resource`] reader capability for live objects,
//!   self-serializing [`Dumpable`] leaves, the map-backed [`Record`] and typed [`Accessors`]
//! - **Selection trees**: requested [`FieldMask`]s and the handle-addressed [`FieldArena`]
//!   produced by field expansion
//! - **Context paths**: [`Context`], the dotted location reported by errors
//! - **Errors**: definition, argument, expansion, dump and rendering failures
//!
//! ## Examples
//!
//! ```
//! use vista_core::{Datum, FieldArena, FieldMask, SchemaTable, SchemaKind, TypeRef};
//!
//! let mut table = SchemaTable::new();
//! let person = table.declare("Person", SchemaKind::Model);
//! table
//!     .define_attributes(person, |attrs| {
//!         attrs.attribute("name", TypeRef::string());
//!         attrs.attribute("age", TypeRef::integer());
//!     })
//!     .unwrap();
//!
//! let mut arena = FieldArena::new();
//! let fields = arena.insert_mask(&FieldMask::names(["name"]));
//! assert!(!arena.selection(fields).is_all());
//! assert_eq!(Datum::from("Bob").to_plain(), Some(serde_json::json!("Bob")));
//! ```

pub mod context;
pub mod datum;
pub mod error;
pub mod fields;
pub mod schema;

pub use context::Context;
pub use datum::{Accessors, Datum, Dumpable, Record, Resource, Wrapped};
pub use error::{
	ArgumentError, CircularExpansionError, CircularRenderingError, DefinitionError, DumpError,
	Error, ReadError, Result,
};
pub use fields::{FieldArena, FieldId, FieldMask, FieldNode, Selection};
pub use schema::{
	Attribute, AttributeOptions, AttributeSet, LeafKind, SchemaId, SchemaKind, SchemaNode,
	SchemaTable, TypeRef, validate_field_name,
};
