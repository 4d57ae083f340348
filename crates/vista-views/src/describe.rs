//! Structural descriptions for documentation tooling

use indexmap::IndexMap;
use serde::Serialize;
use vista_core::SchemaKind;

/// Whether a description belongs to a plain view or a collection view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
	Standard,
	Collection,
}

/// One entry of a view description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryDescription {
	/// Name of the view the entry is rendered with, for view entries
	#[serde(skip_serializing_if = "Option::is_none")]
	pub view: Option<String>,
}

/// `{attributes: {name -> {view?}}, type: standard|collection}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewDescription {
	pub attributes: IndexMap<String, EntryDescription>,
	#[serde(rename = "type")]
	pub kind: ViewType,
}

/// Description of a schema node and its views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
	pub name: String,
	pub kind: SchemaKind,
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub anonymous: bool,
	/// Attribute name to type name
	pub attributes: IndexMap<String, String>,
	pub views: IndexMap<String, ViewDescription>,
}
