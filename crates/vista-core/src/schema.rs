//! Schema adapter
//!
//! The minimal type system the expander and renderer consume: every schema node exposes
//! an ordered attribute mapping, collections expose a member type, and everything else is
//! a leaf. Schema nodes live in a [`SchemaTable`] and are addressed by [`SchemaId`], so
//! self-referential schemas (a `Person` with an `Address` whose `resident` is a `Person`)
//! are plain handles rather than reference cycles.

use crate::error::{ArgumentError, DefinitionError, Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a schema node inside a [`SchemaTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(usize);

impl SchemaId {
	/// Position of the node in its table
	pub fn index(self) -> usize {
		self.0
	}
}

/// Scalar and untyped leaf kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
	String,
	Integer,
	Float,
	Boolean,
	/// Free-form key/value data with no declared keys
	Hash,
	Any,
}

/// The value type of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
	/// No attributes and no member: always rendered whole
	Leaf(LeafKind),
	/// A schema node with attributes
	Struct(SchemaId),
	/// A sequence whose elements share the member type
	Collection(Box<TypeRef>),
}

impl TypeRef {
	pub fn string() -> Self {
		Self::Leaf(LeafKind::String)
	}

	pub fn integer() -> Self {
		Self::Leaf(LeafKind::Integer)
	}

	pub fn float() -> Self {
		Self::Leaf(LeafKind::Float)
	}

	pub fn boolean() -> Self {
		Self::Leaf(LeafKind::Boolean)
	}

	pub fn hash() -> Self {
		Self::Leaf(LeafKind::Hash)
	}

	pub fn any() -> Self {
		Self::Leaf(LeafKind::Any)
	}

	pub fn structure(schema: SchemaId) -> Self {
		Self::Struct(schema)
	}

	pub fn collection_of(member: TypeRef) -> Self {
		Self::Collection(Box::new(member))
	}

	/// Member type of a collection
	pub fn member(&self) -> Option<&TypeRef> {
		match self {
			Self::Collection(member) => Some(member),
			_ => None,
		}
	}

	/// Schema of a struct type
	pub fn schema(&self) -> Option<SchemaId> {
		match self {
			Self::Struct(id) => Some(*id),
			_ => None,
		}
	}

	pub fn is_collection(&self) -> bool {
		matches!(self, Self::Collection(_))
	}

	/// Schema of a struct type, or of a collection's direct member when that member is a
	/// struct. Returns whether the type was a collection.
	pub fn element_schema(&self) -> Option<(SchemaId, bool)> {
		match self {
			Self::Struct(id) => Some((*id, false)),
			Self::Collection(member) => member.schema().map(|id| (id, true)),
			Self::Leaf(_) => None,
		}
	}
}

/// Per-use rendering options attached to a view entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeOptions {
	/// Named view of the related schema to render this attribute with
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub view: Option<String>,
}

impl AttributeOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Select the named view of the related schema
	pub fn view(mut self, name: impl Into<String>) -> Self {
		self.view = Some(name.into());
		self
	}
}

/// A named, typed attribute of a schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
	name: String,
	ty: TypeRef,
}

impl Attribute {
	pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
		Self {
			name: name.into(),
			ty,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn ty(&self) -> &TypeRef {
		&self.ty
	}
}

/// Whether a schema node bears views of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
	/// View-bearing wrapped entity: rendered through its views and cached per object
	Blueprint,
	/// Plain structure: dumped with all of its attributes
	Model,
}

/// A schema node: name, kind and (once defined) its ordered attributes
#[derive(Debug, Clone)]
pub struct SchemaNode {
	id: SchemaId,
	name: String,
	kind: SchemaKind,
	anonymous: bool,
	attributes: Option<IndexMap<String, Attribute>>,
}

impl SchemaNode {
	pub fn id(&self) -> SchemaId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> SchemaKind {
		self.kind
	}

	/// Inline structures declared on an attribute have no name of their own
	pub fn is_anonymous(&self) -> bool {
		self.anonymous
	}

	/// Ordered attributes, or `None` when the node never declared any
	pub fn attributes(&self) -> Option<&IndexMap<String, Attribute>> {
		self.attributes.as_ref()
	}

	pub fn attribute(&self, name: &str) -> Option<&Attribute> {
		self.attributes.as_ref().and_then(|attrs| attrs.get(name))
	}
}

/// Owner of every schema node
///
/// # Examples
///
/// ```
/// use vista_core::{SchemaKind, SchemaTable, TypeRef};
///
/// let mut table = SchemaTable::new();
/// let person = table.declare("Person", SchemaKind::Blueprint);
/// let address = table.declare("Address", SchemaKind::Blueprint);
///
/// table
///     .define_attributes(person, |attrs| {
///         attrs.attribute("name", TypeRef::string());
///         attrs.attribute("address", TypeRef::structure(address));
///         attrs.structure("parents", |parents| {
///             parents.attribute("father", TypeRef::string());
///             parents.attribute("mother", TypeRef::string());
///         });
///     })
///     .unwrap();
///
/// let names: Vec<_> = table.attributes(&TypeRef::structure(person)).unwrap().keys().cloned().collect();
/// assert_eq!(names, ["name", "address", "parents"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaTable {
	nodes: Vec<SchemaNode>,
}

impl SchemaTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserve a named schema node; attributes are defined separately so nodes can refer
	/// to each other before either is complete
	pub fn declare(&mut self, name: impl Into<String>, kind: SchemaKind) -> SchemaId {
		self.push(name.into(), kind, false)
	}

	fn push(&mut self, name: String, kind: SchemaKind, anonymous: bool) -> SchemaId {
		let id = SchemaId(self.nodes.len());
		self.nodes.push(SchemaNode {
			id,
			name,
			kind,
			anonymous,
			attributes: None,
		});
		id
	}

	/// Define the attributes of a declared node
	///
	/// Fails if the node already has attributes, if a name is declared twice or is not an
	/// identifier.
	pub fn define_attributes<F>(&mut self, id: SchemaId, define: F) -> Result<()>
	where
		F: FnOnce(&mut AttributeSet<'_>),
	{
		let owner = self.node(id)?;
		if owner.attributes.is_some() {
			return Err(DefinitionError::AttributesRedefined {
				schema: owner.name.clone(),
			}
			.into());
		}
		let owner_name = owner.name.clone();

		let mut set = AttributeSet::new(self, owner_name);
		define(&mut set);
		let attributes = set.finish()?;

		self.nodes[id.0].attributes = Some(attributes);
		Ok(())
	}

	pub fn node(&self, id: SchemaId) -> Result<&SchemaNode> {
		self.nodes
			.get(id.0)
			.ok_or_else(|| DefinitionError::UnknownSchema(id.0).into())
	}

	pub fn get(&self, id: SchemaId) -> Option<&SchemaNode> {
		self.nodes.get(id.0)
	}

	pub fn nodes(&self) -> impl Iterator<Item = &SchemaNode> {
		self.nodes.iter()
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Name of a schema, `"?"` for ids this table did not issue
	pub fn name_of(&self, id: SchemaId) -> &str {
		self.get(id).map(SchemaNode::name).unwrap_or("?")
	}

	/// `attributes()` of the adapter: the ordered attributes of a struct type
	pub fn attributes(&self, ty: &TypeRef) -> Option<&IndexMap<String, Attribute>> {
		match ty {
			TypeRef::Struct(id) => self.get(*id).and_then(SchemaNode::attributes),
			_ => None,
		}
	}

	/// `member_attribute()` of the adapter: the element type of a collection
	pub fn member_type<'a>(&self, ty: &'a TypeRef) -> Option<&'a TypeRef> {
		ty.member()
	}

	/// Human-readable type name
	pub fn describe_type(&self, ty: &TypeRef) -> String {
		match ty {
			TypeRef::Leaf(kind) => format!("{kind:?}"),
			TypeRef::Struct(id) => self.name_of(*id).to_string(),
			TypeRef::Collection(member) => format!("Collection<{}>", self.describe_type(member)),
		}
	}
}

/// Collector handed to [`SchemaTable::define_attributes`]
///
/// Errors are recorded and reported when the definition completes, so declarations can
/// be chained without `?` at each step.
pub struct AttributeSet<'t> {
	table: &'t mut SchemaTable,
	owner: String,
	attributes: IndexMap<String, Attribute>,
	errors: Vec<Error>,
}

impl<'t> AttributeSet<'t> {
	fn new(table: &'t mut SchemaTable, owner: String) -> Self {
		Self {
			table,
			owner,
			attributes: IndexMap::new(),
			errors: Vec::new(),
		}
	}

	/// Declare an attribute
	pub fn attribute(&mut self, name: &str, ty: TypeRef) -> &mut Self {
		if let Err(err) = validate_field_name(name) {
			self.errors.push(err.into());
			return self;
		}
		if self.attributes.contains_key(name) {
			self.errors.push(
				DefinitionError::DuplicateAttribute {
					schema: self.owner.clone(),
					attribute: name.to_string(),
				}
				.into(),
			);
			return self;
		}
		self.attributes
			.insert(name.to_string(), Attribute::new(name, ty));
		self
	}

	/// Declare an attribute typed by an inline anonymous structure
	pub fn structure<F>(&mut self, name: &str, define: F) -> &mut Self
	where
		F: FnOnce(&mut AttributeSet<'_>),
	{
		match self.inline(name, define) {
			Ok(id) => self.attribute(name, TypeRef::Struct(id)),
			Err(err) => {
				self.errors.push(err);
				self
			}
		}
	}

	/// Declare a collection attribute whose members are an inline anonymous structure
	pub fn collection_of_structure<F>(&mut self, name: &str, define: F) -> &mut Self
	where
		F: FnOnce(&mut AttributeSet<'_>),
	{
		match self.inline(name, define) {
			Ok(id) => self.attribute(name, TypeRef::collection_of(TypeRef::Struct(id))),
			Err(err) => {
				self.errors.push(err);
				self
			}
		}
	}

	fn inline<F>(&mut self, name: &str, define: F) -> Result<SchemaId>
	where
		F: FnOnce(&mut AttributeSet<'_>),
	{
		let anonymous_name = format!("{}::{}", self.owner, name);
		let id = self.table.push(anonymous_name, SchemaKind::Model, true);
		self.table.define_attributes(id, define)?;
		Ok(id)
	}

	fn finish(mut self) -> Result<IndexMap<String, Attribute>> {
		if self.errors.is_empty() {
			Ok(self.attributes)
		} else {
			Err(self.errors.remove(0))
		}
	}
}

impl fmt::Debug for AttributeSet<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("AttributeSet")
			.field("owner", &self.owner)
			.field("attributes", &self.attributes.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Field names must be identifiers: a letter or `_`, then letters, digits or `_`
///
/// # Examples
///
/// ```
/// use vista_core::validate_field_name;
///
/// assert!(validate_field_name("full_name").is_ok());
/// assert!(validate_field_name("2fast").is_err());
/// assert!(validate_field_name("").is_err());
/// ```
pub fn validate_field_name(name: &str) -> std::result::Result<(), ArgumentError> {
	let mut chars = name.chars();
	let valid = match chars.next() {
		Some(first) if first.is_ascii_alphabetic() || first == '_' => {
			chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
		}
		_ => false,
	};
	if valid {
		Ok(())
	} else {
		Err(ArgumentError::InvalidFieldName {
			name: name.to_string(),
		})
	}
}
