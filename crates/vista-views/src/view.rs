//! Views
//!
//! A view is a named projection over one schema node. It is declared with a
//! [`ViewBuilder`] and frozen into a [`View`] when the registry is finalized; from then on
//! its contents never change.

use crate::collection_view::{CollectionMember, CollectionView};
use crate::describe::{EntryDescription, ViewDescription, ViewType};
use crate::dumper::ViewDumper;
use crate::registry::SchemaRegistry;
use crate::renderer::Renderer;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use vista_core::{
	ArgumentError, Attribute, AttributeOptions, Context, Datum, DefinitionError, Result, SchemaId,
	SchemaKind, SchemaTable, Selection, TypeRef, validate_field_name,
};

/// Name of the view rendered when none is requested
pub const DEFAULT_VIEW: &str = "default";
/// Name of the generated all-attributes view
pub const MASTER_VIEW: &str = "master";

/// Nil handling for the view-driven dump path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
	/// Emit `null` for attributes the object holds with a nil value
	pub include_nil: bool,
	/// Emit `null` for attributes the object does not hold at all
	pub include_unset: bool,
}

/// One entry of a view's contents
#[derive(Debug)]
pub enum ViewEntry {
	/// A plain attribute, rendered through its own type
	Attribute {
		attribute: Attribute,
		options: AttributeOptions,
	},
	/// An inline sub-view declared on a structure attribute
	View(Arc<View>),
	/// An inline or referencing view over a collection attribute
	Collection(Arc<CollectionView>),
	/// A named view of the related schema
	Reference {
		attribute: Attribute,
		schema: SchemaId,
		view: String,
	},
}

/// A frozen view
#[derive(Debug)]
pub struct View {
	name: String,
	schema: SchemaId,
	schema_name: String,
	options: ViewOptions,
	contents: IndexMap<String, ViewEntry>,
}

impl View {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Schema node owning this view
	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	pub fn schema_name(&self) -> &str {
		&self.schema_name
	}

	pub fn options(&self) -> ViewOptions {
		self.options
	}

	/// Entries in declaration order
	pub fn contents(&self) -> &IndexMap<String, ViewEntry> {
		&self.contents
	}

	/// Fully expanded selection tree, precomputed when the registry was finalized
	///
	/// Returns `None` for views that do not belong to `registry`.
	pub fn expanded_fields<'r>(&self, registry: &'r SchemaRegistry) -> Option<Selection<'r>> {
		registry.view_fields(self as *const View as usize)
	}

	/// Render `object` through the renderer with this view's expanded fields
	pub fn render<'r>(
		&self,
		renderer: &mut Renderer<'r>,
		object: &Datum,
		context: &Context,
	) -> Result<Arc<Value>> {
		let fields = self
			.expanded_fields(renderer.registry())
			.ok_or_else(|| DefinitionError::UnknownView {
				schema: self.schema_name.clone(),
				view: self.name.clone(),
			})?;
		renderer.render_view(object, fields, Some(&self.name), context)
	}

	/// View-driven dump: walk this view's own contents instead of an expanded tree
	pub fn dump(
		&self,
		registry: &SchemaRegistry,
		object: &Datum,
		context: &Context,
	) -> Result<Value> {
		ViewDumper::new(registry).dump_view(self, object, context)
	}

	/// Shallow structural description
	pub fn describe(&self) -> ViewDescription {
		let attributes = self
			.contents
			.iter()
			.map(|(name, entry)| {
				let view = match entry {
					ViewEntry::Attribute { .. } => None,
					ViewEntry::View(view) => Some(view.name().to_string()),
					ViewEntry::Collection(collection) => Some(collection.name().to_string()),
					ViewEntry::Reference { view, .. } => Some(view.clone()),
				};
				(name.clone(), EntryDescription { view })
			})
			.collect();

		ViewDescription {
			attributes,
			kind: ViewType::Standard,
		}
	}
}

enum PendingEntry {
	Attribute {
		name: String,
		options: AttributeOptions,
	},
	Nested {
		name: String,
		builder: ViewBuilder,
	},
}

/// Declaration of a view
///
/// # Examples
///
/// ```
/// use vista_core::{AttributeOptions, TypeRef};
/// use vista_views::{RegistryBuilder, ViewBuilder};
///
/// let mut builder = RegistryBuilder::new();
/// let person = builder.blueprint("Person");
/// let address = builder.blueprint("Address");
/// builder
///     .attributes(address, |attrs| {
///         attrs.attribute("state", TypeRef::string());
///     })
///     .unwrap();
/// builder
///     .attributes(person, |attrs| {
///         attrs.attribute("name", TypeRef::string());
///         attrs.attribute("address", TypeRef::structure(address));
///         attrs.structure("parents", |parents| {
///             parents.attribute("father", TypeRef::string());
///         });
///     })
///     .unwrap();
///
/// builder.view(address, ViewBuilder::new("default").attribute("state"));
/// builder.view(
///     person,
///     ViewBuilder::new("default")
///         .attribute("name")
///         .attribute_with("address", AttributeOptions::new().view("default"))
///         .nested("parents", |parents| parents.attribute("father")),
/// );
///
/// let registry = builder.finalize().unwrap();
/// let view = registry.view(person, "default").unwrap();
/// assert_eq!(view.contents().len(), 3);
/// ```
pub struct ViewBuilder {
	name: String,
	entries: Vec<PendingEntry>,
	include_nil: Option<bool>,
	include_unset: bool,
}

impl ViewBuilder {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			entries: Vec::new(),
			include_nil: None,
			include_unset: false,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Show an attribute
	pub fn attribute(self, name: impl Into<String>) -> Self {
		self.attribute_with(name, AttributeOptions::default())
	}

	/// Show an attribute with per-use options, typically the view of a related schema
	pub fn attribute_with(mut self, name: impl Into<String>, options: AttributeOptions) -> Self {
		self.entries.push(PendingEntry::Attribute {
			name: name.into(),
			options,
		});
		self
	}

	/// Show a structure attribute (or a collection of structures) through an inline view
	pub fn nested<F>(mut self, name: impl Into<String>, declare: F) -> Self
	where
		F: FnOnce(ViewBuilder) -> ViewBuilder,
	{
		let name = name.into();
		let builder = declare(ViewBuilder::new(name.clone()));
		self.entries.push(PendingEntry::Nested { name, builder });
		self
	}

	pub fn include_nil(mut self, include_nil: bool) -> Self {
		self.include_nil = Some(include_nil);
		self
	}

	/// Also emit attributes the object does not hold; implies `include_nil`
	pub fn include_unset(mut self, include_unset: bool) -> Self {
		self.include_unset = include_unset;
		self
	}

	fn options(&self, schema_name: &str) -> Result<ViewOptions> {
		if self.include_unset && self.include_nil == Some(false) {
			return Err(ArgumentError::InvalidOptions {
				view: format!("{}#{}", schema_name, self.name),
				message: "include_unset requires include_nil".to_string(),
			}
			.into());
		}
		Ok(ViewOptions {
			include_nil: self.include_nil.unwrap_or(self.include_unset),
			include_unset: self.include_unset,
		})
	}

	/// Freeze the declaration against `schema`
	///
	/// `has_view` reports whether a named view exists on a schema, so references can be
	/// checked before the referenced views are themselves built.
	pub(crate) fn build(
		&self,
		table: &SchemaTable,
		schema: SchemaId,
		has_view: &dyn Fn(SchemaId, &str) -> bool,
	) -> Result<View> {
		let node = table.node(schema)?;
		let schema_name = node.name().to_string();
		let options = self.options(&schema_name)?;

		let mut contents = IndexMap::new();
		for pending in &self.entries {
			let (name, entry) = match pending {
				PendingEntry::Attribute { name, options } => {
					let attribute = self.lookup(table, schema, name)?;
					let entry = reference_entry(table, attribute, options, has_view)?;
					(name, entry)
				}
				PendingEntry::Nested { name, builder } => {
					let attribute = self.lookup(table, schema, name)?;
					let entry = match attribute.ty().element_schema() {
						Some((member, false)) => {
							ViewEntry::View(Arc::new(builder.build(table, member, has_view)?))
						}
						Some((member, true)) => {
							let inline = Arc::new(builder.build(table, member, has_view)?);
							ViewEntry::Collection(Arc::new(CollectionView::new(
								name.clone(),
								member,
								table.name_of(member),
								CollectionMember::Inline(inline),
							)))
						}
						None => {
							return Err(DefinitionError::NotAStructure {
								schema: schema_name,
								attribute: name.clone(),
							}
							.into());
						}
					};
					(name, entry)
				}
			};
			contents.insert(name.clone(), entry);
		}

		Ok(View {
			name: self.name.clone(),
			schema,
			schema_name,
			options,
			contents,
		})
	}

	fn lookup(&self, table: &SchemaTable, schema: SchemaId, name: &str) -> Result<Attribute> {
		validate_field_name(name)?;
		let node = table.node(schema)?;
		node.attribute(name).cloned().ok_or_else(|| {
			DefinitionError::UnknownAttribute {
				schema: node.name().to_string(),
				view: self.name.clone(),
				attribute: name.to_string(),
			}
			.into()
		})
	}
}

/// Attributes typed as a Blueprint (directly or as a collection member) are shown through
/// a named view of that Blueprint; every other attribute is stored as is.
fn reference_entry(
	table: &SchemaTable,
	attribute: Attribute,
	options: &AttributeOptions,
	has_view: &dyn Fn(SchemaId, &str) -> bool,
) -> Result<ViewEntry> {
	let target = attribute
		.ty()
		.element_schema()
		.filter(|(id, _)| {
			table
				.get(*id)
				.is_some_and(|node| node.kind() == SchemaKind::Blueprint)
		});

	let Some((target, is_collection)) = target else {
		return Ok(ViewEntry::Attribute {
			attribute,
			options: options.clone(),
		});
	};

	let view = options.view.as_deref().unwrap_or(DEFAULT_VIEW).to_string();
	if !has_view(target, &view) {
		return Err(DefinitionError::UnknownView {
			schema: table.name_of(target).to_string(),
			view,
		}
		.into());
	}

	if is_collection {
		Ok(ViewEntry::Collection(Arc::new(CollectionView::new(
			view.clone(),
			target,
			table.name_of(target),
			CollectionMember::Reference { view },
		))))
	} else {
		Ok(ViewEntry::Reference {
			attribute,
			schema: target,
			view,
		})
	}
}

/// The generated `master` view: every attribute, with related Blueprints shown through
/// their `default` view (or their own `master` when they declare no `default`)
pub(crate) fn master_view(
	table: &SchemaTable,
	schema: SchemaId,
	has_view: &dyn Fn(SchemaId, &str) -> bool,
) -> ViewBuilder {
	let mut builder = ViewBuilder::new(MASTER_VIEW);
	let Some(attributes) = table.get(schema).and_then(|node| node.attributes()) else {
		return builder;
	};

	for (name, attribute) in attributes {
		let related = attribute
			.ty()
			.element_schema()
			.filter(|(id, _)| {
				table
					.get(*id)
					.is_some_and(|node| node.kind() == SchemaKind::Blueprint)
			});
		builder = match related {
			Some((target, _)) => {
				let view = if has_view(target, DEFAULT_VIEW) {
					DEFAULT_VIEW
				} else {
					MASTER_VIEW
				};
				builder.attribute_with(name.as_str(), AttributeOptions::new().view(view))
			}
			None => builder.attribute(name.as_str()),
		};
	}
	builder
}

/// Whether `ty` has structure of its own (attributes or a member type)
pub(crate) fn is_structured(table: &SchemaTable, ty: &TypeRef) -> bool {
	match ty {
		TypeRef::Leaf(_) => false,
		TypeRef::Struct(_) => table.attributes(ty).is_some(),
		TypeRef::Collection(_) => true,
	}
}
