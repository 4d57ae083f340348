//! Schema registry
//!
//! [`RegistryBuilder`] collects schema declarations and view declarations; [`finalize`]
//! freezes them into an immutable [`SchemaRegistry`]:
//!
//! 1. a `master` view is generated for every Blueprint that does not declare one
//! 2. every view is built and its attribute and view references are checked
//! 3. every view and every structure is expanded with `All` into the registry's own arena
//!
//! The finalized registry is `Send + Sync` and can be shared behind an `Arc`.
//!
//! [`finalize`]: RegistryBuilder::finalize

use crate::describe::SchemaDescription;
use crate::expander::{Expandable, FieldExpander, NodeKey};
use crate::renderer::Renderer;
use crate::view::{self, DEFAULT_VIEW, MASTER_VIEW, View, ViewBuilder};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use vista_conf::{CyclePolicy, RenderSettings};
use vista_core::{
	ArgumentError, AttributeSet, Context, Datum, FieldArena, FieldId, FieldMask, FieldNode,
	Record, Resource, Result, SchemaId, SchemaKind, SchemaNode, SchemaTable, Selection, TypeRef,
};

/// Collects schemas and views before finalization
#[derive(Default)]
pub struct RegistryBuilder {
	table: SchemaTable,
	views: BTreeMap<SchemaId, IndexMap<String, ViewBuilder>>,
	settings: RenderSettings,
}

impl RegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Settings used by renderers and expanders created from the registry
	pub fn with_settings(mut self, settings: RenderSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Declare a view-bearing schema
	pub fn blueprint(&mut self, name: impl Into<String>) -> SchemaId {
		self.table.declare(name, SchemaKind::Blueprint)
	}

	/// Declare a plain structure
	pub fn model(&mut self, name: impl Into<String>) -> SchemaId {
		self.table.declare(name, SchemaKind::Model)
	}

	/// Define the attributes of a declared schema
	pub fn attributes<F>(&mut self, schema: SchemaId, define: F) -> Result<()>
	where
		F: FnOnce(&mut AttributeSet<'_>),
	{
		self.table.define_attributes(schema, define)
	}

	/// Record a view; a later view with the same name replaces the earlier one
	pub fn view(&mut self, schema: SchemaId, builder: ViewBuilder) -> &mut Self {
		self.views
			.entry(schema)
			.or_default()
			.insert(builder.name().to_string(), builder);
		self
	}

	pub fn table(&self) -> &SchemaTable {
		&self.table
	}

	/// Build, check and pre-expand everything
	pub fn finalize(self) -> Result<SchemaRegistry> {
		let Self {
			table,
			mut views,
			settings,
		} = self;

		let declared: BTreeMap<SchemaId, Vec<String>> = views
			.iter()
			.map(|(schema, builders)| (*schema, builders.keys().cloned().collect()))
			.collect();
		let has_view = |schema: SchemaId, name: &str| {
			declared
				.get(&schema)
				.is_some_and(|names| names.iter().any(|declared| declared == name))
				|| (name == MASTER_VIEW
					&& table
						.get(schema)
						.is_some_and(|node| node.kind() == SchemaKind::Blueprint))
		};

		for node in table.nodes() {
			if node.kind() != SchemaKind::Blueprint {
				continue;
			}
			let builders = views.entry(node.id()).or_default();
			if !builders.contains_key(MASTER_VIEW) {
				builders.insert(
					MASTER_VIEW.to_string(),
					view::master_view(&table, node.id(), &has_view),
				);
			}
		}

		let mut built: HashMap<SchemaId, IndexMap<String, Arc<View>>> = HashMap::new();
		for (schema, builders) in &views {
			let entry = built.entry(*schema).or_default();
			for (name, builder) in builders {
				let view = builder.build(&table, *schema, &has_view)?;
				tracing::debug!(schema = table.name_of(*schema), view = %name, "built view");
				entry.insert(name.clone(), Arc::new(view));
			}
		}

		let mut registry = SchemaRegistry {
			table,
			views: built,
			arena: FieldArena::new(),
			view_fields: HashMap::new(),
			schema_fields: HashMap::new(),
			empty_fields: FieldId::ALL,
			settings,
		};
		registry.pre_expand()?;

		tracing::debug!(
			schemas = registry.table.len(),
			nodes = registry.arena.len(),
			"finalized schema registry"
		);
		Ok(registry)
	}
}

impl std::fmt::Debug for RegistryBuilder {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RegistryBuilder")
			.field("schemas", &self.table.len())
			.field("settings", &self.settings)
			.finish_non_exhaustive()
	}
}

/// How [`SchemaRegistry::render`] selects fields
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
	view: Option<String>,
	fields: Option<FieldMask>,
	context: Option<Context>,
}

impl RenderOptions {
	pub fn new() -> Self {
		Self::default()
	}

	/// Render through a named view
	pub fn view(mut self, name: impl Into<String>) -> Self {
		self.view = Some(name.into());
		self
	}

	/// Render an explicit mask, expanded against the object's schema
	pub fn fields(mut self, mask: FieldMask) -> Self {
		self.fields = Some(mask);
		self
	}

	/// Render a flat list of field names, each selected entirely
	pub fn field_names<I, S>(self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.fields(FieldMask::names(names))
	}

	/// Root context for error paths
	pub fn context(mut self, context: Context) -> Self {
		self.context = Some(context);
		self
	}
}

/// Immutable set of schemas, views and their precomputed selection trees
pub struct SchemaRegistry {
	table: SchemaTable,
	views: HashMap<SchemaId, IndexMap<String, Arc<View>>>,
	arena: FieldArena,
	view_fields: HashMap<usize, FieldId>,
	schema_fields: HashMap<SchemaId, FieldId>,
	empty_fields: FieldId,
	settings: RenderSettings,
}

impl SchemaRegistry {
	pub fn table(&self) -> &SchemaTable {
		&self.table
	}

	pub fn node(&self, schema: SchemaId) -> Result<&SchemaNode> {
		self.table.node(schema)
	}

	pub fn settings(&self) -> &RenderSettings {
		&self.settings
	}

	/// Arena holding every precomputed selection tree
	pub fn arena(&self) -> &FieldArena {
		&self.arena
	}

	pub fn view(&self, schema: SchemaId, name: &str) -> Option<&Arc<View>> {
		self.views.get(&schema).and_then(|views| views.get(name))
	}

	/// Views of a schema in declaration order
	pub fn views(&self, schema: SchemaId) -> impl Iterator<Item = &Arc<View>> {
		self.views.get(&schema).into_iter().flat_map(|views| views.values())
	}

	pub fn is_blueprint(&self, schema: SchemaId) -> bool {
		self.table
			.get(schema)
			.is_some_and(|node| node.kind() == SchemaKind::Blueprint)
	}

	/// Empty record of a schema, for building object graphs by hand
	pub fn record(&self, schema: SchemaId) -> Record {
		Record::new(schema, self.table.name_of(schema))
	}

	/// Expansion session with the configured cycle policy
	pub fn expander(&self) -> FieldExpander<'_> {
		FieldExpander::new(self)
	}

	/// Render session with the configured settings
	pub fn renderer(&self) -> Renderer<'_> {
		Renderer::new(self)
	}

	/// Render a Blueprint object through a named view (default `default`) or an explicit
	/// field selection
	///
	/// # Examples
	///
	/// ```
	/// use serde_json::json;
	/// use vista_core::{Datum, TypeRef};
	/// use vista_views::{RegistryBuilder, RenderOptions, ViewBuilder};
	///
	/// let mut builder = RegistryBuilder::new();
	/// let person = builder.blueprint("Person");
	/// builder
	///     .attributes(person, |attrs| {
	///         attrs.attribute("name", TypeRef::string());
	///         attrs.attribute("age", TypeRef::integer());
	///     })
	///     .unwrap();
	/// builder.view(person, ViewBuilder::new("default").attribute("name"));
	/// let registry = builder.finalize().unwrap();
	///
	/// let bob = Datum::from(registry.record(person).with("name", "Bob").with("age", 42));
	///
	/// assert_eq!(registry.render(&bob, &RenderOptions::new()).unwrap(), json!({"name": "Bob"}));
	/// assert_eq!(
	///     registry.render(&bob, &RenderOptions::new().field_names(["age"])).unwrap(),
	///     json!({"age": 42})
	/// );
	/// ```
	pub fn render(&self, object: &Datum, options: &RenderOptions) -> Result<Value> {
		let context = options.context.clone().unwrap_or_default();
		let resource = object.as_object().ok_or(ArgumentError::NotAnObject {
			kind: object.kind(),
		})?;
		let schema = resource.schema();

		let view_name = match (&options.view, &options.fields) {
			(Some(name), _) => Some(name.as_str()),
			(None, None) => Some(DEFAULT_VIEW),
			(None, Some(_)) => None,
		};

		if let Some(name) = view_name {
			let view = self
				.view(schema, name)
				.ok_or_else(|| ArgumentError::UnknownView {
					schema: self.table.name_of(schema).to_string(),
					view: name.to_string(),
				})?;
			let mut renderer = self.renderer();
			let rendered = view.render(&mut renderer, object, &context)?;
			return Ok(Arc::unwrap_or_clone(rendered));
		}

		let mask = options.fields.clone().unwrap_or_default();
		let mut expander = self.expander();
		let fields = expander.expand_type(&TypeRef::Struct(schema), &mask)?;
		let arena = expander.into_arena();
		let mut renderer = self.renderer();
		let rendered = renderer.render(object, arena.selection(fields), &context)?;
		Ok(Arc::unwrap_or_clone(rendered))
	}

	/// Mask selecting every attribute that is not a Blueprint or a collection of Blueprints
	pub fn default_fieldset(&self, schema: SchemaId) -> Result<FieldMask> {
		let node = self.table.node(schema)?;
		let names = node
			.attributes()
			.into_iter()
			.flat_map(|attributes| attributes.values())
			.filter(|attribute| {
				!attribute
					.ty()
					.element_schema()
					.is_some_and(|(target, _)| self.is_blueprint(target))
			})
			.map(|attribute| attribute.name().to_string());
		Ok(FieldMask::names(names))
	}

	/// Name, kind, attribute types and view descriptions of a schema
	pub fn describe(&self, schema: SchemaId) -> Result<SchemaDescription> {
		let node = self.table.node(schema)?;
		let attributes = node
			.attributes()
			.into_iter()
			.flat_map(|attributes| attributes.iter())
			.map(|(name, attribute)| (name.clone(), self.table.describe_type(attribute.ty())))
			.collect();
		let views = self
			.views(schema)
			.map(|view| (view.name().to_string(), view.describe()))
			.collect();

		Ok(SchemaDescription {
			name: node.name().to_string(),
			kind: node.kind(),
			anonymous: node.is_anonymous(),
			attributes,
			views,
		})
	}

	/// Precomputed selection of a view or collection view, by address
	pub(crate) fn view_fields(&self, address: usize) -> Option<Selection<'_>> {
		self.view_fields
			.get(&address)
			.map(|id| self.arena.selection(*id))
	}

	/// Selection used when an object is rendered whole: a Blueprint's `default` view (else
	/// its `master`), or every attribute of a Model
	pub(crate) fn dump_selection(&self, schema: SchemaId) -> Selection<'_> {
		let view = self
			.view(schema, DEFAULT_VIEW)
			.or_else(|| self.view(schema, MASTER_VIEW));
		let id = view
			.and_then(|view| self.view_fields.get(&(Arc::as_ptr(view) as usize)))
			.or_else(|| self.schema_fields.get(&schema))
			.copied()
			.unwrap_or(self.empty_fields);
		self.arena.selection(id)
	}

	fn pre_expand(&mut self) -> Result<()> {
		let (mut arena, history) = {
			let mut expander = FieldExpander::new(self).with_policy(CyclePolicy::Link);
			for views in self.views.values() {
				for view in views.values() {
					expander.expand(Expandable::View(view), &FieldMask::All)?;
				}
			}
			for node in self.table.nodes() {
				expander.expand(Expandable::Type(&TypeRef::Struct(node.id())), &FieldMask::All)?;
			}
			expander.into_parts()
		};

		for ((key, mask), id) in history {
			if !mask.is_all() {
				continue;
			}
			match key {
				NodeKey::View(address) | NodeKey::Collection(address) => {
					self.view_fields.insert(address, id);
				}
				NodeKey::Type(TypeRef::Struct(schema)) => {
					self.schema_fields.insert(schema, id);
				}
				NodeKey::Type(_) => {}
			}
		}

		self.empty_fields = arena.push(FieldNode::Fields(IndexMap::new()));
		self.arena = arena;
		Ok(())
	}
}

impl std::fmt::Debug for SchemaRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SchemaRegistry")
			.field("schemas", &self.table.len())
			.field("views", &self.views.values().map(IndexMap::len).sum::<usize>())
			.field("nodes", &self.arena.len())
			.field("settings", &self.settings)
			.finish()
	}
}
