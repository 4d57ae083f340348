//! Rendering
//!
//! A [`Renderer`] walks a live object graph under a selection tree and produces plain
//! JSON data. One renderer is one render session:
//!
//! - Blueprint objects are cached per (object, selection) pair; a repeated render returns
//!   the identical `Arc<Value>` without reading the object again
//! - a depth counter and the set of (object, selection) pairs currently being rendered
//!   turn data cycles into [`CircularRenderingError`] instead of unbounded recursion
//! - reader failures become [`DumpError`]s carrying the dotted path of the attribute

use crate::registry::SchemaRegistry;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use vista_core::{
	ArgumentError, CircularRenderingError, Context, Datum, DumpError, FieldId, FieldNode,
	ReadError, Resource, Result, Selection,
};

/// What an observer is told about each mapping render
#[derive(Debug)]
pub struct RenderEvent<'a> {
	/// Type of the object being rendered
	pub type_name: &'a str,
	/// Selection applied to it
	pub fields: Selection<'a>,
	/// Named view the render was started from, if any
	pub view: Option<&'a str>,
	pub context: &'a Context,
}

/// Instrumentation hook; never affects output
pub trait RenderObserver: Send + Sync {
	fn on_render(&self, event: &RenderEvent<'_>);
}

/// (object identity, arena identity, field id)
type CacheKey = (usize, usize, FieldId);

/// A cached render
///
/// The entry owns the object, so its address cannot be reused while the entry lives.
struct CacheEntry {
	_object: Arc<dyn Resource>,
	rendered: Arc<Value>,
}

/// Render session
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vista_core::{Context, Datum, FieldArena, FieldMask, TypeRef};
/// use vista_views::RegistryBuilder;
///
/// let mut builder = RegistryBuilder::new();
/// let person = builder.blueprint("Person");
/// builder
///     .attributes(person, |attrs| {
///         attrs.attribute("name", TypeRef::string());
///         attrs.attribute("email", TypeRef::string());
///     })
///     .unwrap();
/// let registry = builder.finalize().unwrap();
///
/// let mut arena = FieldArena::new();
/// let fields = arena.insert_mask(&FieldMask::names(["name", "email"]));
/// let bob = Datum::from(registry.record(person).with("name", "Bob").with("email", Datum::Null));
///
/// let mut renderer = registry.renderer();
/// let output = renderer.render(&bob, arena.selection(fields), &Context::root()).unwrap();
/// assert_eq!(*output, json!({"name": "Bob"}));
/// ```
pub struct Renderer<'r> {
	registry: &'r SchemaRegistry,
	include_nil: bool,
	max_depth: usize,
	depth: usize,
	cache: HashMap<CacheKey, CacheEntry>,
	active: HashSet<CacheKey>,
	observer: Option<Arc<dyn RenderObserver>>,
}

impl<'r> Renderer<'r> {
	/// New session using the registry's settings
	pub fn new(registry: &'r SchemaRegistry) -> Self {
		let settings = registry.settings();
		Self {
			registry,
			include_nil: settings.include_nil,
			max_depth: settings.max_depth.max(1),
			depth: 0,
			cache: HashMap::new(),
			active: HashSet::new(),
			observer: None,
		}
	}

	/// Emit `null` for nil attributes instead of omitting them
	pub fn with_include_nil(mut self, include_nil: bool) -> Self {
		self.include_nil = include_nil;
		self
	}

	pub fn with_max_depth(mut self, max_depth: usize) -> Self {
		self.max_depth = max_depth.max(1);
		self
	}

	pub fn with_observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
		self.observer = Some(observer);
		self
	}

	pub fn registry(&self) -> &'r SchemaRegistry {
		self.registry
	}

	pub fn include_nil(&self) -> bool {
		self.include_nil
	}

	/// Number of cached Blueprint renders
	pub fn cached(&self) -> usize {
		self.cache.len()
	}

	/// Render `object` under `fields`
	pub fn render(
		&mut self,
		object: &Datum,
		fields: Selection<'r>,
		context: &Context,
	) -> Result<Arc<Value>> {
		self.render_view(object, fields, None, context)
	}

	/// Render every element of `collection` under `member_fields`
	pub fn render_collection(
		&mut self,
		collection: &Datum,
		member_fields: Selection<'r>,
		context: &Context,
	) -> Result<Arc<Value>> {
		let items = match collection {
			Datum::Null => return Ok(Arc::new(Value::Null)),
			Datum::List(items) => items,
			other => {
				return Err(ArgumentError::NotACollection {
					kind: other.kind(),
					context: context.humanize(),
				}
				.into());
			}
		};
		let mut rendered = Vec::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			let value = self.render(item, member_fields, &context.at(index))?;
			rendered.push(Arc::unwrap_or_clone(value));
		}
		Ok(Arc::new(Value::Array(rendered)))
	}

	/// Render on behalf of a named view; the name is reported to the observer
	pub fn render_view(
		&mut self,
		object: &Datum,
		fields: Selection<'r>,
		view: Option<&str>,
		context: &Context,
	) -> Result<Arc<Value>> {
		self.depth += 1;
		let result = if self.depth > self.max_depth {
			tracing::debug!(
				depth = self.depth,
				context = %context.truncated(),
				"render depth exceeded"
			);
			Err(circular(object, context).into())
		} else {
			self.render_guarded(object, fields, view, context)
		};
		self.depth -= 1;
		result
	}

	fn render_guarded(
		&mut self,
		object: &Datum,
		fields: Selection<'r>,
		view: Option<&str>,
		context: &Context,
	) -> Result<Arc<Value>> {
		let Datum::Object(resource) = object else {
			return self.compute(object, fields, view, context).map(Arc::new);
		};

		let identity = Arc::as_ptr(resource) as *const () as usize;
		let key = (identity, fields.arena_key(), fields.id());
		let cacheable = self.registry.is_blueprint(resource.schema());

		if cacheable {
			if let Some(hit) = self.cache.get(&key) {
				tracing::trace!(type_name = resource.type_name(), "render cache hit");
				return Ok(Arc::clone(&hit.rendered));
			}
		}

		if !self.active.insert(key) {
			tracing::debug!(
				type_name = resource.type_name(),
				context = %context.truncated(),
				"object re-entered while rendering"
			);
			return Err(circular(object, context).into());
		}
		let result = self.compute(object, fields, view, context);
		self.active.remove(&key);

		let rendered = Arc::new(result?);
		if cacheable {
			self.cache.insert(
				key,
				CacheEntry {
					_object: Arc::clone(resource),
					rendered: Arc::clone(&rendered),
				},
			);
		}
		Ok(rendered)
	}

	fn compute(
		&mut self,
		object: &Datum,
		fields: Selection<'r>,
		view: Option<&str>,
		context: &Context,
	) -> Result<Value> {
		match fields.node() {
			FieldNode::All => self.dump(object, context),
			FieldNode::Each(inner) => {
				let inner = fields.at(*inner);
				match object {
					Datum::Null | Datum::Json(Value::Null) => Ok(Value::Null),
					Datum::List(items) => self.render_items(items, inner, view, context),
					Datum::Json(Value::Array(items)) => {
						let items: Vec<Datum> = items.iter().cloned().map(Datum::Json).collect();
						self.render_items(&items, inner, view, context)
					}
					other => Err(ArgumentError::NotACollection {
						kind: other.kind(),
						context: context.humanize(),
					}
					.into()),
				}
			}
			FieldNode::Fields(_) => match object {
				// A mapping applied to a list selects the same fields on each element
				Datum::List(items) => self.render_items(items, fields, view, context),
				_ => self.render_fields(object, fields, view, context),
			},
		}
	}

	fn render_items(
		&mut self,
		items: &[Datum],
		fields: Selection<'r>,
		view: Option<&str>,
		context: &Context,
	) -> Result<Value> {
		let mut rendered = Vec::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			let value = self.render_view(item, fields, view, &context.at(index))?;
			rendered.push(Arc::unwrap_or_clone(value));
		}
		Ok(Value::Array(rendered))
	}

	fn render_fields(
		&mut self,
		object: &Datum,
		fields: Selection<'r>,
		view: Option<&str>,
		context: &Context,
	) -> Result<Value> {
		let FieldNode::Fields(children) = fields.node() else {
			return self.compute(object, fields, view, context);
		};

		let type_name = object.type_name();
		let span = tracing::debug_span!(
			"vista.render",
			type_name = %type_name,
			fields = children.len(),
			view = view.unwrap_or_default()
		);
		let _enter = span.enter();

		if let Some(observer) = &self.observer {
			observer.on_render(&RenderEvent {
				type_name: &type_name,
				fields,
				view,
				context,
			});
		}

		let mut output = Map::new();
		for (key, child) in children {
			let value = self.read(object, key, &type_name, context)?;

			if value.is_null() {
				if self.include_nil {
					output.insert(key.clone(), Value::Null);
				}
				continue;
			}

			let child = fields.at(*child);
			let sub_context = context.child(key.as_str());
			let rendered = if child.is_all() {
				self.dump(&value, &sub_context)?
			} else {
				Arc::unwrap_or_clone(self.render_view(&value, child, None, &sub_context)?)
			};
			output.insert(key.clone(), rendered);
		}
		Ok(Value::Object(output))
	}

	fn read(&self, object: &Datum, key: &str, type_name: &str, context: &Context) -> Result<Datum> {
		let read = match object {
			Datum::Object(resource) => resource.read(key),
			Datum::Json(Value::Object(map)) => {
				Ok(map.get(key).cloned().map(Datum::Json).unwrap_or_default())
			}
			other => Err(ReadError::NotReadable { kind: other.kind() }),
		};
		read.map_err(|cause| {
			DumpError {
				context: context.clone(),
				name: key.to_string(),
				type_name: type_name.to_string(),
				cause,
			}
			.into()
		})
	}

	/// Whole-value output: dumpables serialize themselves, objects render through their
	/// schema's dump selection, lists dump element-wise, scalars pass through
	fn dump(&mut self, value: &Datum, context: &Context) -> Result<Value> {
		match value {
			Datum::Object(resource) => {
				let fields = self.registry.dump_selection(resource.schema());
				Ok(Arc::unwrap_or_clone(self.render_view(value, fields, None, context)?))
			}
			Datum::List(items) => {
				let mut dumped = Vec::with_capacity(items.len());
				for (index, item) in items.iter().enumerate() {
					dumped.push(self.dump(item, &context.at(index))?);
				}
				Ok(Value::Array(dumped))
			}
			Datum::Dumpable(dumpable) => Ok(dumpable.dump()),
			other => Ok(other.to_plain().unwrap_or(Value::Null)),
		}
	}
}

fn circular(object: &Datum, context: &Context) -> CircularRenderingError {
	CircularRenderingError {
		object: object.clone(),
		type_name: object.type_name(),
		context: context.clone(),
	}
}

impl std::fmt::Debug for Renderer<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Renderer")
			.field("include_nil", &self.include_nil)
			.field("max_depth", &self.max_depth)
			.field("depth", &self.depth)
			.field("cached", &self.cache.len())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::registry::RegistryBuilder;
	use rstest::{fixture, rstest};
	use serde_json::json;
	use vista_core::{Dumpable, Error, FieldArena, FieldMask, SchemaId, TypeRef};

	struct Setup {
		registry: SchemaRegistry,
		person: SchemaId,
	}

	#[fixture]
	fn setup() -> Setup {
		let mut builder = RegistryBuilder::new();
		let person = builder.blueprint("Person");
		builder
			.attributes(person, |attrs| {
				attrs.attribute("name", TypeRef::string());
				attrs.attribute("email", TypeRef::string());
				attrs.attribute("friend", TypeRef::structure(person));
				attrs.attribute("metadata", TypeRef::hash());
			})
			.unwrap();
		Setup {
			registry: builder.finalize().unwrap(),
			person,
		}
	}

	#[derive(Debug)]
	struct Upper(&'static str);

	impl Dumpable for Upper {
		fn dump(&self) -> Value {
			json!(self.0.to_uppercase())
		}
	}

	#[rstest]
	#[case(Datum::from("plain"), json!("plain"))]
	#[case(Datum::from(7), json!(7))]
	#[case(Datum::dumpable(Upper("loud")), json!("LOUD"))]
	#[case(Datum::from(json!({"free": ["form"]})), json!({"free": ["form"]}))]
	fn test_all_on_leaf_returns_value(
		setup: Setup,
		#[case] value: Datum,
		#[case] expected: Value,
	) {
		// Arrange
		let arena = FieldArena::new();
		let mut renderer = setup.registry.renderer();

		// Act
		let output = renderer
			.render(&value, arena.selection(FieldId::ALL), &Context::root())
			.unwrap();

		// Assert
		assert_eq!(*output, expected);
	}

	#[rstest]
	fn test_fields_on_scalar_is_a_dump_error(setup: Setup) {
		let mut arena = FieldArena::new();
		let fields = arena.insert_mask(&FieldMask::names(["name"]));
		let mut renderer = setup.registry.renderer();

		let err = renderer
			.render(&Datum::from(3), arena.selection(fields), &Context::root())
			.unwrap_err();

		assert!(matches!(err, Error::Dump(DumpError { ref name, .. }) if name == "name"));
	}

	#[rstest]
	fn test_each_on_single_object_is_rejected(setup: Setup) {
		let mut arena = FieldArena::new();
		let fields = arena.insert_mask(&FieldMask::each(FieldMask::All));
		let bob = Datum::from(setup.registry.record(setup.person));
		let mut renderer = setup.registry.renderer();

		let err = renderer
			.render(&bob, arena.selection(fields), &Context::root())
			.unwrap_err();

		assert!(matches!(
			err,
			Error::Argument(ArgumentError::NotACollection { .. })
		));
	}

	#[rstest]
	fn test_hash_values_select_keys(setup: Setup) {
		let mut arena = FieldArena::new();
		let fields = arena.insert_mask(&FieldMask::fields([(
			"metadata",
			FieldMask::names(["kept", "missing"]),
		)]));
		let bob = Datum::from(
			setup
				.registry
				.record(setup.person)
				.with("metadata", json!({"kept": 1, "dropped": 2})),
		);
		let mut renderer = setup.registry.renderer();

		let output = renderer
			.render(&bob, arena.selection(fields), &Context::root())
			.unwrap();

		assert_eq!(*output, json!({"metadata": {"kept": 1}}));
	}

	#[rstest]
	fn test_depth_budget_trips_on_deep_data(setup: Setup) {
		// Arrange
		let mut arena = FieldArena::new();
		let fields = arena.insert_mask(&FieldMask::fields([(
			"friend",
			FieldMask::fields([("friend", FieldMask::names(["name"]))]),
		)]));
		let third = setup.registry.record(setup.person).with("name", "C");
		let second = setup.registry.record(setup.person).with("friend", third);
		let first = Datum::from(setup.registry.record(setup.person).with("friend", second));
		let mut renderer = setup.registry.renderer().with_max_depth(2);

		// Act
		let err = renderer
			.render(&first, arena.selection(fields), &Context::root())
			.unwrap_err();

		// Assert
		let Error::CircularRendering(err) = err else {
			panic!("expected a circular rendering error");
		};
		assert_eq!(err.context.humanize(), "$.friend.friend");
		assert_eq!(err.type_name, "Person");
	}

	#[rstest]
	fn test_observer_sees_mapping_renders(setup: Setup) {
		use std::sync::Mutex;

		#[derive(Default)]
		struct Collect(Mutex<Vec<(String, Option<String>)>>);

		impl RenderObserver for Collect {
			fn on_render(&self, event: &RenderEvent<'_>) {
				self.0.lock().unwrap().push((
					event.context.humanize(),
					event.view.map(str::to_string),
				));
			}
		}

		let observer = Arc::new(Collect::default());
		let view = setup.registry.view(setup.person, "master").unwrap();
		let friend = setup.registry.record(setup.person).with("name", "Alice");
		let bob = Datum::from(
			setup
				.registry
				.record(setup.person)
				.with("name", "Bob")
				.with("friend", friend),
		);
		let mut renderer = setup.registry.renderer().with_observer(observer.clone());

		view.render(&mut renderer, &bob, &Context::root()).unwrap();

		let events = observer.0.lock().unwrap();
		assert_eq!(
			*events,
			[
				("$".to_string(), Some("master".to_string())),
				("$.friend".to_string(), None),
			]
		);
	}
}
