//! View-driven dump
//!
//! Walks a view's own contents instead of an expanded selection tree. Unlike the
//! [`Renderer`](crate::Renderer) there is no cache: every call reads the object again.
//! Nil handling follows the view's [`ViewOptions`](crate::ViewOptions).

use crate::collection_view::CollectionView;
use crate::registry::SchemaRegistry;
use crate::view::{self, DEFAULT_VIEW, MASTER_VIEW, View, ViewEntry};
use serde_json::{Map, Value};
use vista_core::{
	ArgumentError, AttributeOptions, CircularRenderingError, Context, Datum, DefinitionError,
	DumpError, ReadError, Resource, Result, SchemaId, TypeRef,
};

/// One dump session over a registry
pub struct ViewDumper<'r> {
	registry: &'r SchemaRegistry,
	depth: usize,
	max_depth: usize,
}

impl<'r> ViewDumper<'r> {
	pub fn new(registry: &'r SchemaRegistry) -> Self {
		Self {
			registry,
			depth: 0,
			max_depth: registry.settings().max_depth.max(1),
		}
	}

	/// Dump `object` with the entries of `view`
	pub fn dump_view(&mut self, view: &View, object: &Datum, context: &Context) -> Result<Value> {
		if object.is_null() {
			return Ok(Value::Null);
		}
		self.guarded(object, context, |dumper| {
			dumper.dump_contents(view, object, context)
		})
	}

	/// Dump every element of `collection` with the collection view's member view
	pub fn dump_collection(
		&mut self,
		collection_view: &CollectionView,
		collection: &Datum,
		context: &Context,
	) -> Result<Value> {
		let items = match collection {
			Datum::Null | Datum::Json(Value::Null) => return Ok(Value::Null),
			Datum::List(items) => items,
			other => {
				return Err(ArgumentError::NotACollection {
					kind: other.kind(),
					context: context.humanize(),
				}
				.into());
			}
		};
		let member = collection_view.member_view(self.registry)?;
		let mut dumped = Vec::with_capacity(items.len());
		for (index, item) in items.iter().enumerate() {
			dumped.push(self.dump_view(member, item, &context.at(index))?);
		}
		Ok(Value::Array(dumped))
	}

	/// Dump a value through its declared type
	///
	/// Blueprints go through `options.view` (default `default`), structures dump every
	/// attribute, collections dump element-wise and leaves pass through.
	pub fn dump_typed(
		&mut self,
		ty: &TypeRef,
		options: &AttributeOptions,
		value: &Datum,
		context: &Context,
	) -> Result<Value> {
		if value.is_null() {
			return Ok(Value::Null);
		}
		let table = self.registry.table();
		if !view::is_structured(table, ty) {
			return self.dump_untyped(value, context);
		}

		match ty {
			TypeRef::Collection(member) => {
				let Some(items) = value.as_list() else {
					return Err(ArgumentError::NotACollection {
						kind: value.kind(),
						context: context.humanize(),
					}
					.into());
				};
				let mut dumped = Vec::with_capacity(items.len());
				for (index, item) in items.iter().enumerate() {
					dumped.push(self.dump_typed(member, options, item, &context.at(index))?);
				}
				Ok(Value::Array(dumped))
			}
			TypeRef::Struct(schema) if self.registry.is_blueprint(*schema) => {
				let view = self.blueprint_view(*schema, options.view.as_deref())?;
				self.dump_view(view, value, context)
			}
			TypeRef::Struct(schema) => self.dump_structure(*schema, value, context),
			TypeRef::Leaf(_) => self.dump_untyped(value, context),
		}
	}

	fn dump_contents(&mut self, view: &View, object: &Datum, context: &Context) -> Result<Value> {
		let resource = match object {
			Datum::Object(resource) => Some(resource),
			Datum::Json(Value::Object(_)) => None,
			other => return Err(ArgumentError::NotAnObject { kind: other.kind() }.into()),
		};
		let options = view.options();
		let type_name = object.type_name();

		let mut output = Map::new();
		for (name, entry) in view.contents() {
			if resource.is_some_and(|resource| !resource.responds_to(name)) {
				continue;
			}
			let value = read(object, name, &type_name, context)?;

			if value.is_null() {
				let has_key = match object {
					Datum::Object(resource) => resource.has_key(name),
					Datum::Json(Value::Object(map)) => map.contains_key(name),
					_ => false,
				};
				if options.include_unset || (options.include_nil && has_key) {
					output.insert(name.clone(), Value::Null);
				}
				continue;
			}

			let sub_context = context.child(name.as_str());
			let dumped = match entry {
				ViewEntry::Attribute { attribute, options } => {
					self.dump_typed(attribute.ty(), options, &value, &sub_context)?
				}
				ViewEntry::View(inline) => self.dump_view(inline, &value, &sub_context)?,
				ViewEntry::Collection(collection) => {
					self.dump_collection(collection, &value, &sub_context)?
				}
				ViewEntry::Reference { schema, view, .. } => {
					let target = self.blueprint_view(*schema, Some(view))?;
					self.dump_view(target, &value, &sub_context)?
				}
			};
			output.insert(name.clone(), dumped);
		}
		Ok(Value::Object(output))
	}

	/// Every non-nil attribute of a structure, through the attribute's type
	fn dump_structure(&mut self, schema: SchemaId, value: &Datum, context: &Context) -> Result<Value> {
		match value {
			Datum::Object(_) => {}
			Datum::Json(json) => return Ok(json.clone()),
			other => return Err(ArgumentError::NotAnObject { kind: other.kind() }.into()),
		}
		let registry = self.registry;
		let Some(attributes) = registry.node(schema)?.attributes() else {
			return Ok(Value::Object(Map::new()));
		};

		self.guarded(value, context, |dumper| {
			let type_name = value.type_name();
			let mut output = Map::new();
			for (name, attribute) in attributes {
				let read = read(value, name, &type_name, context)?;
				if read.is_null() {
					continue;
				}
				let dumped = dumper.dump_typed(
					attribute.ty(),
					&AttributeOptions::default(),
					&read,
					&context.child(name.as_str()),
				)?;
				output.insert(name.clone(), dumped);
			}
			Ok(Value::Object(output))
		})
	}

	/// Values whose declared type says nothing about their shape
	fn dump_untyped(&mut self, value: &Datum, context: &Context) -> Result<Value> {
		match value {
			Datum::Object(resource) => {
				let schema = resource.schema();
				if self.registry.is_blueprint(schema) {
					let view = self.blueprint_view(schema, None)?;
					self.dump_view(view, value, context)
				} else {
					self.dump_structure(schema, value, context)
				}
			}
			Datum::List(items) => {
				let mut dumped = Vec::with_capacity(items.len());
				for (index, item) in items.iter().enumerate() {
					dumped.push(self.dump_untyped(item, &context.at(index))?);
				}
				Ok(Value::Array(dumped))
			}
			other => Ok(other.to_plain().unwrap_or(Value::Null)),
		}
	}

	/// A named view of a Blueprint; without a name, `default` falling back to `master`
	fn blueprint_view(&self, schema: SchemaId, name: Option<&str>) -> Result<&'r View> {
		let registry = self.registry;
		let view = match name {
			Some(name) => registry.view(schema, name),
			None => registry
				.view(schema, DEFAULT_VIEW)
				.or_else(|| registry.view(schema, MASTER_VIEW)),
		};
		view.map(|view| view.as_ref()).ok_or_else(|| {
			DefinitionError::UnknownView {
				schema: registry.table().name_of(schema).to_string(),
				view: name.unwrap_or(DEFAULT_VIEW).to_string(),
			}
			.into()
		})
	}

	fn guarded<F>(&mut self, object: &Datum, context: &Context, dump: F) -> Result<Value>
	where
		F: FnOnce(&mut Self) -> Result<Value>,
	{
		self.depth += 1;
		let result = if self.depth > self.max_depth {
			tracing::debug!(
				depth = self.depth,
				context = %context.truncated(),
				"dump depth exceeded"
			);
			Err(CircularRenderingError {
				object: object.clone(),
				type_name: object.type_name(),
				context: context.clone(),
			}
			.into())
		} else {
			dump(self)
		};
		self.depth -= 1;
		result
	}
}

fn read(object: &Datum, name: &str, type_name: &str, context: &Context) -> Result<Datum> {
	let read = match object {
		Datum::Object(resource) => resource.read(name),
		Datum::Json(Value::Object(map)) => {
			Ok(map.get(name).cloned().map(Datum::Json).unwrap_or_default())
		}
		other => Err(ReadError::NotReadable { kind: other.kind() }),
	};
	read.map_err(|cause| {
		DumpError {
			context: context.clone(),
			name: name.to_string(),
			type_name: type_name.to_string(),
			cause,
		}
		.into()
	})
}

impl std::fmt::Debug for ViewDumper<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ViewDumper")
			.field("depth", &self.depth)
			.field("max_depth", &self.max_depth)
			.finish_non_exhaustive()
	}
}
