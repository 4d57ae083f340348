//! Collection views
//!
//! A collection view applies a member view to every element of a sequence-typed attribute.

use crate::describe::{ViewDescription, ViewType};
use crate::dumper::ViewDumper;
use crate::registry::SchemaRegistry;
use crate::view::{View, ViewEntry};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use vista_core::{Context, Datum, DefinitionError, Result, SchemaId};

/// Where a collection view gets its contents from
#[derive(Debug)]
pub enum CollectionMember {
	/// Shares the contents of a named view of the element schema, resolved through the
	/// registry on use
	Reference { view: String },
	/// Owns an inline view built from a nested declaration
	Inline(Arc<View>),
}

/// A view applied element-wise
#[derive(Debug)]
pub struct CollectionView {
	name: String,
	schema: SchemaId,
	schema_name: String,
	member: CollectionMember,
}

impl CollectionView {
	pub(crate) fn new(
		name: impl Into<String>,
		schema: SchemaId,
		schema_name: impl Into<String>,
		member: CollectionMember,
	) -> Self {
		Self {
			name: name.into(),
			schema,
			schema_name: schema_name.into(),
			member,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Element schema
	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	pub fn schema_name(&self) -> &str {
		&self.schema_name
	}

	pub fn member(&self) -> &CollectionMember {
		&self.member
	}

	/// The view applied to each element
	pub fn member_view<'a>(&'a self, registry: &'a SchemaRegistry) -> Result<&'a View> {
		match &self.member {
			CollectionMember::Inline(view) => Ok(view.as_ref()),
			CollectionMember::Reference { view } => registry
				.view(self.schema, view)
				.map(Arc::as_ref)
				.ok_or_else(|| {
					DefinitionError::UnknownView {
						schema: self.schema_name.clone(),
						view: view.clone(),
					}
					.into()
				}),
		}
	}

	/// Contents shared with the member view
	pub fn contents<'a>(
		&'a self,
		registry: &'a SchemaRegistry,
	) -> Result<&'a IndexMap<String, ViewEntry>> {
		Ok(self.member_view(registry)?.contents())
	}

	/// Dump every element with the member view, in order, each under `at(i)`
	pub fn dump(
		&self,
		registry: &SchemaRegistry,
		collection: &Datum,
		context: &Context,
	) -> Result<Value> {
		ViewDumper::new(registry).dump_collection(self, collection, context)
	}

	/// The member view's description tagged as a collection
	pub fn describe(&self, registry: &SchemaRegistry) -> Result<ViewDescription> {
		let mut description = self.member_view(registry)?.describe();
		description.kind = ViewType::Collection;
		Ok(description)
	}
}
