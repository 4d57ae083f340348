//! Field expansion
//!
//! Resolves a requested [`FieldMask`] against a view, a collection view, a bare type or an
//! attribute into a canonical selection tree. Results are memoized per (node, mask) pair,
//! so identical requests return the identical [`FieldId`]. Reaching a pair that is still
//! being expanded means the schema graph is cyclic; depending on the [`CyclePolicy`] the
//! branch either links back to the ancestor's handle or fails.

use crate::collection_view::{CollectionMember, CollectionView};
use crate::registry::SchemaRegistry;
use crate::view::{View, ViewEntry};
use indexmap::IndexMap;
use std::collections::HashMap;
use vista_conf::CyclePolicy;
use vista_core::{
	Attribute, CircularExpansionError, DefinitionError, FieldArena, FieldId, FieldMask, FieldNode,
	Result, SchemaId, Selection, TypeRef,
};

/// Anything the expander can start from
#[derive(Debug, Clone, Copy)]
pub enum Expandable<'a> {
	View(&'a View),
	Collection(&'a CollectionView),
	Type(&'a TypeRef),
	/// Unwrapped to its type
	Attribute(&'a Attribute),
}

/// Memo key of an expandable node
///
/// Views are keyed by address: they live behind `Arc` inside the registry for its whole
/// lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum NodeKey {
	View(usize),
	Collection(usize),
	Type(TypeRef),
}

type HistoryKey = (NodeKey, FieldMask);

/// Expansion session: owns the arena and the memo tables
///
/// # Examples
///
/// ```
/// use vista_core::{FieldMask, TypeRef};
/// use vista_views::{Expandable, FieldExpander, RegistryBuilder};
///
/// let mut builder = RegistryBuilder::new();
/// let full_name = builder.model("FullName");
/// builder
///     .attributes(full_name, |attrs| {
///         attrs.attribute("first", TypeRef::string());
///         attrs.attribute("last", TypeRef::string());
///     })
///     .unwrap();
/// let registry = builder.finalize().unwrap();
///
/// let mut expander = FieldExpander::new(&registry);
/// let ty = TypeRef::structure(full_name);
/// let first = expander.expand(Expandable::Type(&ty), &FieldMask::All).unwrap();
/// let second = expander.expand(Expandable::Type(&ty), &FieldMask::All).unwrap();
///
/// assert_eq!(first, second);
/// assert_eq!(
///     expander.selection(first).to_mask(),
///     Some(FieldMask::names(["first", "last"]))
/// );
/// ```
pub struct FieldExpander<'r> {
	registry: &'r SchemaRegistry,
	arena: FieldArena,
	history: HashMap<HistoryKey, FieldId>,
	stack: IndexMap<HistoryKey, String>,
	policy: CyclePolicy,
}

impl<'r> FieldExpander<'r> {
	/// New session using the registry's configured cycle policy
	pub fn new(registry: &'r SchemaRegistry) -> Self {
		Self {
			registry,
			arena: FieldArena::new(),
			history: HashMap::new(),
			stack: IndexMap::new(),
			policy: registry.settings().expansion_cycles,
		}
	}

	pub fn with_policy(mut self, policy: CyclePolicy) -> Self {
		self.policy = policy;
		self
	}

	pub fn policy(&self) -> CyclePolicy {
		self.policy
	}

	pub fn arena(&self) -> &FieldArena {
		&self.arena
	}

	/// Number of memoized (node, mask) pairs
	pub fn memoized(&self) -> usize {
		self.history.len()
	}

	pub fn into_arena(self) -> FieldArena {
		self.arena
	}

	pub(crate) fn into_parts(self) -> (FieldArena, HashMap<HistoryKey, FieldId>) {
		(self.arena, self.history)
	}

	pub fn selection(&self, id: FieldId) -> Selection<'_> {
		self.arena.selection(id)
	}

	pub fn expand_view(&mut self, view: &View, mask: &FieldMask) -> Result<FieldId> {
		self.expand(Expandable::View(view), mask)
	}

	pub fn expand_type(&mut self, ty: &TypeRef, mask: &FieldMask) -> Result<FieldId> {
		self.expand(Expandable::Type(ty), mask)
	}

	/// Store `mask` verbatim, without consulting any schema
	pub fn expand_mask_literal(&mut self, mask: &FieldMask) -> FieldId {
		self.arena.insert_mask(mask)
	}

	/// Expand `node` under `mask`
	pub fn expand(&mut self, node: Expandable<'_>, mask: &FieldMask) -> Result<FieldId> {
		let node = match node {
			Expandable::Attribute(attribute) => Expandable::Type(attribute.ty()),
			other => other,
		};

		if let Expandable::Type(ty) = node {
			if self.is_terminal(ty) {
				return Ok(FieldId::ALL);
			}
		}

		let key = (key_of(node), mask.clone());

		if self.stack.contains_key(&key) {
			return match (self.policy, self.history.get(&key)) {
				(CyclePolicy::Link, Some(id)) => {
					tracing::trace!(node = %self.label(node), %mask, "closing expansion cycle");
					Ok(*id)
				}
				_ => Err(self.circular(&key, node, mask).into()),
			};
		}

		if let Some(id) = self.history.get(&key) {
			return Ok(*id);
		}

		let label = format!("{}: {}", self.label(node), mask);
		let watermark = self.arena.len();
		self.stack.insert(key.clone(), label);
		let result = self.expand_node(node, &key, mask);
		self.stack.shift_remove(&key);

		if result.is_err() {
			// Nodes reserved by this call may still be unfilled placeholders
			self.history.retain(|_, id| id.index() < watermark);
		}
		result
	}

	fn expand_node(
		&mut self,
		node: Expandable<'_>,
		key: &HistoryKey,
		mask: &FieldMask,
	) -> Result<FieldId> {
		match node {
			Expandable::View(view) => {
				let id = self.reserve(key);
				let children = self.expand_contents(view, mask.unwrap_each())?;
				self.arena.set(id, FieldNode::Fields(children));
				Ok(id)
			}
			Expandable::Collection(collection) => {
				let id = self.reserve(key);
				let member = self.member_view(collection)?;
				let inner = self.expand(Expandable::View(member), mask.unwrap_each())?;
				self.arena.set(id, FieldNode::Each(inner));
				Ok(id)
			}
			Expandable::Type(ty) => match ty {
				TypeRef::Collection(member) => {
					let id = self.reserve(key);
					let inner = self.expand(Expandable::Type(&**member), mask.unwrap_each())?;
					self.arena.set(id, FieldNode::Each(inner));
					Ok(id)
				}
				TypeRef::Struct(_) => {
					let registry = self.registry;
					let Some(attributes) = registry.table().attributes(ty) else {
						return Ok(FieldId::ALL);
					};
					let id = self.reserve(key);
					let mask = mask.unwrap_each();
					let mut children = IndexMap::new();
					for (name, attribute) in attributes {
						if !mask.wants(name) {
							continue;
						}
						let child =
							self.expand(Expandable::Type(attribute.ty()), mask.sub_mask(name))?;
						children.insert(name.clone(), child);
					}
					self.arena.set(id, FieldNode::Fields(children));
					Ok(id)
				}
				TypeRef::Leaf(_) => Ok(FieldId::ALL),
			},
			Expandable::Attribute(attribute) => self.expand(Expandable::Type(attribute.ty()), mask),
		}
	}

	/// Reserve the node for `key` so descendants reaching the same pair link back to it
	fn reserve(&mut self, key: &HistoryKey) -> FieldId {
		let id = self.arena.reserve();
		self.history.insert(key.clone(), id);
		id
	}

	fn expand_contents(
		&mut self,
		view: &View,
		mask: &FieldMask,
	) -> Result<IndexMap<String, FieldId>> {
		let mut children = IndexMap::new();
		for (name, entry) in view.contents() {
			if !mask.wants(name) {
				continue;
			}
			let sub_mask = mask.sub_mask(name);
			let child = match entry {
				ViewEntry::Attribute { attribute, .. } => {
					self.expand(Expandable::Attribute(attribute), sub_mask)?
				}
				ViewEntry::View(inline) => self.expand(Expandable::View(inline), sub_mask)?,
				ViewEntry::Collection(collection) => {
					self.expand(Expandable::Collection(collection), sub_mask)?
				}
				ViewEntry::Reference { schema, view, .. } => {
					let target = self.resolve(*schema, view)?;
					self.expand(Expandable::View(target), sub_mask)?
				}
			};
			children.insert(name.clone(), child);
		}
		Ok(children)
	}

	fn member_view<'c>(&self, collection: &'c CollectionView) -> Result<&'c View>
	where
		'r: 'c,
	{
		match collection.member() {
			CollectionMember::Inline(view) => Ok(view.as_ref()),
			CollectionMember::Reference { view } => self.resolve(collection.schema(), view),
		}
	}

	fn resolve(&self, schema: SchemaId, name: &str) -> Result<&'r View> {
		let registry = self.registry;
		registry
			.view(schema, name)
			.map(|view| view.as_ref())
			.ok_or_else(|| {
				DefinitionError::UnknownView {
					schema: registry.table().name_of(schema).to_string(),
					view: name.to_string(),
				}
				.into()
			})
	}

	/// Leaves and structures without attributes resolve to `All` whatever the mask
	fn is_terminal(&self, ty: &TypeRef) -> bool {
		match ty {
			TypeRef::Leaf(_) => true,
			TypeRef::Struct(_) => self
				.registry
				.table()
				.attributes(ty)
				.is_none_or(|attributes| attributes.is_empty()),
			TypeRef::Collection(_) => false,
		}
	}

	fn label(&self, node: Expandable<'_>) -> String {
		let table = self.registry.table();
		match node {
			Expandable::View(view) => format!("{}#{}", view.schema_name(), view.name()),
			Expandable::Collection(collection) => {
				format!("{}#{}[]", collection.schema_name(), collection.name())
			}
			Expandable::Type(ty) => table.describe_type(ty),
			Expandable::Attribute(attribute) => table.describe_type(attribute.ty()),
		}
	}

	fn circular(
		&self,
		key: &HistoryKey,
		node: Expandable<'_>,
		mask: &FieldMask,
	) -> CircularExpansionError {
		let start = self.stack.get_index_of(key).unwrap_or(0);
		let mut chain: Vec<String> = self.stack.values().skip(start).cloned().collect();
		chain.push(format!("{}: {}", self.label(node), mask));
		tracing::debug!(chain = %chain.join(" -> "), "circular expansion rejected");
		CircularExpansionError { chain }
	}
}

fn key_of(node: Expandable<'_>) -> NodeKey {
	match node {
		Expandable::View(view) => NodeKey::View(view as *const View as usize),
		Expandable::Collection(collection) => {
			NodeKey::Collection(collection as *const CollectionView as usize)
		}
		Expandable::Type(ty) => NodeKey::Type(ty.clone()),
		Expandable::Attribute(attribute) => NodeKey::Type(attribute.ty().clone()),
	}
}

impl std::fmt::Debug for FieldExpander<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("FieldExpander")
			.field("policy", &self.policy)
			.field("nodes", &self.arena.len())
			.field("memoized", &self.history.len())
			.finish()
	}
}
