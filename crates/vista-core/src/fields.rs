//! Field masks and selection trees
//!
//! A [`FieldMask`] is what a caller asks for: `true`, a mapping of wanted names, or a
//! one-element sequence for collections. Expansion resolves a mask against a schema into a
//! selection tree stored in a [`FieldArena`]. Tree nodes are addressed by [`FieldId`], so
//! a cyclic branch is simply a handle pointing back at one of its ancestors, and "the same
//! subtree" means "the same handle".

use crate::error::ArgumentError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

static ALL_MASK: FieldMask = FieldMask::All;

/// A requested set of fields
///
/// Keys keep the order they were given in, and a literal mask renders its keys in that
/// order. Equality and hashing ignore it, so two masks naming the same fields share one
/// expansion.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vista_core::FieldMask;
///
/// let mask = FieldMask::from_json(&json!({"name": true, "address": {"state": true}})).unwrap();
/// assert_eq!(mask.sub_mask("name"), &FieldMask::All);
/// assert_eq!(mask.sub_mask("address"), &FieldMask::names(["state"]));
/// assert!(!mask.wants("age"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldMask {
	/// Everything (`true`)
	#[default]
	All,
	/// Only the named fields, each with its own sub-mask
	Fields(IndexMap<String, FieldMask>),
	/// Apply the inner mask to every element of a collection (`[inner]`)
	Each(Box<FieldMask>),
}

impl FieldMask {
	/// Mask from explicit `(name, sub-mask)` pairs
	pub fn fields<I, K>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, FieldMask)>,
		K: Into<String>,
	{
		Self::Fields(
			entries
				.into_iter()
				.map(|(name, mask)| (name.into(), mask))
				.collect(),
		)
	}

	/// Mask selecting each name entirely
	pub fn names<I, S>(names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::fields(names.into_iter().map(|name| (name, Self::All)))
	}

	pub fn each(inner: FieldMask) -> Self {
		Self::Each(Box::new(inner))
	}

	pub fn is_all(&self) -> bool {
		matches!(self, Self::All)
	}

	/// Explicit entry for `name`, if any
	pub fn get(&self, name: &str) -> Option<&FieldMask> {
		match self {
			Self::All => None,
			Self::Fields(fields) => fields.get(name),
			Self::Each(inner) => inner.get(name),
		}
	}

	/// Whether `name` is selected
	pub fn wants(&self, name: &str) -> bool {
		match self {
			Self::All => true,
			Self::Fields(fields) => fields.contains_key(name),
			Self::Each(inner) => inner.wants(name),
		}
	}

	/// Sub-mask for `name`: `All` under `All`, the entry under a mapping, `All` when absent
	pub fn sub_mask(&self, name: &str) -> &FieldMask {
		self.get(name).unwrap_or(&ALL_MASK)
	}

	/// Strip one level of `Each`
	pub fn unwrap_each(&self) -> &FieldMask {
		match self {
			Self::Each(inner) => inner,
			other => other,
		}
	}

	/// Parse the wire form: `true`, an object of sub-masks or a one-element array
	///
	/// `false` entries in an object are dropped.
	pub fn from_json(value: &Value) -> Result<Self, ArgumentError> {
		match value {
			Value::Bool(true) => Ok(Self::All),
			Value::Object(entries) => {
				let mut fields = IndexMap::new();
				for (name, entry) in entries {
					if matches!(entry, Value::Bool(false)) {
						continue;
					}
					fields.insert(name.clone(), Self::from_json(entry)?);
				}
				Ok(Self::Fields(fields))
			}
			Value::Array(items) if items.len() == 1 => Ok(Self::each(Self::from_json(&items[0])?)),
			Value::Array(items) => Err(ArgumentError::InvalidMask {
				message: format!(
					"collection masks wrap exactly one element, got {}",
					items.len()
				),
			}),
			other => Err(ArgumentError::InvalidMask {
				message: format!("unexpected value {other}"),
			}),
		}
	}

	pub fn to_json(&self) -> Value {
		match self {
			Self::All => Value::Bool(true),
			Self::Fields(fields) => Value::Object(
				fields
					.iter()
					.map(|(name, mask)| (name.clone(), mask.to_json()))
					.collect::<Map<_, _>>(),
			),
			Self::Each(inner) => Value::Array(vec![inner.to_json()]),
		}
	}
}

impl Hash for FieldMask {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::mem::discriminant(self).hash(state);
		match self {
			Self::All => {}
			Self::Fields(fields) => {
				let mut entries: Vec<_> = fields.iter().collect();
				entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
				entries.len().hash(state);
				for (name, mask) in entries {
					name.hash(state);
					mask.hash(state);
				}
			}
			Self::Each(inner) => inner.hash(state),
		}
	}
}

impl fmt::Display for FieldMask {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_json())
	}
}

impl Serialize for FieldMask {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		self.to_json().serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for FieldMask {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let value = Value::deserialize(deserializer)?;
		Self::from_json(&value).map_err(serde::de::Error::custom)
	}
}

/// Handle of a node in a [`FieldArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
	/// The shared `All` node present in every arena
	pub const ALL: FieldId = FieldId(0);

	pub fn index(self) -> usize {
		self.0
	}
}

/// A resolved selection-tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldNode {
	All,
	/// Selected fields in output order
	Fields(IndexMap<String, FieldId>),
	Each(FieldId),
}

/// Storage for selection-tree nodes
///
/// Node 0 is always `All`. Nodes are appended and never removed, so a handle stays valid
/// for the arena's lifetime.
#[derive(Debug, Clone)]
pub struct FieldArena {
	nodes: Vec<FieldNode>,
}

impl FieldArena {
	pub fn new() -> Self {
		Self {
			nodes: vec![FieldNode::All],
		}
	}

	/// Allocate a placeholder to be filled by [`set`](Self::set), so descendants can point
	/// back at it before it is complete
	pub fn reserve(&mut self) -> FieldId {
		let id = FieldId(self.nodes.len());
		self.nodes.push(FieldNode::All);
		id
	}

	pub fn set(&mut self, id: FieldId, node: FieldNode) {
		self.nodes[id.0] = node;
	}

	/// Append a node; `All` always resolves to [`FieldId::ALL`]
	pub fn push(&mut self, node: FieldNode) -> FieldId {
		if node == FieldNode::All {
			return FieldId::ALL;
		}
		let id = FieldId(self.nodes.len());
		self.nodes.push(node);
		id
	}

	/// Node behind a handle
	///
	/// # Panics
	///
	/// Panics if `id` was issued by a different arena and is out of range.
	pub fn node(&self, id: FieldId) -> &FieldNode {
		&self.nodes[id.0]
	}

	pub fn get(&self, id: FieldId) -> Option<&FieldNode> {
		self.nodes.get(id.0)
	}

	/// Node count, including the shared `All` node
	#[allow(clippy::len_without_is_empty)]
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Store a caller-provided mask verbatim, without consulting any schema
	pub fn insert_mask(&mut self, mask: &FieldMask) -> FieldId {
		match mask {
			FieldMask::All => FieldId::ALL,
			FieldMask::Fields(fields) => {
				let children = fields
					.iter()
					.map(|(name, sub)| (name.clone(), self.insert_mask(sub)))
					.collect();
				self.push(FieldNode::Fields(children))
			}
			FieldMask::Each(inner) => {
				let inner = self.insert_mask(inner);
				self.push(FieldNode::Each(inner))
			}
		}
	}

	/// Convert an acyclic tree back into a mask; `None` if the tree is cyclic
	pub fn to_mask(&self, id: FieldId) -> Option<FieldMask> {
		let mut visiting = HashSet::new();
		self.to_mask_inner(id, &mut visiting)
	}

	fn to_mask_inner(&self, id: FieldId, visiting: &mut HashSet<FieldId>) -> Option<FieldMask> {
		if !visiting.insert(id) {
			return None;
		}
		let mask = match self.get(id)? {
			FieldNode::All => FieldMask::All,
			FieldNode::Fields(children) => {
				let mut fields = IndexMap::new();
				for (name, child) in children {
					fields.insert(name.clone(), self.to_mask_inner(*child, visiting)?);
				}
				FieldMask::Fields(fields)
			}
			FieldNode::Each(inner) => FieldMask::each(self.to_mask_inner(*inner, visiting)?),
		};
		visiting.remove(&id);
		Some(mask)
	}

	pub fn selection(&self, id: FieldId) -> Selection<'_> {
		Selection { arena: self, id }
	}
}

impl Default for FieldArena {
	fn default() -> Self {
		Self::new()
	}
}

/// A node handle bound to its arena
#[derive(Clone, Copy)]
pub struct Selection<'a> {
	arena: &'a FieldArena,
	id: FieldId,
}

impl<'a> Selection<'a> {
	pub fn node(&self) -> &'a FieldNode {
		self.arena.node(self.id)
	}

	pub fn id(&self) -> FieldId {
		self.id
	}

	pub fn arena(&self) -> &'a FieldArena {
		self.arena
	}

	/// Address of the owning arena, part of every cache key
	pub fn arena_key(&self) -> usize {
		self.arena as *const FieldArena as usize
	}

	pub fn is_all(&self) -> bool {
		matches!(self.node(), FieldNode::All)
	}

	/// Another node of the same arena
	pub fn at(&self, id: FieldId) -> Selection<'a> {
		Selection {
			arena: self.arena,
			id,
		}
	}

	/// Sub-selection for a selected field
	pub fn child(&self, name: &str) -> Option<Selection<'a>> {
		match self.node() {
			FieldNode::Fields(children) => children.get(name).map(|id| self.at(*id)),
			_ => None,
		}
	}

	/// Inner selection of an `Each` node
	pub fn each(&self) -> Option<Selection<'a>> {
		match self.node() {
			FieldNode::Each(inner) => Some(self.at(*inner)),
			_ => None,
		}
	}

	pub fn to_mask(&self) -> Option<FieldMask> {
		self.arena.to_mask(self.id)
	}
}

impl PartialEq for Selection<'_> {
	fn eq(&self, other: &Self) -> bool {
		std::ptr::eq(self.arena, other.arena) && self.id == other.id
	}
}

impl Eq for Selection<'_> {}

impl fmt::Debug for Selection<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Selection")
			.field("id", &self.id)
			.field("node", self.node())
			.finish()
	}
}
