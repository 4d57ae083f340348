//! Live-object data model
//!
//! Rendering reads attributes by name from whatever object it is handed. Objects opt in by
//! implementing [`Resource`]; the renderer never reflects on concrete types. Two ready-made
//! implementations are provided:
//!
//! - [`Record`]: a map-backed object whose slots can be mutated after construction, so
//!   cyclic object graphs can be assembled
//! - [`Accessors`] + [`Wrapped`]: a per-schema table of typed accessor closures applied to
//!   an arbitrary Rust value

use crate::error::ReadError;
use crate::schema::SchemaId;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A leaf value that knows how to serialize itself
pub trait Dumpable: fmt::Debug + Send + Sync {
	fn dump(&self) -> Value;
}

/// An attribute-bearing object
///
/// Implementations must be cheap to read repeatedly; the renderer caches rendered output
/// but not individual reads.
pub trait Resource: fmt::Debug + Send + Sync {
	/// Schema node describing this object
	fn schema(&self) -> SchemaId;

	/// Type name used in error messages
	fn type_name(&self) -> &str;

	/// Read an attribute by name
	fn read(&self, name: &str) -> Result<Datum, ReadError>;

	/// Whether the object has a reader for `name` at all
	fn responds_to(&self, name: &str) -> bool;

	/// Whether `name` is explicitly present, as opposed to merely readable
	fn has_key(&self, name: &str) -> bool {
		self.responds_to(name)
	}
}

/// A value flowing through the renderer
#[derive(Clone, Default)]
pub enum Datum {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	/// Untyped plain data, passed through as is
	Json(Value),
	List(Vec<Datum>),
	Object(Arc<dyn Resource>),
	Dumpable(Arc<dyn Dumpable>),
}

impl Datum {
	/// Wrap any resource
	pub fn object<R: Resource + 'static>(resource: R) -> Self {
		Self::Object(Arc::new(resource))
	}

	/// Wrap any self-serializing value
	pub fn dumpable<D: Dumpable + 'static>(value: D) -> Self {
		Self::Dumpable(Arc::new(value))
	}

	/// `Null` and JSON `null` are both nil
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null | Self::Json(Value::Null))
	}

	pub fn as_object(&self) -> Option<&Arc<dyn Resource>> {
		match self {
			Self::Object(object) => Some(object),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Datum]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	/// Identity of shared values, used as a cache key
	pub fn identity(&self) -> Option<usize> {
		match self {
			Self::Object(object) => Some(Arc::as_ptr(object) as *const () as usize),
			Self::Dumpable(value) => Some(Arc::as_ptr(value) as *const () as usize),
			_ => None,
		}
	}

	/// Plain data for values that need no rendering
	///
	/// Objects (and lists containing objects) return `None`.
	pub fn to_plain(&self) -> Option<Value> {
		match self {
			Self::Null => Some(Value::Null),
			Self::Bool(value) => Some(Value::Bool(*value)),
			Self::Int(value) => Some(Value::from(*value)),
			Self::Float(value) => Some(
				serde_json::Number::from_f64(*value)
					.map(Value::Number)
					.unwrap_or(Value::Null),
			),
			Self::String(value) => Some(Value::String(value.clone())),
			Self::Json(value) => Some(value.clone()),
			Self::Dumpable(value) => Some(value.dump()),
			Self::List(items) => items
				.iter()
				.map(Datum::to_plain)
				.collect::<Option<Vec<_>>>()
				.map(Value::Array),
			Self::Object(_) => None,
		}
	}

	/// Short kind name for diagnostics
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Null => "null",
			Self::Bool(_) => "bool",
			Self::Int(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
			Self::Json(_) => "json",
			Self::List(_) => "list",
			Self::Object(_) => "object",
			Self::Dumpable(_) => "dumpable",
		}
	}

	/// Type name of an object, or the kind of any other value
	pub fn type_name(&self) -> String {
		match self {
			Self::Object(object) => object.type_name().to_string(),
			other => other.kind().to_string(),
		}
	}
}

impl fmt::Debug for Datum {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Null => f.write_str("Null"),
			Self::Bool(value) => write!(f, "Bool({value})"),
			Self::Int(value) => write!(f, "Int({value})"),
			Self::Float(value) => write!(f, "Float({value})"),
			Self::String(value) => write!(f, "String({value:?})"),
			Self::Json(value) => write!(f, "Json({value})"),
			Self::List(items) => f.debug_tuple("List").field(items).finish(),
			// Objects may be cyclic, print the handle only
			Self::Object(object) => write!(
				f,
				"Object({}@{:#x})",
				object.type_name(),
				Arc::as_ptr(object) as *const () as usize
			),
			Self::Dumpable(value) => f.debug_tuple("Dumpable").field(value).finish(),
		}
	}
}

impl From<&str> for Datum {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for Datum {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<i64> for Datum {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for Datum {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u32> for Datum {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<f64> for Datum {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<bool> for Datum {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<Value> for Datum {
	fn from(value: Value) -> Self {
		Self::Json(value)
	}
}

impl<T: Into<Datum>> From<Vec<T>> for Datum {
	fn from(items: Vec<T>) -> Self {
		Self::List(items.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
	fn from(value: Option<T>) -> Self {
		value.map(Into::into).unwrap_or(Self::Null)
	}
}

impl<R: Resource + 'static> From<Arc<R>> for Datum {
	fn from(resource: Arc<R>) -> Self {
		Self::Object(resource)
	}
}

impl From<Record> for Datum {
	fn from(record: Record) -> Self {
		Self::Object(Arc::new(record))
	}
}

#[derive(Clone)]
enum Slot {
	Value(Datum),
	Failing(String),
}

/// Map-backed object
///
/// Slots are behind a lock so a record can be shared through `Arc` and then pointed at
/// itself (or at another record pointing back), which is how cyclic data is built.
///
/// By default a record responds to every name and reads absent names as `Null`, like an
/// object whose readers all exist but were never assigned. A [`strict`](Record::strict)
/// record only responds to names it holds.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vista_core::{Datum, Record, Resource, SchemaKind, SchemaTable};
///
/// let mut table = SchemaTable::new();
/// let person = table.declare("Person", SchemaKind::Blueprint);
///
/// let bob = Arc::new(Record::new(person, "Person").with("name", "Bob"));
/// bob.set("friend", Datum::from(bob.clone()));
///
/// assert!(bob.read("friend").unwrap().as_object().is_some());
/// assert!(bob.read("email").unwrap().is_null());
/// assert!(!bob.has_key("email"));
/// ```
pub struct Record {
	schema: SchemaId,
	type_name: String,
	slots: RwLock<IndexMap<String, Slot>>,
	strict: bool,
}

impl Record {
	pub fn new(schema: SchemaId, type_name: impl Into<String>) -> Self {
		Self {
			schema,
			type_name: type_name.into(),
			slots: RwLock::new(IndexMap::new()),
			strict: false,
		}
	}

	/// Builder-style assignment
	pub fn with(self, name: impl Into<String>, value: impl Into<Datum>) -> Self {
		self.set(name, value);
		self
	}

	/// Assign a slot on a shared record
	pub fn set(&self, name: impl Into<String>, value: impl Into<Datum>) {
		self.slots
			.write()
			.insert(name.into(), Slot::Value(value.into()));
	}

	/// Make the reader for `name` fail with `message`
	pub fn fail(self, name: impl Into<String>, message: impl Into<String>) -> Self {
		self.slots
			.write()
			.insert(name.into(), Slot::Failing(message.into()));
		self
	}

	/// Only respond to names that hold a slot
	pub fn strict(mut self) -> Self {
		self.strict = true;
		self
	}

	/// Current value of a slot, `None` for absent or failing slots
	pub fn get(&self, name: &str) -> Option<Datum> {
		match self.slots.read().get(name) {
			Some(Slot::Value(value)) => Some(value.clone()),
			_ => None,
		}
	}

	pub fn keys(&self) -> Vec<String> {
		self.slots.read().keys().cloned().collect()
	}
}

impl Resource for Record {
	fn schema(&self) -> SchemaId {
		self.schema
	}

	fn type_name(&self) -> &str {
		&self.type_name
	}

	fn read(&self, name: &str) -> Result<Datum, ReadError> {
		match self.slots.read().get(name) {
			Some(Slot::Value(value)) => Ok(value.clone()),
			Some(Slot::Failing(message)) => Err(ReadError::failed(message.clone())),
			None if self.strict => Err(ReadError::UnknownAttribute {
				type_name: self.type_name.clone(),
				name: name.to_string(),
			}),
			None => Ok(Datum::Null),
		}
	}

	fn responds_to(&self, name: &str) -> bool {
		!self.strict || self.slots.read().contains_key(name)
	}

	fn has_key(&self, name: &str) -> bool {
		self.slots.read().contains_key(name)
	}
}

impl fmt::Debug for Record {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		// Slots are not printed: records may reference themselves
		f.debug_struct("Record")
			.field("type_name", &self.type_name)
			.field("schema", &self.schema)
			.field("keys", &self.keys())
			.finish()
	}
}

type Reader<T> = Box<dyn Fn(&T) -> Result<Datum, ReadError> + Send + Sync>;

/// Typed reader table for one schema
///
/// Registers one accessor closure per attribute name; [`wrap`](Accessors::wrap) turns a
/// plain Rust value into a [`Resource`] that dispatches reads through the table.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vista_core::{Accessors, Datum, Resource, SchemaKind, SchemaTable};
///
/// struct Person {
///     first: String,
///     last: String,
/// }
///
/// let mut table = SchemaTable::new();
/// let schema = table.declare("Person", SchemaKind::Blueprint);
///
/// let accessors = Arc::new(
///     Accessors::<Person>::new(schema, "Person")
///         .field("first", |p| p.first.clone())
///         .field("full", |p| format!("{} {}", p.first, p.last)),
/// );
///
/// let bob = accessors.wrap(Person { first: "Bob".into(), last: "Smith".into() });
/// let object = bob.as_object().unwrap();
/// assert_eq!(object.read("full").unwrap().to_plain(), Some("Bob Smith".into()));
/// assert!(!object.responds_to("age"));
/// ```
pub struct Accessors<T> {
	schema: SchemaId,
	type_name: String,
	readers: IndexMap<String, Reader<T>>,
}

impl<T: Send + Sync + 'static> Accessors<T> {
	pub fn new(schema: SchemaId, type_name: impl Into<String>) -> Self {
		Self {
			schema,
			type_name: type_name.into(),
			readers: IndexMap::new(),
		}
	}

	/// Register an infallible reader
	pub fn field<F, V>(self, name: impl Into<String>, read: F) -> Self
	where
		F: Fn(&T) -> V + Send + Sync + 'static,
		V: Into<Datum>,
	{
		self.try_field(name, move |value| Ok(read(value).into()))
	}

	/// Register a reader that may fail
	pub fn try_field<F>(mut self, name: impl Into<String>, read: F) -> Self
	where
		F: Fn(&T) -> Result<Datum, ReadError> + Send + Sync + 'static,
	{
		self.readers.insert(name.into(), Box::new(read));
		self
	}

	pub fn schema(&self) -> SchemaId {
		self.schema
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.readers.keys().map(String::as_str)
	}

	/// Wrap a value, sharing this table
	pub fn wrap(self: &Arc<Self>, value: T) -> Datum {
		Datum::Object(self.wrap_arc(value))
	}

	/// Wrap a value and keep the concrete handle
	pub fn wrap_arc(self: &Arc<Self>, value: T) -> Arc<Wrapped<T>> {
		Arc::new(Wrapped {
			accessors: Arc::clone(self),
			value,
		})
	}
}

impl<T> fmt::Debug for Accessors<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Accessors")
			.field("type_name", &self.type_name)
			.field("readers", &self.readers.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// A value paired with its schema's [`Accessors`]
pub struct Wrapped<T> {
	accessors: Arc<Accessors<T>>,
	value: T,
}

impl<T> Wrapped<T> {
	pub fn value(&self) -> &T {
		&self.value
	}
}

impl<T: Send + Sync + 'static> Resource for Wrapped<T> {
	fn schema(&self) -> SchemaId {
		self.accessors.schema
	}

	fn type_name(&self) -> &str {
		&self.accessors.type_name
	}

	fn read(&self, name: &str) -> Result<Datum, ReadError> {
		let reader = self
			.accessors
			.readers
			.get(name)
			.ok_or_else(|| ReadError::UnknownAttribute {
				type_name: self.accessors.type_name.clone(),
				name: name.to_string(),
			})?;
		reader(&self.value)
	}

	fn responds_to(&self, name: &str) -> bool {
		self.accessors.readers.contains_key(name)
	}
}

impl<T> fmt::Debug for Wrapped<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Wrapped")
			.field("type_name", &self.accessors.type_name)
			.finish_non_exhaustive()
	}
}
