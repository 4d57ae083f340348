//! Error types
//!
//! Every failure is surfaced to the immediate caller; nothing is retried and no partial
//! output is returned.

use crate::context::Context;
use crate::datum::Datum;

/// Result type used across Vista
pub type Result<T> = std::result::Result<T, Error>;

/// Aggregate error for all Vista operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Definition(#[from] DefinitionError),

	#[error(transparent)]
	Argument(#[from] ArgumentError),

	#[error(transparent)]
	CircularExpansion(#[from] CircularExpansionError),

	#[error(transparent)]
	Dump(#[from] DumpError),

	#[error(transparent)]
	CircularRendering(#[from] CircularRenderingError),
}

/// A schema or view definition is invalid
///
/// Raised while building the registry, never while rendering.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
	/// A view names an attribute its schema does not declare
	#[error(
		"Displaying {attribute} is not allowed in view {view} of {schema}. This attribute does not exist in the schema"
	)]
	UnknownAttribute {
		schema: String,
		view: String,
		attribute: String,
	},

	/// A view (or render call) references a view that does not exist
	#[error("view with name '{view}' is not defined in {schema}")]
	UnknownView { schema: String, view: String },

	/// A nested view was declared on an attribute that has no attributes of its own
	#[error("attribute {attribute} of {schema} is not a structure and cannot declare a nested view")]
	NotAStructure { schema: String, attribute: String },

	/// `define_attributes` was called twice for the same schema
	#[error("Redefining attributes of {schema} is not supported")]
	AttributesRedefined { schema: String },

	/// The same attribute name was declared twice
	#[error("attribute {attribute} is declared twice in {schema}")]
	DuplicateAttribute { schema: String, attribute: String },

	/// A schema id that was not issued by this table
	#[error("schema #{0} is not declared")]
	UnknownSchema(usize),
}

/// A caller supplied an invalid argument or option combination
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
	/// Field names must be identifiers
	#[error("Attribute names must be identifiers, got: {name:?}")]
	InvalidFieldName { name: String },

	/// Conflicting view options
	#[error("invalid options for view {view}: {message}")]
	InvalidOptions { view: String, message: String },

	/// A view requested at render time does not exist
	#[error("view with name '{view}' is not defined in {schema}")]
	UnknownView { schema: String, view: String },

	/// A field mask could not be parsed
	#[error("invalid field mask: {message}")]
	InvalidMask { message: String },

	/// The value handed to a schema-level render is not an attribute-bearing object
	#[error("cannot render a value of kind {kind} through a view")]
	NotAnObject { kind: &'static str },

	/// A collection selection was applied to a single value
	#[error("cannot render a value of kind {kind} as a collection at {context}")]
	NotACollection { kind: &'static str, context: String },
}

/// A structural cycle was found while expanding fields and the expander is configured to
/// reject it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Circular expansion detected: {}", join_chain(.chain))]
pub struct CircularExpansionError {
	/// Every (node, mask) pair on the expansion stack, outermost first, ending with the
	/// pair that closed the cycle
	pub chain: Vec<String>,
}

fn join_chain(chain: &[String]) -> String {
	chain.join(" -> ")
}

/// Failure returned by an attribute reader
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
	/// The object has no reader with this name
	#[error("undefined attribute {name} for {type_name}")]
	UnknownAttribute { type_name: String, name: String },

	/// The value is not an attribute-bearing object
	#[error("value of kind {kind} has no readable attributes")]
	NotReadable { kind: &'static str },

	/// The reader ran and failed
	#[error("{message}")]
	Failed { message: String },

	/// Any other error raised by a reader
	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ReadError {
	/// Shorthand for [`ReadError::Failed`]
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed {
			message: message.into(),
		}
	}
}

/// An attribute reader failed while rendering
///
/// The message carries the attribute name and the dotted path that led to it.
///
/// # Examples
///
/// ```
/// use vista_core::{Context, DumpError, ReadError};
///
/// let err = DumpError {
///     context: Context::new(["root", "address"]),
///     name: "state".to_string(),
///     type_name: "Address".to_string(),
///     cause: ReadError::failed("boom"),
/// };
/// assert!(err.to_string().contains("root.address.state"));
/// ```
#[derive(Debug, thiserror::Error)]
#[error(
	"Error while dumping attribute {name} of type {type_name} for {}: {cause}",
	dotted(.context, .name)
)]
pub struct DumpError {
	/// Path of the object owning the attribute
	pub context: Context,
	/// Attribute being read
	pub name: String,
	/// Type of the object owning the attribute
	pub type_name: String,
	/// The reader failure
	#[source]
	pub cause: ReadError,
}

impl DumpError {
	/// Full path of the failing attribute
	pub fn path(&self) -> Context {
		self.context.child(self.name.as_str())
	}
}

fn dotted(context: &Context, name: &str) -> String {
	context.child(name).humanize()
}

/// Rendering recursed past its depth budget or re-entered an object it was already
/// rendering with the same fields: the data graph contains a cycle
#[derive(Debug, thiserror::Error)]
#[error(
	"Circular rendering detected for {type_name} with context: {}",
	truncated(.context)
)]
pub struct CircularRenderingError {
	/// The object whose render tripped the guard
	pub object: Datum,
	/// Its type name
	pub type_name: String,
	/// Where it was reached
	pub context: Context,
}

fn truncated(context: &Context) -> String {
	context.truncated()
}
