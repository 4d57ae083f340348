//! Context paths
//!
//! A context is the location of a value inside the object graph being rendered,
//! e.g. `$.address.prior_addresses.at(2)`. Errors carry it so failures can be traced
//! back to the exact attribute that caused them.

use std::fmt;

/// Root segment used when no explicit context is given
pub const ROOT_SEGMENT: &str = "$";

/// Number of leading segments kept by [`Context::truncated`]
const TRUNCATED_HEAD: usize = 10;
/// Number of trailing segments kept by [`Context::truncated`]
const TRUNCATED_TAIL: usize = 5;

/// Ordered list of path segments
///
/// # Examples
///
/// ```
/// use vista_core::Context;
///
/// let context = Context::new(["root", "address"]).child("state");
/// assert_eq!(context.humanize(), "root.address.state");
/// assert_eq!(Context::root().at(2).humanize(), "$.at(2)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Context {
	segments: Vec<String>,
}

impl Context {
	/// Create a context from explicit segments
	pub fn new<I, S>(segments: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			segments: segments.into_iter().map(Into::into).collect(),
		}
	}

	/// The default root context (`$`)
	pub fn root() -> Self {
		Self::new([ROOT_SEGMENT])
	}

	/// Segments in order
	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Extend the context with one segment, leaving `self` untouched
	pub fn child(&self, segment: impl Into<String>) -> Self {
		let mut segments = Vec::with_capacity(self.segments.len() + 1);
		segments.extend(self.segments.iter().cloned());
		segments.push(segment.into());
		Self { segments }
	}

	/// Extend the context with a collection position, rendered as `at(i)`
	pub fn at(&self, index: usize) -> Self {
		self.child(format!("at({index})"))
	}

	/// Segments joined with `.`
	pub fn humanize(&self) -> String {
		self.segments.join(".")
	}

	/// Bounded rendering for deep paths: the first 10 and last 5 segments joined by `...`
	///
	/// # Examples
	///
	/// ```
	/// use vista_core::Context;
	///
	/// let deep = Context::new((0..30).map(|i| i.to_string()));
	/// assert_eq!(deep.truncated(), "0.1.2.3.4.5.6.7.8.9...25.26.27.28.29");
	///
	/// let shallow = Context::new(["$", "address"]);
	/// assert_eq!(shallow.truncated(), "$.address");
	/// ```
	pub fn truncated(&self) -> String {
		if self.segments.len() <= TRUNCATED_HEAD + TRUNCATED_TAIL {
			return self.humanize();
		}
		let head = self.segments[..TRUNCATED_HEAD].join(".");
		let tail = self.segments[self.segments.len() - TRUNCATED_TAIL..].join(".");
		format!("{head}...{tail}")
	}
}

impl Default for Context {
	fn default() -> Self {
		Self::root()
	}
}

impl fmt::Display for Context {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.humanize())
	}
}

impl From<&str> for Context {
	fn from(segment: &str) -> Self {
		Self::new([segment])
	}
}

impl From<Vec<String>> for Context {
	fn from(segments: Vec<String>) -> Self {
		Self { segments }
	}
}
