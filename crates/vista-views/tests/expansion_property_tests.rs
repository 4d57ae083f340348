//! Expansion property tests
//!
//! Random masks over the fixture schemas: expansion terminates, is memoized and never
//! selects attributes the mask did not ask for.

mod fixtures;

use proptest::prelude::*;
use vista_conf::RenderSettings;
use vista_core::{FieldMask, FieldNode, TypeRef};

const PERSON_KEYS: &[&str] = &[
	"name",
	"email",
	"age",
	"full_name",
	"aliases",
	"address",
	"prior_addresses",
	"parents",
	"tags",
	"metadata",
	"nickname",
	"zip",
];

const ADDRESS_KEYS: &[&str] = &["street", "state", "resident", "zip"];

fn person_mask() -> impl Strategy<Value = FieldMask> {
	(
		prop::collection::vec(prop::sample::select(PERSON_KEYS), 0..8),
		prop::option::of(prop::collection::vec(
			prop::sample::select(ADDRESS_KEYS),
			0..4,
		)),
	)
		.prop_map(|(names, address)| {
			let mut entries: Vec<(String, FieldMask)> = names
				.into_iter()
				.map(|name| (name.to_string(), FieldMask::All))
				.collect();
			if let Some(address) = address {
				entries.push(("address".to_string(), FieldMask::names(address)));
			}
			FieldMask::fields(entries)
		})
}

// ============================================================================
// Property-Based Tests: FieldExpander
// ============================================================================

proptest! {
	/// Test: Expansion is memoized
	///
	/// Category: Property
	/// Verifies that expanding the same type with the same mask twice returns the same
	/// handle.
	#[test]
	fn prop_expansion_is_memoized(mask in person_mask()) {
		let catalog = fixtures::catalog_with(RenderSettings::default());
		let mut expander = catalog.registry.expander();
		let person = TypeRef::structure(catalog.person);

		let first = expander.expand_type(&person, &mask).unwrap();
		let second = expander.expand_type(&person, &mask).unwrap();

		prop_assert_eq!(first, second);
	}

	/// Test: Expansion selects only requested attributes
	///
	/// Category: Property
	/// Verifies that the top level of the expanded tree holds exactly the requested keys
	/// the schema declares.
	#[test]
	fn prop_expansion_selects_requested_attributes(mask in person_mask()) {
		let catalog = fixtures::catalog_with(RenderSettings::default());
		let attributes = catalog
			.registry
			.node(catalog.person)
			.unwrap()
			.attributes()
			.unwrap();
		let mut expander = catalog.registry.expander();

		let id = expander
			.expand_type(&TypeRef::structure(catalog.person), &mask)
			.unwrap();

		let FieldNode::Fields(children) = expander.selection(id).node() else {
			return Err(TestCaseError::fail("expected a mapping"));
		};
		let expected: Vec<&String> = attributes
			.keys()
			.filter(|name| mask.wants(name))
			.collect();
		prop_assert_eq!(children.keys().collect::<Vec<_>>(), expected);
	}

	/// Test: Nested masks are honoured
	///
	/// Category: Property
	/// Verifies that a sub-mask on a structure attribute restricts that attribute's
	/// subtree to the declared keys it names.
	#[test]
	fn prop_nested_masks_restrict_subtrees(
		address in prop::collection::vec(prop::sample::select(ADDRESS_KEYS), 0..4)
	) {
		let catalog = fixtures::catalog_with(RenderSettings::default());
		let mask = FieldMask::fields([("address", FieldMask::names(address.clone()))]);
		let mut expander = catalog.registry.expander();

		let id = expander
			.expand_type(&TypeRef::structure(catalog.person), &mask)
			.unwrap();

		let selected = expander.selection(id).child("address").unwrap();
		let FieldNode::Fields(children) = selected.node() else {
			return Err(TestCaseError::fail("expected a mapping"));
		};
		for name in children.keys() {
			prop_assert!(address.contains(&name.as_str()));
		}
		prop_assert!(!children.contains_key("zip"));
	}
}
