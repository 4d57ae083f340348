//! Field expansion tests
//!
//! Memo identity, cycle handling under both policies, mask filtering and collection
//! wrapping.

mod fixtures;

use fixtures::{Catalog, catalog};
use rstest::rstest;
use serde_json::json;
use vista_conf::CyclePolicy;
use vista_core::{Error, FieldId, FieldMask, FieldNode, TypeRef};
use vista_views::{Expandable, ViewEntry};

fn mask(value: serde_json::Value) -> FieldMask {
	FieldMask::from_json(&value).unwrap()
}

// ============================================================================
// Identity
// ============================================================================

#[rstest]
fn test_expanding_twice_returns_the_same_handle(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander();
	let person = TypeRef::structure(catalog.person);

	// Act
	let first = expander.expand_type(&person, &FieldMask::All).unwrap();
	let second = expander.expand_type(&person, &FieldMask::All).unwrap();

	// Assert
	assert_eq!(first, second);
}

#[rstest]
fn test_precomputed_view_fields_are_stable(catalog: Catalog) {
	let view = catalog.registry.view(catalog.person, "default").unwrap();

	let first = view.expanded_fields(&catalog.registry).unwrap();
	let second = view.expanded_fields(&catalog.registry).unwrap();

	assert_eq!(first, second);
}

#[rstest]
fn test_shared_subtrees_reuse_handles(catalog: Catalog) {
	let mut expander = catalog.registry.expander();
	let id = expander
		.expand_type(&TypeRef::structure(catalog.person), &FieldMask::All)
		.unwrap();
	let person = expander.selection(id);

	let address = person.child("address").unwrap();
	let prior = person.child("prior_addresses").unwrap().each().unwrap();

	assert_eq!(address, prior);
}

#[rstest]
fn test_leaf_types_expand_to_all(catalog: Catalog) {
	let mut expander = catalog.registry.expander();

	let id = expander
		.expand_type(&TypeRef::string(), &mask(json!({"ignored": true})))
		.unwrap();

	assert_eq!(id, FieldId::ALL);
}

// ============================================================================
// Cycles
// ============================================================================

#[rstest]
fn test_type_cycle_links_back_to_ancestor(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander();

	// Act
	let id = expander
		.expand_type(&TypeRef::structure(catalog.address), &FieldMask::All)
		.unwrap();

	// Assert
	let address = expander.selection(id);
	let round_trip = address
		.child("resident")
		.unwrap()
		.child("address")
		.unwrap();
	assert_eq!(round_trip, address);
	assert_eq!(address.to_mask(), None);
}

#[rstest]
fn test_view_cycle_links_back_to_ancestor(catalog: Catalog) {
	let view = catalog.registry.view(catalog.person, "circular").unwrap();
	let person = view.expanded_fields(&catalog.registry).unwrap();

	let round_trip = person
		.child("address")
		.unwrap()
		.child("resident")
		.unwrap();

	assert_eq!(round_trip, person);
}

#[rstest]
fn test_error_policy_names_the_cycle(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander().with_policy(CyclePolicy::Error);

	// Act
	let err = expander
		.expand_type(&TypeRef::structure(catalog.person), &FieldMask::All)
		.unwrap_err();

	// Assert
	let Error::CircularExpansion(err) = err else {
		panic!("expected a circular expansion error");
	};
	assert_eq!(err.chain, ["Person: true", "Address: true", "Person: true"]);
	assert_eq!(
		err.to_string(),
		"Circular expansion detected: Person: true -> Address: true -> Person: true"
	);
}

#[rstest]
fn test_failed_expansion_forgets_partial_results(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander().with_policy(CyclePolicy::Error);
	let person = TypeRef::structure(catalog.person);

	// Act
	let first = expander.expand_type(&person, &FieldMask::All);
	let memoized = expander.memoized();
	let second = expander.expand_type(&person, &FieldMask::All);

	// Assert
	assert!(matches!(first, Err(Error::CircularExpansion(_))));
	assert_eq!(memoized, 0);
	assert!(matches!(second, Err(Error::CircularExpansion(_))));
}

#[rstest]
fn test_error_policy_accepts_acyclic_requests(catalog: Catalog) {
	let mut expander = catalog.registry.expander().with_policy(CyclePolicy::Error);
	let view = catalog.registry.view(catalog.person, "extended").unwrap();

	let id = expander.expand_view(view, &FieldMask::All).unwrap();

	assert!(expander.selection(id).to_mask().is_some());
}

#[rstest]
fn test_error_policy_from_settings() {
	let catalog = fixtures::catalog_with(
		vista_conf::RenderSettings::new().with_expansion_cycles(CyclePolicy::Error),
	);

	let result = catalog
		.registry
		.expander()
		.expand_type(&TypeRef::structure(catalog.address), &FieldMask::All);

	assert!(matches!(result, Err(Error::CircularExpansion(_))));
}

// ============================================================================
// Masks
// ============================================================================

#[rstest]
fn test_view_expansion_follows_referenced_views(catalog: Catalog) {
	let view = catalog.registry.view(catalog.person, "default").unwrap();

	let fields = view.expanded_fields(&catalog.registry).unwrap();

	assert_eq!(
		fields.to_mask().unwrap().to_json(),
		json!({
			"name": true,
			"full_name": {"first": true, "last": true},
			"address": {"street": true, "state": true},
		})
	);
}

#[rstest]
fn test_view_expansion_keeps_declaration_order(catalog: Catalog) {
	let view = catalog.registry.view(catalog.person, "extended").unwrap();

	let fields = view.expanded_fields(&catalog.registry).unwrap();

	let FieldNode::Fields(children) = fields.node() else {
		panic!("expected a mapping");
	};
	let names: Vec<_> = children.keys().cloned().collect();
	assert_eq!(
		names,
		["name", "full_name", "address", "prior_addresses", "aliases", "parents"]
	);
}

#[rstest]
fn test_mask_keys_outside_the_schema_are_ignored(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander();
	let view = catalog.registry.view(catalog.person, "extended").unwrap();
	let requested = mask(json!({
		"name": true,
		"nickname": true,
		"address": {"state": true, "zip": true},
	}));

	// Act
	let id = expander.expand_view(view, &requested).unwrap();

	// Assert
	assert_eq!(
		expander.selection(id).to_mask().unwrap().to_json(),
		json!({"name": true, "address": {"state": true}})
	);
}

#[rstest]
fn test_unknown_keys_only_yield_an_empty_mapping(catalog: Catalog) {
	let mut expander = catalog.registry.expander();

	let id = expander
		.expand_type(
			&TypeRef::structure(catalog.person),
			&mask(json!({"nickname": true})),
		)
		.unwrap();

	assert_eq!(expander.selection(id).to_mask().unwrap().to_json(), json!({}));
}

#[rstest]
fn test_hash_attributes_are_leaves(catalog: Catalog) {
	let mut expander = catalog.registry.expander();

	let id = expander
		.expand_type(
			&TypeRef::structure(catalog.person),
			&mask(json!({"metadata": {"anything": true}})),
		)
		.unwrap();

	assert_eq!(
		expander.selection(id).to_mask().unwrap().to_json(),
		json!({"metadata": true})
	);
}

#[rstest]
#[case(json!({"prior_addresses": [{"state": true}]}))]
#[case(json!({"prior_addresses": {"state": true}}))]
fn test_collection_masks_wrap_the_member(catalog: Catalog, #[case] requested: serde_json::Value) {
	let mut expander = catalog.registry.expander();

	let id = expander
		.expand_type(&TypeRef::structure(catalog.person), &mask(requested))
		.unwrap();

	assert_eq!(
		expander.selection(id).to_mask().unwrap().to_json(),
		json!({"prior_addresses": [{"state": true}]})
	);
}

#[rstest]
fn test_nested_collections_wrap_each_level(catalog: Catalog) {
	// Arrange
	let mut expander = catalog.registry.expander();
	let matrix = TypeRef::collection_of(TypeRef::collection_of(TypeRef::structure(
		catalog.full_name,
	)));

	// Act
	let all = expander.expand_type(&matrix, &FieldMask::All).unwrap();
	let first = expander
		.expand_type(&matrix, &mask(json!([[{"first": true}]])))
		.unwrap();

	// Assert
	assert_eq!(
		expander.selection(all).to_mask().unwrap().to_json(),
		json!([[{"first": true, "last": true}]])
	);
	assert_eq!(
		expander.selection(first).to_mask().unwrap().to_json(),
		json!([[{"first": true}]])
	);
}

#[rstest]
fn test_collection_views_expand_their_member_view(catalog: Catalog) {
	let view = catalog.registry.view(catalog.person, "extended").unwrap();
	let fields = view.expanded_fields(&catalog.registry).unwrap();

	let member = fields.child("prior_addresses").unwrap().each().unwrap();

	assert_eq!(member.to_mask().unwrap().to_json(), json!({"state": true}));
}

#[rstest]
fn test_collection_view_entry_expands_directly(catalog: Catalog) {
	// Arrange
	let view = catalog.registry.view(catalog.person, "extended").unwrap();
	let ViewEntry::Collection(collection) = &view.contents()["prior_addresses"] else {
		panic!("expected a collection view");
	};
	let mut expander = catalog.registry.expander();

	// Act
	let id = expander
		.expand(Expandable::Collection(collection), &FieldMask::All)
		.unwrap();

	// Assert
	assert_eq!(
		expander.selection(id).to_mask().unwrap().to_json(),
		json!([{"state": true}])
	);
}

#[rstest]
fn test_attribute_expands_through_its_type(catalog: Catalog) {
	let node = catalog.registry.node(catalog.person).unwrap();
	let aliases = node.attribute("aliases").unwrap();
	let mut expander = catalog.registry.expander();

	let id = expander
		.expand(Expandable::Attribute(aliases), &FieldMask::All)
		.unwrap();

	assert_eq!(
		expander.selection(id).to_mask().unwrap().to_json(),
		json!([{"first": true, "last": true}])
	);
}

#[rstest]
fn test_mask_literal_is_stored_verbatim(catalog: Catalog) {
	let mut expander = catalog.registry.expander();
	let literal = mask(json!({"address": true, "nickname": {"x": true}}));

	let id = expander.expand_mask_literal(&literal);

	assert_eq!(expander.selection(id).to_mask(), Some(literal));
}
