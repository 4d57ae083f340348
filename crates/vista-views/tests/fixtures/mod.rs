//! Shared schemas for the integration tests
//!
//! `Person` and `Address` are Blueprints that refer to each other; `FullName` is a plain
//! structure.

#![allow(dead_code)]

use rstest::fixture;
use std::sync::Arc;
use vista_conf::RenderSettings;
use vista_core::{AttributeOptions, Datum, Record, SchemaId, TypeRef};
use vista_views::{RegistryBuilder, SchemaRegistry, ViewBuilder};

pub struct Catalog {
	pub registry: SchemaRegistry,
	pub person: SchemaId,
	pub address: SchemaId,
	pub full_name: SchemaId,
}

impl Catalog {
	pub fn person(&self, name: &str) -> Record {
		self.registry.record(self.person).with("name", name)
	}

	pub fn address(&self, street: &str, state: &str) -> Record {
		self.registry
			.record(self.address)
			.with("street", street)
			.with("state", state)
	}

	pub fn full_name(&self, first: &str, last: &str) -> Record {
		self.registry
			.record(self.full_name)
			.with("first", first)
			.with("last", last)
	}

	/// Bob lives at 1 Main St with himself as the resident
	pub fn bob(&self) -> Datum {
		Datum::from(self.bob_record())
	}

	pub fn bob_record(&self) -> Arc<Record> {
		let home = Arc::new(self.address("1 Main St", "CA"));
		let bob = Arc::new(
			self.person("Bob")
				.with("email", "bob@example.com")
				.with("age", 42)
				.with("full_name", self.full_name("Bob", "Smith"))
				.with("address", Datum::from(home.clone())),
		);
		home.set("resident", Datum::from(bob.clone()));
		bob
	}
}

pub fn declare(builder: &mut RegistryBuilder) -> (SchemaId, SchemaId, SchemaId) {
	let person = builder.blueprint("Person");
	let address = builder.blueprint("Address");
	let full_name = builder.model("FullName");

	builder
		.attributes(full_name, |attrs| {
			attrs.attribute("first", TypeRef::string());
			attrs.attribute("last", TypeRef::string());
		})
		.unwrap();
	builder
		.attributes(address, |attrs| {
			attrs.attribute("id", TypeRef::integer());
			attrs.attribute("name", TypeRef::string());
			attrs.attribute("street", TypeRef::string());
			attrs.attribute("state", TypeRef::string());
			attrs.attribute("resident", TypeRef::structure(person));
		})
		.unwrap();
	builder
		.attributes(person, |attrs| {
			attrs.attribute("name", TypeRef::string());
			attrs.attribute("email", TypeRef::string());
			attrs.attribute("age", TypeRef::integer());
			attrs.attribute("full_name", TypeRef::structure(full_name));
			attrs.attribute(
				"aliases",
				TypeRef::collection_of(TypeRef::structure(full_name)),
			);
			attrs.attribute("address", TypeRef::structure(address));
			attrs.attribute(
				"prior_addresses",
				TypeRef::collection_of(TypeRef::structure(address)),
			);
			attrs.structure("parents", |parents| {
				parents.attribute("father", TypeRef::string());
				parents.attribute("mother", TypeRef::string());
			});
			attrs.attribute("tags", TypeRef::collection_of(TypeRef::string()));
			attrs.attribute("alive", TypeRef::boolean());
			attrs.attribute("metadata", TypeRef::hash());
		})
		.unwrap();

	builder.view(
		address,
		ViewBuilder::new("default").attribute("street").attribute("state"),
	);
	builder.view(address, ViewBuilder::new("state").attribute("state"));
	builder.view(
		address,
		ViewBuilder::new("extended")
			.attribute("state")
			.attribute("street")
			.attribute("resident"),
	);
	builder.view(
		address,
		ViewBuilder::new("circular")
			.attribute("street")
			.attribute_with("resident", AttributeOptions::new().view("circular")),
	);

	builder.view(
		person,
		ViewBuilder::new("default")
			.attribute("name")
			.attribute("full_name")
			.attribute("address"),
	);
	builder.view(
		person,
		ViewBuilder::new("current")
			.attribute("name")
			.attribute("full_name")
			.attribute_with("address", AttributeOptions::new().view("state")),
	);
	builder.view(
		person,
		ViewBuilder::new("extended")
			.attribute("name")
			.attribute("full_name")
			.attribute_with("address", AttributeOptions::new().view("extended"))
			.attribute_with("prior_addresses", AttributeOptions::new().view("state"))
			.attribute("aliases")
			.nested("parents", |parents| {
				parents.attribute("father").attribute("mother")
			}),
	);
	builder.view(
		person,
		ViewBuilder::new("with_nil")
			.include_nil(true)
			.attribute("name")
			.attribute("email")
			.attribute("age"),
	);
	builder.view(
		person,
		ViewBuilder::new("with_unset")
			.include_unset(true)
			.attribute("name")
			.attribute("email")
			.attribute("age"),
	);
	builder.view(
		person,
		ViewBuilder::new("circular")
			.attribute("name")
			.attribute_with("address", AttributeOptions::new().view("circular")),
	);

	(person, address, full_name)
}

pub fn catalog_with(settings: RenderSettings) -> Catalog {
	let mut builder = RegistryBuilder::new().with_settings(settings);
	let (person, address, full_name) = declare(&mut builder);
	Catalog {
		registry: builder.finalize().unwrap(),
		person,
		address,
		full_name,
	}
}

#[fixture]
pub fn catalog() -> Catalog {
	catalog_with(RenderSettings::default())
}
