//! Integration tests for applying documents to a store.

use jsonapi_graph::{
    AttributeModel, EntityModel, ErrorKind, FieldValue, MemoryStore, ModelDescription,
    NativeValue, RecordRef, RegistryOptions, RelationshipModel, ScalarKind, SchemaRegistry, Store,
};
use serde_json::{json, Value};

fn model() -> ModelDescription {
    ModelDescription::new()
        .entity(
            EntityModel::new("Pet")
                .attribute(AttributeModel::new("id", ScalarKind::String))
                .attribute(AttributeModel::new("name", ScalarKind::String))
                .attribute(AttributeModel::new("age", ScalarKind::Integer16))
                .relationship(RelationshipModel::to_one("owner", "Person"))
                .relationship(RelationshipModel::to_many("toys", "Toy"))
                .relationship(RelationshipModel::to_many("tricks", "Trick").ordered()),
        )
        .entity(
            EntityModel::new("Person")
                .attribute(AttributeModel::new("id", ScalarKind::String))
                .attribute(AttributeModel::new("firstName", ScalarKind::String)),
        )
        .entity(EntityModel::new("Toy").attribute(AttributeModel::new("id", ScalarKind::String)))
        .entity(EntityModel::new("Trick").attribute(AttributeModel::new("id", ScalarKind::String)))
}

fn setup() -> (SchemaRegistry, MemoryStore) {
    let model = model();
    let registry = SchemaRegistry::new(&model, RegistryOptions::default()).unwrap();
    (registry, MemoryStore::for_model(&model))
}

fn refs(resource_type: &str, ids: &[&str]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| json!({ "type": resource_type, "id": id }))
            .collect(),
    )
}

fn pet(id: &str, attributes: Value, relationships: Value) -> Value {
    json!({
        "data": {
            "type": "pet",
            "id": id,
            "attributes": attributes,
            "relationships": relationships
        }
    })
}

fn related_ids(store: &MemoryStore, record: &RecordRef, field: &str) -> Vec<NativeValue> {
    let related = match store.get_field(record, field).unwrap() {
        FieldValue::Many(related) => related,
        FieldValue::One(related) => vec![related],
        FieldValue::Null => Vec::new(),
        other => panic!("unexpected value {:?}", other),
    };
    related
        .iter()
        .map(|r| match store.get_field(r, "id").unwrap() {
            FieldValue::Value(id) => id,
            other => panic!("unexpected id {:?}", other),
        })
        .collect()
}

fn ids(values: &[&str]) -> Vec<NativeValue> {
    values.iter().map(|v| NativeValue::from(*v)).collect()
}

// === Idempotence ===

mod idempotence {
    use super::*;

    #[test]
    fn second_apply_writes_nothing() {
        let (registry, mut store) = setup();
        let document = pet(
            "1",
            json!({ "name": "Rex", "age": 3 }),
            json!({
                "owner": { "data": { "type": "person", "id": "7" } },
                "toys": { "data": refs("toy", &["1", "2"]) },
                "tricks": { "data": refs("trick", &["sit", "roll"]) }
            }),
        );

        let first = registry.update(&mut store, &document).unwrap();
        assert_eq!(first.stats.resources, 1);
        assert!(first.stats.writes > 0);

        let second = registry.update(&mut store, &document).unwrap();
        assert_eq!(second.stats.writes, 0);
        assert_eq!(second.stats.created, 0);
        assert_eq!(second.records, first.records);
    }

    #[test]
    fn only_changed_fields_written() {
        let (registry, mut store) = setup();
        registry
            .update(&mut store, &pet("1", json!({ "name": "Rex", "age": 3 }), json!({})))
            .unwrap();

        let result = registry
            .update(&mut store, &pet("1", json!({ "name": "Rex", "age": 4 }), json!({})))
            .unwrap();
        assert_eq!(result.stats.writes, 1);
        assert_eq!(
            store.get_field(&result.records[0], "age").unwrap(),
            FieldValue::Value(NativeValue::Integer16(4))
        );
    }

    #[test]
    fn absent_fields_left_alone() {
        let (registry, mut store) = setup();
        registry
            .update(&mut store, &pet("1", json!({ "name": "Rex", "age": 3 }), json!({})))
            .unwrap();

        let result = registry
            .update(&mut store, &pet("1", json!({ "age": 5 }), json!({})))
            .unwrap();
        assert_eq!(
            store.get_field(&result.records[0], "name").unwrap(),
            FieldValue::Value(NativeValue::from("Rex"))
        );
    }

    #[test]
    fn null_clears_optional_attribute() {
        let (registry, mut store) = setup();
        registry
            .update(&mut store, &pet("1", json!({ "age": 3 }), json!({})))
            .unwrap();

        let result = registry
            .update(&mut store, &pet("1", json!({ "age": null }), json!({})))
            .unwrap();
        assert_eq!(result.stats.writes, 1);
        assert_eq!(
            store.get_field(&result.records[0], "age").unwrap(),
            FieldValue::Null
        );
    }
}

// === Batched resolution ===

mod batching {
    use super::*;

    fn big_document() -> Value {
        let data: Vec<Value> = (0..999)
            .map(|i| {
                let toy_count = i % 100 + 1;
                let toys: Vec<Value> = (0..toy_count)
                    .map(|k| json!({ "type": "toy", "id": ((i + k) % 250).to_string() }))
                    .collect();
                json!({
                    "type": "pet",
                    "id": i.to_string(),
                    "attributes": { "age": (i % 20) as i64 },
                    "relationships": {
                        "owner": { "data": { "type": "person", "id": (i % 10).to_string() } },
                        "toys": { "data": toys }
                    }
                })
            })
            .collect();
        json!({ "data": data })
    }

    #[test]
    fn one_fetch_per_entity_type() {
        let (registry, mut store) = setup();

        let result = registry.update(&mut store, &big_document()).unwrap();
        assert_eq!(result.records.len(), 999);
        assert_eq!(result.stats.fetches, 3);

        let fetches = &store.stats().fetches;
        assert_eq!(fetches.get("Pet"), Some(&1));
        assert_eq!(fetches.get("Toy"), Some(&1));
        assert_eq!(fetches.get("Person"), Some(&1));
        assert_eq!(store.records("Toy").len(), 250);
        assert_eq!(store.records("Person").len(), 10);
    }

    #[test]
    fn reapplying_large_document_fetches_once_and_writes_nothing() {
        let (registry, mut store) = setup();
        let document = big_document();
        registry.update(&mut store, &document).unwrap();
        store.reset_stats();

        let result = registry.update(&mut store, &document).unwrap();
        assert_eq!(result.stats.writes, 0);
        assert_eq!(result.stats.created, 0);
        assert_eq!(store.stats().total_fetches(), 3);
        assert_eq!(store.stats().writes, 0);
    }

    #[test]
    fn existing_records_are_reused() {
        let (registry, mut store) = setup();
        registry
            .update(
                &mut store,
                &json!({ "data": { "type": "person", "id": "7", "attributes": { "first_name": "Ann" } } }),
            )
            .unwrap();

        let result = registry
            .update(
                &mut store,
                &pet(
                    "1",
                    json!({}),
                    json!({ "owner": { "data": { "type": "person", "id": "7" } } }),
                ),
            )
            .unwrap();
        assert_eq!(result.stats.created, 1);
        assert_eq!(store.records("Person").len(), 1);
        assert_eq!(related_ids(&store, &result.records[0], "owner"), ids(&["7"]));
    }
}

// === Relationship semantics ===

mod relationships {
    use super::*;

    #[test]
    fn to_one_replaced_and_cleared() {
        let (registry, mut store) = setup();
        let owner = |data: Value| pet("1", json!({}), json!({ "owner": { "data": data } }));

        registry
            .update(&mut store, &owner(json!({ "type": "person", "id": "7" })))
            .unwrap();
        let result = registry
            .update(&mut store, &owner(json!({ "type": "person", "id": "8" })))
            .unwrap();
        assert_eq!(result.stats.writes, 1);
        assert_eq!(related_ids(&store, &result.records[0], "owner"), ids(&["8"]));

        let result = registry.update(&mut store, &owner(Value::Null)).unwrap();
        assert_eq!(result.stats.writes, 1);
        assert_eq!(
            store.get_field(&result.records[0], "owner").unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn to_many_null_clears_collection() {
        let (registry, mut store) = setup();
        registry
            .update(
                &mut store,
                &pet("1", json!({}), json!({ "toys": { "data": refs("toy", &["1", "2"]) } })),
            )
            .unwrap();

        let result = registry
            .update(&mut store, &pet("1", json!({}), json!({ "toys": { "data": null } })))
            .unwrap();
        assert_eq!(result.stats.writes, 1);
        assert!(related_ids(&store, &result.records[0], "toys").is_empty());
    }

    #[test]
    fn unordered_reorder_is_unchanged() {
        let (registry, mut store) = setup();
        let toys = |order: &[&str]| {
            pet("1", json!({}), json!({ "toys": { "data": refs("toy", order) } }))
        };

        registry.update(&mut store, &toys(&["1", "2", "3"])).unwrap();
        let result = registry.update(&mut store, &toys(&["3", "1", "2"])).unwrap();
        assert_eq!(result.stats.writes, 0);

        let result = registry.update(&mut store, &toys(&["3", "1"])).unwrap();
        assert_eq!(result.stats.writes, 1);
        let mut current = related_ids(&store, &result.records[0], "toys");
        current.sort_by_key(|id| id.to_string());
        assert_eq!(current, ids(&["1", "3"]));
    }

    #[test]
    fn ordered_reorder_is_written() {
        let (registry, mut store) = setup();
        let tricks = |order: &[&str]| {
            pet("1", json!({}), json!({ "tricks": { "data": refs("trick", order) } }))
        };

        registry.update(&mut store, &tricks(&["sit", "roll"])).unwrap();
        let result = registry.update(&mut store, &tricks(&["roll", "sit"])).unwrap();
        assert_eq!(result.stats.writes, 1);
        assert_eq!(
            related_ids(&store, &result.records[0], "tricks"),
            ids(&["roll", "sit"])
        );
    }

    #[test]
    fn duplicate_ids_collapse() {
        let (registry, mut store) = setup();
        let result = registry
            .update(
                &mut store,
                &pet("1", json!({}), json!({ "toys": { "data": refs("toy", &["1", "1", "2"]) } })),
            )
            .unwrap();

        assert_eq!(related_ids(&store, &result.records[0], "toys").len(), 2);
        assert_eq!(store.records("Toy").len(), 2);
    }
}

// === Failures ===

mod failures {
    use super::*;

    #[test]
    fn invalid_resource_aborts_before_writing() {
        let (registry, mut store) = setup();
        let document = json!({
            "data": [
                { "type": "pet", "id": "1", "attributes": { "age": 1 } },
                { "type": "pet", "id": "2", "attributes": { "age": 40000 } }
            ]
        });

        let err = registry.update(&mut store, &document).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_store_records_rejected() {
        let model = model();
        let registry = SchemaRegistry::new(&model, RegistryOptions::default()).unwrap();
        let mut store = MemoryStore::for_model(&model);
        for _ in 0..2 {
            let record = store.create_record("Person").unwrap();
            store
                .set_field(&record, "id", FieldValue::Value(NativeValue::from("7")))
                .unwrap();
        }

        let err = registry
            .update(
                &mut store,
                &json!({ "data": { "type": "person", "id": "7" } }),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store);
    }

    #[test]
    fn server_error_document_writes_nothing() {
        let (registry, mut store) = setup();
        let err = registry
            .update(&mut store, &json!({ "errors": [{ "status": "500", "title": "boom" }] }))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert!(err.to_string().contains("boom"));
        assert!(store.is_empty());
    }
}

// === Reading records back ===

mod serialization {
    use super::*;

    #[test]
    fn stored_record_serializes_to_wire() {
        let (registry, mut store) = setup();
        let result = registry
            .update(
                &mut store,
                &pet(
                    "1",
                    json!({ "name": "Rex", "age": 3 }),
                    json!({
                        "owner": { "data": { "type": "person", "id": "7" } },
                        "tricks": { "data": refs("trick", &["sit", "roll"]) }
                    }),
                ),
            )
            .unwrap();

        let wire = registry.serialize(&store, &result.records[0]).unwrap();
        assert_eq!(wire["type"], "pet");
        assert_eq!(wire["id"], "1");
        assert_eq!(wire["attributes"]["name"], "Rex");
        assert_eq!(wire["attributes"]["age"], 3);
        assert_eq!(wire["relationships"]["owner"]["data"]["id"], "7");
        assert_eq!(wire["relationships"]["tricks"]["data"][1]["id"], "roll");
    }

    #[test]
    fn integer_identifiers_use_decimal_text() {
        let model = ModelDescription::new().entity(
            EntityModel::new("Ticket")
                .attribute(AttributeModel::new("number", ScalarKind::Integer32).remote_id())
                .attribute(AttributeModel::new("title", ScalarKind::String)),
        );
        let registry = SchemaRegistry::new(&model, RegistryOptions::default()).unwrap();
        let mut store = MemoryStore::for_model(&model);

        let result = registry
            .update(
                &mut store,
                &json!({ "data": { "type": "ticket", "id": "42", "attributes": { "title": "Leak" } } }),
            )
            .unwrap();
        assert_eq!(
            store.get_field(&result.records[0], "number").unwrap(),
            FieldValue::Value(NativeValue::Integer32(42))
        );

        let wire = registry.serialize(&store, &result.records[0]).unwrap();
        assert_eq!(wire["id"], "42");
    }

    #[test]
    fn find_record_by_wire_id() {
        let (registry, mut store) = setup();
        registry
            .update(&mut store, &pet("1", json!({ "name": "Rex" }), json!({})))
            .unwrap();

        assert!(registry.find_record(&mut store, "pet", "1").unwrap().is_some());
        assert!(registry.find_record(&mut store, "pet", "2").unwrap().is_none());
    }
}
