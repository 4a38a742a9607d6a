//! End-to-end tests against an in-memory backend.

use canter_core::{
    assert_fact, connect, AssertValue, Config, Connection, CoreError, EntityData, EntityValue,
    Id, Ident, IdentRef, KvStore, Lookup, Resolve, TempId, Value, ID_CARDINALITY, ID_IDENT,
    ID_TYPE,
};
use canter_kv::{KvBackend, MemoryBackend};
use std::sync::Arc;

/// A connection over a fresh in-memory store with the system schema
/// installed.
fn memory_connection() -> Connection {
    let store = Arc::new(KvStore::new(Arc::new(MemoryBackend::new())).unwrap());
    let conn = connect(Config::from_store(store));
    conn.initialize_db().unwrap();
    conn
}

/// A connection initialized with the person/pet schema used across tests.
fn test_connection() -> Connection {
    let conn = memory_connection();
    conn.assert(&[
        &EntityData::new()
            .with("db/ident", "person/email")
            .with("db/type", "db.type/string")
            .with("db/unique", true)
            .with("db/cardinality", "db.cardinality/one")
            .with(
                "db/doc",
                "An individual email address. Used to uniquely identify a person.",
            ),
        &EntityData::new()
            .with("db/ident", "person/ssn")
            .with("db/type", "db.type/string")
            .with("db/unique", true)
            .with("db/cardinality", "db.cardinality/one")
            .with(
                "db/doc",
                "A Social Security Number. Used to uniquely identify a person.",
            ),
        &EntityData::new()
            .with("db/ident", "person/firstName")
            .with("db/type", "db.type/string")
            .with("db/cardinality", "db.cardinality/one"),
        &EntityData::new()
            .with("db/ident", "person/lastName")
            .with("db/type", "db.type/string")
            .with("db/cardinality", "db.cardinality/one"),
        &EntityData::new()
            .with("db/ident", "person/pets")
            .with("db/type", "db.type/ref")
            .with("db/cardinality", "db.cardinality/many"),
        &EntityData::new()
            .with("db/ident", "person/age")
            .with("db/type", "db.type/int16")
            .with("db/cardinality", "db.cardinality/one"),
        &EntityData::new()
            .with("db/ident", "pet/name")
            .with("db/type", "db.type/string")
            .with("db/cardinality", "db.cardinality/one"),
        &EntityData::new()
            .with("db/ident", "pet/breed")
            .with("db/type", "db.type/string")
            .with("db/cardinality", "db.cardinality/one"),
    ])
    .unwrap();
    conn
}

fn one(value: Value) -> EntityValue {
    EntityValue::One(value)
}

#[test]
fn resolve_system_idents() {
    let conn = memory_connection();

    let by_name = conn
        .resolve_idents(&[
            IdentRef::from("db/ident"),
            IdentRef::from("db/type"),
            IdentRef::from("db/cardinality"),
        ])
        .unwrap();
    assert_eq!(
        by_name,
        vec![
            Ident::new(ID_IDENT, "db/ident"),
            Ident::new(ID_TYPE, "db/type"),
            Ident::new(ID_CARDINALITY, "db/cardinality"),
        ]
    );
    assert_eq!(ID_IDENT, Id::new(-2));
    assert_eq!(ID_TYPE, Id::new(-3));
    assert_eq!(ID_CARDINALITY, Id::new(-5));

    let by_id = conn
        .resolve_idents(&[
            IdentRef::from(ID_IDENT),
            IdentRef::from(ID_TYPE),
            IdentRef::from(ID_CARDINALITY),
        ])
        .unwrap();
    assert_eq!(by_name, by_id);
}

#[test]
fn resolve_idents_output_is_parallel_to_mixed_input() {
    let conn = test_connection();

    let email = conn.resolve_ident("person/email").unwrap();
    let ssn = conn.resolve_ident("person/ssn").unwrap();

    let resolved = conn
        .resolve_idents(&[
            IdentRef::from("person/ssn"),
            IdentRef::from(email.id),
            IdentRef::from(ssn.clone()),
            IdentRef::from("person/firstName"),
        ])
        .unwrap();
    assert_eq!(resolved[0], ssn);
    assert_eq!(resolved[1], email);
    assert_eq!(resolved[2], ssn);
    assert_eq!(resolved[3].name, "person/firstName");
}

#[test]
fn ident_bijectivity() {
    let conn = test_connection();

    let by_name = conn.resolve_ident("person/email").unwrap();
    let by_id = conn.resolve_ident(by_name.id).unwrap();
    assert_eq!(by_name, by_id);
    assert!(by_name.id.as_i64() > 0);
}

#[test]
fn unknown_ident_is_an_error() {
    let conn = memory_connection();
    let err = conn.resolve_ident("missing/name").unwrap_err();
    assert!(matches!(err, CoreError::NoSuchIdent { .. }));
}

#[test]
fn reserved_namespace_is_rejected() {
    let conn = memory_connection();
    let err = conn.resolve_ident("db/custom").unwrap_err();
    assert!(matches!(err, CoreError::ReservedNamespace { .. }));
}

#[test]
fn assert_schema_entity_and_read_it_back() {
    let conn = memory_connection();
    let result = conn
        .assert(&[&EntityData::new()
            .with("db/ident", "person/email")
            .with("db/type", "db.type/string")
            .with("db/unique", true)
            .with("db/cardinality", "db.cardinality/one")])
        .unwrap();
    assert!(!result.db.basis.is_unresolved());

    let eid = Ident::named("person/email").resolve(&conn).unwrap();
    assert!(eid.as_i64() > 0);

    let entity = conn.get_entity(&eid).unwrap();
    let data = entity.get_data(&conn).unwrap();
    assert_eq!(data["db/ident"], one(Value::Ref(eid)));
    assert_eq!(data["db/type"], one(Value::Ref(Id::new(-511))));
    assert_eq!(data["db/unique"], one(Value::Boolean(true)));
    assert_eq!(data["db/cardinality"], one(Value::Ref(Id::new(-10))));
}

#[test]
fn unique_attribute_upserts_into_existing_entity() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "ameredith@example.com")
        .with("person/firstName", "Andrew")])
        .unwrap();

    conn.assert(&[&EntityData::new()
        .with("person/email", "ameredith@example.com")
        .with("person/lastName", "Meredith")])
        .unwrap();

    let entity = conn
        .get_entity(&Lookup::new("person/email", "ameredith@example.com"))
        .unwrap();
    let data = entity.get_data(&conn).unwrap();
    assert_eq!(
        data["person/email"],
        one(Value::String("ameredith@example.com".into()))
    );
    assert_eq!(data["person/firstName"], one(Value::String("Andrew".into())));
    assert_eq!(
        data["person/lastName"],
        one(Value::String("Meredith".into()))
    );
    assert_eq!(data.len(), 3);
}

#[test]
fn lookup_is_stable_across_upserts() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "a@x")
        .with("person/firstName", "Ann")])
        .unwrap();
    let first = Lookup::new("person/email", "a@x").resolve(&conn).unwrap();

    conn.assert(&[&EntityData::new()
        .with("person/email", "a@x")
        .with("person/lastName", "Lee")])
        .unwrap();
    let second = Lookup::new("person/email", "a@x").resolve(&conn).unwrap();

    assert_eq!(first, second);
}

#[test]
fn multiple_unique_identifiers_converge_on_one_entity() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "bob@example.com")
        .with("person/ssn", "123-45-6789")
        .with("person/firstName", "Bob")])
        .unwrap();

    conn.assert(&[&EntityData::new()
        .with("person/email", "bob@example.com")
        .with("person/lastName", "Smith")])
        .unwrap();

    let pet_id = TempId::new();
    let result = conn
        .assert(&[
            &EntityData::new()
                .with("person/ssn", "123-45-6789")
                .with(
                    "person/pets",
                    AssertValue::List(vec![pet_id.clone().into()]),
                ),
            &EntityData::new()
                .with("db/id", pet_id.clone())
                .with("pet/name", "Sir Wimbledon")
                .with("pet/breed", "Whippet"),
        ])
        .unwrap();
    let resolved_pet = result.temp_ids.lookup(&pet_id).expect("pet temp id bound");
    assert!(!resolved_pet.is_unresolved());

    let entity = conn
        .get_entity(&Lookup::new("person/email", "bob@example.com"))
        .unwrap();
    let data = entity.get_data(&conn).unwrap();
    assert_eq!(
        data["person/email"],
        one(Value::String("bob@example.com".into()))
    );
    assert_eq!(
        data["person/ssn"],
        one(Value::String("123-45-6789".into()))
    );
    assert_eq!(data["person/firstName"], one(Value::String("Bob".into())));
    assert_eq!(data["person/lastName"], one(Value::String("Smith".into())));
    assert_eq!(
        data["person/pets"],
        EntityValue::Many(vec![Value::Ref(resolved_pet)])
    );

    let by_email = Lookup::new("person/email", "bob@example.com")
        .resolve(&conn)
        .unwrap();
    let by_ssn = Lookup::new("person/ssn", "123-45-6789")
        .resolve(&conn)
        .unwrap();
    assert_eq!(by_email, by_ssn);

    let pet = conn.get_entity(&resolved_pet).unwrap();
    assert_eq!(
        pet.get(&conn, "pet/name").unwrap(),
        one(Value::String("Sir Wimbledon".into()))
    );
}

#[test]
fn disagreeing_unique_attributes_conflict() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "bob@example.com")
        .with("person/ssn", "123-45-6789")
        .with("person/firstName", "Bob")])
        .unwrap();

    // The SSN identifies Bob, but the email identifies no entity; the
    // batch must not silently re-key Bob.
    let err = conn
        .assert(&[&EntityData::new()
            .with("person/email", "carol@example.com")
            .with("person/ssn", "123-45-6789")])
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }), "got {err}");
}

#[test]
fn unique_attributes_naming_two_entities_conflict() {
    let conn = test_connection();

    conn.assert(&[
        &EntityData::new()
            .with("person/email", "bob@example.com")
            .with("person/ssn", "111-11-1111"),
        &EntityData::new()
            .with("person/email", "carol@example.com")
            .with("person/ssn", "222-22-2222"),
    ])
    .unwrap();

    let err = conn
        .assert(&[&EntityData::new()
            .with("person/email", "bob@example.com")
            .with("person/ssn", "222-22-2222")])
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict { .. }), "got {err}");
}

#[test]
fn temp_id_unifies_across_assertions() {
    let conn = test_connection();

    let person = TempId::new();
    let result = conn
        .assert(&[
            &assert_fact(person.clone(), "person/firstName", "Ann"),
            &assert_fact(person.clone(), "person/lastName", "Lee"),
        ])
        .unwrap();

    let id = result.temp_ids.lookup(&person).expect("temp id bound");
    assert!(!id.is_unresolved());

    let written: Vec<_> = result
        .data
        .iter()
        .filter(|ra| ra.fact.entity == id)
        .collect();
    assert_eq!(written.len(), 2);
}

#[test]
fn cardinality_many_preserves_all_values() {
    let conn = test_connection();

    let (rex, fido, rover) = (TempId::new(), TempId::new(), TempId::new());
    let result = conn
        .assert(&[
            &EntityData::new().with("person/email", "e@x").with(
                "person/pets",
                AssertValue::List(vec![
                    rex.clone().into(),
                    fido.clone().into(),
                    rover.clone().into(),
                ]),
            ),
            &EntityData::new()
                .with("db/id", rex.clone())
                .with("pet/name", "Rex"),
            &EntityData::new()
                .with("db/id", fido.clone())
                .with("pet/name", "Fido"),
            &EntityData::new()
                .with("db/id", rover.clone())
                .with("pet/name", "Rover"),
        ])
        .unwrap();

    let mut expected: Vec<Id> = [rex, fido, rover]
        .iter()
        .map(|t| result.temp_ids.lookup(t).unwrap())
        .collect();

    let entity = conn
        .get_entity(&Lookup::new("person/email", "e@x"))
        .unwrap();
    let pets = entity.get(&conn, "person/pets").unwrap();
    let mut actual: Vec<Id> = pets
        .as_many()
        .unwrap()
        .iter()
        .map(|v| v.as_ref_id().unwrap())
        .collect();

    assert_eq!(actual.len(), 3);
    expected.sort();
    actual.sort();
    assert_eq!(actual, expected);
}

#[test]
fn read_your_writes_per_attribute() {
    let conn = test_connection();

    let result = conn
        .assert(&[&EntityData::new()
            .with("person/email", "ann@x")
            .with("person/age", 41i64)])
        .unwrap();
    assert!(!result.db.basis.is_unresolved());

    let entity = conn
        .get_entity(&Lookup::new("person/email", "ann@x"))
        .unwrap();
    // int16 attribute: the stored value is the narrowed type.
    assert_eq!(entity.get(&conn, "person/age").unwrap(), one(Value::Int16(41)));
    assert_eq!(entity.basis(), result.db.basis);
}

#[test]
fn integer_out_of_range_fails_the_batch() {
    let conn = test_connection();

    let err = conn
        .assert(&[&EntityData::new()
            .with("person/email", "f@x")
            .with("person/age", 40_000i64)])
        .unwrap_err();
    assert!(matches!(err, CoreError::OutOfRange { .. }), "got {err}");

    // Nothing from the failed batch is visible.
    let err = Lookup::new("person/email", "f@x").resolve(&conn).unwrap_err();
    assert!(matches!(err, CoreError::NoSuchEntity));
}

#[test]
fn asserting_against_unknown_attribute_fails() {
    let conn = memory_connection();
    let err = conn
        .assert(&[&EntityData::new().with("missing/attr", "x")])
        .unwrap_err();
    assert!(matches!(err, CoreError::NoSuchIdent { .. }), "got {err}");
}

#[test]
fn asserting_against_non_schema_entity_fails() {
    let conn = memory_connection();
    // db.cardinality/one exists as an ident but carries no db/type fact.
    let err = conn
        .assert(&[&assert_fact(Id::new(500), "db.cardinality/one", true)])
        .unwrap_err();
    assert!(matches!(err, CoreError::NotSchemaEntity { .. }), "got {err}");
}

#[test]
fn validation_errors_are_collected_before_any_write() {
    let conn = test_connection();

    let err = conn
        .assert(&[
            &assert_fact(Id::new(1), "", true),
            &assert_fact("", "person/firstName", "x"),
        ])
        .unwrap_err();
    match err {
        CoreError::InvalidAssertions { messages } => assert_eq!(messages.len(), 2),
        other => panic!("expected InvalidAssertions, got {other}"),
    }
}

#[test]
fn db_id_pinning_requires_an_existing_entity() {
    let conn = test_connection();

    let err = conn
        .assert(&[&assert_fact(TempId::new(), "db/id", Id::new(999_999))])
        .unwrap_err();
    assert!(matches!(err, CoreError::NoSuchEntity), "got {err}");
}

#[test]
fn retraction_hides_a_fact_from_entity_reads() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "r@x")
        .with("person/firstName", "Rae")])
        .unwrap();
    let eid = Lookup::new("person/email", "r@x").resolve(&conn).unwrap();

    conn.assert(&[&canter_core::retract_fact(eid, "person/firstName", "Rae")])
        .unwrap();

    let entity = conn.get_entity(&eid).unwrap();
    let err = entity.get(&conn, "person/firstName").unwrap_err();
    assert!(matches!(err, CoreError::PropertyNotFound));
    // The unique email is untouched.
    assert_eq!(
        entity.get(&conn, "person/email").unwrap(),
        one(Value::String("r@x".into()))
    );
}

#[test]
fn redaction_hides_a_fact_from_entity_reads() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new()
        .with("person/email", "x@x")
        .with("person/ssn", "999-99-9999")])
        .unwrap();
    let eid = Lookup::new("person/email", "x@x").resolve(&conn).unwrap();

    conn.assert(&[&canter_core::redact_fact(eid, "person/ssn", "999-99-9999")])
        .unwrap();

    let entity = conn.get_entity(&eid).unwrap();
    let err = entity.get(&conn, "person/ssn").unwrap_err();
    assert!(matches!(err, CoreError::PropertyNotFound));
    // The redacted value no longer resolves through the unique index.
    let err = Lookup::new("person/ssn", "999-99-9999")
        .resolve(&conn)
        .unwrap_err();
    assert!(matches!(err, CoreError::NoSuchEntity));
}

#[test]
fn missing_property_is_recoverable() {
    let conn = test_connection();

    conn.assert(&[&EntityData::new().with("person/email", "m@x")])
        .unwrap();
    let entity = conn
        .get_entity(&Lookup::new("person/email", "m@x"))
        .unwrap();
    let err = entity.get(&conn, "person/lastName").unwrap_err();
    assert!(matches!(err, CoreError::PropertyNotFound));
}

#[test]
fn lookup_on_non_unique_attribute_fails() {
    let conn = test_connection();
    let err = Lookup::new("person/firstName", "Ann")
        .resolve(&conn)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotUnique { .. }));
}

#[test]
fn commit_time_fact_is_written_for_every_transaction() {
    let conn = test_connection();

    let result = conn
        .assert(&[&EntityData::new().with("person/email", "t@x")])
        .unwrap();

    let tx = result.db.basis;
    let tx_entity = conn.get_entity(&tx).unwrap();
    let commit_time = tx_entity.get(&conn, "db.tx/commitTime").unwrap();
    assert!(matches!(commit_time, EntityValue::One(Value::Timestamp(_))));
}

#[test]
fn transactions_are_totally_ordered_by_basis() {
    let conn = test_connection();

    let first = conn
        .assert(&[&EntityData::new().with("person/email", "1@x")])
        .unwrap();
    let second = conn
        .assert(&[&EntityData::new().with("person/email", "2@x")])
        .unwrap();
    assert!(second.db.basis > first.db.basis);
}

#[test]
fn reopening_the_store_preserves_idents_and_facts() {
    let backend = Arc::new(MemoryBackend::new());
    {
        let store = Arc::new(KvStore::new(Arc::clone(&backend) as Arc<dyn KvBackend>).unwrap());
        let conn = connect(Config::from_store(store));
        conn.initialize_db().unwrap();
        conn.assert(&[&EntityData::new()
            .with("db/ident", "person/email")
            .with("db/type", "db.type/string")
            .with("db/unique", true)
            .with("db/cardinality", "db.cardinality/one")])
            .unwrap();
        conn.assert(&[&EntityData::new().with("person/email", "persist@x")])
            .unwrap();
    }

    // A second connection over the same backend hydrates the user ident
    // and sees the committed facts.
    let store = Arc::new(KvStore::new(backend as Arc<dyn KvBackend>).unwrap());
    let conn = connect(Config::from_store(store));
    conn.initialize_db().unwrap();

    let entity = conn
        .get_entity(&Lookup::new("person/email", "persist@x"))
        .unwrap();
    assert_eq!(
        entity.get(&conn, "person/email").unwrap(),
        one(Value::String("persist@x".into()))
    );
}
