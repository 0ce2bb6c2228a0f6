use bulkload_core::{
    Error, Field, FieldType, GenericDialect, KeySet, PostgresDialect, Schema, StatementKind,
    exists_statement, insert_statement, update_statement,
};

fn person() -> Schema {
    Schema::new(
        "app.person",
        "id",
        vec![
            Field::auto("id", FieldType::Integer),
            Field::new("email", FieldType::Text),
            Field::new("name", FieldType::Text),
            Field::new("order", FieldType::Integer),
        ],
    )
}

#[test]
fn builds_insert_over_writable_fields() {
    let statement = insert_statement(&PostgresDialect, &person()).expect("insert");
    assert_eq!(
        statement.sql,
        r#"INSERT INTO "app"."person" ("email", "name", "order") VALUES ($1, $2, $3)"#
    );
    assert_eq!(statement.arity, 3);
}

#[test]
fn builds_update_with_values_before_keys() {
    let schema = person();
    let keys = schema.key_fields(&KeySet::fields(["email"])).unwrap();
    let statement = update_statement(&PostgresDialect, &schema, &keys).expect("update");
    assert_eq!(
        statement.sql,
        r#"UPDATE "app"."person" SET "name" = $1, "order" = $2 WHERE "email" = $3"#
    );
    assert_eq!(
        statement.kind,
        StatementKind::Update {
            table: "app.person".to_string(),
            set_columns: vec!["name".to_string(), "order".to_string()],
            key_columns: vec!["email".to_string()],
        }
    );
}

#[test]
fn update_by_primary_key_targets_auto_field() {
    let schema = person();
    let keys = schema.key_fields(&KeySet::Primary).unwrap();
    let statement = update_statement(&GenericDialect::default(), &schema, &keys).unwrap();
    assert_eq!(
        statement.sql,
        r#"UPDATE "app"."person" SET "email" = ?, "name" = ?, "order" = ? WHERE "id" = ?"#
    );
    assert_eq!(statement.arity, 4);
}

#[test]
fn update_without_value_fields_is_skipped() {
    let schema = Schema::new(
        "tag",
        "label",
        vec![Field::new("label", FieldType::Text)],
    );
    let keys = schema.key_fields(&KeySet::Primary).unwrap();
    assert!(update_statement(&PostgresDialect, &schema, &keys).is_none());
}

#[test]
fn builds_tuple_membership_select() {
    let schema = person();
    let keys = schema.key_fields(&KeySet::fields(["name", "email"])).unwrap();
    let statement = exists_statement(&PostgresDialect, &schema, &keys, 2).expect("exists");
    assert_eq!(
        statement.sql,
        r#"SELECT "email", "name" FROM "app"."person" WHERE ("email", "name") IN (($1, $2), ($3, $4))"#
    );
    assert_eq!(statement.arity, 4);
}

#[test]
fn tuple_select_requires_dialect_support() {
    let schema = person();
    let keys = schema.key_fields(&KeySet::fields(["email"])).unwrap();
    let dialect = GenericDialect {
        tuple_comparison: false,
        max_bind_parameters: Some(999),
    };
    let err = exists_statement(&dialect, &schema, &keys, 1).unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}
