use bulkload_core::{FieldType, Schema, validate_schema};

#[test]
fn loads_schema_from_toml() {
    let source = r#"
table = "app.person"
primary_key = "id"

[[fields]]
name = "id"
type = "integer"
auto_generated = true

[[fields]]
name = "email"
type = "text"

[[fields]]
name = "name"
column = "full_name"
"#;

    let schema: Schema = toml::from_str(source).expect("parse schema");
    validate_schema(&schema).expect("valid schema");

    assert_eq!(schema.table, "app.person");
    assert_eq!(schema.fields.len(), 3);
    assert!(schema.fields[0].auto_generated);
    assert_eq!(schema.fields[1].field_type, FieldType::Text);
    assert_eq!(schema.fields[2].field_type, FieldType::Any);
    assert_eq!(schema.fields[2].column(), "full_name");
    assert_eq!(schema.writable_fields().len(), 2);
}
