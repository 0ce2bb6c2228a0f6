use anyhow::{Context, Result};
use bulkload::{
    DynamicRecord, Field, FieldType, KeySet, PostgresStore, PostgresStoreOptions, Schema,
    UpsertOptions, insert_many, update_many, upsert_many,
};
use sqlx::PgPool;
use std::env;

const SETUP: &[&str] = &[
    "DROP SCHEMA IF EXISTS bulkload_it CASCADE",
    "CREATE SCHEMA bulkload_it",
    "CREATE TABLE bulkload_it.person (
        id bigserial PRIMARY KEY,
        email text NOT NULL UNIQUE,
        name text NOT NULL,
        \"order\" bigint,
        joined_at timestamptz
    )",
];

fn database_url() -> Option<String> {
    env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok()
}

async fn reset(pool: &PgPool) -> Result<()> {
    for sql in SETUP {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("executing setup `{sql}`"))?;
    }
    Ok(())
}

fn person_schema() -> Schema {
    Schema::new(
        "bulkload_it.person",
        "id",
        vec![
            Field::auto("id", FieldType::Integer),
            Field::new("email", FieldType::Text),
            Field::new("name", FieldType::Text),
            Field::new("order", FieldType::Integer),
            Field::new("joined_at", FieldType::Timestamp),
        ],
    )
}

fn person(email: &str, name: &str) -> DynamicRecord {
    DynamicRecord::new().with("email", email).with("name", name)
}

async fn names(pool: &PgPool) -> Result<Vec<(String, String)>> {
    sqlx::query_as("SELECT email, name FROM bulkload_it.person ORDER BY email")
        .fetch_all(pool)
        .await
        .context("reading people")
}

#[tokio::test]
async fn bulk_operations_round_trip_through_postgres() -> Result<()> {
    let Some(db_url) = database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL or DATABASE_URL for integration tests");
        return Ok(());
    };
    let mut store = PostgresStore::connect(&db_url, PostgresStoreOptions::default())
        .await
        .context("connecting to Postgres")?;
    let pool = store.pool().clone();
    reset(&pool).await?;
    let schema = person_schema();

    let mut seed = vec![
        person("a@x", "Ann").with("order", 1).with("joined_at", "2024-01-02T03:04:05Z"),
        person("b@x", "Bob"),
    ];
    let report = insert_many(&mut store, &schema, &mut seed).await?;
    assert_eq!(report.inserted, 2);

    let mut renames = vec![person("b@x", "Bobby")];
    let report = update_many(&mut store, &schema, &mut renames, &KeySet::fields(["email"])).await?;
    assert_eq!(report.affected, 1);

    let mut batch = vec![
        person("a@x", "Ann B."),
        person("c@x", "Cid"),
        person("c@x", "Cid 2"),
    ];
    let options = UpsertOptions::keyed_by(["email"]);
    let report = upsert_many(&mut store, &schema, &mut batch, &options).await?;
    assert_eq!(report.updated, 1);
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);

    assert_eq!(
        names(&pool).await?,
        vec![
            ("a@x".to_string(), "Ann B.".to_string()),
            ("b@x".to_string(), "Bobby".to_string()),
            ("c@x".to_string(), "Cid 2".to_string()),
        ]
    );

    let again = upsert_many(&mut store, &schema, &mut batch, &options).await?;
    assert_eq!(again.inserted, 0);

    Ok(())
}

#[tokio::test]
async fn explicit_transaction_is_left_to_the_caller() -> Result<()> {
    let Some(db_url) = database_url() else {
        return Ok(());
    };
    let mut store = PostgresStore::connect(&db_url, PostgresStoreOptions::default())
        .await
        .context("connecting to Postgres")?;
    let pool = store.pool().clone();
    sqlx::query("CREATE SCHEMA IF NOT EXISTS bulkload_tx")
        .execute(&pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS bulkload_tx.tag")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE TABLE bulkload_tx.tag (label text PRIMARY KEY, uses bigint)")
        .execute(&pool)
        .await?;

    let schema = Schema::new(
        "bulkload_tx.tag",
        "label",
        vec![
            Field::new("label", FieldType::Text),
            Field::new("uses", FieldType::Integer),
        ],
    );
    store.begin().await?;
    let mut batch = vec![DynamicRecord::new().with("label", "rust").with("uses", 3)];
    insert_many(&mut store, &schema, &mut batch).await?;

    let (visible,): (i64,) = sqlx::query_as("SELECT count(*) FROM bulkload_tx.tag")
        .fetch_one(&pool)
        .await?;
    assert_eq!(visible, 0, "uncommitted rows leaked outside the transaction");

    store.commit_transaction().await?;
    let (visible,): (i64,) = sqlx::query_as("SELECT count(*) FROM bulkload_tx.tag")
        .fetch_one(&pool)
        .await?;
    assert_eq!(visible, 1);

    Ok(())
}

struct KeyCase {
    table: &'static str,
    columns: &'static str,
    keys: &'static [&'static str],
    fields: Vec<Field>,
    record: DynamicRecord,
}

fn key_cases() -> Vec<KeyCase> {
    let note = || Field::new("note", FieldType::Text);
    vec![
        KeyCase {
            table: "int4_key",
            columns: "id integer PRIMARY KEY",
            keys: &["id"],
            fields: vec![Field::new("id", FieldType::Integer), note()],
            record: DynamicRecord::new().with("id", 7),
        },
        KeyCase {
            table: "numeric_key",
            columns: "sku numeric PRIMARY KEY",
            keys: &["sku"],
            fields: vec![Field::new("sku", FieldType::Integer), note()],
            record: DynamicRecord::new().with("sku", 7),
        },
        KeyCase {
            table: "fractional_numeric_key",
            columns: "price numeric(10, 2) PRIMARY KEY",
            keys: &["price"],
            fields: vec![Field::new("price", FieldType::Float), note()],
            record: DynamicRecord::new().with("price", 7.5),
        },
        KeyCase {
            table: "timestamptz_key",
            columns: "seen_at timestamptz UNIQUE",
            keys: &["seen_at"],
            fields: vec![Field::new("seen_at", FieldType::Timestamp), note()],
            record: DynamicRecord::new().with("seen_at", "2024-01-02T03:04:05.123456789Z"),
        },
        KeyCase {
            table: "uuid_key",
            columns: "id uuid PRIMARY KEY",
            keys: &["id"],
            fields: vec![Field::new("id", FieldType::Uuid), note()],
            record: DynamicRecord::new().with("id", "0b8e4a5c-9f3e-4c47-9d61-2f1f3c2a7b10"),
        },
        KeyCase {
            table: "char_key",
            columns: "code char(5) PRIMARY KEY",
            keys: &["code"],
            fields: vec![Field::new("code", FieldType::Text), note()],
            record: DynamicRecord::new().with("code", "ab"),
        },
        KeyCase {
            table: "composite_key",
            columns: "tenant integer, code text, PRIMARY KEY (tenant, code)",
            keys: &["tenant", "code"],
            fields: vec![
                Field::new("tenant", FieldType::Integer),
                Field::new("code", FieldType::Text),
                note(),
            ],
            record: DynamicRecord::new().with("tenant", 3).with("code", "ab"),
        },
    ]
}

#[tokio::test]
async fn upsert_recognizes_existing_keys_of_every_type() -> Result<()> {
    let Some(db_url) = database_url() else {
        return Ok(());
    };
    let mut store = PostgresStore::connect(&db_url, PostgresStoreOptions::default())
        .await
        .context("connecting to Postgres")?;
    let pool = store.pool().clone();
    for sql in ["DROP SCHEMA IF EXISTS bulkload_keys CASCADE", "CREATE SCHEMA bulkload_keys"] {
        sqlx::query(sql).execute(&pool).await?;
    }

    for case in key_cases() {
        let table = format!("bulkload_keys.{}", case.table);
        sqlx::query(&format!("CREATE TABLE {table} ({}, note text)", case.columns))
            .execute(&pool)
            .await
            .with_context(|| format!("creating {table}"))?;

        let schema = Schema::new(table.clone(), case.keys[0], case.fields);
        let options = UpsertOptions::keyed_by(case.keys.iter().copied());

        let mut batch = vec![case.record.clone().with("note", "first")];
        let first = upsert_many(&mut store, &schema, &mut batch, &options)
            .await
            .with_context(|| format!("first upsert into {table}"))?;
        assert_eq!(first.inserted, 1, "{table}");

        let mut batch = vec![case.record.with("note", "second")];
        let second = upsert_many(&mut store, &schema, &mut batch, &options)
            .await
            .with_context(|| format!("second upsert into {table}"))?;
        assert_eq!(second.inserted, 0, "{table}: existing key was not recognized");
        assert_eq!(second.updated, 1, "{table}");

        let (rows, note): (i64, Option<String>) =
            sqlx::query_as(&format!("SELECT count(*), max(note) FROM {table}"))
                .fetch_one(&pool)
                .await?;
        assert_eq!((rows, note.as_deref()), (1, Some("second")), "{table}");
    }

    Ok(())
}
