//! Parameterized statement generation for bulk writes and key lookups.

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};

/// Structured description of a generated statement.
///
/// Stores that do not speak SQL interpret this instead of the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Insert {
        table: String,
        columns: Vec<String>,
    },
    Update {
        table: String,
        set_columns: Vec<String>,
        key_columns: Vec<String>,
    },
    Exists {
        table: String,
        key_columns: Vec<String>,
        tuples: usize,
    },
}

/// Statement text plus the number of values each execution binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub arity: usize,
}

/// `INSERT INTO t (cols) VALUES (...)` over all writable fields, executed once per record.
pub fn insert_statement(dialect: &dyn Dialect, schema: &Schema) -> Result<Statement> {
    let fields = schema.writable_fields();
    if fields.is_empty() {
        return Err(Error::Configuration(format!(
            "schema `{}` has no writable fields",
            schema.table
        )));
    }

    let columns = column_names(&fields);
    let placeholders = (1..=fields.len())
        .map(|position| dialect.placeholder(position))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_table(&schema.table),
        quoted_list(dialect, &columns),
        placeholders
    );

    Ok(Statement {
        arity: columns.len(),
        kind: StatementKind::Insert {
            table: schema.table.clone(),
            columns,
        },
        sql,
    })
}

/// `UPDATE t SET v=... WHERE k=... AND ...`.
///
/// Parameters per record are the value fields followed by the key fields.
/// Returns `None` when every writable field is part of the key.
pub fn update_statement(
    dialect: &dyn Dialect,
    schema: &Schema,
    key_fields: &[&Field],
) -> Option<Statement> {
    let value_fields = schema.value_fields(key_fields);
    if value_fields.is_empty() || key_fields.is_empty() {
        return None;
    }

    let set_columns = column_names(&value_fields);
    let key_columns = column_names(key_fields);
    let mut position = 0;
    let mut assign = |column: &String| {
        position += 1;
        format!(
            "{} = {}",
            dialect.quote_identifier(column),
            dialect.placeholder(position)
        )
    };

    let assignments = set_columns.iter().map(&mut assign).collect::<Vec<_>>();
    let conditions = key_columns.iter().map(&mut assign).collect::<Vec<_>>();
    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.quote_table(&schema.table),
        assignments.join(", "),
        conditions.join(" AND ")
    );

    Some(Statement {
        arity: set_columns.len() + key_columns.len(),
        kind: StatementKind::Update {
            table: schema.table.clone(),
            set_columns,
            key_columns,
        },
        sql,
    })
}

/// `SELECT keys FROM t WHERE (keys) IN ((...), ...)` with `tuples` groups.
///
/// Requires row-value comparison support from the dialect.
pub fn exists_statement(
    dialect: &dyn Dialect,
    schema: &Schema,
    key_fields: &[&Field],
    tuples: usize,
) -> Result<Statement> {
    if !dialect.supports_tuple_comparison() {
        return Err(Error::Store(format!(
            "{} does not support tuple comparison; upsert is unavailable",
            dialect.engine()
        )));
    }
    if key_fields.is_empty() || tuples == 0 {
        return Err(Error::Configuration(
            "existence lookup needs at least one key field and one tuple".to_string(),
        ));
    }

    let key_columns = column_names(key_fields);
    let quoted = quoted_list(dialect, &key_columns);
    let width = key_columns.len();
    let groups = (0..tuples)
        .map(|tuple| {
            let placeholders = (1..=width)
                .map(|offset| dialect.placeholder(tuple * width + offset))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({placeholders})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {quoted} FROM {} WHERE ({quoted}) IN ({groups})",
        dialect.quote_table(&schema.table)
    );

    Ok(Statement {
        arity: width * tuples,
        kind: StatementKind::Exists {
            table: schema.table.clone(),
            key_columns,
            tuples,
        },
        sql,
    })
}

fn column_names(fields: &[&Field]) -> Vec<String> {
    fields.iter().map(|field| field.column().to_string()).collect()
}

fn quoted_list(dialect: &dyn Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| dialect.quote_identifier(column))
        .collect::<Vec<_>>()
        .join(", ")
}
