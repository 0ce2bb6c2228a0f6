//! In-process data store for tests and dry runs.
//!
//! Interprets the structured [`StatementKind`] instead of SQL text. Writes
//! apply immediately; the first write after a commit snapshots the tables so
//! [`DataStore::rollback`] can restore them.

use std::collections::BTreeMap;

use async_trait::async_trait;

use bulkload_core::{Dialect, Error, GenericDialect, Result, Statement, StatementKind, Value};

use crate::store::DataStore;

pub type Row = BTreeMap<String, Value>;

/// One table: rows plus optional serial column and unique constraints.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Vec<Row>,
    serial: Option<String>,
    next_serial: i64,
    unique: Vec<Vec<String>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            next_serial: 1,
            ..Self::default()
        }
    }

    /// Column filled with increasing integers when an insert omits it.
    pub fn serial(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.unique.push(vec![column.clone()]);
        self.serial = Some(column);
        self
    }

    /// Reject inserts that duplicate these columns (NULLs never conflict).
    pub fn unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn insert(&mut self, columns: &[String], values: &[Value]) -> Result<()> {
        let mut row: Row = columns.iter().cloned().zip(values.iter().cloned()).collect();
        if let Some(serial) = &self.serial {
            if row.get(serial).is_none_or(Value::is_null) {
                row.insert(serial.clone(), Value::Int(self.next_serial));
                self.next_serial += 1;
            }
        }

        for constraint in &self.unique {
            let candidate = project(&row, constraint);
            if candidate.iter().any(Value::is_null) {
                continue;
            }
            if self.rows.iter().any(|existing| project(existing, constraint) == candidate) {
                return Err(Error::Store(format!(
                    "duplicate key value violates unique constraint on ({})",
                    constraint.join(", ")
                )));
            }
        }

        self.rows.push(row);
        Ok(())
    }

    fn update(&mut self, set_columns: &[String], key_columns: &[String], values: &[Value]) -> u64 {
        let (assignments, key) = values.split_at(set_columns.len());
        let mut affected = 0;
        for row in self.rows.iter_mut().filter(|row| matches_key(row, key_columns, key)) {
            for (column, value) in set_columns.iter().zip(assignments) {
                row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        affected
    }
}

/// A statement the store received, kept for assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub tuples: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    dialect: GenericDialect,
    tables: BTreeMap<String, MemoryTable>,
    snapshot: Option<BTreeMap<String, MemoryTable>>,
    explicit: bool,
    commits: usize,
    executed: Vec<ExecutedStatement>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_dialect(GenericDialect::default())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a dialect with custom capabilities (e.g. no tuple comparison).
    pub fn with_dialect(dialect: GenericDialect) -> Self {
        Self {
            dialect,
            tables: BTreeMap::new(),
            snapshot: None,
            explicit: false,
            commits: 0,
            executed: Vec::new(),
        }
    }

    pub fn create_table(&mut self, name: impl Into<String>, table: MemoryTable) {
        self.tables.insert(name.into(), table);
    }

    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    /// Rows of `name`, empty when the table does not exist.
    pub fn rows(&self, name: &str) -> &[Row] {
        self.tables.get(name).map(MemoryTable::rows).unwrap_or(&[])
    }

    /// Every statement sent to the store, in order.
    pub fn executed(&self) -> &[ExecutedStatement] {
        &self.executed
    }

    pub fn round_trips(&self) -> usize {
        self.executed.len()
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn has_pending_writes(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Start a caller-managed transaction.
    pub fn begin(&mut self) {
        self.explicit = true;
    }

    /// End a caller-managed transaction, keeping its writes.
    pub fn commit_transaction(&mut self) {
        self.snapshot = None;
        self.explicit = false;
        self.commits += 1;
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemoryTable> {
        if self.snapshot.is_none() {
            self.snapshot = Some(self.tables.clone());
        }
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::Store(format!("relation \"{name}\" does not exist")))
    }

    fn record(&mut self, statement: &Statement, tuples: usize) {
        self.executed.push(ExecutedStatement {
            sql: statement.sql.clone(),
            tuples,
        });
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    fn dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn in_explicit_transaction(&self) -> bool {
        self.explicit
    }

    async fn execute_many(&mut self, statement: &Statement, params: &[Vec<Value>]) -> Result<u64> {
        self.record(statement, params.len());
        match &statement.kind {
            StatementKind::Insert { table, columns } => {
                let table = self.table_mut(table)?;
                for values in params {
                    table.insert(columns, values)?;
                }
                Ok(params.len() as u64)
            }
            StatementKind::Update {
                table,
                set_columns,
                key_columns,
            } => {
                let table = self.table_mut(table)?;
                Ok(params
                    .iter()
                    .map(|values| table.update(set_columns, key_columns, values))
                    .sum())
            }
            StatementKind::Exists { .. } => Err(Error::Store(
                "existence lookups must go through fetch_all".to_string(),
            )),
        }
    }

    async fn fetch_all(
        &mut self,
        statement: &Statement,
        params: &[Value],
    ) -> Result<Vec<Vec<Value>>> {
        self.record(statement, 1);
        let StatementKind::Exists {
            table, key_columns, ..
        } = &statement.kind
        else {
            return Err(Error::Store("only existence lookups return rows".to_string()));
        };
        if !self.dialect.supports_tuple_comparison() {
            return Err(Error::Store("syntax error at or near \",\"".to_string()));
        }

        let table = self
            .tables
            .get(table)
            .ok_or_else(|| Error::Store(format!("relation \"{table}\" does not exist")))?;
        let wanted: Vec<&[Value]> = params.chunks(key_columns.len()).collect();
        Ok(table
            .rows()
            .iter()
            .filter(|row| wanted.iter().any(|key| matches_key(row, key_columns, key)))
            .map(|row| project(row, key_columns))
            .collect())
    }

    async fn commit(&mut self) -> Result<()> {
        self.snapshot = None;
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.tables = snapshot;
        }
        self.explicit = false;
        Ok(())
    }
}

fn project(row: &Row, columns: &[String]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| row.get(column).cloned().unwrap_or(Value::Null))
        .collect()
}

// SQL `=`: NULL never matches.
fn matches_key(row: &Row, columns: &[String], key: &[Value]) -> bool {
    columns.iter().zip(key).all(|(column, expected)| {
        !expected.is_null() && row.get(column).is_some_and(|actual| actual == expected)
    })
}
