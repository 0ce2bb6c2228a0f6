/// SQL flavour of a data store: identifier quoting, placeholders and limits.
pub trait Dialect: Send + Sync {
    /// Returns the engine identifier (e.g. `postgres`).
    fn engine(&self) -> &'static str;

    /// Quote a single identifier (column or table part).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Placeholder for the 1-based parameter `position` of a statement.
    fn placeholder(&self, position: usize) -> String;

    /// Whether `(a, b) IN ((?, ?), ...)` row comparisons are understood.
    fn supports_tuple_comparison(&self) -> bool;

    /// Upper bound on bind parameters in one statement, if the store has one.
    fn max_bind_parameters(&self) -> Option<usize> {
        None
    }

    /// Fractional second digits the store keeps for timestamps, if limited.
    fn timestamp_precision(&self) -> Option<u16> {
        None
    }

    /// Quote a table name, handling `schema.table`.
    fn quote_table(&self, table: &str) -> String {
        table
            .split('.')
            .map(|part| self.quote_identifier(part.trim_matches('"')))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// PostgreSQL: `$n` placeholders, a 65535 bind-parameter ceiling and
/// microsecond timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, position: usize) -> String {
        format!("${position}")
    }

    fn supports_tuple_comparison(&self) -> bool {
        true
    }

    fn max_bind_parameters(&self) -> Option<usize> {
        Some(u16::MAX as usize)
    }

    fn timestamp_precision(&self) -> Option<u16> {
        Some(6)
    }
}

/// `?` placeholders with configurable capabilities.
#[derive(Debug, Clone, Copy)]
pub struct GenericDialect {
    pub tuple_comparison: bool,
    pub max_bind_parameters: Option<usize>,
}

impl Default for GenericDialect {
    fn default() -> Self {
        Self {
            tuple_comparison: true,
            max_bind_parameters: None,
        }
    }
}

impl Dialect for GenericDialect {
    fn engine(&self) -> &'static str {
        "generic"
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn supports_tuple_comparison(&self) -> bool {
        self.tuple_comparison
    }

    fn max_bind_parameters(&self) -> Option<usize> {
        self.max_bind_parameters
    }
}
