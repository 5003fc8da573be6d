//! The driver boundary.
//!
//! The mapper only ever talks to a database through these traits: open a
//! connection, run a [`Command`] as a non-query, scalar or reader, create a
//! large-text value, and pass transactions through. Everything vendor
//! specific lives behind them.

use rowbind_core::{Result, Value};

/// Storage type a parameter is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// No type declared; the driver picks one.
    Default,
    Int32,
    Int64,
    Decimal,
    DateTime,
    Text,
    LargeText,
    Binary,
    Cursor,
}

/// Whether a parameter carries a value in or out of the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Input,
    Output,
}

/// A parameter ready to be attached to a command.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// Placeholder name without the leading colon (`"0"`, `"1"`, or a key).
    pub name: String,
    pub storage_type: StorageType,
    pub direction: Direction,
    /// Declared size, when the storage type needs one.
    pub size: Option<usize>,
    pub value: Value,
}

/// SQL text plus its parameters, in binding order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub sql: String,
    pub parameters: Vec<BoundParameter>,
}

impl Command {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn add_parameter(&mut self, parameter: BoundParameter) {
        self.parameters.push(parameter);
    }

    pub fn parameter(&self, name: &str) -> Option<&BoundParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Forward-only cursor over a result set.
pub trait Reader {
    /// Advance to the next row. Returns `false` once the rows are exhausted.
    fn read(&mut self) -> Result<bool>;

    fn field_count(&self) -> usize;

    fn name(&self, index: usize) -> &str;

    /// Value of column `index` in the current row; NULL is [`Value::Null`].
    fn value(&self, index: usize) -> Result<Value>;
}

/// An open physical connection.
pub trait DriverConnection {
    /// Run a statement and return the number of affected rows.
    fn execute_non_query(&mut self, command: &Command) -> Result<usize>;

    /// First column of the first row, or [`Value::Null`] when there are no rows.
    fn execute_scalar(&mut self, command: &Command) -> Result<Value>;

    /// Run a query and return an owning cursor over its rows.
    fn execute_reader(&mut self, command: &Command) -> Result<Box<dyn Reader>>;

    /// Turn `text` into the value bound for a large-text parameter.
    fn create_large_text(&mut self, text: &str) -> Result<Value>;

    fn begin_transaction(&mut self) -> Result<()>;

    fn commit(&mut self) -> Result<()>;

    fn rollback(&mut self) -> Result<()>;

    /// Release the physical connection.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Opens physical connections.
pub trait Driver {
    type Connection: DriverConnection;

    fn open(&self, connection_string: &str) -> Result<Self::Connection>;
}
