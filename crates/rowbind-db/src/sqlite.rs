//! SQLite driver built on rusqlite.
//!
//! Parameters bind by name, so `:0` in the SQL text picks up the parameter
//! named `"0"`. Query results are read into memory per statement, which keeps
//! the returned [`Reader`] independent of the connection's borrow.

use std::collections::VecDeque;

use rowbind_core::value::DATETIME_FORMAT;
use rowbind_core::{Error, Result, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rust_decimal::prelude::ToPrimitive;

use crate::driver::{Command, Direction, Driver, DriverConnection, Reader};

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e)
}

/// Opens [`SqliteConnection`]s from a file path, `:memory:` or a `file:` URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn open(&self, connection_string: &str) -> Result<SqliteConnection> {
        let conn = rusqlite::Connection::open(connection_string).map_err(|e| {
            Error::database(format!("Failed to open database {connection_string}: {e}"))
        })?;
        SqliteConnection::from_connection(conn)
    }
}

/// A physical SQLite connection.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Adopt a connection opened elsewhere. Foreign keys are switched on.
    pub fn from_connection(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err)?;
        Ok(Self { conn })
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Prepare `command` and bind its parameters by name.
    ///
    /// Every parameter must have a placeholder and every placeholder must
    /// receive a parameter. Output parameters have no SQLite counterpart and
    /// bind as NULL.
    fn prepare(&self, command: &Command) -> Result<rusqlite::Statement<'_>> {
        let mut stmt = self.conn.prepare(&command.sql).map_err(db_err)?;
        let mut bound = vec![false; stmt.parameter_count()];

        for parameter in &command.parameters {
            let name = format!(":{}", parameter.name);
            let index = stmt
                .parameter_index(&name)
                .map_err(db_err)?
                .ok_or_else(|| {
                    Error::database(format!("Statement has no parameter named {name}"))
                })?;
            let value = if parameter.direction == Direction::Output {
                tracing::debug!(name = %parameter.name, "Binding output parameter as NULL");
                SqlValue::Null
            } else {
                to_sql_value(&parameter.value)?
            };
            stmt.raw_bind_parameter(index, value).map_err(db_err)?;
            bound[index - 1] = true;
        }

        if let Some(i) = bound.iter().position(|b| !b) {
            let name = stmt.parameter_name(i + 1).unwrap_or("?").to_string();
            return Err(Error::database(format!(
                "Statement parameter {name} was not bound"
            )));
        }
        Ok(stmt)
    }
}

fn to_sql_value(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(v) => SqlValue::Integer(*v),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Decimal(d) => SqlValue::Real(
            d.to_f64()
                .ok_or_else(|| Error::unsupported(format!("decimal {d} does not fit REAL")))?,
        ),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATETIME_FORMAT).to_string()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Cursor => {
            return Err(Error::unsupported("SQLite has no cursor parameters"));
        }
    })
}

fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

impl DriverConnection for SqliteConnection {
    fn execute_non_query(&mut self, command: &Command) -> Result<usize> {
        let mut stmt = self.prepare(command)?;
        stmt.raw_execute().map_err(db_err)
    }

    fn execute_scalar(&mut self, command: &Command) -> Result<Value> {
        let mut stmt = self.prepare(command)?;
        let mut rows = stmt.raw_query();
        let value = match rows.next().map_err(db_err)? {
            Some(row) => from_value_ref(row.get_ref(0).map_err(db_err)?),
            None => Value::Null,
        };
        Ok(value)
    }

    fn execute_reader(&mut self, command: &Command) -> Result<Box<dyn Reader>> {
        let mut stmt = self.prepare(command)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut buffered = VecDeque::new();
        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next().map_err(db_err)? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(from_value_ref(row.get_ref(i).map_err(db_err)?));
            }
            buffered.push_back(values);
        }

        Ok(Box::new(BufferedReader {
            columns,
            rows: buffered,
            current: None,
        }))
    }

    fn create_large_text(&mut self, text: &str) -> Result<Value> {
        // TEXT has no length cap in SQLite.
        Ok(Value::Text(text.to_string()))
    }

    fn begin_transaction(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(db_err)
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(db_err)
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(db_err)
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| db_err(e))
    }
}

/// Rows of one statement, read ahead.
struct BufferedReader {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl Reader for BufferedReader {
    fn read(&mut self) -> Result<bool> {
        self.current = self.rows.pop_front();
        Ok(self.current.is_some())
    }

    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn name(&self, index: usize) -> &str {
        &self.columns[index]
    }

    fn value(&self, index: usize) -> Result<Value> {
        self.current
            .as_ref()
            .and_then(|row| row.get(index))
            .cloned()
            .ok_or_else(|| Error::database(format!("No value at column {index}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::ParameterBinder;

    fn memory() -> SqliteConnection {
        SqliteDriver.open(":memory:").unwrap()
    }

    fn command(conn: &mut SqliteConnection, sql: &str, args: Vec<Value>) -> Command {
        let mut command = Command::new(sql);
        ParameterBinder::new(conn)
            .bind_positional(&mut command, args, 0)
            .unwrap();
        command
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = memory();
        let fk: i32 = conn
            .inner()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn binds_numbered_placeholders_by_name() {
        let mut conn = memory();
        conn.inner()
            .execute_batch("create table t (a integer, b text)")
            .unwrap();

        // Placeholders out of textual order still bind by name.
        let insert = command(
            &mut conn,
            "insert into t (b, a) values (:1, :0)",
            vec![Value::Int(7), Value::from("seven")],
        );
        assert_eq!(conn.execute_non_query(&insert).unwrap(), 1);

        let select = command(&mut conn, "select b from t where a = :0", vec![Value::Int(7)]);
        assert_eq!(conn.execute_scalar(&select).unwrap(), Value::from("seven"));
    }

    #[test]
    fn scalar_without_rows_is_null() {
        let mut conn = memory();
        let select = command(&mut conn, "select 1 where 1 = 2", vec![]);
        assert_eq!(conn.execute_scalar(&select).unwrap(), Value::Null);
    }

    #[test]
    fn unknown_parameter_is_an_error() {
        let mut conn = memory();
        let select = command(&mut conn, "select :0", vec![Value::Int(1), Value::Int(2)]);
        let err = conn.execute_scalar(&select).unwrap_err();
        assert!(err.is_driver_error());
        assert!(err.to_string().contains(":1"));
    }

    #[test]
    fn unbound_placeholder_is_an_error() {
        let mut conn = memory();

        let select = command(&mut conn, "select :0 is null", vec![]);
        let err = conn.execute_scalar(&select).unwrap_err();
        assert!(err.is_driver_error());
        assert!(err.to_string().contains("Statement parameter :0 was not bound"));

        let select = command(&mut conn, "select :0, :1", vec![Value::Int(1)]);
        let err = conn.execute_reader(&select).err().expect("expected an error");
        assert!(err.to_string().contains(":1"));
    }

    #[test]
    fn repeated_placeholder_binds_once() {
        let mut conn = memory();
        let select = command(&mut conn, "select :0 + :0", vec![Value::Int(2)]);
        assert_eq!(conn.execute_scalar(&select).unwrap(), Value::Int(4));
    }

    #[test]
    fn output_parameter_binds_null() {
        let mut conn = memory();
        let mut select = Command::new("select :ResultOutput is null");
        ParameterBinder::new(&mut conn)
            .bind_named(&mut select, [("ResultOutput", &Value::Int(5))])
            .unwrap();
        assert_eq!(conn.execute_scalar(&select).unwrap(), Value::Int(1));
    }

    #[test]
    fn reader_yields_columns_and_rows() {
        let mut conn = memory();
        let select = command(
            &mut conn,
            "select 1 as fund_id, null as note, x'0102' as bytes union all select 2, 'n', null",
            vec![],
        );
        let mut reader = conn.execute_reader(&select).unwrap();
        assert_eq!(reader.field_count(), 3);
        assert_eq!(reader.name(0), "fund_id");

        assert!(reader.read().unwrap());
        assert_eq!(reader.value(0).unwrap(), Value::Int(1));
        assert_eq!(reader.value(1).unwrap(), Value::Null);
        assert_eq!(reader.value(2).unwrap(), Value::Bytes(vec![1, 2]));

        assert!(reader.read().unwrap());
        assert_eq!(reader.value(1).unwrap(), Value::from("n"));
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn decimal_and_datetime_round_trip_as_text_and_real() {
        let mut conn = memory();
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let select = command(
            &mut conn,
            "select :0, :1",
            vec![Value::Float(3.1415), Value::DateTime(dt)],
        );
        let mut reader = conn.execute_reader(&select).unwrap();
        assert!(reader.read().unwrap());
        assert_eq!(reader.value(0).unwrap(), Value::Float(3.1415));
        assert_eq!(reader.value(1).unwrap(), Value::from("2024-05-06 07:08:09"));
    }

    #[test]
    fn transactions_pass_through() {
        let mut conn = memory();
        conn.inner()
            .execute_batch("create table t (a integer)")
            .unwrap();
        conn.begin_transaction().unwrap();
        let insert = command(&mut conn, "insert into t values (:0)", vec![Value::Int(1)]);
        conn.execute_non_query(&insert).unwrap();
        conn.rollback().unwrap();

        let count = command(&mut conn, "select count(1) from t", vec![]);
        assert_eq!(conn.execute_scalar(&count).unwrap(), Value::Int(0));
        conn.close().unwrap();
    }
}
