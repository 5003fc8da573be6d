//! Value -> bound parameter conversion.

use rowbind_core::{Error, Result, Value};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::driver::{BoundParameter, Command, Direction, DriverConnection, StorageType};

/// Strings longer than this many characters are bound as large text.
pub const LARGE_TEXT_THRESHOLD: usize = 4000;

/// Declared size of a NULL parameter hinted as text.
pub const NULL_TEXT_SIZE: usize = 4096;

/// Parameters whose name ends with this suffix are bound as output.
pub const OUTPUT_SUFFIX: &str = "Output";

/// Binds values for commands that will run on `connection`.
///
/// The connection is only touched for strings over
/// [`LARGE_TEXT_THRESHOLD`], whose large-object value must come from the
/// connection the statement executes on.
pub struct ParameterBinder<'c, C: DriverConnection + ?Sized> {
    connection: &'c mut C,
}

impl<'c, C: DriverConnection + ?Sized> ParameterBinder<'c, C> {
    pub fn new(connection: &'c mut C) -> Self {
        Self { connection }
    }

    /// Convert one value into a parameter named `name`.
    pub fn bind(
        &mut self,
        name: &str,
        value: Value,
        hint: Option<StorageType>,
    ) -> Result<BoundParameter> {
        let mut direction = if name.ends_with(OUTPUT_SUFFIX) {
            Direction::Output
        } else {
            Direction::Input
        };
        let mut size = None;

        let (storage_type, value) = match value {
            Value::Null => {
                let storage_type = hint.unwrap_or(StorageType::Default);
                if storage_type == StorageType::Text {
                    size = Some(NULL_TEXT_SIZE);
                }
                (storage_type, Value::Null)
            }
            Value::Float(f) => {
                let d = Decimal::from_f64(f).ok_or_else(|| {
                    Error::unsupported(format!("float {f} cannot be bound as decimal"))
                })?;
                (StorageType::Decimal, Value::Decimal(d))
            }
            Value::Decimal(d) => (StorageType::Decimal, Value::Decimal(d)),
            Value::Bool(b) => (StorageType::Int32, Value::Int(i64::from(b))),
            Value::Int(v) if i32::try_from(v).is_ok() => (StorageType::Int32, Value::Int(v)),
            Value::Int(v) => (StorageType::Int64, Value::Int(v)),
            Value::DateTime(dt) => (StorageType::DateTime, Value::DateTime(dt)),
            Value::Cursor => {
                direction = Direction::Output;
                (StorageType::Cursor, Value::Null)
            }
            Value::Bytes(b) => (StorageType::Binary, Value::Bytes(b)),
            Value::Text(s) if s.chars().count() > LARGE_TEXT_THRESHOLD => {
                let handle = self.connection.create_large_text(&s)?;
                (StorageType::LargeText, handle)
            }
            Value::Text(s) => (StorageType::Text, Value::Text(s)),
        };

        Ok(BoundParameter {
            name: name.to_string(),
            storage_type,
            direction,
            size,
            value,
        })
    }

    /// Bind `values` as `:offset`, `:offset+1`, ... onto `command`.
    pub fn bind_positional<I>(&mut self, command: &mut Command, values: I, offset: usize) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        for (i, value) in values.into_iter().enumerate() {
            let parameter = self.bind(&(offset + i).to_string(), value, None)?;
            command.add_parameter(parameter);
        }
        Ok(())
    }

    /// Bind each `(name, value)` pair under its own name.
    pub fn bind_named<'v, I>(&mut self, command: &mut Command, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'v str, &'v Value)>,
    {
        for (name, value) in entries {
            let parameter = self.bind(name, value.clone(), None)?;
            command.add_parameter(parameter);
        }
        Ok(())
    }
}
