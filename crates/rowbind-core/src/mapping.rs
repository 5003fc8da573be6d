//! Explicit field mapping between Rust types and rows.
//!
//! A type opts in by implementing [`Mapped`] and returning a
//! [`TypeMapping`] built once, typically from a `OnceLock`:
//!
//! ```
//! use std::sync::OnceLock;
//! use rowbind_core::mapping::{Mapped, TypeMapping};
//! use rowbind_core::FromScalar;
//!
//! #[derive(Default)]
//! struct Item {
//!     id: i32,
//!     name: Option<String>,
//! }
//!
//! impl Mapped for Item {
//!     fn mapping() -> &'static TypeMapping<Self> {
//!         static MAPPING: OnceLock<TypeMapping<Item>> = OnceLock::new();
//!         MAPPING.get_or_init(|| {
//!             TypeMapping::<Item>::new()
//!                 .field("Id", |i| i.id.into(), |i, v| {
//!                     i.id = FromScalar::from_scalar(v)?;
//!                     Ok(())
//!                 })
//!                 .field("Name", |i| i.name.clone().into(), |i, v| {
//!                     i.name = FromScalar::from_scalar(v)?;
//!                     Ok(())
//!                 })
//!         })
//!     }
//! }
//!
//! let columns: Vec<_> = Item::mapping().fields().iter().map(|f| f.column()).collect();
//! assert_eq!(columns, ["id", "name"]);
//! ```

use crate::error::{Error, Result};
use crate::naming::{to_domain_name, to_storage_name};
use crate::record::Record;
use crate::value::Value;

/// Reads a property out of an object.
pub type Getter<T> = fn(&T) -> Value;

/// Writes a converted column value into an object.
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

/// One mapped property.
pub struct Field<T> {
    property: &'static str,
    column: String,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> Field<T> {
    /// Domain-style property name.
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// Storage-style column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn get(&self, object: &T) -> Value {
        (self.get)(object)
    }

    pub fn set(&self, object: &mut T, value: Value) -> Result<()> {
        (self.set)(object, value)
    }
}

/// Ordered field descriptors for `T`.
pub struct TypeMapping<T> {
    fields: Vec<Field<T>>,
}

impl<T> Default for TypeMapping<T> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<T> TypeMapping<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property; its column name is derived with [`to_storage_name`].
    pub fn field(mut self, property: &'static str, get: Getter<T>, set: Setter<T>) -> Self {
        self.fields.push(Field {
            property,
            column: to_storage_name(property),
            get,
            set,
        });
        self
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// Field whose property matches the domain name of `column`.
    pub fn by_column(&self, column: &str) -> Option<&Field<T>> {
        let property = to_domain_name(column);
        self.fields.iter().find(|f| f.property == property)
    }

    /// Snapshot `object` as a record for `table_name`.
    pub fn to_record(&self, object: &T, table_name: &str) -> Record {
        let mut record = Record::new(table_name);
        for field in &self.fields {
            record.set(field.property, field.get(object));
        }
        record
    }

    /// Copy result columns into `object`.
    ///
    /// Columns without a matching property are skipped (and logged when
    /// `warn_unmapped` is set); properties without a column keep their value.
    pub fn apply_row<'a, I>(&self, object: &mut T, columns: I, warn_unmapped: bool) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        for (column, value) in columns {
            match self.by_column(column) {
                Some(field) => field
                    .set(object, value)
                    .map_err(|e| Error::column(column, e))?,
                None if warn_unmapped => {
                    tracing::warn!("Could not find property {}", to_domain_name(column));
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Types that can be built from and written as rows.
pub trait Mapped: Default + 'static {
    fn mapping() -> &'static TypeMapping<Self>;
}

impl Record {
    /// Snapshot a mapped object as a record for `table_name`.
    pub fn from_object<T: Mapped>(object: &T, table_name: &str) -> Record {
        T::mapping().to_record(object, table_name)
    }
}
