//! rowbind-db: the database side of rowbind.
//!
//! This crate defines the driver boundary, converts values into bound
//! parameters, scopes physical connections, and provides the [`Mapper`]
//! that turns records into statements. A SQLite driver built on rusqlite is
//! included.

pub mod binder;
pub mod driver;
pub mod mapper;
pub mod scope;
pub mod sqlite;

pub use binder::ParameterBinder;
pub use driver::{BoundParameter, Command, Direction, Driver, DriverConnection, Reader, StorageType};
pub use mapper::{Mapper, MergeOutcome, Rows};
pub use rowbind_core::{Error, Record, Result, Value};
pub use scope::{ConnectionHandle, ConnectionScope};
pub use sqlite::{SqliteConnection, SqliteDriver};

/// Build a `&[Value]` argument list for positional `:N` placeholders.
///
/// ```
/// use rowbind_db::{args, Value};
///
/// let a = args![1, "two", None::<i32>];
/// assert_eq!(a, [Value::Int(1), Value::from("two"), Value::Null]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        &[] as &[$crate::Value]
    };
    ($($arg:expr),+ $(,)?) => {
        &[$($crate::Value::from($arg)),+] as &[$crate::Value]
    };
}
