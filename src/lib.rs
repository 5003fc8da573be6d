//! rowbind - schema-free row mapping over parameterized SQL.
//!
//! Records are ordered maps of domain-named properties. The [`Mapper`]
//! turns them into storage-named `insert`, `update`, `delete` and merge
//! statements with positional `:N` placeholders, and maps result rows back
//! into records or [`Mapped`] types. Nested operations share one physical
//! connection through a [`ConnectionScope`].
//!
//! ```
//! use rowbind::{args, Mapper, MapperConfig, Record, SqliteDriver};
//!
//! # fn main() -> rowbind::Result<()> {
//! let mapper = Mapper::new(SqliteDriver, MapperConfig::with_connection_string(":memory:"));
//! let _conn = mapper.open_connection()?;
//! mapper.non_query("create table item (item_id integer primary key, name text)", args![])?;
//!
//! let item = Record::with_primary_key("item", "item_id")
//!     .with("ItemId", 1)
//!     .with("Name", "first");
//! mapper.merge_into(&item)?;
//!
//! let name: String = mapper.query_scalar("select name from item where item_id = :0", args![1])?;
//! assert_eq!(name, "first");
//! # Ok(())
//! # }
//! ```

pub use rowbind_core::config::CONNECTION_STRING_ENV;
pub use rowbind_core::mapping::{Field, Getter, Setter};
pub use rowbind_core::{
    to_domain_name, to_storage_name, Decimal, Error, FromScalar, Mapped, MapperConfig,
    NaiveDateTime, Record, Result, StatementBuilder, StorageMap, TypeMapping, Value,
};
pub use rowbind_db::{
    args, BoundParameter, Command, ConnectionHandle, ConnectionScope, Direction, Driver,
    DriverConnection, Mapper, MergeOutcome, ParameterBinder, Reader, Rows, SqliteConnection,
    SqliteDriver, StorageType,
};
