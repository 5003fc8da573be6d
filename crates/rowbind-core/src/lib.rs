//! rowbind-core: naming conventions, dynamic values, records and SQL fragments.
//!
//! This crate has no database dependency. It turns domain-named records into
//! storage-named column maps and positional SQL fragments, and coerces
//! driver values back into Rust types.

pub mod config;
pub mod error;
pub mod mapping;
pub mod naming;
pub mod record;
pub mod statement;
pub mod value;

// Re-export the most commonly used items at the crate root.
pub use config::MapperConfig;
pub use error::{Error, Result};
pub use mapping::{Mapped, TypeMapping};
pub use naming::{to_domain_name, to_storage_name};
pub use record::{Record, StorageMap};
pub use statement::StatementBuilder;
pub use value::{FromScalar, Value};

// Re-exported so callers can build decimal and date-time values without
// naming the exact crate versions.
pub use chrono::NaiveDateTime;
pub use rust_decimal::Decimal;
