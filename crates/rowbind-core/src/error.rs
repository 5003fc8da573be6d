//! Unified error type for rowbind.
//!
//! Mapping faults (missing primary-key values, unsupported values, NULL scalars)
//! are raised where they are detected and never retried. Driver failures are
//! carried through [`Error::Database`] with their original source attached.

/// Every failure mode of the mapping engine and its drivers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured primary-key column has no matching property on the record.
    #[error("Property '{property}' was not found")]
    MissingProperty {
        /// Domain-style name that was looked up.
        property: String,
    },

    /// A primary-key based operation was requested on a record without keys.
    #[error("Primary key is not set for table '{table}'")]
    NoPrimaryKey {
        /// Table the record targets (empty when unknown).
        table: String,
    },

    /// Two result columns map to the same property name.
    #[error("Duplicate property '{property}'")]
    DuplicateProperty {
        /// Domain-style name both columns map to.
        property: String,
    },

    /// A write was issued for a record that has no target table.
    #[error("Record has no table name")]
    NoTableName,

    /// The binder received a value it cannot express as a parameter.
    #[error("Unsupported value type: {0}")]
    UnsupportedValueType(String),

    /// A scalar query produced NULL (or overflowed) for a non-nullable target.
    #[error("Scalar result cannot be converted: {0}")]
    NullScalar(String),

    /// An explicit pin was requested while a connection is already pinned.
    #[error("Cannot open new connection: already open")]
    AlreadyPinned,

    /// A connection handle was used after its physical connection was closed.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// The pinned connection is already in use further up the call stack.
    #[error("Connection is busy")]
    ConnectionBusy,

    /// Reading a column into a record or typed object failed.
    #[error("Error reading column {column}: {source}")]
    Column {
        /// Storage-style column name.
        column: String,
        /// Underlying conversion failure.
        source: Box<Error>,
    },

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// A driver operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying driver error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    /// Convenience constructor for [`Error::MissingProperty`].
    pub fn missing_property(property: impl Into<String>) -> Self {
        Error::MissingProperty {
            property: property.into(),
        }
    }

    /// Convenience constructor for [`Error::NoPrimaryKey`].
    pub fn no_primary_key(table: impl Into<String>) -> Self {
        Error::NoPrimaryKey {
            table: table.into(),
        }
    }

    /// Convenience constructor for [`Error::UnsupportedValueType`].
    pub fn unsupported(what: impl Into<String>) -> Self {
        Error::UnsupportedValueType(what.into())
    }

    /// Convenience constructor for [`Error::NullScalar`].
    pub fn null_scalar(what: impl Into<String>) -> Self {
        Error::NullScalar(what.into())
    }

    /// Wrap a failure that happened while reading `column`.
    pub fn column(column: impl Into<String>, source: Error) -> Self {
        Error::Column {
            column: column.into(),
            source: Box::new(source),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// True for faults raised by the driver rather than by the mapper itself.
    pub fn is_driver_error(&self) -> bool {
        matches!(self, Error::Database { .. })
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
