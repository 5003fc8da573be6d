//! Record and statement orchestration.
//!
//! Every operation acquires a connection from the mapper's
//! [`ConnectionScope`] for exactly as long as it runs. Inside an explicit
//! [`Mapper::open_connection`] scope all of them share that one connection.

use rowbind_core::mapping::Mapped;
use rowbind_core::{Error, FromScalar, MapperConfig, Record, Result, StatementBuilder, Value};

use crate::binder::ParameterBinder;
use crate::driver::{Command, Driver, DriverConnection, Reader};
use crate::scope::{ConnectionHandle, ConnectionScope};

/// Which statement [`Mapper::merge_into`] ended up running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
}

/// Maps records onto a database reached through `D`.
///
/// A mapper is single-threaded: its connection state is `Rc` based, so it is
/// neither `Send` nor `Sync`. Use one mapper per thread.
pub struct Mapper<D: Driver> {
    driver: D,
    config: MapperConfig,
    scope: ConnectionScope<D::Connection>,
}

impl<D: Driver> Mapper<D> {
    pub fn new(driver: D, config: MapperConfig) -> Self {
        for warning in config.validate() {
            tracing::debug!("Mapper config: {warning}");
        }
        Self {
            driver,
            config,
            scope: ConnectionScope::new(),
        }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    /// Replace the connection string used for connections opened from now on.
    pub fn set_connection_string(&mut self, connection_string: impl Into<String>) {
        self.config.connection_string = Some(connection_string.into());
    }

    pub fn scope(&self) -> &ConnectionScope<D::Connection> {
        &self.scope
    }

    fn open_physical(&self) -> Result<D::Connection> {
        let connection_string = self
            .config
            .connection_string
            .as_deref()
            .ok_or_else(|| Error::Config("connection string is not set".into()))?;
        tracing::debug!("Opening physical connection");
        self.driver.open(connection_string)
    }

    fn acquire(&self) -> Result<ConnectionHandle<D::Connection>> {
        self.scope.acquire(|| self.open_physical())
    }

    /// Open and pin a connection that every following operation reuses until
    /// the returned handle is dropped. Fails with [`Error::AlreadyPinned`]
    /// while another connection is pinned.
    pub fn open_connection(&self) -> Result<ConnectionHandle<D::Connection>> {
        self.scope.pin_explicitly(|| self.open_physical())
    }

    /// Pin a connection the caller opened.
    pub fn set_external_connection(
        &self,
        connection: D::Connection,
    ) -> Result<ConnectionHandle<D::Connection>> {
        self.scope.pin_externally(connection)
    }

    fn create_command(&self, sql: String) -> Command {
        if self.config.print_sqls {
            tracing::info!(target: "rowbind::sql", "{sql}");
        } else {
            tracing::trace!(target: "rowbind::sql", "{sql}");
        }
        Command::new(sql)
    }

    fn positional_command(
        &self,
        connection: &mut D::Connection,
        sql: String,
        args: Vec<Value>,
    ) -> Result<Command> {
        let mut command = self.create_command(sql);
        ParameterBinder::new(connection).bind_positional(&mut command, args, 0)?;
        Ok(command)
    }

    fn execute(&self, sql: String, args: Vec<Value>) -> Result<usize> {
        let handle = self.acquire()?;
        handle.with(|connection| {
            let command = self.positional_command(connection, sql, args)?;
            connection.execute_non_query(&command)
        })
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Insert every non-NULL property of `record`.
    pub fn insert(&self, record: &Record) -> Result<usize> {
        let table = record.table_name().ok_or(Error::NoTableName)?;
        let tokens = StatementBuilder::new(record.to_storage_mapping(true));

        let sql = if tokens.non_null_entries().is_empty() {
            format!("insert into {table} default values")
        } else {
            format!(
                "insert into {table} ({}) values ({})",
                tokens.column_name_list(false),
                tokens.placeholder_list(false)
            )
        };
        self.execute(sql, tokens.values(false))
    }

    /// Insert a mapped object into `table_name`.
    pub fn insert_object<T: Mapped>(&self, object: &T, table_name: &str) -> Result<usize> {
        self.insert(&Record::from_object(object, table_name))
    }

    /// Update the row identified by the record's primary key.
    pub fn update(&self, record: &Record) -> Result<usize> {
        let key = StatementBuilder::new(record.primary_key_storage_mapping()?);
        self.update_where(record, &key.where_clause(0), &key.values(true))
    }

    /// Update rows matching `where_clause`, whose placeholders start at `:0`.
    ///
    /// Set-clause placeholders continue after `args`. Primary-key properties
    /// are never set. Nothing runs when there is nothing to set.
    pub fn update_where(
        &self,
        record: &Record,
        where_clause: &str,
        args: &[Value],
    ) -> Result<usize> {
        let table = record.table_name().ok_or(Error::NoTableName)?;
        let set = StatementBuilder::new(record.to_storage_mapping(false));
        if set.is_empty() {
            tracing::debug!(table, "Nothing to update");
            return Ok(0);
        }

        let sql = format!("update {table} {} {where_clause}", set.set_clause(args.len()));
        let mut values = args.to_vec();
        values.extend(set.values(true));
        self.execute(sql, values)
    }

    /// Delete the row identified by the record's primary key.
    pub fn delete(&self, record: &Record) -> Result<usize> {
        let table = record.table_name().ok_or(Error::NoTableName)?;
        let key = StatementBuilder::new(record.primary_key_storage_mapping()?);
        self.execute(
            format!("delete from {table} {}", key.where_clause(0)),
            key.values(true),
        )
    }

    /// Delete rows of `table_name` matching `where_clause`.
    pub fn delete_where(
        &self,
        table_name: &str,
        where_clause: &str,
        args: &[Value],
    ) -> Result<usize> {
        self.execute(format!("delete from {table_name} {where_clause}"), args.to_vec())
    }

    /// Insert the record, or update it when a row with its primary key exists.
    ///
    /// The existence probe and the write run on the same connection.
    pub fn merge_into(&self, record: &Record) -> Result<MergeOutcome> {
        let table = record.table_name().ok_or(Error::NoTableName)?;
        let key = StatementBuilder::new(record.primary_key_storage_mapping()?);

        let _handle = self.acquire()?;
        let count: i64 = self.query_scalar(
            &format!("select count(1) from {table} {}", key.where_clause(0)),
            &key.values(true),
        )?;

        if count == 0 {
            self.insert(record)?;
            Ok(MergeOutcome::Inserted)
        } else {
            self.update(record)?;
            Ok(MergeOutcome::Updated)
        }
    }

    // -----------------------------------------------------------------------
    // Raw statements
    // -----------------------------------------------------------------------

    /// Run a statement with positional `:N` arguments.
    pub fn non_query(&self, sql: &str, args: &[Value]) -> Result<usize> {
        self.execute(sql.to_string(), args.to_vec())
    }

    /// Like [`Mapper::non_query`], but a failure of the statement itself is
    /// logged and swallowed.
    pub fn non_query_ignore_error(&self, sql: &str, args: &[Value]) -> Result<()> {
        let handle = self.acquire()?;
        handle.with(|connection| {
            let command = self.positional_command(connection, sql.to_string(), args.to_vec())?;
            if let Err(e) = connection.execute_non_query(&command) {
                tracing::warn!("Db error ignored: {e}");
            }
            Ok(())
        })
    }

    /// Run a statement whose parameters are named after the record's
    /// properties (`:Name`). Names ending in `Output` bind as output.
    pub fn non_query_named(&self, sql: &str, parameters: &Record) -> Result<usize> {
        let handle = self.acquire()?;
        handle.with(|connection| {
            let mut command = self.create_command(sql.to_string());
            ParameterBinder::new(&mut *connection).bind_named(&mut command, parameters.iter())?;
            connection.execute_non_query(&command)
        })
    }

    /// First column of the first row, converted to `T`.
    ///
    /// With `T = Option<_>`, NULL and an empty result are `None`. For any other
    /// `T` they fail with [`Error::NullScalar`], as does a value that overflows.
    pub fn query_scalar<T: FromScalar>(&self, sql: &str, args: &[Value]) -> Result<T> {
        let handle = self.acquire()?;
        let value = handle.with(|connection| {
            let command = self.positional_command(connection, sql.to_string(), args.to_vec())?;
            connection.execute_scalar(&command)
        })?;
        T::from_scalar(value)
    }

    fn open_rows<T>(
        &self,
        sql: &str,
        args: &[Value],
        map: RowMapper<T>,
    ) -> Result<Rows<D::Connection, T>> {
        let handle = self.acquire()?;
        let reader = handle.with(|connection| {
            let command = self.positional_command(connection, sql.to_string(), args.to_vec())?;
            connection.execute_reader(&command)
        })?;
        Ok(Rows {
            reader: Some(reader),
            handle: Some(handle),
            map,
            warn_unmapped: self.config.print_warnings,
        })
    }

    /// Rows as records keyed by domain names.
    pub fn query(&self, sql: &str, args: &[Value]) -> Result<Rows<D::Connection, Record>> {
        self.open_rows(sql, args, read_record)
    }

    /// Rows as mapped objects.
    pub fn query_as<T: Mapped>(
        &self,
        sql: &str,
        args: &[Value],
    ) -> Result<Rows<D::Connection, T>> {
        self.open_rows(sql, args, read_object::<T>)
    }

    /// The first column of every row, converted to `T`.
    pub fn query_column<T: FromScalar>(
        &self,
        sql: &str,
        args: &[Value],
    ) -> Result<Rows<D::Connection, T>> {
        self.open_rows(sql, args, read_first::<T>)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

type RowMapper<T> = fn(&dyn Reader, bool) -> Result<T>;

fn read_record(reader: &dyn Reader, _warn_unmapped: bool) -> Result<Record> {
    let mut columns = Vec::with_capacity(reader.field_count());
    for i in 0..reader.field_count() {
        let name = reader.name(i);
        let value = reader.value(i).map_err(|e| Error::column(name, e))?;
        columns.push((name, value));
    }
    Record::from_result_row(columns)
}

fn read_object<T: Mapped>(reader: &dyn Reader, warn_unmapped: bool) -> Result<T> {
    let mut columns = Vec::with_capacity(reader.field_count());
    for i in 0..reader.field_count() {
        let name = reader.name(i);
        let value = reader.value(i).map_err(|e| Error::column(name, e))?;
        columns.push((name, value));
    }
    let mut object = T::default();
    T::mapping().apply_row(&mut object, columns, warn_unmapped)?;
    Ok(object)
}

fn read_first<T: FromScalar>(reader: &dyn Reader, _warn_unmapped: bool) -> Result<T> {
    T::from_scalar(reader.value(0)?)
}

/// Lazily mapped query results.
///
/// Owns the result cursor and a connection handle. Both are released when
/// the rows run out, when an error is yielded, or when the value is dropped.
pub struct Rows<C: DriverConnection, T> {
    reader: Option<Box<dyn Reader>>,
    handle: Option<ConnectionHandle<C>>,
    map: RowMapper<T>,
    warn_unmapped: bool,
}

impl<C: DriverConnection, T> Rows<C, T> {
    fn finish(&mut self) {
        self.reader = None;
        self.handle = None;
    }

    /// True once the cursor and connection have been released.
    pub fn is_finished(&self) -> bool {
        self.reader.is_none()
    }
}

impl<C: DriverConnection, T> Iterator for Rows<C, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        match reader.read() {
            Ok(true) => {
                let item = (self.map)(&**reader, self.warn_unmapped);
                if item.is_err() {
                    self.finish();
                }
                Some(item)
            }
            Ok(false) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}
