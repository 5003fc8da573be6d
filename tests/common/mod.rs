//! Shared test harness for integration tests.
//!
//! Provides [`RecordingDriver`], a driver whose connections record every
//! command they run and count opens, closes and large-text creations.
//! Scalar and reader results are scripted through the shared [`Log`].

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rowbind::{
    Command, Driver, DriverConnection, Error, Mapper, MapperConfig, Reader, Result, Value,
};

/// Everything the recording connections did, plus scripted results.
#[derive(Default)]
pub struct Log {
    pub opened: Cell<usize>,
    pub closed: Cell<usize>,
    pub large_texts: Cell<usize>,
    pub commands: RefCell<Vec<Command>>,
    scalars: RefCell<VecDeque<Value>>,
    results: RefCell<VecDeque<(Vec<String>, Vec<Vec<Value>>)>>,
    failing: RefCell<Option<String>>,
}

impl Log {
    /// Next `execute_scalar` returns `value`. Unscripted scalars are NULL.
    pub fn push_scalar(&self, value: impl Into<Value>) {
        self.scalars.borrow_mut().push_back(value.into());
    }

    /// Next `execute_reader` yields these rows. Unscripted readers are empty.
    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.results.borrow_mut().push_back((columns, rows));
    }

    /// Statements containing `fragment` fail with a driver error.
    pub fn fail_on(&self, fragment: &str) {
        *self.failing.borrow_mut() = Some(fragment.to_string());
    }

    pub fn sql(&self) -> Vec<String> {
        self.commands.borrow().iter().map(|c| c.sql.clone()).collect()
    }

    pub fn last(&self) -> Command {
        self.commands
            .borrow()
            .last()
            .cloned()
            .expect("no command was executed")
    }

    fn record(&self, command: &Command) -> Result<()> {
        self.commands.borrow_mut().push(command.clone());
        match self.failing.borrow().as_deref() {
            Some(fragment) if command.sql.contains(fragment) => {
                Err(Error::database(format!("scripted failure: {}", command.sql)))
            }
            _ => Ok(()),
        }
    }
}

pub struct RecordingDriver {
    pub log: Rc<Log>,
}

impl Driver for RecordingDriver {
    type Connection = RecordingConnection;

    fn open(&self, _connection_string: &str) -> Result<RecordingConnection> {
        self.log.opened.set(self.log.opened.get() + 1);
        Ok(RecordingConnection {
            log: Rc::clone(&self.log),
        })
    }
}

pub struct RecordingConnection {
    pub log: Rc<Log>,
}

impl DriverConnection for RecordingConnection {
    fn execute_non_query(&mut self, command: &Command) -> Result<usize> {
        self.log.record(command)?;
        Ok(1)
    }

    fn execute_scalar(&mut self, command: &Command) -> Result<Value> {
        self.log.record(command)?;
        Ok(self.log.scalars.borrow_mut().pop_front().unwrap_or_default())
    }

    fn execute_reader(&mut self, command: &Command) -> Result<Box<dyn Reader>> {
        self.log.record(command)?;
        let (columns, rows) = self.log.results.borrow_mut().pop_front().unwrap_or_default();
        Ok(Box::new(VecReader {
            columns,
            rows: rows.into(),
            current: None,
        }))
    }

    fn create_large_text(&mut self, text: &str) -> Result<Value> {
        self.log.large_texts.set(self.log.large_texts.get() + 1);
        Ok(Value::from(format!("lob({})", text.chars().count())))
    }

    fn begin_transaction(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.log.closed.set(self.log.closed.get() + 1);
        Ok(())
    }
}

struct VecReader {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
}

impl Reader for VecReader {
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
        Ok(self
            .current
            .as_ref()
            .and_then(|row| row.get(index))
            .cloned()
            .unwrap_or_default())
    }
}

/// A mapper over a fresh [`RecordingDriver`], plus the driver's log.
pub fn recording_mapper() -> (Mapper<RecordingDriver>, Rc<Log>) {
    recording_mapper_with(MapperConfig::with_connection_string("recording"))
}

pub fn recording_mapper_with(config: MapperConfig) -> (Mapper<RecordingDriver>, Rc<Log>) {
    let log = Rc::new(Log::default());
    let driver = RecordingDriver {
        log: Rc::clone(&log),
    };
    (Mapper::new(driver, config), log)
}
