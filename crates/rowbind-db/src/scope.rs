//! Reference-counted connection nesting.
//!
//! A [`ConnectionScope`] pins at most one physical connection. Acquiring while
//! pinned hands out another [`ConnectionHandle`] to the same connection and
//! bumps the nesting level; dropping a handle undoes one level, and the drop at
//! level 0 closes the connection and returns the scope to idle. Callers never
//! need to know whether they run inside a wider scope.
//!
//! The state is `Rc`/`Cell` based: a scope and its handles belong to one
//! thread.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rowbind_core::{Error, Result};

use crate::driver::DriverConnection;

struct Pinned<C> {
    connection: RefCell<Option<C>>,
    level: Cell<usize>,
}

type Slot<C> = Rc<RefCell<Option<Rc<Pinned<C>>>>>;

/// Holder of the currently pinned connection, if any.
pub struct ConnectionScope<C: DriverConnection> {
    slot: Slot<C>,
}

impl<C: DriverConnection> Default for ConnectionScope<C> {
    fn default() -> Self {
        Self {
            slot: Rc::new(RefCell::new(None)),
        }
    }
}

impl<C: DriverConnection> fmt::Debug for ConnectionScope<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionScope")
            .field("level", &self.level())
            .finish()
    }
}

impl<C: DriverConnection> ConnectionScope<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pinned(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Nesting level of the pinned connection; `None` when idle.
    pub fn level(&self) -> Option<usize> {
        self.slot.borrow().as_ref().map(|p| p.level.get())
    }

    /// Reuse the pinned connection, or open one with `open` and pin it.
    pub fn acquire<F>(&self, open: F) -> Result<ConnectionHandle<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        let current = self.slot.borrow().clone();
        if let Some(pinned) = current {
            pinned.level.set(pinned.level.get() + 1);
            tracing::trace!(level = pinned.level.get(), "Reusing pinned connection");
            return Ok(ConnectionHandle {
                pinned,
                slot: Rc::clone(&self.slot),
            });
        }
        let connection = open()?;
        Ok(self.pin(connection))
    }

    /// Open a connection with `open` and pin it at level 0.
    pub fn pin_explicitly<F>(&self, open: F) -> Result<ConnectionHandle<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        if self.is_pinned() {
            return Err(Error::AlreadyPinned);
        }
        let connection = open()?;
        Ok(self.pin(connection))
    }

    /// Pin a connection the caller already opened.
    pub fn pin_externally(&self, connection: C) -> Result<ConnectionHandle<C>> {
        if self.is_pinned() {
            return Err(Error::AlreadyPinned);
        }
        Ok(self.pin(connection))
    }

    fn pin(&self, connection: C) -> ConnectionHandle<C> {
        let pinned = Rc::new(Pinned {
            connection: RefCell::new(Some(connection)),
            level: Cell::new(0),
        });
        *self.slot.borrow_mut() = Some(Rc::clone(&pinned));
        tracing::debug!("Pinned physical connection");
        ConnectionHandle {
            pinned,
            slot: Rc::clone(&self.slot),
        }
    }
}

/// One acquisition of the pinned connection. Released on drop.
pub struct ConnectionHandle<C: DriverConnection> {
    pinned: Rc<Pinned<C>>,
    slot: Slot<C>,
}

impl<C: DriverConnection> fmt::Debug for ConnectionHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("level", &self.pinned.level.get())
            .field("open", &self.is_open())
            .finish()
    }
}

impl<C: DriverConnection> ConnectionHandle<C> {
    /// Run `f` against the physical connection.
    ///
    /// The connection is borrowed exclusively while `f` runs, so using the
    /// same scope again from inside `f` fails with [`Error::ConnectionBusy`].
    pub fn with<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut C) -> Result<R>,
    {
        let mut guard = self
            .pinned
            .connection
            .try_borrow_mut()
            .map_err(|_| Error::ConnectionBusy)?;
        let connection = guard.as_mut().ok_or(Error::ConnectionClosed)?;
        f(connection)
    }

    pub fn is_open(&self) -> bool {
        // A busy connection is in use, hence open.
        self.pinned
            .connection
            .try_borrow()
            .map_or(true, |c| c.is_some())
    }

    pub fn level(&self) -> usize {
        self.pinned.level.get()
    }

    pub fn begin_transaction(&self) -> Result<()> {
        self.with(|c| c.begin_transaction())
    }

    pub fn commit(&self) -> Result<()> {
        self.with(|c| c.commit())
    }

    pub fn rollback(&self) -> Result<()> {
        self.with(|c| c.rollback())
    }

    /// Explicit spelling of dropping the handle.
    pub fn release(self) {}
}

impl<C: DriverConnection> Drop for ConnectionHandle<C> {
    fn drop(&mut self) {
        let level = self.pinned.level.get();
        if level > 0 {
            self.pinned.level.set(level - 1);
            return;
        }

        {
            let mut slot = self.slot.borrow_mut();
            if slot
                .as_ref()
                .is_some_and(|current| Rc::ptr_eq(current, &self.pinned))
            {
                *slot = None;
            }
        }

        let connection = self.pinned.connection.borrow_mut().take();
        if let Some(connection) = connection {
            match connection.close() {
                Ok(()) => tracing::debug!("Closed physical connection"),
                Err(e) => tracing::warn!("Failed to close connection: {e}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Command, Reader};
    use rowbind_core::Value;

    #[derive(Default)]
    struct Counters {
        opened: Cell<usize>,
        closed: Cell<usize>,
        begun: Cell<usize>,
    }

    struct FakeConnection(Rc<Counters>);

    impl DriverConnection for FakeConnection {
        fn execute_non_query(&mut self, _: &Command) -> Result<usize> {
            Ok(0)
        }
        fn execute_scalar(&mut self, _: &Command) -> Result<Value> {
            Ok(Value::Null)
        }
        fn execute_reader(&mut self, _: &Command) -> Result<Box<dyn Reader>> {
            Err(Error::database("no reader"))
        }
        fn create_large_text(&mut self, text: &str) -> Result<Value> {
            Ok(Value::from(text))
        }
        fn begin_transaction(&mut self) -> Result<()> {
            self.0.begun.set(self.0.begun.get() + 1);
            Ok(())
        }
        fn commit(&mut self) -> Result<()> {
            Ok(())
        }
        fn rollback(&mut self) -> Result<()> {
            Ok(())
        }
        fn close(self) -> Result<()> {
            self.0.closed.set(self.0.closed.get() + 1);
            Ok(())
        }
    }

    fn opener(counters: &Rc<Counters>) -> impl Fn() -> Result<FakeConnection> + '_ {
        move || {
            counters.opened.set(counters.opened.get() + 1);
            Ok(FakeConnection(Rc::clone(counters)))
        }
    }

    #[test]
    fn nested_acquire_opens_once_closes_once() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let outer = scope.acquire(opener(&counters)).unwrap();
        let inner = scope.acquire(opener(&counters)).unwrap();
        assert_eq!(counters.opened.get(), 1);
        assert_eq!(scope.level(), Some(1));

        inner.release();
        assert_eq!(counters.closed.get(), 0);
        assert_eq!(scope.level(), Some(0));

        outer.release();
        assert_eq!(counters.opened.get(), 1);
        assert_eq!(counters.closed.get(), 1);
        assert!(!scope.is_pinned());
    }

    #[test]
    fn acquire_after_idle_opens_again() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        drop(scope.acquire(opener(&counters)).unwrap());
        drop(scope.acquire(opener(&counters)).unwrap());
        assert_eq!(counters.opened.get(), 2);
        assert_eq!(counters.closed.get(), 2);
    }

    #[test]
    fn explicit_pin_is_shared_by_acquire() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let pinned = scope.pin_explicitly(opener(&counters)).unwrap();
        for _ in 0..3 {
            let handle = scope.acquire(opener(&counters)).unwrap();
            assert_eq!(handle.level(), 1);
        }
        assert_eq!(counters.opened.get(), 1);
        assert_eq!(counters.closed.get(), 0);

        drop(pinned);
        assert_eq!(counters.closed.get(), 1);
    }

    #[test]
    fn pinning_twice_fails() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let _pinned = scope.pin_explicitly(opener(&counters)).unwrap();
        let err = scope.pin_explicitly(opener(&counters)).unwrap_err();
        assert!(matches!(err, Error::AlreadyPinned));
        let err = scope
            .pin_externally(FakeConnection(Rc::clone(&counters)))
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyPinned));
        assert_eq!(counters.opened.get(), 1);
    }

    #[test]
    fn external_connection_is_closed_at_level_zero() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let handle = scope
            .pin_externally(FakeConnection(Rc::clone(&counters)))
            .unwrap();
        handle.begin_transaction().unwrap();
        assert_eq!(counters.begun.get(), 1);
        drop(handle);
        assert_eq!(counters.closed.get(), 1);
        assert!(!scope.is_pinned());
    }

    #[test]
    fn reentrant_use_is_busy_not_a_panic() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let outer = scope.acquire(opener(&counters)).unwrap();
        let result = outer.with(|_| {
            let inner = scope.acquire(opener(&counters))?;
            inner.with(|_| Ok(()))
        });
        assert!(matches!(result, Err(Error::ConnectionBusy)));
        assert_eq!(scope.level(), Some(0));
        assert_eq!(counters.opened.get(), 1);

        outer.with(|_| Ok(())).unwrap();
    }

    #[test]
    fn failed_open_leaves_scope_idle() {
        let scope: ConnectionScope<FakeConnection> = ConnectionScope::new();
        let err = scope
            .acquire(|| Err(Error::database("unreachable host")))
            .unwrap_err();
        assert!(err.is_driver_error());
        assert!(!scope.is_pinned());
    }

    #[test]
    fn out_of_order_release_closes_for_remaining_handles() {
        let counters = Rc::new(Counters::default());
        let scope = ConnectionScope::new();

        let outer = scope.acquire(opener(&counters)).unwrap();
        let inner = scope.acquire(opener(&counters)).unwrap();
        drop(outer);
        drop(inner);
        assert_eq!(counters.closed.get(), 1);

        let outer = scope.acquire(opener(&counters)).unwrap();
        let inner = scope.acquire(opener(&counters)).unwrap();
        drop(outer);
        assert!(inner.is_open());
        drop(inner);
        assert!(!scope.is_pinned());
    }
}
