//! In-memory [`Database`] implementation.
//!
//! Keeps the whole [`State`] behind a single lock. A transaction holds that
//! lock for its whole lifetime and works on a private copy of the
//! [`State`], which replaces the shared one on [`Commit`]. Dropping a
//! transaction without committing discards its copy.

mod impls;

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};

use common::operations::{Commit, Transact};
use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{
        deal, property, provider, service_request, user, Activity, Deal,
        Notification, Property, ServiceRequest, User,
    },
    infra::database,
    read::Cursor,
};
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Non-transactional [`Memory`] client.
///
/// Every operation is applied atomically on its own.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`State`].
    state: Arc<Mutex<State>>,
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Working copy of the [`State`], taken on [`Commit`].
    inner: Arc<Mutex<Option<Working>>>,
}

/// Working copy of a [`State`] in a [`Tx`].
#[derive(Debug)]
struct Working {
    /// Guard of the shared [`State`], held until the [`Tx`] ends.
    guard: OwnedMutexGuard<State>,

    /// Copy of the shared [`State`] the [`Tx`] operates on.
    state: State,
}

/// Access to a [`State`].
pub trait Access {
    /// Applies the provided function to the [`State`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn access<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Access for NonTx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

impl Access for Tx {
    async fn access<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut inner = self.inner.lock().await;
        let working = inner
            .as_mut()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        Ok(f(&mut working.state))
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let state = guard.clone();
        Ok(Memory(Tx {
            inner: Arc::new(Mutex::new(Some(Working { guard, state }))),
        }))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        let Working { mut guard, state } = self
            .inner
            .lock()
            .await
            .take()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *guard = state;
        Ok(())
    }
}

/// Data stored in a [`Memory`] database.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Last issued [`Cursor`] value.
    seq: i64,

    /// Known [`User`]s.
    users: HashMap<user::Id, User>,

    /// Known [`Property`]s.
    properties: HashMap<property::Id, Property>,

    /// [`provider::Profile`]s by their holders.
    profiles: HashMap<user::Id, provider::Profile>,

    /// [`Deal`]s along with their positions.
    deals: HashMap<deal::Id, (Cursor, Deal)>,

    /// [`ServiceRequest`]s along with their positions.
    requests: HashMap<service_request::Id, (Cursor, ServiceRequest)>,

    /// [`Activity`] log in insertion order.
    activities: BTreeMap<Cursor, Activity>,

    /// [`Notification`]s in insertion order.
    notifications: BTreeMap<Cursor, Notification>,
}

impl State {
    /// Issues the next [`Cursor`].
    fn next_cursor(&mut self) -> Cursor {
        self.seq += 1;
        Cursor::from(self.seq)
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Transaction was already committed.
    #[display("transaction is already committed")]
    TxFinished,
}
