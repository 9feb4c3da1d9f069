//! Operation markers used as [`Handler`] arguments.
//!
//! Storage backends implement [`Handler`] once per operation they support,
//! so a command declares exactly which operations it needs in its bounds.

use std::marker::PhantomData;

use crate::Handler;

/// Stores the wrapped value, replacing any previous version of it.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Modifies stored values as described by the wrapped value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Removes stored values described by the wrapped value.
#[derive(Clone, Copy, Debug)]
pub struct Delete<T>(pub T);

/// Reads the value described by the wrapped selector.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Locks the value described by the wrapped selector until the end of the
/// current transaction.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Starts a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Handle of a started transaction.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Commits a transaction.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of a `W`hat by a `B`y value.
///
/// The `W` parameter disambiguates operations sharing the same key type,
/// e.g. selecting a deal or its activity by the same deal ID.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the selected value.
    _what: PhantomData<W>,

    /// Value to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns the value to select by.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
