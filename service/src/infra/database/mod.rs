//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    ///
    /// [`Memory`] never reports one, because its writers are serialized.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Memory(_) => false,
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }

    /// Checks if the error is an abort of a transaction conflicting with a
    /// concurrent one, so it may be retried.
    ///
    /// [`Memory`] never reports one, because its writers are serialized.
    #[must_use]
    pub fn is_serialization_failure(&self) -> bool {
        match self {
            Self::Memory(_) => false,
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_serialization_failure(),
        }
    }
}
