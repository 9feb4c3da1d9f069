//! [`Handler`] abstraction.

use std::future::Future;

/// Asynchronous executor of an `Args` operation.
///
/// Commands, queries and database operations are all expressed as
/// [`Handler`] implementations keyed by their argument type.
pub trait Handler<Args = ()> {
    /// Result of a successful execution.
    type Ok;

    /// Error of a failed execution.
    type Err;

    /// Executes the operation described by the provided `args`.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
