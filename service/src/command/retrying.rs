//! [`Command`] re-executing another one on transient conflicts.
//!
//! Transactions run at the serializable isolation level, so concurrent
//! writers may be aborted by the [`Database`] instead of being blocked. Such
//! an abort leaves nothing behind, and re-executing the whole [`Command`]
//! usually succeeds.
//!
//! [`Database`]: crate::infra::Database

use std::time;

use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{infra::database, Service};

use super::{
    assign_provider, create_deal, create_service_request, delete_deal,
    respond_to_service_request, transition_deal, Command,
};

/// Configuration of [`Retrying`] [`Command`]s.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Number of attempts to execute a single [`Command`].
    ///
    /// Zero is treated as a single attempt.
    #[default(3)]
    pub attempts: u8,

    /// Delay before the first retry, growing linearly with each next one.
    #[default(time::Duration::from_millis(50))]
    pub backoff: time::Duration,
}

/// [`Command`] executing the wrapped `C` [`Command`] again while it fails
/// with a [`Transient`] error.
#[derive(Clone, Copy, Debug)]
pub struct Retrying<C>(pub C);

/// Error which may disappear by itself on a next attempt.
pub trait Transient {
    /// Checks if this error is transient.
    fn is_transient(&self) -> bool;
}

impl<Db, C, E> Command<Retrying<C>> for Service<Db>
where
    C: Clone,
    E: Transient + std::fmt::Display,
    Self: Command<C, Err = Traced<E>>,
{
    type Ok = <Self as Command<C>>::Ok;
    type Err = Traced<E>;

    async fn execute(
        &self,
        Retrying(cmd): Retrying<C>,
    ) -> Result<Self::Ok, Self::Err> {
        let Config { attempts, backoff } = self.config().retry;
        let attempts = attempts.max(1);

        let mut attempt = 1;
        loop {
            match <Self as Command<C>>::execute(self, cmd.clone()).await {
                Err(e) if attempt < attempts && e.as_ref().is_transient() => {
                    log::warn!(
                        "`Command` aborted by a concurrent one \
                         (attempt {attempt}/{attempts}), retrying: {e}",
                    );
                    tokio::time::sleep(backoff.saturating_mul(attempt.into()))
                        .await;
                    attempt += 1;
                }
                res => return res,
            }
        }
    }
}

impl Transient for database::Error {
    fn is_transient(&self) -> bool {
        self.is_serialization_failure()
    }
}

/// Implements [`Transient`] for `ExecutionError`s whose only transient
/// variant is a `Db` one.
macro_rules! impl_transient {
    ($($cmd:ident),* $(,)?) => {$(
        impl Transient for $cmd::ExecutionError {
            fn is_transient(&self) -> bool {
                matches!(self, Self::Db(e) if e.is_transient())
            }
        }
    )*};
}

impl_transient!(
    assign_provider,
    create_deal,
    create_service_request,
    delete_deal,
    respond_to_service_request,
    transition_deal,
);

#[cfg(test)]
mod spec {
    use std::sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    };

    use derive_more::{Display, Error};
    use tracerr::Traced;

    use crate::{dispatch, infra::Memory, Command as _, Config, Service};

    use super::{Retrying, Transient};

    /// Command failing with a transient error for the first `failures`
    /// executions.
    #[derive(Clone, Debug)]
    struct Flaky {
        failures: u8,
        transient: bool,
        executed: Arc<AtomicU8>,
    }

    #[derive(Debug, Display, Error)]
    #[display("aborted")]
    struct Aborted {
        transient: bool,
    }

    impl Transient for Aborted {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    impl super::Command<Flaky> for Service<Memory> {
        type Ok = u8;
        type Err = Traced<Aborted>;

        async fn execute(&self, cmd: Flaky) -> Result<u8, Self::Err> {
            let n = cmd.executed.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= cmd.failures {
                return Err(tracerr::new!(Aborted {
                    transient: cmd.transient,
                }));
            }
            Ok(n)
        }
    }

    fn service(attempts: u8) -> Service<Memory> {
        Service::new(
            Config {
                jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                    b"test",
                ),
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    b"test",
                ),
                dispatch: dispatch::Config::default(),
                retry: super::Config {
                    attempts,
                    backoff: std::time::Duration::ZERO,
                },
            },
            Memory::new(),
        )
    }

    fn flaky(failures: u8, transient: bool) -> (Flaky, Arc<AtomicU8>) {
        let executed = Arc::new(AtomicU8::new(0));
        let cmd = Flaky {
            failures,
            transient,
            executed: Arc::clone(&executed),
        };
        (cmd, executed)
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let (cmd, executed) = flaky(2, true);

        let res = service(3).execute(Retrying(cmd)).await;

        assert_eq!(res.unwrap(), 3);
        assert_eq!(executed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts() {
        let (cmd, executed) = flaky(5, true);

        let res = service(3).execute(Retrying(cmd)).await;

        assert!(res.unwrap_err().as_ref().transient);
        assert_eq!(executed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fails_right_away_on_persistent_errors() {
        let (cmd, executed) = flaky(1, false);

        let res = service(3).execute(Retrying(cmd)).await;

        assert!(res.is_err());
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn treats_zero_attempts_as_one() {
        let (cmd, executed) = flaky(1, true);

        let res = service(0).execute(Retrying(cmd)).await;

        assert!(res.is_err());
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }
}
