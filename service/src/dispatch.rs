//! Best-effort delivery of [`Notification`]s into inboxes.
//!
//! Delivery happens after the triggering change is committed, so it never
//! rolls that change back. A failed delivery is retried a bounded number of
//! times, and is only logged once the retries are exhausted.

use std::time;

use common::operations::Insert;
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Notification,
    infra::{database, Database},
    Service,
};

/// Configuration of [`Notification`]s delivery.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Number of attempts to deliver a single [`Notification`].
    ///
    /// Zero is treated as a single attempt.
    #[default(3)]
    pub attempts: u8,

    /// Delay before the first retry, growing linearly with each next one.
    #[default(time::Duration::from_millis(100))]
    pub backoff: time::Duration,
}

impl<Db> Service<Db>
where
    Db: Database<
        Insert<Notification>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    /// Delivers the provided [`Notification`]s into their recipients'
    /// inboxes, in order.
    ///
    /// Never fails: undelivered [`Notification`]s are logged and dropped.
    pub async fn dispatch(
        &self,
        notifications: impl IntoIterator<Item = Notification>,
    ) {
        for notification in notifications {
            self.deliver(notification).await;
        }
    }

    /// Delivers the provided [`Notification`], retrying on failures.
    ///
    /// Retries are safe, because storing the same [`Notification`] again
    /// doesn't duplicate it.
    async fn deliver(&self, notification: Notification) {
        let Config { attempts, backoff } = self.config().dispatch;
        let attempts = attempts.max(1);

        for attempt in 1..=attempts {
            let res = self
                .database()
                .execute(Insert(notification.clone()))
                .await;
            let Err(e) = res else {
                return;
            };

            if attempt < attempts {
                log::warn!(
                    "failed to deliver `Notification(id: {})` to \
                     `User(id: {})` (attempt {attempt}/{attempts}), \
                     retrying: {e}",
                    notification.id,
                    notification.recipient_id,
                );
                tokio::time::sleep(backoff.saturating_mul(attempt.into()))
                    .await;
            } else {
                log::error!(
                    "failed to deliver `Notification(id: {})` to \
                     `User(id: {})` after {attempts} attempts: {e}",
                    notification.id,
                    notification.recipient_id,
                );
            }
        }
    }
}
