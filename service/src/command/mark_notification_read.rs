//! [`Command`] for marking a [`Notification`] as read.

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{notification, user, Notification},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::User;

use super::Command;

/// [`Command`] for marking a [`Notification`] as read by its recipient.
///
/// Marking an already read [`Notification`] is a no-op.
#[derive(Clone, Copy, Debug)]
pub struct MarkNotificationRead {
    /// ID of the [`Notification`] to mark.
    pub notification_id: notification::Id,

    /// ID of the [`User`] reading the [`Notification`].
    pub user_id: user::Id,
}

impl<Db> Command<MarkNotificationRead> for Service<Db>
where
    Db: Database<
            Select<By<Option<Notification>, notification::Id>>,
            Ok = Option<Notification>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkNotificationRead,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let MarkNotificationRead {
            notification_id,
            user_id,
        } = cmd;

        let mut notification = self
            .database()
            .execute(Select(By::<Option<Notification>, _>::new(
                notification_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::NotificationNotExists(notification_id))
            .map_err(tracerr::wrap!())?;
        if notification.recipient_id != user_id {
            return Err(tracerr::new!(E::Unauthorized(user_id)));
        }
        if notification.is_read {
            return Ok(notification);
        }

        notification.is_read = true;
        self.database()
            .execute(Insert(notification.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(notification)
    }
}

/// Error of [`MarkNotificationRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Notification`] with the provided ID does not exist.
    #[display("`Notification(id: {_0})` does not exist")]
    #[from(ignore)]
    NotificationNotExists(#[error(not(source))] notification::Id),

    /// [`User`] is not the recipient of the [`Notification`].
    #[display("`User(id: {_0})` is not the recipient")]
    #[from(ignore)]
    Unauthorized(#[error(not(source))] user::Id),
}
