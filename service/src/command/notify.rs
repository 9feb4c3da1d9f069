//! [`Command`] for sending a [`Notification`] directly.

use common::operations::{By, Insert, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        notification::{Kind, Link, Message, Metadata, Title},
        user, Notification, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for putting a [`Notification`] into the inbox of a [`User`].
///
/// Unlike [`Notification`]s produced by other [`Command`]s, this one is
/// stored synchronously, so a failure is reported to the caller.
#[derive(Clone, Debug)]
pub struct Notify {
    /// ID of the [`User`] to notify.
    pub recipient_id: user::Id,

    /// [`Kind`] of the [`Notification`].
    pub kind: Kind,

    /// [`Title`] of the [`Notification`].
    pub title: Title,

    /// [`Message`] of the [`Notification`].
    pub message: Message,

    /// [`Link`] of the [`Notification`], if any.
    pub link: Option<Link>,

    /// [`Metadata`] of the [`Notification`].
    pub metadata: Metadata,
}

impl<Db> Command<Notify> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<Notification>, Err = Traced<database::Error>>,
{
    type Ok = Notification;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: Notify) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let Notify {
            recipient_id,
            kind,
            title,
            message,
            link,
            metadata,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(recipient_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(recipient_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let notification = Notification::new(
            recipient_id,
            kind,
            title,
            message,
            link,
            metadata,
        );
        self.database()
            .execute(Insert(notification.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`Notification(id: {})` of `{kind}` kind sent to \
             `User(id: {recipient_id})`",
            notification.id,
        );

        Ok(notification)
    }
}

/// Error of [`Notify`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
