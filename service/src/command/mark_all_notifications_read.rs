//! [`Command`] for marking all [`Notification`]s of a [`User`] as read.

use common::operations::Update;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{notification::AllRead, user},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::{Notification, User};

use super::Command;

/// [`Command`] for marking all unread [`Notification`]s of a [`User`] as
/// read.
///
/// Returns the number of [`Notification`]s marked.
#[derive(Clone, Copy, Debug)]
pub struct MarkAllNotificationsRead {
    /// ID of the [`User`] whose inbox is marked.
    pub user_id: user::Id,
}

impl<Db> Command<MarkAllNotificationsRead> for Service<Db>
where
    Db: Database<
        Update<AllRead>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: MarkAllNotificationsRead,
    ) -> Result<Self::Ok, Self::Err> {
        let MarkAllNotificationsRead { user_id } = cmd;

        let marked = self
            .database()
            .execute(Update(AllRead {
                recipient_id: user_id,
            }))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))?;

        log::debug!(
            "{marked} `Notification`s of `User(id: {user_id})` marked as read",
        );

        Ok(marked)
    }
}

/// Error of [`MarkAllNotificationsRead`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
