//! [`Command`] for deleting a [`Deal`].

use common::operations::{
    By, Commit, Delete, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{deal, user, Deal, User},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::{Activity, Notification, ServiceRequest};

use super::Command;

/// [`Command`] for deleting a [`Deal`] along with its [`ServiceRequest`]s,
/// [`Activity`] log and [`Notification`]s.
#[derive(Clone, Copy, Debug)]
pub struct DeleteDeal {
    /// ID of the [`Deal`] to delete.
    pub deal_id: deal::Id,

    /// ID of the [`User`] deleting the [`Deal`].
    pub actor_id: user::Id,
}

impl<Db> Command<DeleteDeal> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Deal, deal::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Deal>, deal::Id>>,
            Ok = Option<Deal>,
            Err = Traced<database::Error>,
        > + Database<Delete<By<Deal, deal::Id>>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Deal;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteDeal) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteDeal { deal_id, actor_id } = cmd;

        let actor = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(actor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(actor_id))
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let deal = tx
            .execute(Select(By::<Option<Deal>, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DealNotExists(deal_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_admin() && deal.investor_id != actor_id {
            return Err(tracerr::new!(E::Unauthorized(actor_id)));
        }

        tx.execute(Delete(By::<Deal, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`User(id: {actor_id})` deleted `Deal(id: {deal_id})`");

        Ok(deal)
    }
}

/// Error of [`DeleteDeal`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Deal`] with the provided ID does not exist.
    #[display("`Deal(id: {_0})` does not exist")]
    DealNotExists(#[error(not(source))] deal::Id),

    /// [`User`] is neither the investor of the [`Deal`] nor an admin.
    #[display("`User(id: {_0})` is not allowed to delete the `Deal`")]
    Unauthorized(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
