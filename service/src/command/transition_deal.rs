//! [`Command`] for moving a [`Deal`] to another [`deal::Stage`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        activity::StageChange, deal, property, user, Activity, Deal,
        Notification, Property, User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for moving a [`Deal`] to another [`deal::Stage`].
#[derive(Clone, Debug)]
pub struct TransitionDeal {
    /// ID of the [`Deal`] to move.
    pub deal_id: deal::Id,

    /// [`deal::Stage`] to move the [`Deal`] to.
    pub target: deal::Stage,

    /// ID of the [`User`] moving the [`Deal`].
    pub actor_id: user::Id,

    /// [`deal::Note`] explaining the move, if any.
    pub note: Option<deal::Note>,
}

impl<Db> Command<TransitionDeal> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Property>, property::Id>>,
            Ok = Option<Property>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<Notification>,
            Ok = (),
            Err = Traced<database::Error>,
        >,
    Transacted<Db>: Database<
            Lock<By<Deal, deal::Id>>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Deal>, deal::Id>>,
            Ok = Option<Deal>,
            Err = Traced<database::Error>,
        > + Database<Insert<Deal>, Err = Traced<database::Error>>
        + Database<Insert<Activity>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Deal;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: TransitionDeal,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TransitionDeal {
            deal_id,
            target,
            actor_id,
            note,
        } = cmd;

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

        // Serialize concurrent writes upon the same `Deal`.
        tx.execute(Lock(By::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut deal = tx
            .execute(Select(By::<Option<Deal>, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DealNotExists(deal_id))
            .map_err(tracerr::wrap!())?;

        if !actor.is_admin() && !deal.is_participant(actor_id) {
            return Err(tracerr::new!(E::Unauthorized(actor_id)));
        }

        let from = deal
            .transition(target, note.clone())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Insert(deal.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Insert(Activity::new(
            deal_id,
            actor_id,
            StageChange {
                from,
                to: target,
                note,
            },
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`Deal(id: {deal_id})` moved from `{from}` to `{target}` by \
             `User(id: {actor_id})`",
        );

        // Notifications are best-effort, so the missing `Property` only
        // degrades their texts.
        let property = self
            .database()
            .execute(Select(By::<Option<Property>, _>::new(deal.property_id)))
            .await
            .unwrap_or_else(|e| {
                log::warn!(
                    "failed to load `Property(id: {})`: {e}",
                    deal.property_id,
                );
                None
            });
        self.dispatch(
            deal.participants()
                .filter(|&id| id != actor_id)
                .map(|id| {
                    Notification::stage_changed(
                        id,
                        &deal,
                        from,
                        property.as_ref(),
                    )
                })
                .collect::<Vec<_>>(),
        )
        .await;

        Ok(deal)
    }
}

/// Error of [`TransitionDeal`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Deal`] with the provided ID does not exist.
    #[display("`Deal(id: {_0})` does not exist")]
    DealNotExists(#[error(not(source))] deal::Id),

    /// Requested [`deal::Stage`] cannot be entered.
    #[display("Invalid transition: {_0}")]
    #[from]
    InvalidTransition(deal::TransitionError),

    /// [`User`] is neither a participant of the [`Deal`], nor an admin.
    #[display("`User(id: {_0})` is not allowed to move the `Deal`")]
    Unauthorized(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
