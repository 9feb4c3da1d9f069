//! [`Command`] for assigning a provider to a [`Deal`] administratively.

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        activity::ProviderAssigned, deal, property, provider,
        service_request::Status,
        user, Activity, Deal, Notification, Property, ServiceRequest, User,
    },
    infra::{database, Database},
    read::service_request::Pending,
    Service,
};

use super::Command;

/// [`Command`] for assigning a provider to a [`Deal`] bypassing the
/// [`ServiceRequest`] handshake.
///
/// An accepted [`ServiceRequest`] is still recorded for the assignment: the
/// provider's pending one is accepted, or a new accepted one is created. A
/// pending [`ServiceRequest`] of another provider for the same role is
/// declined.
#[derive(Clone, Copy, Debug)]
pub struct AssignProvider {
    /// ID of the [`Deal`] to assign the provider to.
    pub deal_id: deal::Id,

    /// Role to assign the provider to.
    pub kind: provider::Kind,

    /// ID of the provider [`User`] to assign.
    pub provider_id: user::Id,

    /// ID of the admin [`User`] performing the assignment.
    pub actor_id: user::Id,
}

impl<Db> Command<AssignProvider> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<provider::Profile>, user::Id>>,
            Ok = Option<provider::Profile>,
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
        > + Database<
            Select<By<Option<Pending>, (deal::Id, provider::Kind)>>,
            Ok = Option<Pending>,
            Err = Traced<database::Error>,
        > + Database<Insert<Deal>, Err = Traced<database::Error>>
        + Database<Insert<ServiceRequest>, Err = Traced<database::Error>>
        + Database<Insert<Activity>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Deal;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AssignProvider,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AssignProvider {
            deal_id,
            kind,
            provider_id,
            actor_id,
        } = cmd;

        let actor = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(actor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(actor_id))
            .map_err(tracerr::wrap!())?;
        if !actor.is_admin() {
            return Err(tracerr::new!(E::Unauthorized(actor_id)));
        }

        let profile = self
            .database()
            .execute(Select(By::<Option<provider::Profile>, _>::new(
                provider_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProviderNotExists(provider_id))
            .map_err(tracerr::wrap!())?;
        if profile.kind != kind {
            return Err(tracerr::new!(E::ProviderKindMismatch {
                provider_id,
                kind: profile.kind,
            }));
        }

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
        if deal.stage().is_terminal() {
            return Err(tracerr::new!(E::DealTerminal(deal_id)));
        }
        deal.assign(kind, provider_id)
            .map_err(|assigned| E::AlreadyAssigned {
                kind,
                provider_id: assigned,
            })
            .map_err(tracerr::wrap!())?;

        let pending = tx
            .execute(Select(By::<Option<Pending>, _>::new((deal_id, kind))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        let (accepted, superseded) = match pending {
            Some(Pending(mut req)) if req.provider_id == provider_id => {
                req.overrule(Status::Accepted);
                (req, None)
            }
            pending => {
                let superseded = pending.map(|Pending(mut req)| {
                    req.overrule(Status::Declined);
                    req
                });
                let mut req = ServiceRequest::new(
                    deal_id,
                    deal.investor_id,
                    provider_id,
                    kind,
                    None,
                );
                req.overrule(Status::Accepted);
                (req, superseded)
            }
        };

        tx.execute(Insert(deal.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        for req in superseded.iter().chain([&accepted]) {
            tx.execute(Insert(req.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Insert(Activity::new(
            deal_id,
            actor_id,
            ProviderAssigned { kind, provider_id },
        )))
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
        .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`User(id: {provider_id})` assigned as `{kind}` to \
             `Deal(id: {deal_id})` by `User(id: {actor_id})`",
        );

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
        let mut notifications = vec![
            Notification::provider_assigned(
                deal.investor_id,
                deal_id,
                kind,
                property.as_ref(),
            ),
            Notification::provider_assigned(
                provider_id,
                deal_id,
                kind,
                property.as_ref(),
            ),
        ];
        notifications.extend(superseded.as_ref().map(|req| {
            Notification::request_responded(req, property.as_ref())
        }));
        self.dispatch(notifications).await;

        Ok(deal)
    }
}

/// Error of [`AssignProvider`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Role is already taken on the [`Deal`].
    #[display("`{kind}` is already assigned: `User(id: {provider_id})`")]
    AlreadyAssigned {
        /// Role being assigned.
        kind: provider::Kind,

        /// ID of the provider holding the role.
        provider_id: user::Id,
    },

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Deal`] with the provided ID does not exist.
    #[display("`Deal(id: {_0})` does not exist")]
    DealNotExists(#[error(not(source))] deal::Id),

    /// [`Deal`] is in a terminal [`deal::Stage`].
    #[display("`Deal(id: {_0})` is finished")]
    DealTerminal(#[error(not(source))] deal::Id),

    /// Provider holds a [`provider::Profile`] of another role.
    #[display("`User(id: {provider_id})` is a `{kind}`")]
    ProviderKindMismatch {
        /// ID of the provider.
        provider_id: user::Id,

        /// Role the provider actually holds.
        kind: provider::Kind,
    },

    /// [`User`] holds no [`provider::Profile`].
    #[display("`User(id: {_0})` is not a provider")]
    ProviderNotExists(#[error(not(source))] user::Id),

    /// [`User`] is not an admin.
    #[display("`User(id: {_0})` is not an admin")]
    Unauthorized(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
