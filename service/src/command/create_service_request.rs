//! [`Command`] for asking a provider to join a [`Deal`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        deal, property, provider, service_request, user, Deal, Notification,
        Property, ServiceRequest, User,
    },
    infra::{database, Database},
    read::service_request::Pending,
    Service,
};

use super::Command;

/// Name of the database constraint keeping a single pending
/// [`ServiceRequest`] per [`Deal`] and role.
const PENDING_UNIQUENESS: &str = "service_requests_pending_uniq";

/// [`Command`] for asking a provider to join a [`Deal`].
#[derive(Clone, Debug)]
pub struct CreateServiceRequest {
    /// ID of the [`Deal`] the provider is asked to join.
    pub deal_id: deal::Id,

    /// ID of the investing [`User`] owning the [`Deal`].
    pub investor_id: user::Id,

    /// ID of the provider [`User`] being asked.
    pub provider_id: user::Id,

    /// Role the provider is asked to take.
    pub provider_kind: provider::Kind,

    /// [`service_request::Message`] to the provider, if any.
    pub message: Option<service_request::Message>,
}

impl<Db> Command<CreateServiceRequest> for Service<Db>
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
        > + Database<Insert<ServiceRequest>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ServiceRequest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateServiceRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateServiceRequest {
            deal_id,
            investor_id,
            provider_id,
            provider_kind,
            message,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<User>, _>::new(investor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(investor_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let profile = self
            .database()
            .execute(Select(By::<Option<provider::Profile>, _>::new(
                provider_id,
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProviderNotExists(provider_id))
            .map_err(tracerr::wrap!())?;
        if profile.kind != provider_kind {
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

        let deal = tx
            .execute(Select(By::<Option<Deal>, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DealNotExists(deal_id))
            .map_err(tracerr::wrap!())?;
        if deal.investor_id != investor_id {
            return Err(tracerr::new!(E::Unauthorized(investor_id)));
        }
        if deal.stage().is_terminal() {
            return Err(tracerr::new!(E::DealTerminal(deal_id)));
        }
        if let Some(assigned) = deal.assignment(provider_kind) {
            return Err(tracerr::new!(E::AlreadyAssigned {
                kind: provider_kind,
                provider_id: assigned,
            }));
        }

        let pending = tx
            .execute(Select(By::<Option<Pending>, _>::new((
                deal_id,
                provider_kind,
            ))))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if let Some(Pending(req)) = pending {
            return Err(tracerr::new!(E::DuplicatePendingRequest(req.id)));
        }

        let req = ServiceRequest::new(
            deal_id,
            investor_id,
            provider_id,
            provider_kind,
            message,
        );
        tx.execute(Insert(req.clone()))
            .await
            .map_err(|e| {
                if e.as_ref().is_unique_violation(Some(PENDING_UNIQUENESS)) {
                    tracerr::new!(E::DuplicatePendingRequest(req.id))
                } else {
                    tracerr::map_from(e)
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`User(id: {investor_id})` asked `User(id: {provider_id})` to \
             join `Deal(id: {deal_id})` as `{provider_kind}`",
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
        self.dispatch([Notification::request_received(&req, property.as_ref())])
            .await;

        Ok(req)
    }
}

/// Error of [`CreateServiceRequest`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Role is already taken on the [`Deal`].
    #[display("`{kind}` is already assigned: `User(id: {provider_id})`")]
    AlreadyAssigned {
        /// Requested role.
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

    /// Another [`ServiceRequest`] for the same role is still pending.
    #[display("`ServiceRequest(id: {_0})` is still pending")]
    DuplicatePendingRequest(#[error(not(source))] service_request::Id),

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

    /// [`User`] doesn't own the [`Deal`].
    #[display("`User(id: {_0})` doesn't own the `Deal`")]
    Unauthorized(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
