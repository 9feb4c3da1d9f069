//! [`Command`] for responding to a [`ServiceRequest`].

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Transacted,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        activity::ProviderAssigned,
        deal, property, provider,
        service_request::{self, Decision},
        user, Activity, Deal, Notification, Property, ServiceRequest,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::User;

use super::Command;

/// [`Command`] for responding to a [`ServiceRequest`] by its provider.
///
/// Accepting assigns the provider to the [`Deal`] in the same transaction.
#[derive(Clone, Debug)]
pub struct RespondToServiceRequest {
    /// ID of the [`ServiceRequest`] to respond to.
    pub request_id: service_request::Id,

    /// ID of the provider [`User`] responding.
    pub provider_id: user::Id,

    /// [`Decision`] of the provider.
    pub decision: Decision,

    /// [`service_request::Message`] to the investor, if any.
    pub response: Option<service_request::Message>,
}

impl<Db> Command<RespondToServiceRequest> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>
        + Database<
            Select<By<Option<ServiceRequest>, service_request::Id>>,
            Ok = Option<ServiceRequest>,
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
            Select<By<Option<ServiceRequest>, service_request::Id>>,
            Ok = Option<ServiceRequest>,
            Err = Traced<database::Error>,
        > + Database<Insert<Deal>, Err = Traced<database::Error>>
        + Database<Insert<ServiceRequest>, Err = Traced<database::Error>>
        + Database<Insert<Activity>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = ServiceRequest;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RespondToServiceRequest,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RespondToServiceRequest {
            request_id,
            provider_id,
            decision,
            response,
        } = cmd;

        let deal_id = self
            .database()
            .execute(Select(By::<Option<ServiceRequest>, _>::new(request_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RequestNotExists(request_id))
            .map_err(tracerr::wrap!())?
            .deal_id;

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

        let mut req = tx
            .execute(Select(By::<Option<ServiceRequest>, _>::new(request_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::RequestNotExists(request_id))
            .map_err(tracerr::wrap!())?;
        if req.provider_id != provider_id {
            return Err(tracerr::new!(E::Unauthorized(provider_id)));
        }
        req.respond(decision, response)
            .map_err(|e| E::AlreadyResponded(e.status))
            .map_err(tracerr::wrap!())?;

        let mut deal = tx
            .execute(Select(By::<Option<Deal>, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DealNotExists(deal_id))
            .map_err(tracerr::wrap!())?;

        if decision == Decision::Accept {
            if deal.stage().is_terminal() {
                return Err(tracerr::new!(E::DealTerminal(deal_id)));
            }
            deal.assign(req.provider_kind, provider_id)
                .map_err(|assigned| E::AlreadyAssigned {
                    kind: req.provider_kind,
                    provider_id: assigned,
                })
                .map_err(tracerr::wrap!())?;

            tx.execute(Insert(deal.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
            tx.execute(Insert(Activity::new(
                deal_id,
                provider_id,
                ProviderAssigned {
                    kind: req.provider_kind,
                    provider_id,
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        }
        tx.execute(Insert(req.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`User(id: {provider_id})` responded to \
             `ServiceRequest(id: {request_id})` with `{decision}`",
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
        let mut notifications =
            vec![Notification::request_responded(&req, property.as_ref())];
        if decision == Decision::Accept {
            notifications.push(Notification::provider_assigned(
                provider_id,
                deal_id,
                req.provider_kind,
                property.as_ref(),
            ));
        }
        self.dispatch(notifications).await;

        Ok(req)
    }
}

/// Error of [`RespondToServiceRequest`] [`Command`] execution.
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

    /// [`ServiceRequest`] is not pending anymore.
    #[display("`ServiceRequest` is already `{_0}`")]
    AlreadyResponded(#[error(not(source))] service_request::Status),

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

    /// [`ServiceRequest`] with the provided ID does not exist.
    #[display("`ServiceRequest(id: {_0})` does not exist")]
    RequestNotExists(#[error(not(source))] service_request::Id),

    /// [`User`] is not the provider the [`ServiceRequest`] is addressed to.
    #[display("`User(id: {_0})` is not the requested provider")]
    Unauthorized(#[error(not(source))] user::Id),
}
