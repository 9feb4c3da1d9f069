//! [`Query`] collection related to a single [`Deal`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{deal, provider, user, Deal, User},
    infra::{database, Database},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a [`Deal`] by its [`deal::Id`].
pub type ById = DatabaseQuery<By<Option<Deal>, deal::Id>>;

/// [`Query`] for the provider assigned to a [`Deal`] in a role.
///
/// Only participants of the [`Deal`] and admins may look it up.
#[derive(Clone, Copy, Debug)]
pub struct Assignment {
    /// ID of the [`Deal`].
    pub deal_id: deal::Id,

    /// Role to look up.
    pub kind: provider::Kind,

    /// ID of the [`User`] looking up the assignment.
    pub viewer_id: user::Id,
}

impl<Db> Query<Assignment> for Service<Db>
where
    Db: Database<
            Select<By<Option<Deal>, deal::Id>>,
            Ok = Option<Deal>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Option<user::Id>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Assignment {
            deal_id,
            kind,
            viewer_id,
        }: Assignment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let viewer = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(viewer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(viewer_id))
            .map_err(tracerr::wrap!())?;

        let deal = self
            .database()
            .execute(Select(By::<Option<Deal>, _>::new(deal_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DealNotExists(deal_id))
            .map_err(tracerr::wrap!())?;

        if !viewer.is_admin() && !deal.is_participant(viewer_id) {
            return Err(tracerr::new!(E::Unauthorized(viewer_id)));
        }

        Ok(deal.assignment(kind))
    }
}

/// Error of [`Assignment`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Deal`] with the provided ID does not exist.
    #[display("`Deal(id: {_0})` does not exist")]
    #[from(ignore)]
    DealNotExists(#[error(not(source))] deal::Id),

    /// [`User`] neither takes part in the [`Deal`] nor is an admin.
    #[display("`User(id: {_0})` is not allowed to view the `Deal`")]
    #[from(ignore)]
    Unauthorized(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}
