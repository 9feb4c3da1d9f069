//! [`Command`] for opening a new [`Deal`].

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{property, user, Deal, Property, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for opening a new [`Deal`] on a [`Property`].
#[derive(Clone, Copy, Debug)]
pub struct CreateDeal {
    /// ID of the [`Property`] the [`Deal`] is about.
    pub property_id: property::Id,

    /// ID of the investing [`User`] opening the [`Deal`].
    pub investor_id: user::Id,

    /// Price offered by the investor, if any.
    pub offer_price: Option<Money>,
}

impl<Db> Command<CreateDeal> for Service<Db>
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
        >,
    Transacted<Db>: Database<Insert<Deal>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Deal;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateDeal) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateDeal {
            property_id,
            investor_id,
            offer_price,
        } = cmd;

        let investor = self
            .database()
            .execute(Select(By::<Option<User>, _>::new(investor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(investor_id))
            .map_err(tracerr::wrap!())?;
        if investor.role != user::Role::Investor {
            return Err(tracerr::new!(E::UserNotInvestor(investor_id)));
        }

        self.database()
            .execute(Select(By::<Option<Property>, _>::new(property_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PropertyNotExists(property_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let deal = Deal::new(property_id, investor_id, offer_price);

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(deal.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`User(id: {investor_id})` opened `Deal(id: {})` on \
             `Property(id: {property_id})`",
            deal.id,
        );

        Ok(deal)
    }
}

/// Error of [`CreateDeal`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Property`] with the provided ID does not exist.
    #[display("`Property(id: {_0})` does not exist")]
    PropertyNotExists(#[error(not(source))] property::Id),

    /// [`User`] is not an investor.
    #[display("`User(id: {_0})` is not an investor")]
    UserNotInvestor(#[error(not(source))] user::Id),

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    UserNotExists(#[error(not(source))] user::Id),
}
