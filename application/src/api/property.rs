//! [`Property`]-related definitions.

use common::Money;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::Context;

/// Listed [`Property`] a deal is made upon.
#[derive(Clone, Debug, From)]
pub struct Property(domain::Property);

/// Listed property a `Deal` is made upon.
#[graphql_object(context = Context)]
impl Property {
    /// Unique identifier of this `Property`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Title of this `Property`.
    #[must_use]
    pub fn title(&self) -> &str {
        self.0.title.as_ref()
    }

    /// City this `Property` is located in.
    #[must_use]
    pub fn city(&self) -> &str {
        self.0.city.as_ref()
    }

    /// Listing price of this `Property`.
    #[must_use]
    pub fn price(&self) -> Money {
        self.0.price
    }
}

/// Unique identifier of a `Property`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::property::Id)]
#[into(domain::property::Id)]
#[graphql(name = "PropertyId", transparent)]
pub struct Id(Uuid);
