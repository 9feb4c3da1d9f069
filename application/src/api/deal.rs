//! [`Deal`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{domain, query, read, Query as _};
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    AsError, Context, Error,
};

/// Property transaction of an investor.
#[derive(Clone, Debug, From)]
pub struct Deal(domain::Deal);

/// Property transaction tracked from an investor's interest till its
/// completion or cancellation.
#[graphql_object(context = Context)]
impl Deal {
    /// Unique identifier of this `Deal`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `Property` this `Deal` is made upon.
    ///
    /// `null` if the `Property` was delisted.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %self.0.id,
            gql.name = "Deal.property",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn property(
        &self,
        ctx: &Context,
    ) -> Result<Option<api::Property>, Error> {
        ctx.service()
            .execute(query::property::ById::by(self.0.property_id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|p| p.map(Into::into))
    }

    /// Investing `User` owning this `Deal`.
    #[must_use]
    pub fn investor(&self) -> api::User {
        #[expect(unsafe_code, reason = "`Deal` references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.0.investor_id)
        }
    }

    /// Current stage of this `Deal`.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.0.stage().into()
    }

    /// Stages this `Deal` went through, in chronological order.
    #[must_use]
    pub fn stage_history(&self) -> Vec<StageEntry> {
        self.0.history.entries().iter().map(Into::into).collect()
    }

    /// Assigned broker, if any.
    #[must_use]
    pub fn broker(&self) -> Option<api::User> {
        self.assigned(domain::provider::Kind::Broker)
    }

    /// Assigned mortgage advisor, if any.
    #[must_use]
    pub fn mortgage_advisor(&self) -> Option<api::User> {
        self.assigned(domain::provider::Kind::MortgageAdvisor)
    }

    /// Assigned lawyer, if any.
    #[must_use]
    pub fn lawyer(&self) -> Option<api::User> {
        self.assigned(domain::provider::Kind::Lawyer)
    }

    /// Price offered by the investor, if any.
    #[must_use]
    pub fn offer_price(&self) -> Option<Money> {
        self.0.offer_price
    }

    /// `DateTime` when this `Deal` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Deal` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }

    /// `ServiceRequest`s made within this `Deal`, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            deal.id = %self.0.id,
            first = ?first,
            gql.name = "Deal.serviceRequests",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn service_requests(
        &self,
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::service_request::list::Connection, Error> {
        let arguments = api::arguments(first, after)
            .map_err(Error::from)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(query::service_requests::List::by(
                read::service_request::list::Selector {
                    arguments,
                    filter: read::service_request::list::Filter::Deal(
                        self.0.id,
                    ),
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Activity timeline of this `Deal`, oldest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            deal.id = %self.0.id,
            first = ?first,
            gql.name = "Deal.activity",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn activity(
        &self,
        first: Option<i32>,
        after: Option<api::activity::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::activity::list::Connection, Error> {
        api::activity::list::page(self.0.id, first, after, ctx).await
    }
}

impl Deal {
    /// Returns the provider assigned to the provided role, if any.
    fn assigned(&self, kind: domain::provider::Kind) -> Option<api::User> {
        self.0.assignment(kind).map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Deal` references existing `User`"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        })
    }
}

/// Unique identifier of a `Deal`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::deal::Id)]
#[into(domain::deal::Id)]
#[graphql(name = "DealId", transparent)]
pub struct Id(Uuid);

/// Note attached to a `Deal` stage transition.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(name = "DealNote", with = scalar::Via::<domain::deal::Note>)]
pub struct Note(domain::deal::Note);

/// Phase of a `Deal` in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "DealStage")]
pub enum Stage {
    /// Investor expressed interest in a `Property`.
    Interest,

    /// Broker is engaged.
    BrokerAssigned,

    /// Mortgage is being arranged.
    Mortgage,

    /// Legal review is in progress.
    Legal,

    /// Deal is being closed.
    Closing,

    /// Deal is completed.
    Completed,

    /// Deal is abandoned.
    Cancelled,
}

impl From<domain::deal::Stage> for Stage {
    fn from(stage: domain::deal::Stage) -> Self {
        use domain::deal::Stage as S;

        match stage {
            S::Interest => Self::Interest,
            S::BrokerAssigned => Self::BrokerAssigned,
            S::Mortgage => Self::Mortgage,
            S::Legal => Self::Legal,
            S::Closing => Self::Closing,
            S::Completed => Self::Completed,
            S::Cancelled => Self::Cancelled,
        }
    }
}

impl From<Stage> for domain::deal::Stage {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Interest => Self::Interest,
            Stage::BrokerAssigned => Self::BrokerAssigned,
            Stage::Mortgage => Self::Mortgage,
            Stage::Legal => Self::Legal,
            Stage::Closing => Self::Closing,
            Stage::Completed => Self::Completed,
            Stage::Cancelled => Self::Cancelled,
        }
    }
}

/// Single record of a `Deal` stage history.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(name = "DealStageEntry")]
pub struct StageEntry {
    /// Stage the `Deal` entered.
    pub stage: Stage,

    /// `DateTime` when the stage was entered.
    pub at: DateTime,

    /// Note left by the actor, if any.
    pub note: Option<Note>,
}

impl From<&domain::deal::Entry> for StageEntry {
    fn from(entry: &domain::deal::Entry) -> Self {
        Self {
            stage: entry.stage.into(),
            at: entry.at.coerce(),
            note: entry.note.clone().map(Into::into),
        }
    }
}

pub mod list {
    //! Definitions related to [`Deal`] lists.
    //!
    //! [`Deal`]: super::Deal

    crate::api::define_list!(
        service::read::deal::list as api::Deal,
        edge = "DealListEdge",
        connection = "DealListConnection",
    );
}
