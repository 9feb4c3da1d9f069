//! [`ServiceRequest`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Invitation of a provider to join a deal.
#[derive(Clone, Debug, From)]
pub struct ServiceRequest(domain::ServiceRequest);

/// Invitation of a provider to join a `Deal` in a particular role.
#[graphql_object(context = Context)]
impl ServiceRequest {
    /// Unique identifier of this `ServiceRequest`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// ID of the `Deal` the provider is asked to join.
    #[must_use]
    pub fn deal_id(&self) -> api::deal::Id {
        self.0.deal_id.into()
    }

    /// Investing `User` who made this `ServiceRequest`.
    #[must_use]
    pub fn investor(&self) -> api::User {
        #[expect(unsafe_code, reason = "request references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.0.investor_id)
        }
    }

    /// Provider `User` being asked.
    #[must_use]
    pub fn provider(&self) -> api::User {
        #[expect(unsafe_code, reason = "request references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.0.provider_id)
        }
    }

    /// Role the provider is asked to take.
    #[must_use]
    pub fn provider_kind(&self) -> ProviderKind {
        self.0.provider_kind.into()
    }

    /// Status of this `ServiceRequest`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Message of the investor to the provider, if any.
    #[must_use]
    pub fn investor_message(&self) -> Option<Message> {
        self.0.investor_message.clone().map(Into::into)
    }

    /// Response of the provider, if any.
    #[must_use]
    pub fn provider_response(&self) -> Option<Message> {
        self.0.provider_response.clone().map(Into::into)
    }

    /// `DateTime` when this `ServiceRequest` was made.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when the provider responded, if they did.
    #[must_use]
    pub fn responded_at(&self) -> Option<DateTime> {
        self.0.responded_at.map(|at| at.coerce())
    }

    /// Indicator whether an admin assignment decided this `ServiceRequest`
    /// instead of the provider.
    #[must_use]
    pub fn is_overruled(&self) -> bool {
        self.0.overruled
    }
}

/// Unique identifier of a `ServiceRequest`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::service_request::Id)]
#[into(domain::service_request::Id)]
#[graphql(name = "ServiceRequestId", transparent)]
pub struct Id(Uuid);

/// Free-form message exchanged over a `ServiceRequest`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ServiceRequestMessage",
    with = scalar::Via::<domain::service_request::Message>,
)]
pub struct Message(domain::service_request::Message);

/// Role a provider takes in a `Deal`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
pub enum ProviderKind {
    /// Real-estate broker.
    Broker,

    /// Mortgage advisor.
    MortgageAdvisor,

    /// Lawyer.
    Lawyer,
}

impl From<domain::provider::Kind> for ProviderKind {
    fn from(kind: domain::provider::Kind) -> Self {
        use domain::provider::Kind as K;

        match kind {
            K::Broker => Self::Broker,
            K::MortgageAdvisor => Self::MortgageAdvisor,
            K::Lawyer => Self::Lawyer,
        }
    }
}

impl From<ProviderKind> for domain::provider::Kind {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Broker => Self::Broker,
            ProviderKind::MortgageAdvisor => Self::MortgageAdvisor,
            ProviderKind::Lawyer => Self::Lawyer,
        }
    }
}

/// Status of a `ServiceRequest`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ServiceRequestStatus")]
pub enum Status {
    /// Waiting for the provider to respond.
    Pending,

    /// Accepted by the provider.
    Accepted,

    /// Declined by the provider.
    Declined,
}

impl From<domain::service_request::Status> for Status {
    fn from(status: domain::service_request::Status) -> Self {
        use domain::service_request::Status as S;

        match status {
            S::Pending => Self::Pending,
            S::Accepted => Self::Accepted,
            S::Declined => Self::Declined,
        }
    }
}

/// Decision of a provider upon a `ServiceRequest`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ServiceRequestDecision")]
pub enum Decision {
    /// Join the `Deal`.
    Accept,

    /// Refuse to join the `Deal`.
    Decline,
}

impl From<Decision> for domain::service_request::Decision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accept => Self::Accept,
            Decision::Decline => Self::Decline,
        }
    }
}

pub mod list {
    //! Definitions related to [`ServiceRequest`] lists.
    //!
    //! [`ServiceRequest`]: super::ServiceRequest

    crate::api::define_list!(
        service::read::service_request::list as api::ServiceRequest,
        edge = "ServiceRequestListEdge",
        connection = "ServiceRequestListConnection",
    );
}
