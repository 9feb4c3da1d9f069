//! [`Notification`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{
    api::{self, scalar},
    Context,
};

/// Message in a user's inbox.
#[derive(Clone, Debug, From)]
pub struct Notification(domain::Notification);

/// Message in a `User`'s inbox.
#[graphql_object(context = Context)]
impl Notification {
    /// Unique identifier of this `Notification`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Kind of this `Notification`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// Title of this `Notification`.
    #[must_use]
    pub fn title(&self) -> Title {
        self.0.title.clone().into()
    }

    /// Message of this `Notification`.
    #[must_use]
    pub fn message(&self) -> Message {
        self.0.message.clone().into()
    }

    /// In-app link to the subject of this `Notification`, if any.
    #[must_use]
    pub fn link(&self) -> Option<Link> {
        self.0.link.clone().map(Into::into)
    }

    /// ID of the `Deal` this `Notification` is about, if any.
    #[must_use]
    pub fn deal_id(&self) -> Option<api::deal::Id> {
        self.0.metadata.deal_id.map(Into::into)
    }

    /// ID of the `ServiceRequest` this `Notification` is about, if any.
    #[must_use]
    pub fn service_request_id(&self) -> Option<api::service_request::Id> {
        self.0.metadata.request_id.map(Into::into)
    }

    /// Indicator whether the recipient has read this `Notification`.
    #[must_use]
    pub fn is_read(&self) -> bool {
        self.0.is_read
    }

    /// `DateTime` when this `Notification` was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Unique identifier of a `Notification`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::notification::Id)]
#[into(domain::notification::Id)]
#[graphql(name = "NotificationId", transparent)]
pub struct Id(Uuid);

/// Title of a `Notification`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "NotificationTitle",
    with = scalar::Via::<domain::notification::Title>,
)]
pub struct Title(domain::notification::Title);

/// Message of a `Notification`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "NotificationMessage",
    with = scalar::Via::<domain::notification::Message>,
)]
pub struct Message(domain::notification::Message);

/// In-app link of a `Notification`, being an absolute path like
/// `/deals/{id}`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "NotificationLink",
    with = scalar::Via::<domain::notification::Link>,
)]
pub struct Link(domain::notification::Link);

/// Kind of a `Notification`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "NotificationKind")]
pub enum Kind {
    /// New chat message.
    NewMessage,

    /// `Deal` moved to another stage.
    DealStageChange,

    /// File was uploaded to a `Deal`.
    FileUploaded,

    /// Provider was asked to join a `Deal`.
    RequestReceived,

    /// Provider accepted a `ServiceRequest`.
    RequestAccepted,

    /// Provider declined a `ServiceRequest`.
    RequestDeclined,

    /// Provider was assigned to a `Deal`.
    ProviderAssigned,
}

impl From<domain::notification::Kind> for Kind {
    fn from(kind: domain::notification::Kind) -> Self {
        use domain::notification::Kind as K;

        match kind {
            K::NewMessage => Self::NewMessage,
            K::DealStageChange => Self::DealStageChange,
            K::FileUploaded => Self::FileUploaded,
            K::RequestReceived => Self::RequestReceived,
            K::RequestAccepted => Self::RequestAccepted,
            K::RequestDeclined => Self::RequestDeclined,
            K::ProviderAssigned => Self::ProviderAssigned,
        }
    }
}

impl From<Kind> for domain::notification::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::NewMessage => Self::NewMessage,
            Kind::DealStageChange => Self::DealStageChange,
            Kind::FileUploaded => Self::FileUploaded,
            Kind::RequestReceived => Self::RequestReceived,
            Kind::RequestAccepted => Self::RequestAccepted,
            Kind::RequestDeclined => Self::RequestDeclined,
            Kind::ProviderAssigned => Self::ProviderAssigned,
        }
    }
}

pub mod list {
    //! Definitions related to [`Notification`] lists.
    //!
    //! [`Notification`]: super::Notification

    crate::api::define_list!(
        service::read::notification::list as api::Notification,
        edge = "NotificationListEdge",
        connection = "NotificationListConnection",
    );
}
