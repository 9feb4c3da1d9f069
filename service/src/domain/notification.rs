//! [`Notification`] definitions.

use std::sync::LazyLock;

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    deal, provider, service_request, user, Deal, Property,
    ServiceRequest,
};
#[cfg(doc)]
use crate::domain::User;

/// Inbox item of a [`User`].
#[derive(Clone, Debug)]
pub struct Notification {
    /// ID of this [`Notification`].
    pub id: Id,

    /// ID of the [`User`] receiving this [`Notification`].
    pub recipient_id: user::Id,

    /// [`Kind`] of this [`Notification`].
    pub kind: Kind,

    /// [`Title`] of this [`Notification`].
    pub title: Title,

    /// [`Message`] of this [`Notification`].
    pub message: Message,

    /// Deep [`Link`] to the subject of this [`Notification`], if any.
    pub link: Option<Link>,

    /// [`Metadata`] of this [`Notification`].
    pub metadata: Metadata,

    /// Indicator whether this [`Notification`] was read by its recipient.
    ///
    /// Never goes back to `false` once set.
    pub is_read: bool,

    /// [`DateTime`] when this [`Notification`] was created.
    pub created_at: CreationDateTime,
}

impl Notification {
    /// Creates a new unread [`Notification`].
    #[must_use]
    pub fn new(
        recipient_id: user::Id,
        kind: Kind,
        title: Title,
        message: Message,
        link: Option<Link>,
        metadata: Metadata,
    ) -> Self {
        Self {
            id: Id::new(),
            recipient_id,
            kind,
            title,
            message,
            link,
            metadata,
            is_read: false,
            created_at: DateTime::now().coerce(),
        }
    }

    /// Creates a [`Kind::RequestReceived`] [`Notification`] for the
    /// provider of the provided [`ServiceRequest`].
    #[must_use]
    pub fn request_received(
        request: &ServiceRequest,
        property: Option<&Property>,
    ) -> Self {
        Self::new(
            request.provider_id,
            Kind::RequestReceived,
            Title(format!(
                "New {} request",
                request.provider_kind.title(),
            )),
            Message(format!(
                "You were asked to join the deal on {} as a {}.",
                subject(property),
                request.provider_kind.title(),
            )),
            Some(Link::request(request.id)),
            Metadata::request(request),
        )
    }

    /// Creates a [`Kind::RequestAccepted`] or [`Kind::RequestDeclined`]
    /// [`Notification`] for the investor of the provided responded
    /// [`ServiceRequest`].
    #[must_use]
    pub fn request_responded(
        request: &ServiceRequest,
        property: Option<&Property>,
    ) -> Self {
        let (kind, verb) = match request.status {
            service_request::Status::Accepted => {
                (Kind::RequestAccepted, "accepted")
            }
            service_request::Status::Pending
            | service_request::Status::Declined => {
                (Kind::RequestDeclined, "declined")
            }
        };
        Self::new(
            request.investor_id,
            kind,
            Title(format!("Request {verb}")),
            Message(format!(
                "Your {} request on {} was {verb}.",
                request.provider_kind.title(),
                subject(property),
            )),
            Some(Link::deal(request.deal_id)),
            Metadata::request(request),
        )
    }

    /// Creates a [`Kind::DealStageChange`] [`Notification`] for the provided
    /// participant of the [`Deal`].
    #[must_use]
    pub fn stage_changed(
        recipient_id: user::Id,
        deal: &Deal,
        from: deal::Stage,
        property: Option<&Property>,
    ) -> Self {
        Self::new(
            recipient_id,
            Kind::DealStageChange,
            Title(format!("Deal moved to {}", deal.stage().title())),
            Message(format!(
                "The deal on {} moved from {} to {}.",
                subject(property),
                from.title(),
                deal.stage().title(),
            )),
            Some(Link::deal(deal.id)),
            Metadata::deal(deal.id),
        )
    }

    /// Creates a [`Kind::ProviderAssigned`] [`Notification`] for the provided
    /// participant of the [`Deal`].
    #[must_use]
    pub fn provider_assigned(
        recipient_id: user::Id,
        deal_id: deal::Id,
        kind: provider::Kind,
        property: Option<&Property>,
    ) -> Self {
        Self::new(
            recipient_id,
            Kind::ProviderAssigned,
            Title(format!("New {} on the deal", kind.title())),
            Message(format!(
                "A {} was assigned to the deal on {}.",
                kind.title(),
                subject(property),
            )),
            Some(Link::deal(deal_id)),
            Metadata::deal(deal_id),
        )
    }
}

/// Returns how the provided [`Property`] is referred to in texts.
fn subject(property: Option<&Property>) -> String {
    property.map_or_else(
        || "a property".to_owned(),
        |p| format!("\"{}\" in {}", p.title, p.city),
    )
}

/// ID of a [`Notification`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    /// Kind of a [`Notification`].
    enum Kind {
        /// Direct message was received.
        NewMessage = 1,

        /// [`Deal`] moved to another [`deal::Stage`].
        DealStageChange = 2,

        /// File was uploaded to a [`Deal`].
        FileUploaded = 3,

        /// [`ServiceRequest`] was received by a provider.
        RequestReceived = 4,

        /// [`ServiceRequest`] was accepted by a provider.
        RequestAccepted = 5,

        /// [`ServiceRequest`] was declined by a provider.
        RequestDeclined = 6,

        /// Provider was assigned to a [`Deal`].
        ProviderAssigned = 7,
    }
}

/// Title of a [`Notification`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Title(String);

impl Title {
    /// Creates a new [`Title`] if the given `title` is valid.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Option<Self> {
        let title = title.into();
        let valid = title.trim() == title
            && !title.is_empty()
            && title.chars().count() <= 256;
        valid.then_some(Self(title))
    }
}

impl FromStr for Title {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Title`")
    }
}

/// Text of a [`Notification`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let valid = !text.trim().is_empty() && text.chars().count() <= 4096;
        valid.then_some(Self(text))
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// Deep link into the application, relative to its root.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Link(String);

impl Link {
    /// Creates a new [`Link`] if the given `path` is valid.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Option<Self> {
        let path = path.into();
        Self::check(&path).then_some(Self(path))
    }

    /// Returns a [`Link`] to the [`Deal`] page.
    #[must_use]
    pub fn deal(id: deal::Id) -> Self {
        Self(format!("/deals/{id}"))
    }

    /// Returns a [`Link`] to the [`ServiceRequest`] page.
    #[must_use]
    pub fn request(id: service_request::Id) -> Self {
        Self(format!("/requests/{id}"))
    }

    /// Checks whether the given `path` is a valid [`Link`].
    fn check(path: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Link`] format:
        /// - Must start with a slash;
        /// - Must contain only URL-safe characters;
        /// - Must be at most 2048 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^/[A-Za-z0-9\-._~/?#\[\]@!$&'()*+,;=%]{0,2047}$")
                .expect("valid regex")
        });

        REGEX.is_match(path.as_ref())
    }
}

impl FromStr for Link {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Link`")
    }
}

/// References of a [`Notification`] to the entities it's about.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Metadata {
    /// ID of the related [`Deal`], if any.
    pub deal_id: Option<deal::Id>,

    /// ID of the related [`ServiceRequest`], if any.
    pub request_id: Option<service_request::Id>,
}

impl Metadata {
    /// Creates [`Metadata`] referring the provided [`Deal`].
    #[must_use]
    pub fn deal(id: deal::Id) -> Self {
        Self {
            deal_id: Some(id),
            request_id: None,
        }
    }

    /// Creates [`Metadata`] referring the provided [`ServiceRequest`] and
    /// its [`Deal`].
    #[must_use]
    pub fn request(request: &ServiceRequest) -> Self {
        Self {
            deal_id: Some(request.deal_id),
            request_id: Some(request.id),
        }
    }
}

/// Request to mark every unread [`Notification`] of a [`User`] as read.
#[derive(Clone, Copy, Debug)]
pub struct AllRead {
    /// ID of the [`User`] whose [`Notification`]s are marked.
    pub recipient_id: user::Id,
}

/// [`DateTime`] when a [`Notification`] was created.
pub type CreationDateTime = DateTimeOf<(Notification, unit::Creation)>;

#[cfg(test)]
mod spec {
    use crate::domain::deal;

    use super::{Link, Title};

    #[test]
    fn validates_links() {
        assert!(Link::new("/deals/42?tab=files").is_some());
        assert_eq!(
            Link::deal(deal::Id::default()).to_string(),
            "/deals/00000000-0000-0000-0000-000000000000",
        );

        assert!(Link::new("https://example.com").is_none());
        assert!(Link::new("/deals/<script>").is_none());
        assert!(Link::new("").is_none());
    }

    #[test]
    fn validates_titles() {
        assert!(Title::new("New message").is_some());
        assert!(Title::new(" padded").is_none());
        assert!(Title::new("").is_none());
    }
}
