//! [`ServiceRequest`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{deal, provider, user};
#[cfg(doc)]
use crate::domain::{Deal, User};

/// Offer of engagement from an investor to a provider for a single role on
/// a [`Deal`].
#[derive(Clone, Debug)]
pub struct ServiceRequest {
    /// ID of this [`ServiceRequest`].
    pub id: Id,

    /// ID of the [`Deal`] the provider is requested for.
    pub deal_id: deal::Id,

    /// ID of the investing [`User`] who made this [`ServiceRequest`].
    pub investor_id: user::Id,

    /// ID of the requested provider.
    pub provider_id: user::Id,

    /// Role the provider is requested for.
    pub provider_kind: provider::Kind,

    /// [`Status`] of this [`ServiceRequest`].
    pub status: Status,

    /// [`Message`] from the investor, if any.
    pub investor_message: Option<Message>,

    /// [`Message`] from the provider responding, if any.
    pub provider_response: Option<Message>,

    /// [`DateTime`] when this [`ServiceRequest`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when the provider responded.
    pub responded_at: Option<ResponseDateTime>,

    /// Indicator whether an admin assignment decided this
    /// [`ServiceRequest`] instead of the provider.
    pub overruled: bool,
}

impl ServiceRequest {
    /// Creates a new [`Status::Pending`] [`ServiceRequest`].
    #[must_use]
    pub fn new(
        deal_id: deal::Id,
        investor_id: user::Id,
        provider_id: user::Id,
        provider_kind: provider::Kind,
        investor_message: Option<Message>,
    ) -> Self {
        Self {
            id: Id::new(),
            deal_id,
            investor_id,
            provider_id,
            provider_kind,
            status: Status::Pending,
            investor_message,
            provider_response: None,
            created_at: DateTime::now().coerce(),
            responded_at: None,
            overruled: false,
        }
    }

    /// Applies the provider's [`Decision`] to this [`ServiceRequest`].
    ///
    /// # Errors
    ///
    /// With [`AlreadyResponded`], if this [`ServiceRequest`] is not
    /// [`Status::Pending`] anymore.
    pub fn respond(
        &mut self,
        decision: Decision,
        response: Option<Message>,
    ) -> Result<(), AlreadyResponded> {
        if self.status != Status::Pending {
            return Err(AlreadyResponded {
                status: self.status,
            });
        }
        self.status = match decision {
            Decision::Accept => Status::Accepted,
            Decision::Decline => Status::Declined,
        };
        self.provider_response = response;
        self.responded_at = Some(DateTime::now().coerce());
        Ok(())
    }

    /// Decides this [`ServiceRequest`] on behalf of the provider, as a
    /// consequence of an admin assignment.
    ///
    /// Such a decision doesn't tell anything about the provider, so it's
    /// excluded from their response statistics.
    pub fn overrule(&mut self, status: Status) {
        self.status = status;
        self.responded_at = Some(DateTime::now().coerce());
        self.overruled = true;
    }

    /// Returns how long the provider took to respond, if the provider
    /// responded.
    ///
    /// [`None`] for [`ServiceRequest`]s decided by an admin.
    #[must_use]
    pub fn response_time(&self) -> Option<time::Duration> {
        if self.overruled {
            return None;
        }
        self.responded_at
            .map(|at| at.coerce::<()>() - self.created_at.coerce())
    }
}

/// ID of a [`ServiceRequest`].
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
    /// Status of a [`ServiceRequest`].
    ///
    /// Both [`Status::Accepted`] and [`Status::Declined`] are terminal.
    enum Status {
        /// Waiting for the provider's response.
        Pending = 1,

        /// Provider accepted and is assigned to the [`Deal`].
        Accepted = 2,

        /// Provider declined.
        Declined = 3,
    }
}

/// Provider's decision upon a [`ServiceRequest`].
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    /// Accept the [`ServiceRequest`] and join the [`Deal`].
    Accept,

    /// Decline the [`ServiceRequest`].
    Decline,
}

/// Free-form message attached to a [`ServiceRequest`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Message(String);

impl Message {
    /// Creates a new [`Message`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let trimmed = text.trim();
        (!trimmed.is_empty() && trimmed.chars().count() <= 2048)
            .then(|| Self(trimmed.to_owned()))
    }
}

impl FromStr for Message {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Message`")
    }
}

/// Error of responding to a [`ServiceRequest`] which is not
/// [`Status::Pending`].
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`ServiceRequest` is already `{status}`")]
pub struct AlreadyResponded {
    /// Current [`Status`] of the [`ServiceRequest`].
    pub status: Status,
}

/// [`DateTime`] when a [`ServiceRequest`] was created.
pub type CreationDateTime = DateTimeOf<(ServiceRequest, unit::Creation)>;

/// [`DateTime`] when a [`ServiceRequest`] was responded to.
pub type ResponseDateTime = DateTimeOf<(ServiceRequest, unit::Response)>;

#[cfg(test)]
mod spec {
    use crate::domain::{deal, provider, user};

    use super::{Decision, Message, ServiceRequest, Status};

    fn request() -> ServiceRequest {
        ServiceRequest::new(
            deal::Id::new(),
            user::Id::new(),
            user::Id::new(),
            provider::Kind::Broker,
            Message::new("Could you help?"),
        )
    }

    #[test]
    fn starts_pending() {
        let req = request();

        assert_eq!(req.status, Status::Pending);
        assert!(req.responded_at.is_none());
        assert!(req.response_time().is_none());
    }

    #[test]
    fn accepts_once() {
        let mut req = request();

        req.respond(Decision::Accept, Message::new("Sure")).unwrap();

        assert_eq!(req.status, Status::Accepted);
        assert!(req.responded_at.is_some());
        assert!(!req.response_time().unwrap().is_negative());
        assert_eq!(
            req.respond(Decision::Decline, None).unwrap_err().status,
            Status::Accepted,
        );
        assert_eq!(req.status, Status::Accepted);
    }

    #[test]
    fn declines_once() {
        let mut req = request();

        req.respond(Decision::Decline, None).unwrap();

        assert_eq!(req.status, Status::Declined);
        assert!(req.provider_response.is_none());
        assert_eq!(
            req.respond(Decision::Accept, None).unwrap_err().status,
            Status::Declined,
        );
    }

    #[test]
    fn hides_response_time_when_overruled() {
        let mut req = request();

        req.overrule(Status::Declined);

        assert_eq!(req.status, Status::Declined);
        assert!(req.overruled);
        assert!(req.responded_at.is_some());
        assert!(req.response_time().is_none());
        assert!(req.respond(Decision::Accept, None).is_err());
    }

    #[test]
    fn parses_decision() {
        assert_eq!("accept".parse::<Decision>().unwrap(), Decision::Accept);
        assert_eq!(Decision::Decline.to_string(), "decline");
    }
}
