//! [`Activity`]-related definitions.

use common::DateTime;
use juniper::{graphql_object, GraphQLEnum};
use service::domain::{self, activity::Details};

use crate::{api, Context};

/// Entry of a deal's activity timeline.
#[derive(Clone, Debug, derive_more::From)]
pub struct Activity(domain::Activity);

/// Entry of a `Deal` activity timeline.
///
/// Stage-related fields are set for `STAGE_CHANGE` entries only, while
/// provider-related ones are set for `PROVIDER_ASSIGNED` entries only.
#[graphql_object(context = Context)]
impl Activity {
    /// Kind of this `Activity`.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self.0.details {
            Details::StageChange(_) => Kind::StageChange,
            Details::ProviderAssigned(_) => Kind::ProviderAssigned,
        }
    }

    /// `User` who caused this `Activity`.
    #[must_use]
    pub fn actor(&self) -> api::User {
        #[expect(unsafe_code, reason = "activity references existing `User`")]
        unsafe {
            api::User::new_unchecked(self.0.actor_id)
        }
    }

    /// Stage the `Deal` moved from.
    #[must_use]
    pub fn from_stage(&self) -> Option<api::deal::Stage> {
        match &self.0.details {
            Details::StageChange(c) => Some(c.from.into()),
            Details::ProviderAssigned(_) => None,
        }
    }

    /// Stage the `Deal` moved to.
    #[must_use]
    pub fn to_stage(&self) -> Option<api::deal::Stage> {
        match &self.0.details {
            Details::StageChange(c) => Some(c.to.into()),
            Details::ProviderAssigned(_) => None,
        }
    }

    /// Note left on the stage change, if any.
    #[must_use]
    pub fn note(&self) -> Option<api::deal::Note> {
        match &self.0.details {
            Details::StageChange(c) => c.note.clone().map(Into::into),
            Details::ProviderAssigned(_) => None,
        }
    }

    /// Role the provider was assigned to.
    #[must_use]
    pub fn provider_kind(&self) -> Option<api::service_request::ProviderKind> {
        match &self.0.details {
            Details::ProviderAssigned(a) => Some(a.kind.into()),
            Details::StageChange(_) => None,
        }
    }

    /// Assigned provider `User`.
    #[must_use]
    pub fn provider(&self) -> Option<api::User> {
        match &self.0.details {
            Details::ProviderAssigned(a) => Some({
                #[expect(
                    unsafe_code,
                    reason = "activity references existing `User`"
                )]
                unsafe {
                    api::User::new_unchecked(a.provider_id)
                }
            }),
            Details::StageChange(_) => None,
        }
    }

    /// `DateTime` when this `Activity` happened.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }
}

/// Kind of an `Activity`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ActivityKind")]
pub enum Kind {
    /// `Deal` moved to another stage.
    StageChange,

    /// Provider was assigned to the `Deal`.
    ProviderAssigned,
}

pub mod list {
    //! Definitions related to [`Activity`] timelines.
    //!
    //! A timeline is pinned to a snapshot taken on its first page, so its
    //! [`Cursor`]s carry the snapshot bound along with the position.
    //!
    //! [`Activity`]: super::Activity

    use derive_more::{AsRef, From, Into};
    use juniper::{graphql_object, GraphQLObject, GraphQLScalar};
    use service::{
        domain, query,
        read::activity::snapshot::{self, Bookmark},
        Query as _,
    };

    use crate::{
        api::{self, scalar},
        AsError, Context, Error,
    };

    /// Opaque position in an `Activity` timeline snapshot.
    #[derive(AsRef, Clone, Copy, Debug, From, GraphQLScalar, Into)]
    #[graphql(name = "ActivityCursor", with = scalar::Via::<Bookmark>)]
    pub struct Cursor(Bookmark);

    /// Edge in an `Activity` timeline.
    #[derive(Clone, Debug, From, Into)]
    pub struct Edge(snapshot::Edge);

    #[graphql_object(name = "ActivityListEdge", context = Context)]
    impl Edge {
        /// Cursor pointing to this edge.
        #[must_use]
        pub fn cursor(&self) -> Cursor {
            self.0.cursor.into()
        }

        /// Item of this edge.
        #[must_use]
        pub fn node(&self) -> api::Activity {
            self.0.node.clone().into()
        }
    }

    /// Information about an `Activity` timeline page.
    #[derive(Clone, Copy, Debug, GraphQLObject)]
    #[graphql(name = "ActivityPageInfo")]
    pub struct PageInfo {
        /// Indicator whether there is a next page.
        pub has_next_page: bool,

        /// Cursor of the first item on the page.
        pub start_cursor: Option<Cursor>,

        /// Cursor of the last item on the page.
        pub end_cursor: Option<Cursor>,
    }

    /// Page of an `Activity` timeline.
    #[derive(Clone, Debug, From, Into)]
    pub struct Connection(snapshot::Connection);

    #[graphql_object(name = "ActivityListConnection", context = Context)]
    impl Connection {
        /// Edges on this page, oldest first.
        #[must_use]
        pub fn edges(&self) -> Vec<Edge> {
            self.0.edges.iter().cloned().map(Into::into).collect()
        }

        /// Information about this page.
        #[must_use]
        pub fn page_info(&self) -> PageInfo {
            let info = self.0.page_info();
            PageInfo {
                has_next_page: info.has_next_page,
                start_cursor: info.start_cursor.map(Into::into),
                end_cursor: info.end_cursor.map(Into::into),
            }
        }
    }

    /// Fetches a page of the `Deal` activity timeline, oldest first.
    ///
    /// Without `after` the page starts a new snapshot.
    ///
    /// # Errors
    ///
    /// If `first` is out of range or the page cannot be loaded.
    pub(crate) async fn page(
        deal_id: domain::deal::Id,
        first: Option<i32>,
        after: Option<Cursor>,
        ctx: &Context,
    ) -> Result<Connection, Error> {
        let arguments = api::arguments(first, after)
            .map_err(Error::from)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(query::activity::Timeline::by(snapshot::Selector {
                arguments,
                filter: deal_id,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}
