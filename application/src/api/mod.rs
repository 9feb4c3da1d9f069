//! GraphQL API definitions.

pub mod activity;
pub mod analytics;
pub mod deal;
mod mutation;
pub mod notification;
pub mod property;
mod query;
pub mod scalar;
pub mod service_request;
mod subscription;
pub mod user;

use juniper::GraphQLObject;
use service::read;

use crate::define_error;

pub use self::{
    activity::Activity, deal::Deal, mutation::Mutation,
    notification::Notification, property::Property, query::Query,
    scalar::Cursor, service_request::ServiceRequest,
    subscription::Subscription, user::User,
};

/// GraphQL schema.
pub type Schema = juniper::RootNode<'static, Query, Mutation, Subscription>;

/// Default number of items on a list page.
const DEFAULT_PAGE_SIZE: usize = 20;

/// Builds [`read`] pagination arguments out of the GraphQL ones.
///
/// # Errors
///
/// With [`PaginationError::InvalidPageSize`] if `first` is out of range.
fn arguments<C, A: Into<C>>(
    first: Option<i32>,
    after: Option<A>,
) -> Result<common::pagination::Arguments<C>, PaginationError> {
    common::pagination::Arguments::new(
        first,
        after.map(Into::into),
        DEFAULT_PAGE_SIZE,
    )
    .ok_or(PaginationError::InvalidPageSize)
}

/// Information about a list page.
#[derive(Clone, Copy, Debug, GraphQLObject)]
pub struct PageInfo {
    /// Indicator whether there is a next page.
    pub has_next_page: bool,

    /// Cursor of the first item on the page.
    pub start_cursor: Option<Cursor>,

    /// Cursor of the last item on the page.
    pub end_cursor: Option<Cursor>,
}

impl From<common::pagination::PageInfo<read::Cursor>> for PageInfo {
    fn from(info: common::pagination::PageInfo<read::Cursor>) -> Self {
        Self {
            has_next_page: info.has_next_page,
            start_cursor: info.start_cursor.map(Into::into),
            end_cursor: info.end_cursor.map(Into::into),
        }
    }
}

/// Defines GraphQL `Edge` and `Connection` objects of a [`read`] list.
macro_rules! define_list {
    (
        $($read:ident)::+ as $node:ty,
        edge = $edge:tt,
        connection = $connection:tt $(,)?
    ) => {
        use derive_more::{From, Into};
        use juniper::graphql_object;

        use crate::{api, Context};

        /// Edge in the list.
        #[derive(Clone, Debug, From, Into)]
        pub struct Edge($($read)::+::Edge);

        #[graphql_object(name = $edge, context = Context)]
        impl Edge {
            /// Cursor pointing to this edge.
            #[must_use]
            pub fn cursor(&self) -> api::Cursor {
                self.0.cursor.into()
            }

            /// Item of this edge.
            #[must_use]
            pub fn node(&self) -> $node {
                self.0.node.clone().into()
            }
        }

        /// Page of the list.
        #[derive(Clone, Debug, From, Into)]
        pub struct Connection($($read)::+::Connection);

        #[graphql_object(name = $connection, context = Context)]
        impl Connection {
            /// Edges on this page, in list order.
            #[must_use]
            pub fn edges(&self) -> Vec<Edge> {
                self.0.edges.iter().cloned().map(Into::into).collect()
            }

            /// Information about this page.
            #[must_use]
            pub fn page_info(&self) -> api::PageInfo {
                self.0.page_info().into()
            }
        }
    };
}
pub(crate) use define_list;

define_error! {
    enum PrivilegeError {
        #[code = "UNAUTHORIZED"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` is not allowed to do this"]
        Forbidden,
    }
}

define_error! {
    enum PaginationError {
        #[code = "INVALID_PAGE_SIZE"]
        #[status = BAD_REQUEST]
        #[message = "`first` must be within `1..=100` range"]
        InvalidPageSize,
    }
}

#[cfg(test)]
mod arguments_spec {
    use service::read;

    use super::{arguments, Cursor};

    #[test]
    fn defaults_page_size() {
        let args =
            arguments::<read::Cursor, Cursor>(None, None).expect("valid");

        assert_eq!(args.limit(), super::DEFAULT_PAGE_SIZE);
        assert!(args.cursor().is_none());
    }

    #[test]
    fn rejects_out_of_range_page_size() {
        let page =
            |first| arguments::<read::Cursor, Cursor>(Some(first), None);

        assert!(page(0).is_err());
        assert!(page(-5).is_err());
        assert!(page(101).is_err());
        assert!(page(100).is_ok());
    }
}
