//! [`ServiceRequest`] read model definition.

use crate::domain::ServiceRequest;

/// Wrapper around a [`ServiceRequest`] which is still
/// [`Status::Pending`].
///
/// [`Status::Pending`]: crate::domain::service_request::Status::Pending
#[derive(Clone, Debug)]
pub struct Pending(pub ServiceRequest);

pub mod list {
    //! [`ServiceRequest`]s list definitions.

    use common::define_pagination;

    use crate::{
        domain::{deal, user, ServiceRequest},
        read,
    };
    #[cfg(doc)]
    use crate::domain::{Deal, User};

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = ServiceRequest;

    /// Cursor pointing to a specific [`ServiceRequest`] in a list.
    ///
    /// Lists are ordered from the most recently created [`ServiceRequest`].
    pub type Cursor = read::Cursor;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Filter {
        /// [`ServiceRequest`]s made on the [`Deal`].
        Deal(deal::Id),

        /// [`ServiceRequest`]s addressed to the provider [`User`].
        Provider(user::Id),
    }

    impl Filter {
        /// Checks whether the provided [`ServiceRequest`] passes this
        /// [`Filter`].
        #[must_use]
        pub fn matches(&self, req: &ServiceRequest) -> bool {
            match *self {
                Self::Deal(id) => req.deal_id == id,
                Self::Provider(id) => req.provider_id == id,
            }
        }
    }
}
