//! [`Deal`] read model definition.

#[cfg(doc)]
use crate::domain::Deal;

pub mod list {
    //! [`Deal`]s list definitions.

    use common::define_pagination;

    use crate::{
        domain::{user, Deal},
        read,
    };
    #[cfg(doc)]
    use crate::domain::User;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Deal;

    /// Cursor pointing to a specific [`Deal`] in a list.
    ///
    /// Lists are ordered from the most recently created [`Deal`].
    pub type Cursor = read::Cursor;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum Filter {
        /// [`Deal`]s owned by the investing [`User`].
        Investor(user::Id),

        /// [`Deal`]s the [`User`] is assigned to as a provider in any role.
        Provider(user::Id),
    }

    impl Filter {
        /// Checks whether the provided [`Deal`] passes this [`Filter`].
        #[must_use]
        pub fn matches(&self, deal: &Deal) -> bool {
            match *self {
                Self::Investor(id) => deal.investor_id == id,
                Self::Provider(id) => {
                    deal.assignments().any(|(_, assigned)| assigned == id)
                }
            }
        }
    }
}
