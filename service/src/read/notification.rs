//! [`Notification`] read model definition.

#[cfg(doc)]
use crate::domain::Notification;

pub mod list {
    //! [`Notification`]s list definitions.

    use common::define_pagination;
    use derive_more::{Display, From, Into};

    use crate::{
        domain::{user, Notification},
        read,
    };
    #[cfg(doc)]
    use crate::domain::User;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Notification;

    /// Cursor pointing to a specific [`Notification`] in a list.
    ///
    /// Lists are ordered from the most recent [`Notification`].
    pub type Cursor = read::Cursor;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Filter {
        /// ID of the [`User`] receiving the [`Notification`]s.
        pub recipient_id: user::Id,
    }

    /// Number of unread [`Notification`]s of a [`User`].
    #[derive(
        Clone, Copy, Debug, Default, Display, Eq, From, Hash, Into, PartialEq,
    )]
    pub struct UnreadCount(u32);
}
