//! [`Query`] collection related to the multiple [`Notification`]s.

use common::operations::By;

use crate::{domain::user, read};
#[cfg(doc)]
use crate::{
    domain::{Notification, User},
    Query,
};

use super::DatabaseQuery;

/// Queries an inbox page of [`Notification`]s.
pub type List = DatabaseQuery<
    By<read::notification::list::Page, read::notification::list::Selector>,
>;

/// Queries the number of unread [`Notification`]s of a [`User`].
pub type UnreadCount =
    DatabaseQuery<By<read::notification::list::UnreadCount, user::Id>>;
