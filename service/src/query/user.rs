//! [`Query`] collection related to a single [`User`] of the marketplace.

use common::operations::By;

use crate::domain::{provider, user, User};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`User`] by its [`user::Id`].
pub type ById = DatabaseQuery<By<Option<User>, user::Id>>;

/// Queries the [`provider::Profile`] of a [`User`], present only for
/// [`User`]s offering services on [`Deal`]s.
///
/// [`Deal`]: crate::domain::Deal
pub type ProfileById = DatabaseQuery<By<Option<provider::Profile>, user::Id>>;
