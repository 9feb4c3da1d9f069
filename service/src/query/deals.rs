//! [`Query`] collection related to the multiple [`Deal`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Deal, Query};

use super::DatabaseQuery;

/// Queries a list of [`Deal`]s.
pub type List =
    DatabaseQuery<By<read::deal::list::Page, read::deal::list::Selector>>;
