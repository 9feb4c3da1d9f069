//! [`Query`] collection related to the multiple [`ServiceRequest`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::ServiceRequest, Query};

use super::DatabaseQuery;

/// Queries a list of [`ServiceRequest`]s.
pub type List = DatabaseQuery<
    By<
        read::service_request::list::Page,
        read::service_request::list::Selector,
    >,
>;
