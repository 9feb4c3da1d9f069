//! [`Query`] collection related to a single [`ServiceRequest`].

use common::operations::By;

use crate::domain::{service_request, ServiceRequest};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`ServiceRequest`] by its [`service_request::Id`].
pub type ById =
    DatabaseQuery<By<Option<ServiceRequest>, service_request::Id>>;
