//! Read entities definitions.

pub mod activity;
pub mod analytics;
pub mod deal;
pub mod notification;
pub mod service_request;

use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};

/// Position of a record in the order it was stored.
///
/// Every list is paginated by these positions, so a [`Cursor`] stays valid
/// no matter how many records are stored after it.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Cursor(i64);
