//! [`Activity`] definitions.

use common::{define_kind, unit, DateTime, DateTimeOf};
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{deal, provider, user};
#[cfg(doc)]
use crate::domain::{Deal, User};

/// Immutable audit record of a state-changing event on a [`Deal`].
#[derive(Clone, Debug)]
pub struct Activity {
    /// ID of this [`Activity`].
    pub id: Id,

    /// ID of the [`Deal`] this [`Activity`] happened on.
    pub deal_id: deal::Id,

    /// ID of the [`User`] who performed this [`Activity`].
    pub actor_id: user::Id,

    /// [`Details`] of what happened.
    pub details: Details,

    /// [`DateTime`] when this [`Activity`] happened.
    pub created_at: CreationDateTime,
}

impl Activity {
    /// Creates a new [`Activity`] happening right now.
    #[must_use]
    pub fn new(
        deal_id: deal::Id,
        actor_id: user::Id,
        details: impl Into<Details>,
    ) -> Self {
        Self {
            id: Id::new(),
            deal_id,
            actor_id,
            details: details.into(),
            created_at: DateTime::now().coerce(),
        }
    }
}

/// ID of an [`Activity`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Typed payload of an [`Activity`].
#[derive(Clone, Debug, From)]
pub enum Details {
    /// [`Deal`] moved to another [`deal::Stage`].
    StageChange(StageChange),

    /// Provider was assigned to a [`Deal`].
    ProviderAssigned(ProviderAssigned),
}

impl Details {
    /// Returns [`Kind`] of these [`Details`].
    #[must_use]
    pub const fn kind(&self) -> Kind {
        match self {
            Self::StageChange(_) => Kind::StageChange,
            Self::ProviderAssigned(_) => Kind::ProviderAssigned,
        }
    }
}

/// [`Details`] of a [`Deal`] moving between [`deal::Stage`]s.
#[derive(Clone, Debug)]
pub struct StageChange {
    /// [`deal::Stage`] the [`Deal`] left.
    pub from: deal::Stage,

    /// [`deal::Stage`] the [`Deal`] entered.
    pub to: deal::Stage,

    /// [`deal::Note`] left by the actor, if any.
    pub note: Option<deal::Note>,
}

/// [`Details`] of a provider joining a [`Deal`].
#[derive(Clone, Copy, Debug)]
pub struct ProviderAssigned {
    /// Role the provider was assigned to.
    pub kind: provider::Kind,

    /// ID of the assigned provider.
    pub provider_id: user::Id,
}

define_kind! {
    /// Kind of an [`Activity`].
    enum Kind {
        /// [`StageChange`].
        StageChange = 1,

        /// [`ProviderAssigned`].
        ProviderAssigned = 2,
    }
}

/// [`DateTime`] when an [`Activity`] happened.
pub type CreationDateTime = DateTimeOf<(Activity, unit::Creation)>;
