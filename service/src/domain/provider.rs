//! Service provider definitions.

use common::define_kind;

use crate::domain::user;
#[cfg(doc)]
use crate::domain::{Deal, User};

/// Profile of a [`User`] offering services on [`Deal`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Profile {
    /// ID of the [`User`] holding this [`Profile`].
    pub user_id: user::Id,

    /// [`Kind`] of services the [`User`] provides.
    pub kind: Kind,
}

define_kind! {
    /// Role a provider plays on a [`Deal`].
    enum Kind {
        /// Real-estate broker.
        Broker = 1,

        /// Mortgage advisor.
        MortgageAdvisor = 2,

        /// Lawyer.
        Lawyer = 3,
    }
}

impl Kind {
    /// Returns the human-readable name of this [`Kind`].
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Broker => "broker",
            Self::MortgageAdvisor => "mortgage advisor",
            Self::Lawyer => "lawyer",
        }
    }
}
