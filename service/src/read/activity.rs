//! [`Activity`] read model definition.

#[cfg(doc)]
use crate::domain::Activity;

pub mod list {
    //! [`Activity`] timeline definitions.

    use common::define_pagination;

    use crate::{
        domain::{deal, Activity},
        read,
    };
    #[cfg(doc)]
    use crate::domain::Deal;

    define_pagination!(Cursor, Node, Filter);

    /// Node in a [`Connection`].
    pub type Node = Activity;

    /// Cursor pointing to a specific [`Activity`] in a timeline.
    ///
    /// Timelines are ordered from the oldest [`Activity`].
    pub type Cursor = read::Cursor;

    /// Filter for [`Selector`].
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Filter {
        /// ID of the [`Deal`] to list the timeline of.
        pub deal_id: deal::Id,

        /// Last [`Cursor`] included into the timeline, if bounded.
        ///
        /// Pins the timeline to a snapshot, so [`Activity`]s appended while
        /// the timeline is being read don't leak into it.
        pub until: Option<Cursor>,
    }

    /// Latest [`Cursor`] of a [`Deal`] timeline, if it's not empty.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Latest(pub Option<Cursor>);
}

pub mod snapshot {
    //! [`Activity`] timeline pinned to a snapshot.
    //!
    //! The snapshot is taken when the first page is requested, and every
    //! [`Bookmark`] carries its bound, so the following pages never yield
    //! [`Activity`]s appended in the meantime.

    use std::str::FromStr;

    use common::define_pagination;
    use derive_more::Display;

    use crate::domain::{deal, Activity};
    #[cfg(doc)]
    use crate::domain::Deal;

    use super::list::Cursor;

    define_pagination!(Bookmark, Node, deal::Id);

    /// Node in a [`Connection`].
    pub type Node = Activity;

    /// Position of an [`Activity`] in a timeline snapshot.
    #[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
    #[display("{at}.{until}")]
    pub struct Bookmark {
        /// [`Cursor`] of the [`Activity`] this [`Bookmark`] points to.
        pub at: Cursor,

        /// Last [`Cursor`] included into the snapshot.
        pub until: Cursor,
    }

    impl FromStr for Bookmark {
        type Err = &'static str;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            const ERR: &str = "expected `{at}.{until}` timeline position";

            let (at, until) = s.split_once('.').ok_or(ERR)?;
            let at = at.parse::<Cursor>().map_err(|_| ERR)?;
            let until = until.parse::<Cursor>().map_err(|_| ERR)?;
            (at <= until).then_some(Self { at, until }).ok_or(ERR)
        }
    }

    #[cfg(test)]
    mod spec {
        use super::{Bookmark, Cursor};

        #[test]
        fn parses_own_representation() {
            let bookmark = Bookmark {
                at: Cursor::from(3),
                until: Cursor::from(7),
            };

            assert_eq!(bookmark.to_string(), "3.7");
            assert_eq!("3.7".parse::<Bookmark>(), Ok(bookmark));
        }

        #[test]
        fn rejects_malformed() {
            for s in ["", "3", "3.", ".7", "a.7", "8.7", "3.7.9"] {
                assert!(s.parse::<Bookmark>().is_err(), "`{s}` parsed");
            }
        }
    }
}
