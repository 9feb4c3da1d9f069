//! Cursor-based forward pagination.
//!
//! Every list is traversed in a fixed order and a page is requested by the
//! number of items and the cursor of the last item already seen. Restarting
//! from any previously returned cursor yields the same continuation, which
//! makes paged lists lazy and restartable.

/// Page of a list.
#[derive(Clone, Debug)]
pub struct Connection<C, N> {
    /// [`Edge`]s on this page, in list order.
    pub edges: Vec<Edge<C, N>>,

    /// Indicator whether more items follow this page.
    pub has_next_page: bool,
}

/// Alias of a [`Connection`] emphasizing it holds a single page.
pub type Page<C, N> = Connection<C, N>;

impl<C, N> Connection<C, N> {
    /// Creates a new [`Connection`] out of the provided [`Edge`]s.
    #[must_use]
    pub fn new(
        edges: impl IntoIterator<Item = impl Into<Edge<C, N>>>,
        has_next_page: bool,
    ) -> Self {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            has_next_page,
        }
    }

    /// Returns [`PageInfo`] of this [`Connection`].
    #[must_use]
    pub fn page_info(&self) -> PageInfo<C>
    where
        C: Clone,
    {
        PageInfo {
            start_cursor: self.edges.first().map(|e| e.cursor.clone()),
            end_cursor: self.edges.last().map(|e| e.cursor.clone()),
            has_next_page: self.has_next_page,
        }
    }

    /// Returns nodes of this [`Connection`], dropping cursors.
    pub fn into_nodes(self) -> impl Iterator<Item = N> {
        self.edges.into_iter().map(|e| e.node)
    }
}

/// Information about a [`Connection`] page.
#[derive(Clone, Copy, Debug)]
pub struct PageInfo<C> {
    /// Cursor of the first item on the page.
    pub start_cursor: Option<C>,

    /// Cursor of the last item on the page.
    pub end_cursor: Option<C>,

    /// Indicator whether more items follow the page.
    pub has_next_page: bool,
}

/// Item of a [`Connection`] along with its cursor.
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, N> {
    /// Cursor pointing to this [`Edge`].
    pub cursor: C,

    /// Item itself.
    pub node: N,
}

impl<C, N> From<(C, N)> for Edge<C, N> {
    fn from((cursor, node): (C, N)) -> Self {
        Self { cursor, node }
    }
}

/// Arguments requesting a page.
#[derive(Clone, Copy, Debug)]
pub struct Arguments<C> {
    /// Maximum number of items on the page.
    first: usize,

    /// Cursor after which the page starts, if any.
    after: Option<C>,
}

impl<C> Arguments<C> {
    /// Upper bound of the page size a client may request.
    pub const MAX_PAGE_SIZE: usize = 100;

    /// Creates new [`Arguments`].
    ///
    /// `default` is used when `first` is omitted. [`None`] is returned if
    /// `first` is negative, zero or exceeds [`Arguments::MAX_PAGE_SIZE`].
    #[must_use]
    pub fn new<Num>(
        first: Option<Num>,
        after: Option<C>,
        default: usize,
    ) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let first = match first {
            Some(n) => n.try_into().ok()?,
            None => default,
        };
        (1..=Self::MAX_PAGE_SIZE)
            .contains(&first)
            .then_some(Self { first, after })
    }

    /// Returns [`Arguments`] requesting the very first page of the provided
    /// size.
    #[must_use]
    pub fn first(first: usize) -> Self {
        Self {
            first: first.clamp(1, Self::MAX_PAGE_SIZE),
            after: None,
        }
    }

    /// Returns [`Arguments`] requesting the page following the provided
    /// `cursor`.
    #[must_use]
    pub fn after(self, cursor: C) -> Self {
        Self {
            first: self.first,
            after: Some(cursor),
        }
    }

    /// Returns the cursor the page starts after, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&C> {
        self.after.as_ref()
    }

    /// Returns the maximum number of items on the page.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.first
    }

    /// Builds a page out of the `items` following the cursor.
    ///
    /// The `items` must already be in list order and start right after the
    /// cursor. At most one item beyond the limit is consumed to find out
    /// whether a next page exists.
    pub fn paginate<N>(
        &self,
        items: impl IntoIterator<Item = (C, N)>,
    ) -> Connection<C, N> {
        let mut edges = items
            .into_iter()
            .take(self.first + 1)
            .map(Edge::from)
            .collect::<Vec<_>>();
        let has_next_page = edges.len() > self.first;
        edges.truncate(self.first);
        Connection {
            edges,
            has_next_page,
        }
    }
}

/// Page selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<C, F> {
    /// Page [`Arguments`].
    pub arguments: Arguments<C>,

    /// Filter restricting the list.
    pub filter: F,
}

/// Defines pagination type aliases for a list module.
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Item of a [`Connection`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "Page of the list."]
        pub type Connection = $crate::pagination::Connection<$cursor, $node>;

        #[doc = "Page of the list."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "Information about a [`Page`]."]
        pub type PageInfo = $crate::pagination::PageInfo<$cursor>;

        #[doc = "Arguments requesting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::Arguments;

    #[test]
    fn validates_page_size() {
        let default = Arguments::<u32>::new(None::<i32>, None, 10).unwrap();
        assert_eq!(default.limit(), 10);
        let three = Arguments::<u32>::new(Some(3), None, 10).unwrap();
        assert_eq!(three.limit(), 3);

        assert!(Arguments::<u32>::new(Some(0), None, 10).is_none());
        assert!(Arguments::<u32>::new(Some(-1), None, 10).is_none());
        assert!(Arguments::<u32>::new(Some(101), None, 10).is_none());
    }

    #[test]
    fn detects_next_page() {
        let args = Arguments::<u32>::first(2);

        let page = args.paginate((1..=5).map(|n| (n, n * 10)));
        assert!(page.has_next_page);
        assert_eq!(page.into_nodes().collect::<Vec<_>>(), [10, 20]);

        let page = args.paginate((1..=2).map(|n| (n, n * 10)));
        assert!(!page.has_next_page);
        assert_eq!(page.page_info().end_cursor, Some(2));
    }

    #[test]
    fn resumes_after_cursor() {
        let items = [1_u32, 2, 3, 4, 5];
        let first = Arguments::first(2).paginate(items.map(|n| (n, n)));
        let cursor = first.page_info().end_cursor.unwrap();

        let next = Arguments::first(2).after(cursor);
        let rest = items
            .into_iter()
            .filter(|n| next.cursor().map_or(true, |c| n > c))
            .map(|n| (n, n));
        let nodes = next.paginate(rest).into_nodes().collect::<Vec<_>>();
        assert_eq!(nodes, [3, 4]);
    }
}
