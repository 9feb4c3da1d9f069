//! [`Query`] collection related to the [`Activity`] log of a [`Deal`].

use common::{
    operations::{By, Select},
    pagination::Arguments,
};
use futures::{stream, Stream, TryStreamExt as _};
use tracerr::Traced;

use crate::{
    domain::{deal, Activity},
    infra::{database, Database},
    read::activity::{
        list::{Filter, Latest, Page, Selector},
        snapshot::{self, Bookmark},
    },
    Service,
};
#[cfg(doc)]
use crate::domain::Deal;

use super::Query;

/// [`Query`] of a [`Deal`] timeline page, oldest [`Activity`] first.
///
/// A page requested without a [`Bookmark`] pins the snapshot, and the
/// [`Bookmark`]s it returns keep the following pages within it.
#[derive(Clone, Copy, Debug)]
pub struct Timeline(snapshot::Selector);

impl Timeline {
    /// Creates a new [`Timeline`] query of the page `selector` points to.
    #[must_use]
    pub fn by(selector: snapshot::Selector) -> Self {
        Self(selector)
    }
}

impl<Db> Query<Timeline> for Service<Db>
where
    Db: Database<
            Select<By<Latest, deal::Id>>,
            Ok = Latest,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Page, Selector>>,
            Ok = Page,
            Err = Traced<database::Error>,
        >,
{
    type Ok = snapshot::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Timeline(selector): Timeline,
    ) -> Result<Self::Ok, Self::Err> {
        let snapshot::Selector {
            arguments,
            filter: deal_id,
        } = selector;

        let mut page_args = Arguments::first(arguments.limit());
        let until = if let Some(bookmark) = arguments.cursor() {
            page_args = page_args.after(bookmark.at);
            bookmark.until
        } else {
            let Latest(latest) = self
                .database()
                .execute(Select(By::<Latest, _>::new(deal_id)))
                .await
                .map_err(tracerr::wrap!())?;
            let Some(latest) = latest else {
                return Ok(snapshot::Page::new(
                    Vec::<(Bookmark, Activity)>::new(),
                    false,
                ));
            };
            latest
        };

        let page = self
            .database()
            .execute(Select(By::<Page, _>::new(Selector {
                arguments: page_args,
                filter: Filter {
                    deal_id,
                    until: Some(until),
                },
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let has_next_page = page.has_next_page;
        Ok(snapshot::Page::new(
            page.edges
                .into_iter()
                .map(|e| (Bookmark { at: e.cursor, until }, e.node)),
            has_next_page,
        ))
    }
}

impl<Db> Service<Db>
where
    Self: Query<Timeline, Ok = snapshot::Page, Err = Traced<database::Error>>,
{
    /// Reads the whole timeline of the [`Deal`] lazily, oldest [`Activity`]
    /// first, fetching `page_size` [`Activity`]s at once.
    ///
    /// The timeline is a snapshot taken when the first page is requested:
    /// [`Activity`]s appended afterwards are not yielded. Dropping the
    /// returned [`Stream`] stops reading.
    pub fn activity_timeline(
        &self,
        deal_id: deal::Id,
        page_size: usize,
    ) -> impl Stream<Item = Result<Activity, Traced<database::Error>>> + '_
    {
        let first = snapshot::Arguments::first(page_size);
        stream::try_unfold(Some(first), move |arguments| async move {
            let Some(arguments) = arguments else {
                return Ok(None);
            };

            let page = self
                .execute(Timeline::by(snapshot::Selector {
                    arguments,
                    filter: deal_id,
                }))
                .await
                .map_err(tracerr::wrap!())?;

            let next = page
                .page_info()
                .end_cursor
                .filter(|_| page.has_next_page)
                .map(|last| arguments.after(last));
            let activities = page.into_nodes().map(Ok);

            Ok::<_, Traced<database::Error>>(Some((
                stream::iter(activities),
                next,
            )))
        })
        .try_flatten()
    }
}
