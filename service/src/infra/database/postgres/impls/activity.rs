//! [`Activity`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        activity::{self, Details, ProviderAssigned, StageChange},
        deal, Activity,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Restores an [`Activity`] out of the provided `deal_activities` table row.
///
/// [`None`] is returned if the row doesn't hold all the [`Details`] its
/// [`activity::Kind`] requires.
fn from_row(row: &Row) -> Option<Activity> {
    let details = match row.get::<_, activity::Kind>("kind") {
        activity::Kind::StageChange => Details::from(StageChange {
            from: row.get::<_, Option<_>>("from_stage")?,
            to: row.get::<_, Option<_>>("to_stage")?,
            note: row.get("note"),
        }),
        activity::Kind::ProviderAssigned => Details::from(ProviderAssigned {
            kind: row.get::<_, Option<_>>("provider_kind")?,
            provider_id: row.get::<_, Option<_>>("provider_id")?,
        }),
    };
    Some(Activity {
        id: row.get("id"),
        deal_id: row.get("deal_id"),
        actor_id: row.get("actor_id"),
        details,
        created_at: row.get("created_at"),
    })
}

impl<C> Database<Insert<Activity>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(activity): Insert<Activity>,
    ) -> Result<Self::Ok, Self::Err> {
        let Activity {
            id,
            deal_id,
            actor_id,
            details,
            created_at,
        } = activity;
        let kind = details.kind();
        let (mut from_stage, mut to_stage, mut note) = (None, None, None);
        let (mut provider_kind, mut provider_id) = (None, None);
        match details {
            Details::StageChange(change) => {
                from_stage = Some(change.from);
                to_stage = Some(change.to);
                note = change.note;
            }
            Details::ProviderAssigned(assigned) => {
                provider_kind = Some(assigned.kind);
                provider_id = Some(assigned.provider_id);
            }
        }

        const SQL: &str = "\
            INSERT INTO deal_activities (\
                id, deal_id, actor_id, kind, \
                from_stage, to_stage, note, \
                provider_kind, provider_id, \
                created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, $4::INT2, \
                $5::INT2, $6::INT2, $7::VARCHAR, \
                $8::INT2, $9::UUID, \
                $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO NOTHING";
        self.exec(
            SQL,
            &[
                &id,
                &deal_id,
                &actor_id,
                &kind,
                &from_stage,
                &to_stage,
                &note,
                &provider_kind,
                &provider_id,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C>
    Database<
        Select<By<read::activity::list::Page, read::activity::list::Selector>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::activity::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::activity::list::Page, read::activity::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::activity::list::Selector {
            arguments,
            filter: read::activity::list::Filter { deal_id, until },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit() + 1).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &deal_id];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });
        let until_idx = until.as_ref().map(|c| {
            ps.push(c);
            ps.len()
        });

        let sql = format!(
            "SELECT id, seq, deal_id, actor_id, kind, \
                    from_stage, to_stage, note, \
                    provider_kind, provider_id, \
                    created_at \
             FROM deal_activities \
             WHERE deal_id = $2::UUID \
                   {cursor} \
                   {until} \
             ORDER BY seq \
             LIMIT $1::INT8",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND seq > ${idx}::INT8"))
            }),
            until = until_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND seq <= ${idx}::INT8"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        Ok(arguments.paginate(
            rows.iter().filter_map(|row| {
                let restored = from_row(row);
                if restored.is_none() {
                    log::error!(
                        "`Activity(id: {})` misses its details, skipping",
                        row.get::<_, activity::Id>("id"),
                    );
                }
                Some((row.get("seq"), restored?))
            }),
        ))
    }
}

impl<C> Database<Select<By<read::activity::list::Latest, deal::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::activity::list::Latest;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::activity::list::Latest, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let deal_id: deal::Id = by.into_inner();

        const SQL: &str = "\
            SELECT MAX(seq) AS seq \
            FROM deal_activities \
            WHERE deal_id = $1::UUID";
        Ok(read::activity::list::Latest(
            self.query_opt(SQL, &[&deal_id])
                .await
                .map_err(tracerr::wrap!())?
                .and_then(|row| row.get("seq")),
        ))
    }
}
