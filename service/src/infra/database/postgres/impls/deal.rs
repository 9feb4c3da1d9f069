//! [`Deal`]-related [`Database`] implementations.

use std::collections::HashMap;

use common::{
    operations::{By, Delete, Insert, Lock, Select},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{deal, Deal},
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of the `deals` table required to restore a [`Deal`].
const COLUMNS: &str = "\
    id, seq, property_id, investor_id, \
    broker_id, mortgage_advisor_id, lawyer_id, \
    offer_amount, offer_currency, \
    created_at, updated_at";

impl<C: Connection> Postgres<C> {
    /// Restores [`Deal`]s out of the provided `deals` table rows, keeping
    /// their order.
    async fn restore_deals(
        &self,
        rows: Vec<Row>,
    ) -> Result<Vec<(read::Cursor, Deal)>, Traced<database::Error>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids = rows
            .iter()
            .map(|row| row.get::<_, deal::Id>("id"))
            .collect::<Vec<_>>();

        const SQL: &str = "\
            SELECT deal_id, stage, at, note \
            FROM deal_stage_history \
            WHERE deal_id IN (SELECT unnest($1::UUID[])) \
            ORDER BY deal_id, position";
        let mut histories = HashMap::<deal::Id, Vec<deal::Entry>>::new();
        for row in self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
        {
            histories.entry(row.get("deal_id")).or_default().push(
                deal::Entry {
                    stage: row.get("stage"),
                    at: row.get("at"),
                    note: row.get("note"),
                },
            );
        }

        rows.into_iter()
            .map(|row| -> Result<_, Traced<database::Error>> {
                let id = row.get("id");
                let history = histories
                    .remove(&id)
                    .and_then(deal::History::new)
                    .ok_or(postgres::Error::StageHistoryCorrupted(id))
                    .map_err(tracerr::from_and_wrap!(=> database::Error))?;
                let offer_amount = row.get("offer_amount");
                let offer_currency = row.get("offer_currency");
                Ok((
                    row.get("seq"),
                    Deal {
                        id,
                        property_id: row.get("property_id"),
                        investor_id: row.get("investor_id"),
                        broker_id: row.get("broker_id"),
                        mortgage_advisor_id: row.get("mortgage_advisor_id"),
                        lawyer_id: row.get("lawyer_id"),
                        offer_price: Option::zip(offer_amount, offer_currency)
                            .map(|(amount, currency)| Money {
                                amount,
                                currency,
                            }),
                        history,
                        created_at: row.get("created_at"),
                        updated_at: row.get("updated_at"),
                    },
                ))
            })
            .collect()
    }
}

impl<C> Database<Select<By<Option<Deal>, deal::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Deal>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Deal>, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: deal::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM deals \
             WHERE id = $1::UUID"
        );
        let rows = self
            .query(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(self
            .restore_deals(rows)
            .await
            .map_err(tracerr::wrap!())?
            .pop()
            .map(|(_, deal)| deal))
    }
}

impl<C> Database<Insert<Deal>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(deal): Insert<Deal>,
    ) -> Result<Self::Ok, Self::Err> {
        let stage = deal.stage();
        let Deal {
            id,
            property_id,
            investor_id,
            broker_id,
            mortgage_advisor_id,
            lawyer_id,
            offer_price,
            history,
            created_at,
            updated_at,
        } = deal;
        let offer_amount = offer_price.map(|p| p.amount);
        let offer_currency = offer_price.map(|p| p.currency);

        const SQL: &str = "\
            INSERT INTO deals (\
                id, property_id, investor_id, \
                broker_id, mortgage_advisor_id, lawyer_id, \
                stage, offer_amount, offer_currency, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::UUID, $5::UUID, $6::UUID, \
                $7::INT2, $8::NUMERIC, $9::INT2, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET broker_id = EXCLUDED.broker_id, \
                mortgage_advisor_id = EXCLUDED.mortgage_advisor_id, \
                lawyer_id = EXCLUDED.lawyer_id, \
                stage = EXCLUDED.stage, \
                offer_amount = EXCLUDED.offer_amount, \
                offer_currency = EXCLUDED.offer_currency, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &property_id,
                &investor_id,
                &broker_id,
                &mortgage_advisor_id,
                &lawyer_id,
                &stage,
                &offer_amount,
                &offer_currency,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)?;

        // History is append-only, so already stored entries stay untouched.
        let entries = history.entries();
        let positions = (1_i32..).take(entries.len()).collect::<Vec<_>>();
        let stages = entries.iter().map(|e| e.stage).collect::<Vec<_>>();
        let ats = entries.iter().map(|e| e.at).collect::<Vec<_>>();
        let notes = entries.iter().map(|e| e.note.clone()).collect::<Vec<_>>();

        const HISTORY_SQL: &str = "\
            INSERT INTO deal_stage_history (deal_id, position, stage, at, note) \
            SELECT $1::UUID, h.position, h.stage, h.at, h.note \
            FROM unnest(\
                $2::INT4[], $3::INT2[], $4::TIMESTAMPTZ[], $5::VARCHAR[]\
            ) AS h(position, stage, at, note) \
            ON CONFLICT (deal_id, position) DO NOTHING";
        self.exec(HISTORY_SQL, &[&id, &positions, &stages, &ats, &notes])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Deal, deal::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Deal, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: deal::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM deals \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Deal, deal::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Deal, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: deal::Id = by.into_inner();

        // Stage history, service requests and activities are removed by
        // `ON DELETE CASCADE`.
        const SQL: &str = "\
            WITH notifications AS (\
                DELETE FROM notifications \
                WHERE deal_id = $1::UUID\
            ) \
            DELETE FROM deals \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

/// Builds the `WHERE` condition of the provided [`read::deal::list::Filter`]
/// referring its parameter by `idx`.
fn filter_sql(filter: read::deal::list::Filter, idx: usize) -> String {
    use read::deal::list::Filter;

    match filter {
        Filter::Investor(_) => format!("investor_id = ${idx}::UUID"),
        Filter::Provider(_) => format!(
            "${idx}::UUID IN (broker_id, mortgage_advisor_id, lawyer_id)"
        ),
    }
}

impl<C> Database<Select<By<read::deal::list::Page, read::deal::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::deal::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::deal::list::Page, read::deal::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        use read::deal::list::Filter;

        let read::deal::list::Selector { arguments, filter } = by.into_inner();
        let (Filter::Investor(user_id) | Filter::Provider(user_id)) = filter;

        let limit = i64::try_from(arguments.limit() + 1).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &user_id];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM deals \
             WHERE {filtering} \
                   {cursor} \
             ORDER BY seq DESC \
             LIMIT $1::INT8",
            filtering = filter_sql(filter, 2),
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND seq < ${idx}::INT8"))
            }),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;
        let deals = self
            .restore_deals(rows)
            .await
            .map_err(tracerr::wrap!())?;

        Ok(arguments.paginate(deals))
    }
}

impl<C> Database<Select<By<Vec<Deal>, read::deal::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Deal>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Deal>, read::deal::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::deal::list::Filter;

        let filter = by.into_inner();
        let (Filter::Investor(user_id) | Filter::Provider(user_id)) = filter;

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM deals \
             WHERE {filtering} \
             ORDER BY seq",
            filtering = filter_sql(filter, 1),
        );
        let rows = self
            .query(&sql, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?;
        Ok(self
            .restore_deals(rows)
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|(_, deal)| deal)
            .collect())
    }
}
