//! [`ServiceRequest`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{deal, provider, service_request, ServiceRequest},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::{self, service_request::Pending},
};

/// Columns of the `service_requests` table required to restore a
/// [`ServiceRequest`].
const COLUMNS: &str = "\
    id, seq, deal_id, investor_id, \
    provider_id, provider_kind, status, \
    investor_message, provider_response, \
    created_at, responded_at, overruled";

/// Restores a [`ServiceRequest`] out of the provided `service_requests`
/// table row.
fn from_row(row: &Row) -> ServiceRequest {
    ServiceRequest {
        id: row.get("id"),
        deal_id: row.get("deal_id"),
        investor_id: row.get("investor_id"),
        provider_id: row.get("provider_id"),
        provider_kind: row.get("provider_kind"),
        status: row.get("status"),
        investor_message: row.get("investor_message"),
        provider_response: row.get("provider_response"),
        created_at: row.get("created_at"),
        responded_at: row.get("responded_at"),
        overruled: row.get("overruled"),
    }
}

impl<C> Database<Select<By<Option<ServiceRequest>, service_request::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<ServiceRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ServiceRequest>, service_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: service_request::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_requests \
             WHERE id = $1::UUID"
        );
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Option<Pending>, (deal::Id, provider::Kind)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Pending>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Pending>, (deal::Id, provider::Kind)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (deal_id, kind) = by.into_inner();
        let status = service_request::Status::Pending;

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_requests \
             WHERE deal_id = $1::UUID \
               AND provider_kind = $2::INT2 \
               AND status = $3::INT2 \
             LIMIT 1"
        );
        Ok(self
            .query_opt(&sql, &[&deal_id, &kind, &status])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(|row| Pending(from_row(row))))
    }
}

impl<C> Database<Insert<ServiceRequest>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(req): Insert<ServiceRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        let ServiceRequest {
            id,
            deal_id,
            investor_id,
            provider_id,
            provider_kind,
            status,
            investor_message,
            provider_response,
            created_at,
            responded_at,
            overruled,
        } = req;

        const SQL: &str = "\
            INSERT INTO service_requests (\
                id, deal_id, investor_id, \
                provider_id, provider_kind, status, \
                investor_message, provider_response, \
                created_at, responded_at, overruled\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::UUID, $5::INT2, $6::INT2, \
                $7::VARCHAR, $8::VARCHAR, \
                $9::TIMESTAMPTZ, $10::TIMESTAMPTZ, $11::BOOL\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET status = EXCLUDED.status, \
                provider_response = EXCLUDED.provider_response, \
                responded_at = EXCLUDED.responded_at, \
                overruled = EXCLUDED.overruled";
        self.exec(
            SQL,
            &[
                &id,
                &deal_id,
                &investor_id,
                &provider_id,
                &provider_kind,
                &status,
                &investor_message,
                &provider_response,
                &created_at,
                &responded_at,
                &overruled,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

/// Builds the `WHERE` condition of the provided
/// [`read::service_request::list::Filter`] referring its parameter by `idx`.
fn filter_sql(
    filter: read::service_request::list::Filter,
    idx: usize,
) -> String {
    use read::service_request::list::Filter;

    match filter {
        Filter::Deal(_) => format!("deal_id = ${idx}::UUID"),
        Filter::Provider(_) => format!("provider_id = ${idx}::UUID"),
    }
}

/// Returns the parameter of the provided
/// [`read::service_request::list::Filter`].
fn filter_param(
    filter: &read::service_request::list::Filter,
) -> &(dyn ToSql + Sync) {
    use read::service_request::list::Filter;

    match filter {
        Filter::Deal(id) => id,
        Filter::Provider(id) => id,
    }
}

impl<C>
    Database<
        Select<
            By<
                read::service_request::list::Page,
                read::service_request::list::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::service_request::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::service_request::list::Page,
                read::service_request::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::service_request::list::Selector { arguments, filter } =
            by.into_inner();

        let limit = i64::try_from(arguments.limit() + 1).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> =
            vec![&limit, filter_param(&filter)];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_requests \
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

        Ok(arguments.paginate(
            rows.iter().map(|row| (row.get("seq"), from_row(row))),
        ))
    }
}

impl<C>
    Database<
        Select<By<Vec<ServiceRequest>, read::service_request::list::Filter>>,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<ServiceRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<ServiceRequest>, read::service_request::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM service_requests \
             WHERE {filtering} \
             ORDER BY seq",
            filtering = filter_sql(filter, 1),
        );
        Ok(self
            .query(&sql, &[filter_param(&filter)])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}
