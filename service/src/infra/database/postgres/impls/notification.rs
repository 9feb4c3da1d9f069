//! [`Notification`]-related [`Database`] implementations.

use common::operations::{By, Insert, Select, Update};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        notification::{self, Metadata},
        user, Notification,
    },
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of the `notifications` table required to restore a
/// [`Notification`].
const COLUMNS: &str = "\
    id, seq, recipient_id, kind, \
    title, message, link, \
    deal_id, request_id, \
    is_read, created_at";

/// Restores a [`Notification`] out of the provided `notifications` table
/// row.
fn from_row(row: &Row) -> Notification {
    Notification {
        id: row.get("id"),
        recipient_id: row.get("recipient_id"),
        kind: row.get("kind"),
        title: row.get("title"),
        message: row.get("message"),
        link: row.get("link"),
        metadata: Metadata {
            deal_id: row.get("deal_id"),
            request_id: row.get("request_id"),
        },
        is_read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

impl<C> Database<Select<By<Option<Notification>, notification::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Notification>, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: notification::Id = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM notifications \
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

impl<C> Database<Insert<Notification>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let Notification {
            id,
            recipient_id,
            kind,
            title,
            message,
            link,
            metadata: Metadata {
                deal_id,
                request_id,
            },
            is_read,
            created_at,
        } = notification;

        const SQL: &str = "\
            INSERT INTO notifications (\
                id, recipient_id, kind, \
                title, message, link, \
                deal_id, request_id, \
                is_read, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::INT2, \
                $4::VARCHAR, $5::VARCHAR, $6::VARCHAR, \
                $7::UUID, $8::UUID, \
                $9::BOOLEAN, $10::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET is_read = notifications.is_read OR EXCLUDED.is_read";
        self.exec(
            SQL,
            &[
                &id,
                &recipient_id,
                &kind,
                &title,
                &message,
                &link,
                &deal_id,
                &request_id,
                &is_read,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<notification::AllRead>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(all): Update<notification::AllRead>,
    ) -> Result<Self::Ok, Self::Err> {
        let notification::AllRead { recipient_id } = all;

        const SQL: &str = "\
            UPDATE notifications \
            SET is_read = TRUE \
            WHERE recipient_id = $1::UUID \
              AND NOT is_read";
        self.exec(SQL, &[&recipient_id])
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C>
    Database<
        Select<
            By<
                read::notification::list::Page,
                read::notification::list::Selector,
            >,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::notification::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::notification::list::Page,
                read::notification::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::notification::list::Selector {
            arguments,
            filter: read::notification::list::Filter { recipient_id },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit() + 1).unwrap_or(i64::MAX);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit, &recipient_id];
        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM notifications \
             WHERE recipient_id = $2::UUID \
                   {cursor} \
             ORDER BY seq DESC \
             LIMIT $1::INT8",
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

impl<C> Database<Select<By<read::notification::list::UnreadCount, user::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::notification::list::UnreadCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::notification::list::UnreadCount, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let recipient_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT COUNT(*)::INT8 AS count \
            FROM notifications \
            WHERE recipient_id = $1::UUID \
              AND NOT is_read";
        let count = self
            .query_opt(SQL, &[&recipient_id])
            .await
            .map_err(tracerr::wrap!())?
            .map_or(0, |row| row.get::<_, i64>("count"));
        Ok(u32::try_from(count).unwrap_or(u32::MAX).into())
    }
}
