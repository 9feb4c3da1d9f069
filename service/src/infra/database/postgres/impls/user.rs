//! [`User`], [`Property`] and [`provider::Profile`] [`Database`]
//! implementations.
//!
//! These entities are owned by external directories, so only lookups and
//! upserts are provided.

use std::collections::HashMap;

use common::{
    operations::{By, Insert, Select},
    Money,
};
use tracerr::Traced;

use crate::{
    domain::{property, provider, user, Property, User},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C, IDs> Database<Select<By<HashMap<user::Id, User>, IDs>>> for Postgres<C>
where
    C: Connection,
    IDs: AsRef<[user::Id]>,
{
    type Ok = HashMap<user::Id, User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<user::Id, User>, IDs>>,
    ) -> Result<Self::Ok, Self::Err> {
        let ids = by.into_inner();
        // Avoid subtle change for SQL.
        let ids: &[user::Id] = ids.as_ref();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        const SQL: &str = "\
            SELECT id, name, role \
            FROM users \
            WHERE id IN (SELECT unnest($1::UUID[]))";
        Ok(self
            .query(SQL, &[&ids])
            .await
            .map_err(tracerr::wrap!())?
            .into_iter()
            .map(|row| {
                let id = row.get("id");
                (
                    id,
                    User {
                        id,
                        name: row.get("name"),
                        role: row.get("role"),
                    },
                )
            })
            .collect())
    }
}

impl<C> Database<Select<By<Option<User>, user::Id>>> for Postgres<C>
where
    C: Connection,
    Self: Database<
        Select<By<HashMap<user::Id, User>, [user::Id; 1]>>,
        Ok = HashMap<user::Id, User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        Ok(self
            .execute(Select(By::new([id])))
            .await
            .map_err(tracerr::wrap!())?
            .remove(&id))
    }
}

impl<C> Database<Insert<User>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        let User { id, name, role } = user;

        const SQL: &str = "\
            INSERT INTO users (id, name, role) \
            VALUES ($1::UUID, $2::VARCHAR, $3::INT2) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                role = EXCLUDED.role";
        self.exec(SQL, &[&id, &name, &role])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Select<By<Option<Property>, property::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: property::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, title, city, price_amount, price_currency \
            FROM properties \
            WHERE id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| Property {
                id: row.get("id"),
                title: row.get("title"),
                city: row.get("city"),
                price: Money {
                    amount: row.get("price_amount"),
                    currency: row.get("price_currency"),
                },
            }))
    }
}

impl<C> Database<Insert<Property>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        let Property {
            id,
            title,
            city,
            price,
        } = property;

        const SQL: &str = "\
            INSERT INTO properties (\
                id, title, city, price_amount, price_currency\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::VARCHAR, $4::NUMERIC, $5::INT2\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET title = EXCLUDED.title, \
                city = EXCLUDED.city, \
                price_amount = EXCLUDED.price_amount, \
                price_currency = EXCLUDED.price_currency";
        self.exec(
            SQL,
            &[&id, &title, &city, &price.amount, &price.currency],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Select<By<Option<provider::Profile>, user::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<provider::Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<provider::Profile>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let user_id: user::Id = by.into_inner();

        const SQL: &str = "\
            SELECT user_id, kind \
            FROM provider_profiles \
            WHERE user_id = $1::UUID";
        Ok(self
            .query_opt(SQL, &[&user_id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| provider::Profile {
                user_id: row.get("user_id"),
                kind: row.get("kind"),
            }))
    }
}

impl<C> Database<Insert<provider::Profile>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(profile): Insert<provider::Profile>,
    ) -> Result<Self::Ok, Self::Err> {
        let provider::Profile { user_id, kind } = profile;

        const SQL: &str = "\
            INSERT INTO provider_profiles (user_id, kind) \
            VALUES ($1::UUID, $2::INT2) \
            ON CONFLICT (user_id) DO UPDATE \
            SET kind = EXCLUDED.kind";
        self.exec(SQL, &[&user_id, &kind])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
