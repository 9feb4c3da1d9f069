//! Shared fixtures of the `service` integration tests.

#![allow(dead_code, reason = "not every test uses every fixture")]

use common::{
    money::Currency,
    operations::Insert,
    pagination::Arguments,
    Money,
};
use rust_decimal::Decimal;
use service::{
    command::{self, CreateDeal, CreateServiceRequest},
    dispatch,
    domain::{
        property, provider, user, Deal, Notification, Property,
        ServiceRequest, User,
    },
    infra::Memory,
    query, read, Command as _, Config, Service,
};

/// [`Service`] over an in-memory database, populated with a cast of
/// [`User`]s and a single [`Property`].
pub struct World {
    pub service: Service<Memory>,
    pub investor: user::Id,
    pub other_investor: user::Id,
    pub broker: user::Id,
    pub other_broker: user::Id,
    pub advisor: user::Id,
    pub lawyer: user::Id,
    pub admin: user::Id,
    pub property: property::Id,
}

impl World {
    /// Creates a new [`World`].
    pub async fn new() -> Self {
        let config = Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(b"test"),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"test"),
            dispatch: dispatch::Config::default(),
            retry: command::retrying::Config::default(),
        };
        let service = Service::new(config, Memory::new());

        let investor =
            user(&service, "Ivy Investor", user::Role::Investor).await;
        let other_investor =
            user(&service, "Oscar Investor", user::Role::Investor).await;
        let admin = user(&service, "Ada Admin", user::Role::Admin).await;
        let broker =
            provider(&service, "Bea Broker", provider::Kind::Broker).await;
        let other_broker =
            provider(&service, "Ben Broker", provider::Kind::Broker).await;
        let advisor = provider(
            &service,
            "Max Mortgage",
            provider::Kind::MortgageAdvisor,
        )
        .await;
        let lawyer =
            provider(&service, "Lea Lawyer", provider::Kind::Lawyer).await;

        let property = Property {
            id: property::Id::new(),
            title: property::Title::new("Sunny loft").unwrap(),
            city: property::City::new("Lisbon").unwrap(),
            price: usd(450_000),
        };
        service.database().execute(Insert(property.clone())).await.unwrap();

        Self {
            service,
            investor,
            other_investor,
            broker,
            other_broker,
            advisor,
            lawyer,
            admin,
            property: property.id,
        }
    }

    /// Opens a new [`Deal`] of the main investor.
    pub async fn deal(&self) -> Deal {
        self.service
            .execute(CreateDeal {
                property_id: self.property,
                investor_id: self.investor,
                offer_price: Some(usd(440_000)),
            })
            .await
            .unwrap()
    }

    /// Asks the provider to join the [`Deal`] of the main investor.
    pub async fn request(
        &self,
        deal: &Deal,
        provider_id: user::Id,
        kind: provider::Kind,
    ) -> ServiceRequest {
        self.service
            .execute(CreateServiceRequest {
                deal_id: deal.id,
                investor_id: self.investor,
                provider_id,
                provider_kind: kind,
                message: None,
            })
            .await
            .unwrap()
    }

    /// Returns the whole inbox of the [`User`], most recent first.
    pub async fn inbox(&self, user_id: user::Id) -> Vec<Notification> {
        self.service
            .execute(query::notifications::List::by(
                read::notification::list::Selector {
                    arguments: Arguments::first(100),
                    filter: read::notification::list::Filter {
                        recipient_id: user_id,
                    },
                },
            ))
            .await
            .unwrap()
            .into_nodes()
            .collect()
    }

    /// Returns the number of unread [`Notification`]s of the [`User`].
    pub async fn unread(&self, user_id: user::Id) -> u32 {
        self.service
            .execute(query::notifications::UnreadCount::by(user_id))
            .await
            .unwrap()
            .into()
    }
}

/// Returns the provided amount of US dollars.
pub fn usd(amount: i64) -> Money {
    Money {
        amount: Decimal::from(amount),
        currency: Currency::Usd,
    }
}

/// Stores a new [`User`].
async fn user(
    service: &Service<Memory>,
    name: &str,
    role: user::Role,
) -> user::Id {
    let user = User {
        id: user::Id::new(),
        name: user::Name::new(name).unwrap(),
        role,
    };
    service.database().execute(Insert(user.clone())).await.unwrap();
    user.id
}

/// Stores a new provider [`User`] along with its [`provider::Profile`].
async fn provider(
    service: &Service<Memory>,
    name: &str,
    kind: provider::Kind,
) -> user::Id {
    let id = user(service, name, user::Role::Provider).await;
    service
        .database()
        .execute(Insert(provider::Profile { user_id: id, kind }))
        .await
        .unwrap();
    id
}

/// Returns the [`Deal`] as it's stored now.
pub async fn reload(world: &World, deal: &Deal) -> Deal {
    world
        .service
        .execute(query::deal::ById::by(deal.id))
        .await
        .unwrap()
        .unwrap()
}
