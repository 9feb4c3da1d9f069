mod common;

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use ::common::operations::{By, Insert, Select, Transact, Transacted};
use service::{
    command::{self, TransitionDeal},
    dispatch,
    domain::{
        activity, deal::Stage, notification, property, provider,
        service_request::Decision, user, Notification, Property, User,
    },
    infra::{database, memory, Database, Memory},
    query, read, Command as _, Config, Service,
};
use tracerr::Traced;

use self::common::{reload, World};

/// [`Memory`] database failing to store the first `failures` of
/// [`Notification`]s it is given.
#[derive(Clone, Debug)]
struct Faulty {
    inner: Memory,
    failures: u8,
    inserts: Arc<AtomicU8>,
}

impl Database<Transact> for Faulty {
    type Ok = Transacted<Memory>;
    type Err = Traced<database::Error>;

    async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
        self.inner.execute(op).await
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Faulty {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        op: Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.inner.execute(op).await
    }
}

impl Database<Select<By<Option<Property>, property::Id>>> for Faulty {
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        op: Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.inner.execute(op).await
    }
}

impl Database<Insert<Notification>> for Faulty {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        op: Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        let n = self.inserts.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err(tracerr::new!(database::Error::from(
                memory::Error::TxFinished,
            )));
        }
        self.inner.execute(op).await
    }
}

/// Prepares a [`World`] [`Deal`] with an assigned broker, and a [`Service`]
/// over the same data whose first `failures` deliveries fail.
///
/// [`Deal`]: service::domain::Deal
async fn faulty_world(
    failures: u8,
) -> (World, service::domain::Deal, Service<Faulty>, Arc<AtomicU8>) {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;
    _ = world
        .service
        .execute(command::RespondToServiceRequest {
            request_id: req.id,
            provider_id: world.broker,
            decision: Decision::Accept,
            response: None,
        })
        .await
        .unwrap();

    let inserts = Arc::new(AtomicU8::new(0));
    let faulty = Service::new(
        Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(b"test"),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(b"test"),
            dispatch: dispatch::Config {
                attempts: 3,
                backoff: Duration::ZERO,
            },
            retry: command::retrying::Config::default(),
        },
        Faulty {
            inner: world.service.database().clone(),
            failures,
            inserts: Arc::clone(&inserts),
        },
    );
    (world, deal, faulty, inserts)
}

fn stage_changes(inbox: &[Notification]) -> usize {
    inbox
        .iter()
        .filter(|n| n.kind == notification::Kind::DealStageChange)
        .count()
}

#[tokio::test]
async fn retries_failed_delivery() {
    let (world, deal, faulty, inserts) = faulty_world(2).await;

    let moved = faulty
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::BrokerAssigned,
            actor_id: world.investor,
            note: None,
        })
        .await
        .unwrap();

    assert_eq!(moved.stage(), Stage::BrokerAssigned);
    assert_eq!(inserts.load(Ordering::SeqCst), 3);
    assert_eq!(stage_changes(&world.inbox(world.broker).await), 1);
}

#[tokio::test]
async fn keeps_transition_when_delivery_fails() {
    let (world, deal, faulty, inserts) = faulty_world(u8::MAX).await;

    let moved = faulty
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::BrokerAssigned,
            actor_id: world.investor,
            note: None,
        })
        .await;

    assert!(moved.is_ok(), "delivery failure leaked: {moved:?}");
    assert_eq!(inserts.load(Ordering::SeqCst), 3);
    assert_eq!(reload(&world, &deal).await.stage(), Stage::BrokerAssigned);
    assert_eq!(stage_changes(&world.inbox(world.broker).await), 0);

    let log = world
        .service
        .execute(query::activity::Timeline::by(
            read::activity::snapshot::Selector {
                arguments: ::common::pagination::Arguments::first(10),
                filter: deal.id,
            },
        ))
        .await
        .unwrap();
    let kinds = log
        .into_nodes()
        .map(|a| a.details.kind())
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [activity::Kind::ProviderAssigned, activity::Kind::StageChange],
    );
}
