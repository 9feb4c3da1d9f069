mod common;

use std::pin::pin;

use futures::TryStreamExt as _;
use service::{
    command::{RespondToServiceRequest, TransitionDeal},
    domain::{
        activity::{self, Details},
        deal::{self, Stage},
        provider,
        service_request::Decision,
    },
    query,
    read::activity::snapshot,
    Command as _,
};

use self::common::World;

#[tokio::test]
async fn reads_timeline_lazily_from_snapshot() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;
    _ = world
        .service
        .execute(RespondToServiceRequest {
            request_id: req.id,
            provider_id: world.broker,
            decision: Decision::Accept,
            response: None,
        })
        .await
        .unwrap();
    for target in [Stage::BrokerAssigned, Stage::Mortgage] {
        _ = world
            .service
            .execute(TransitionDeal {
                deal_id: deal.id,
                target,
                actor_id: world.investor,
                note: None,
            })
            .await
            .unwrap();
    }

    let mut timeline = pin!(world.service.activity_timeline(deal.id, 1));
    let first = timeline.try_next().await.unwrap().unwrap();
    assert_eq!(first.details.kind(), activity::Kind::ProviderAssigned);

    // Appended after the snapshot was taken.
    _ = world
        .service
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::Legal,
            actor_id: world.investor,
            note: None,
        })
        .await
        .unwrap();

    let rest = timeline.try_collect::<Vec<_>>().await.unwrap();
    let targets = rest
        .iter()
        .map(|a| match &a.details {
            Details::StageChange(change) => Some(change.to),
            Details::ProviderAssigned(_) => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(
        targets,
        [Some(Stage::BrokerAssigned), Some(Stage::Mortgage)],
    );

    // Restarting reads the fresh snapshot.
    let all = world
        .service
        .activity_timeline(deal.id, 2)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn yields_nothing_for_quiet_deal() {
    let world = World::new().await;
    let deal = world.deal().await;

    let all = world
        .service
        .activity_timeline(deal.id, 10)
        .try_collect::<Vec<_>>()
        .await
        .unwrap();

    assert!(all.is_empty());
}

async fn timeline_page(
    world: &World,
    deal_id: deal::Id,
    arguments: snapshot::Arguments,
) -> snapshot::Page {
    world
        .service
        .execute(query::activity::Timeline::by(snapshot::Selector {
            arguments,
            filter: deal_id,
        }))
        .await
        .unwrap()
}

#[tokio::test]
async fn keeps_pages_within_first_page_snapshot() {
    let world = World::new().await;
    let deal = world.deal().await;
    _ = world
        .service
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::Cancelled,
            actor_id: world.investor,
            note: None,
        })
        .await
        .unwrap();
    let other = world.deal().await;
    let req = world.request(&other, world.broker, provider::Kind::Broker).await;
    _ = world
        .service
        .execute(RespondToServiceRequest {
            request_id: req.id,
            provider_id: world.broker,
            decision: Decision::Accept,
            response: None,
        })
        .await
        .unwrap();

    let first =
        timeline_page(&world, other.id, snapshot::Arguments::first(1)).await;
    assert_eq!(first.edges.len(), 1);
    assert!(!first.has_next_page);
    let bookmark = first.page_info().end_cursor.unwrap();

    // Appended after the snapshot was taken.
    _ = world
        .service
        .execute(TransitionDeal {
            deal_id: other.id,
            target: Stage::BrokerAssigned,
            actor_id: world.investor,
            note: None,
        })
        .await
        .unwrap();

    let next = timeline_page(
        &world,
        other.id,
        snapshot::Arguments::first(10).after(bookmark),
    )
    .await;
    assert!(next.edges.is_empty());
    assert!(!next.has_next_page);

    let fresh =
        timeline_page(&world, other.id, snapshot::Arguments::first(10)).await;
    assert_eq!(fresh.edges.len(), 2);
    assert!(fresh.edges.iter().all(|e| e.cursor.until > bookmark.until));
    assert_eq!(
        fresh.edges[0].node.details.kind(),
        activity::Kind::ProviderAssigned,
    );
}

#[tokio::test]
async fn returns_empty_page_for_quiet_deal() {
    let world = World::new().await;
    let deal = world.deal().await;

    let page =
        timeline_page(&world, deal.id, snapshot::Arguments::first(5)).await;

    assert!(page.edges.is_empty());
    assert!(!page.has_next_page);
}
