mod common;

use ::common::pagination::Arguments;
use service::{
    command::{
        delete_deal, transition_deal, DeleteDeal, RespondToServiceRequest,
        TransitionDeal,
    },
    domain::{
        deal::{Stage, TransitionError},
        notification, provider,
        service_request::Decision,
        Deal,
    },
    query, read, Command as _,
};
use tracerr::Traced;

use self::common::{reload, World};

async fn transition(
    world: &World,
    deal: &Deal,
    target: Stage,
) -> Result<Deal, Traced<transition_deal::ExecutionError>> {
    world
        .service
        .execute(TransitionDeal {
            deal_id: deal.id,
            target,
            actor_id: world.investor,
            note: None,
        })
        .await
}

async fn assign_broker(world: &World, deal: &Deal) {
    let req = world.request(deal, world.broker, provider::Kind::Broker).await;
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
}

#[tokio::test]
async fn opens_deal_in_interest_stage() {
    let world = World::new().await;

    let deal = world.deal().await;

    assert_eq!(deal.stage(), Stage::Interest);
    assert_eq!(deal.history.entries().len(), 1);
    assert_eq!(reload(&world, &deal).await.stage(), Stage::Interest);
}

#[tokio::test]
async fn rejects_skipping_broker_stage() {
    let world = World::new().await;
    let deal = world.deal().await;

    let err = transition(&world, &deal, Stage::Mortgage).await.unwrap_err();

    assert!(
        matches!(
            err.as_ref(),
            transition_deal::ExecutionError::InvalidTransition(
                TransitionError::Unreachable {
                    current: Stage::Interest,
                    target: Stage::Mortgage,
                },
            ),
        ),
        "unexpected error: {err:?}",
    );
    assert_eq!(reload(&world, &deal).await.stage(), Stage::Interest);
}

#[tokio::test]
async fn requires_broker_before_broker_stage() {
    let world = World::new().await;
    let deal = world.deal().await;

    let err = transition(&world, &deal, Stage::BrokerAssigned)
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        transition_deal::ExecutionError::InvalidTransition(
            TransitionError::AssignmentRequired {
                kind: provider::Kind::Broker,
                ..
            },
        ),
    ));
}

#[tokio::test]
async fn moves_forward_one_stage_at_a_time() {
    let world = World::new().await;
    let deal = world.deal().await;
    assign_broker(&world, &deal).await;

    let moved = transition(&world, &deal, Stage::BrokerAssigned).await.unwrap();
    assert_eq!(moved.stage(), Stage::BrokerAssigned);

    let err = transition(&world, &deal, Stage::Closing).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        transition_deal::ExecutionError::InvalidTransition(
            TransitionError::Unreachable { .. },
        ),
    ));

    let err = transition(&world, &deal, Stage::BrokerAssigned)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        transition_deal::ExecutionError::InvalidTransition(_),
    ));
    assert_eq!(reload(&world, &deal).await.stage(), Stage::BrokerAssigned);
}

#[tokio::test]
async fn locks_cancelled_deal() {
    let world = World::new().await;
    let deal = world.deal().await;
    assign_broker(&world, &deal).await;
    for stage in [Stage::BrokerAssigned, Stage::Mortgage, Stage::Cancelled] {
        _ = transition(&world, &deal, stage).await.unwrap();
    }

    let err = transition(&world, &deal, Stage::Legal).await.unwrap_err();

    assert!(matches!(
        err.as_ref(),
        transition_deal::ExecutionError::InvalidTransition(
            TransitionError::Terminal {
                current: Stage::Cancelled,
            },
        ),
    ));
    let stages = reload(&world, &deal)
        .await
        .history
        .entries()
        .iter()
        .map(|e| e.stage)
        .collect::<Vec<_>>();
    assert_eq!(
        stages,
        [
            Stage::Interest,
            Stage::BrokerAssigned,
            Stage::Mortgage,
            Stage::Cancelled,
        ],
    );
}

#[tokio::test]
async fn rejects_outsiders() {
    let world = World::new().await;
    let deal = world.deal().await;

    let err = world
        .service
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::Cancelled,
            actor_id: world.other_investor,
            note: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        transition_deal::ExecutionError::Unauthorized(id)
            if *id == world.other_investor,
    ));

    let cancelled = world
        .service
        .execute(TransitionDeal {
            deal_id: deal.id,
            target: Stage::Cancelled,
            actor_id: world.admin,
            note: None,
        })
        .await
        .unwrap();
    assert_eq!(cancelled.stage(), Stage::Cancelled);
}

#[tokio::test]
async fn notifies_other_participants_about_stage_change() {
    let world = World::new().await;
    let deal = world.deal().await;
    assign_broker(&world, &deal).await;

    _ = transition(&world, &deal, Stage::BrokerAssigned).await.unwrap();

    let changes = |inbox: Vec<notification::Notification>| {
        inbox
            .into_iter()
            .filter(|n| n.kind == notification::Kind::DealStageChange)
            .count()
    };
    assert_eq!(changes(world.inbox(world.broker).await), 1);
    assert_eq!(changes(world.inbox(world.investor).await), 0);
}

#[tokio::test]
async fn deletes_deal_with_everything_attached() {
    let world = World::new().await;
    let deal = world.deal().await;
    assign_broker(&world, &deal).await;

    let err = world
        .service
        .execute(DeleteDeal {
            deal_id: deal.id,
            actor_id: world.other_investor,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        delete_deal::ExecutionError::Unauthorized(_),
    ));

    _ = world
        .service
        .execute(DeleteDeal {
            deal_id: deal.id,
            actor_id: world.investor,
        })
        .await
        .unwrap();

    let found = world
        .service
        .execute(query::deal::ById::by(deal.id))
        .await
        .unwrap();
    assert!(found.is_none());
    let requests = world
        .service
        .execute(query::service_requests::List::by(
            read::service_request::list::Selector {
                arguments: Arguments::first(10),
                filter: read::service_request::list::Filter::Deal(deal.id),
            },
        ))
        .await
        .unwrap();
    assert!(requests.edges.is_empty());
    assert!(world.inbox(world.investor).await.is_empty());
    assert!(world.inbox(world.broker).await.is_empty());
}

#[tokio::test]
async fn lists_deals_newest_first() {
    let world = World::new().await;
    let older = world.deal().await;
    let newer = world.deal().await;
    // Updates keep the position of a `Deal`.
    assign_broker(&world, &older).await;
    _ = transition(&world, &older, Stage::BrokerAssigned).await.unwrap();

    let list = |arguments| {
        world.service.execute(query::deals::List::by(
            read::deal::list::Selector {
                arguments,
                filter: read::deal::list::Filter::Investor(world.investor),
            },
        ))
    };

    let ids = list(Arguments::first(10))
        .await
        .unwrap()
        .into_nodes()
        .map(|d| d.id)
        .collect::<Vec<_>>();
    assert_eq!(ids, [newer.id, older.id]);

    let first = list(Arguments::first(1)).await.unwrap();
    assert!(first.has_next_page);
    let after = first.page_info().end_cursor.unwrap();
    let rest = list(Arguments::first(1).after(after)).await.unwrap();
    assert!(!rest.has_next_page);
    let ids = rest.into_nodes().map(|d| d.id).collect::<Vec<_>>();
    assert_eq!(ids, [older.id]);
}
