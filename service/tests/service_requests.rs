mod common;

use ::common::pagination::Arguments;
use service::{
    command::{
        assign_provider, create_service_request, respond_to_service_request,
        AssignProvider, CreateServiceRequest, RespondToServiceRequest,
    },
    domain::{
        activity, notification, provider,
        service_request::{Decision, Status},
        ServiceRequest,
    },
    query, read, Command as _,
};

use self::common::{reload, World};

async fn respond(
    world: &World,
    req: &ServiceRequest,
    provider_id: service::domain::user::Id,
    decision: Decision,
) -> Result<
    ServiceRequest,
    tracerr::Traced<respond_to_service_request::ExecutionError>,
> {
    world
        .service
        .execute(RespondToServiceRequest {
            request_id: req.id,
            provider_id,
            decision,
            response: None,
        })
        .await
}

async fn activities(
    world: &World,
    deal_id: service::domain::deal::Id,
) -> Vec<service::domain::Activity> {
    world
        .service
        .execute(query::activity::Timeline::by(
            read::activity::snapshot::Selector {
                arguments: Arguments::first(100),
                filter: deal_id,
            },
        ))
        .await
        .unwrap()
        .into_nodes()
        .collect()
}

#[tokio::test]
async fn accepting_assigns_provider_atomically() {
    let world = World::new().await;
    let deal = world.deal().await;

    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;
    assert_eq!(req.status, Status::Pending);
    let received = world.inbox(world.broker).await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].kind, notification::Kind::RequestReceived);

    let accepted = respond(&world, &req, world.broker, Decision::Accept)
        .await
        .unwrap();
    assert_eq!(accepted.status, Status::Accepted);
    assert!(accepted.responded_at.is_some());

    let assigned = world
        .service
        .execute(query::deal::Assignment {
            deal_id: deal.id,
            kind: provider::Kind::Broker,
            viewer_id: world.investor,
        })
        .await
        .unwrap();
    assert_eq!(assigned, Some(world.broker));

    let log = activities(&world, deal.id).await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].details.kind(), activity::Kind::ProviderAssigned);

    let inbox = world.inbox(world.investor).await;
    assert_eq!(
        inbox
            .iter()
            .filter(|n| n.kind == notification::Kind::RequestAccepted)
            .count(),
        1,
    );
}

#[tokio::test]
async fn keeps_single_pending_request_per_role() {
    let world = World::new().await;
    let deal = world.deal().await;
    let first =
        world.request(&deal, world.broker, provider::Kind::Broker).await;

    let err = world
        .service
        .execute(CreateServiceRequest {
            deal_id: deal.id,
            investor_id: world.investor,
            provider_id: world.other_broker,
            provider_kind: provider::Kind::Broker,
            message: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        create_service_request::ExecutionError::DuplicatePendingRequest(id)
            if *id == first.id,
    ));

    // Other roles are independent.
    _ = world
        .request(&deal, world.advisor, provider::Kind::MortgageAdvisor)
        .await;
}

#[tokio::test]
async fn admits_one_of_concurrent_requests() {
    let world = World::new().await;
    let deal = world.deal().await;
    let create = |provider_id| {
        world.service.execute(CreateServiceRequest {
            deal_id: deal.id,
            investor_id: world.investor,
            provider_id,
            provider_kind: provider::Kind::Broker,
            message: None,
        })
    };

    let (a, b) = tokio::join!(create(world.broker), create(world.other_broker));

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let failed = a.err().or(b.err()).unwrap();
    assert!(matches!(
        failed.as_ref(),
        create_service_request::ExecutionError::DuplicatePendingRequest(_),
    ));
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
    assert_eq!(requests.edges.len(), 1);
}

#[tokio::test]
async fn assigns_once_under_concurrent_accepts() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;

    let (a, b) = tokio::join!(
        respond(&world, &req, world.broker, Decision::Accept),
        respond(&world, &req, world.broker, Decision::Accept),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    assert_eq!(
        reload(&world, &deal).await.assignment(provider::Kind::Broker),
        Some(world.broker),
    );
    assert_eq!(activities(&world, deal.id).await.len(), 1);
}

#[tokio::test]
async fn declining_leaves_role_open() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;

    let declined = respond(&world, &req, world.broker, Decision::Decline)
        .await
        .unwrap();

    assert_eq!(declined.status, Status::Declined);
    assert_eq!(
        reload(&world, &deal).await.assignment(provider::Kind::Broker),
        None,
    );
    assert!(activities(&world, deal.id).await.is_empty());
    let inbox = world.inbox(world.investor).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].kind, notification::Kind::RequestDeclined);

    // The role may be requested again.
    let next = world
        .request(&deal, world.other_broker, provider::Kind::Broker)
        .await;
    assert_eq!(next.status, Status::Pending);
}

#[tokio::test]
async fn only_addressee_responds_once() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;

    let err = respond(&world, &req, world.other_broker, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        respond_to_service_request::ExecutionError::Unauthorized(_),
    ));

    _ = respond(&world, &req, world.broker, Decision::Decline)
        .await
        .unwrap();
    let err = respond(&world, &req, world.broker, Decision::Accept)
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        respond_to_service_request::ExecutionError::AlreadyResponded(
            Status::Declined,
        ),
    ));
}

#[tokio::test]
async fn checks_provider_role() {
    let world = World::new().await;
    let deal = world.deal().await;

    let err = world
        .service
        .execute(CreateServiceRequest {
            deal_id: deal.id,
            investor_id: world.investor,
            provider_id: world.lawyer,
            provider_kind: provider::Kind::Broker,
            message: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_service_request::ExecutionError::ProviderKindMismatch {
            kind: provider::Kind::Lawyer,
            ..
        },
    ));

    let err = world
        .service
        .execute(CreateServiceRequest {
            deal_id: deal.id,
            investor_id: world.investor,
            provider_id: world.other_investor,
            provider_kind: provider::Kind::Broker,
            message: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        create_service_request::ExecutionError::ProviderNotExists(_),
    ));
}

#[tokio::test]
async fn admin_assignment_supersedes_pending_request() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;
    let assign = |actor_id, provider_id| {
        world.service.execute(AssignProvider {
            deal_id: deal.id,
            kind: provider::Kind::Broker,
            provider_id,
            actor_id,
        })
    };

    let err = assign(world.investor, world.other_broker).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        assign_provider::ExecutionError::Unauthorized(_),
    ));

    let deal = assign(world.admin, world.other_broker).await.unwrap();
    assert_eq!(
        deal.assignment(provider::Kind::Broker),
        Some(world.other_broker),
    );

    let superseded = world
        .service
        .execute(query::service_request::ById::by(req.id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(superseded.status, Status::Declined);
    let kinds = world
        .inbox(world.investor)
        .await
        .into_iter()
        .map(|n| n.kind)
        .collect::<Vec<_>>();
    assert!(kinds.contains(&notification::Kind::ProviderAssigned));
    assert!(kinds.contains(&notification::Kind::RequestDeclined));

    let err = assign(world.admin, world.broker).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        assign_provider::ExecutionError::AlreadyAssigned { provider_id, .. }
            if *provider_id == world.other_broker,
    ));
}

#[tokio::test]
async fn hides_assignment_from_outsiders() {
    let world = World::new().await;
    let deal = world.deal().await;
    let req = world.request(&deal, world.broker, provider::Kind::Broker).await;
    respond(&world, &req, world.broker, Decision::Accept)
        .await
        .unwrap();

    let lookup = |viewer_id| {
        world.service.execute(query::deal::Assignment {
            deal_id: deal.id,
            kind: provider::Kind::Broker,
            viewer_id,
        })
    };

    let err = lookup(world.other_investor).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::deal::ExecutionError::Unauthorized(id)
            if *id == world.other_investor,
    ));
    let err = lookup(world.other_broker).await.unwrap_err();
    assert!(matches!(
        err.as_ref(),
        query::deal::ExecutionError::Unauthorized(_),
    ));

    assert_eq!(lookup(world.broker).await.unwrap(), Some(world.broker));
    assert_eq!(lookup(world.admin).await.unwrap(), Some(world.broker));
}

#[tokio::test]
async fn looks_up_provider_profiles() {
    let world = World::new().await;

    let profile = world
        .service
        .execute(query::user::ProfileById::by(world.broker))
        .await
        .unwrap()
        .expect("broker has no profile");
    assert_eq!(profile.kind, provider::Kind::Broker);

    let none = world
        .service
        .execute(query::user::ProfileById::by(world.investor))
        .await
        .unwrap();
    assert!(none.is_none());
}
