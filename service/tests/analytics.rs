mod common;

use service::{
    command::{AssignProvider, RespondToServiceRequest, TransitionDeal},
    domain::{deal::Stage, provider, service_request::Decision},
    query::analytics::ProviderAnalytics,
    Command as _, Query as _,
};

use self::common::World;

#[tokio::test]
async fn reports_zeros_for_idle_provider() {
    let world = World::new().await;

    let analytics = world
        .service
        .execute(ProviderAnalytics {
            provider_id: world.lawyer,
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(analytics.provider_kind, provider::Kind::Lawyer);
    assert_eq!(analytics.total_deals, 0);
    assert!(analytics.conversion_rate.abs() < f64::EPSILON);
    assert!(analytics.monthly_trends.is_empty());
}

#[tokio::test]
async fn yields_nothing_for_non_provider() {
    let world = World::new().await;

    let analytics = world
        .service
        .execute(ProviderAnalytics {
            provider_id: world.investor,
        })
        .await
        .unwrap();

    assert!(analytics.is_none());
}

#[tokio::test]
async fn aggregates_provider_activity() {
    let world = World::new().await;
    let active = world.deal().await;
    let idle = world.deal().await;
    let accepted = world
        .request(&active, world.broker, provider::Kind::Broker)
        .await;
    _ = world.request(&idle, world.broker, provider::Kind::Broker).await;
    _ = world
        .service
        .execute(RespondToServiceRequest {
            request_id: accepted.id,
            provider_id: world.broker,
            decision: Decision::Accept,
            response: None,
        })
        .await
        .unwrap();
    _ = world
        .service
        .execute(TransitionDeal {
            deal_id: active.id,
            target: Stage::BrokerAssigned,
            actor_id: world.broker,
            note: None,
        })
        .await
        .unwrap();

    let analytics = world
        .service
        .execute(ProviderAnalytics {
            provider_id: world.broker,
        })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(analytics.total_deals, 1);
    assert_eq!(analytics.active_deals, 1);
    assert_eq!(analytics.completed_deals, 0);
    assert_eq!(analytics.total_requests, 2);
    assert_eq!(analytics.accepted_requests, 1);
    assert_eq!(analytics.pending_requests, 1);
    assert!((analytics.conversion_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(analytics.monthly_trends.len(), 1);
    assert_eq!(analytics.stage_breakdown.len(), 1);
    assert_eq!(analytics.stage_breakdown[0].stage, Stage::BrokerAssigned);
}

#[tokio::test]
async fn ignores_admin_assignments_in_rates() {
    let world = World::new().await;
    let superseded = world.deal().await;
    let direct = world.deal().await;
    let accepted = world.deal().await;
    _ = world
        .request(&superseded, world.other_broker, provider::Kind::Broker)
        .await;
    let req = world
        .request(&accepted, world.other_broker, provider::Kind::Broker)
        .await;
    _ = world
        .service
        .execute(RespondToServiceRequest {
            request_id: req.id,
            provider_id: world.other_broker,
            decision: Decision::Accept,
            response: None,
        })
        .await
        .unwrap();
    for deal in [&superseded, &direct] {
        _ = world
            .service
            .execute(AssignProvider {
                deal_id: deal.id,
                kind: provider::Kind::Broker,
                provider_id: world.broker,
                actor_id: world.admin,
            })
            .await
            .unwrap();
    }

    let analytics = |provider_id| {
        world.service.execute(ProviderAnalytics { provider_id })
    };

    let assigned = analytics(world.broker).await.unwrap().unwrap();
    assert_eq!(assigned.total_deals, 2);
    assert_eq!(assigned.accepted_requests, 2);
    assert!(assigned.conversion_rate.abs() < f64::EPSILON);
    assert!(assigned.avg_response_time_hours.abs() < f64::EPSILON);

    let bypassed = analytics(world.other_broker).await.unwrap().unwrap();
    assert_eq!(bypassed.total_requests, 2);
    assert_eq!(bypassed.accepted_requests, 1);
    assert_eq!(bypassed.pending_requests, 0);
    assert!((bypassed.conversion_rate - 1.0).abs() < f64::EPSILON);
}
