mod common;

use ::common::pagination::Arguments;
use service::{
    demo,
    domain::{activity, notification, Activity, Deal, Notification},
    query, read, Command as _,
};

use self::common::World;

async fn inboxes(world: &World) -> Vec<Notification> {
    let mut all = vec![];
    for user_id in demo::user_ids() {
        all.extend(world.inbox(user_id).await);
    }
    all
}

async fn deals(world: &World) -> Vec<Deal> {
    let mut all = vec![];
    for user_id in demo::user_ids() {
        let page = world
            .service
            .execute(query::deals::List::by(read::deal::list::Selector {
                arguments: Arguments::first(100),
                filter: read::deal::list::Filter::Investor(user_id),
            }))
            .await
            .unwrap();
        all.extend(page.into_nodes());
    }
    all
}

async fn activities(world: &World, deals: &[Deal]) -> Vec<Activity> {
    let mut all = vec![];
    for deal in deals {
        let page = world
            .service
            .execute(query::activity::Timeline::by(
                read::activity::snapshot::Selector {
                    arguments: Arguments::first(100),
                    filter: deal.id,
                },
            ))
            .await
            .unwrap();
        all.extend(page.into_nodes());
    }
    all
}

#[tokio::test]
async fn seeds_every_kind_of_record() {
    let world = World::new().await;

    demo::seed(&world.service).await.unwrap();

    let notifications = inboxes(&world).await;
    for kind in notification::Kind::ALL {
        assert!(
            notifications.iter().any(|n| n.kind == *kind),
            "no `{kind}` notification seeded",
        );
    }

    let deals = deals(&world).await;
    assert_eq!(deals.len(), 3);
    let activities = activities(&world, &deals).await;
    for kind in activity::Kind::ALL {
        assert!(
            activities.iter().any(|a| a.details.kind() == *kind),
            "no `{kind}` activity seeded",
        );
    }
}

#[tokio::test]
async fn seeds_only_once() {
    let world = World::new().await;
    demo::seed(&world.service).await.unwrap();
    let notified = inboxes(&world).await.len();
    let deals_before = deals(&world).await;
    let logged = activities(&world, &deals_before).await.len();

    demo::seed(&world.service).await.unwrap();

    let deals_after = deals(&world).await;
    assert_eq!(deals_after.len(), deals_before.len());
    assert_eq!(inboxes(&world).await.len(), notified);
    assert_eq!(activities(&world, &deals_after).await.len(), logged);
}
