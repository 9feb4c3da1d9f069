mod common;

use service::{
    command::{
        mark_notification_read, notify, MarkAllNotificationsRead,
        MarkNotificationRead, Notify,
    },
    domain::{
        notification::{Kind, Message, Metadata, Title},
        provider, user,
    },
    Command as _,
};

use self::common::World;

fn message(recipient_id: user::Id) -> Notify {
    Notify {
        recipient_id,
        kind: Kind::NewMessage,
        title: Title::new("New message").unwrap(),
        message: Message::new("Are you free tomorrow?").unwrap(),
        link: None,
        metadata: Metadata::default(),
    }
}

#[tokio::test]
async fn never_deduplicates_direct_notifications() {
    let world = World::new().await;

    let first = world.service.execute(message(world.investor)).await.unwrap();
    let second = world.service.execute(message(world.investor)).await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(!first.is_read);
    assert_eq!(world.inbox(world.investor).await.len(), 2);
    assert_eq!(world.unread(world.investor).await, 2);
}

#[tokio::test]
async fn rejects_unknown_recipient() {
    let world = World::new().await;

    let err = world
        .service
        .execute(message(user::Id::new()))
        .await
        .unwrap_err();

    assert!(matches!(
        err.as_ref(),
        notify::ExecutionError::UserNotExists(_),
    ));
}

#[tokio::test]
async fn marks_single_notification_idempotently() {
    let world = World::new().await;
    let n = world.service.execute(message(world.investor)).await.unwrap();

    let err = world
        .service
        .execute(MarkNotificationRead {
            notification_id: n.id,
            user_id: world.broker,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_ref(),
        mark_notification_read::ExecutionError::Unauthorized(_),
    ));

    for _ in 0..2 {
        let read = world
            .service
            .execute(MarkNotificationRead {
                notification_id: n.id,
                user_id: world.investor,
            })
            .await
            .unwrap();
        assert!(read.is_read);
    }
    assert_eq!(world.unread(world.investor).await, 0);
}

#[tokio::test]
async fn marks_everything_read() {
    let world = World::new().await;
    let deal = world.deal().await;
    _ = world.request(&deal, world.broker, provider::Kind::Broker).await;
    for _ in 0..3 {
        _ = world.service.execute(message(world.broker)).await.unwrap();
    }
    _ = world.service.execute(message(world.investor)).await.unwrap();
    assert_eq!(world.unread(world.broker).await, 4);

    let marked = world
        .service
        .execute(MarkAllNotificationsRead {
            user_id: world.broker,
        })
        .await
        .unwrap();

    assert_eq!(marked, 4);
    assert_eq!(world.unread(world.broker).await, 0);
    assert!(world.inbox(world.broker).await.iter().all(|n| n.is_read));
    assert_eq!(world.unread(world.investor).await, 1);

    let marked = world
        .service
        .execute(MarkAllNotificationsRead {
            user_id: world.broker,
        })
        .await
        .unwrap();
    assert_eq!(marked, 0);
}

#[tokio::test]
async fn lists_inbox_newest_first() {
    let world = World::new().await;
    let first = world.service.execute(message(world.investor)).await.unwrap();
    let second = world.service.execute(message(world.investor)).await.unwrap();
    let third = world.service.execute(message(world.investor)).await.unwrap();

    let ids = world
        .inbox(world.investor)
        .await
        .into_iter()
        .map(|n| n.id)
        .collect::<Vec<_>>();

    assert_eq!(ids, [third.id, second.id, first.id]);
}
