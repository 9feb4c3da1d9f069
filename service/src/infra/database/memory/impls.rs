//! [`Database`] implementations.

use common::operations::{By, Delete, Insert, Lock, Select, Update};
use tracerr::Traced;

use crate::{
    domain::{
        deal, notification, property, provider, service_request, user,
        Activity, Deal, Notification, Property, ServiceRequest, User,
    },
    infra::{database, Database},
    read::{self, service_request::Pending, Cursor},
};

use super::{Access, Memory};

impl<C: Access> Database<Select<By<Option<User>, user::Id>>> for Memory<C> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| s.users.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<User>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| drop(s.users.insert(user.id, user)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Option<Property>, property::Id>>>
    for Memory<C>
{
    type Ok = Option<Property>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Property>, property::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| s.properties.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Property>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(property): Insert<Property>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| drop(s.properties.insert(property.id, property)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Option<provider::Profile>, user::Id>>>
    for Memory<C>
{
    type Ok = Option<provider::Profile>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<provider::Profile>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let user_id = by.into_inner();
        self.access(|s| s.profiles.get(&user_id).copied())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<provider::Profile>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(profile): Insert<provider::Profile>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| drop(s.profiles.insert(profile.user_id, profile)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Option<Deal>, deal::Id>>> for Memory<C> {
    type Ok = Option<Deal>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Deal>, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| s.deals.get(&id).map(|(_, d)| d.clone()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Deal>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(deal): Insert<Deal>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| {
            let cursor = match s.deals.get(&deal.id) {
                Some((cursor, _)) => *cursor,
                None => s.next_cursor(),
            };
            drop(s.deals.insert(deal.id, (cursor, deal)));
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Lock<By<Deal, deal::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(_): Lock<By<Deal, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Transactions hold the whole `State` lock already, so this only
        // checks the transaction is still alive.
        self.access(|_| ()).await.map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Delete<By<Deal, deal::Id>>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Deal, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| {
            drop(s.deals.remove(&id));
            s.requests.retain(|_, (_, r)| r.deal_id != id);
            s.activities.retain(|_, a| a.deal_id != id);
            s.notifications.retain(|_, n| n.metadata.deal_id != Some(id));
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<read::deal::list::Page, read::deal::list::Selector>>>
    for Memory<C>
{
    type Ok = read::deal::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::deal::list::Page, read::deal::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::deal::list::Selector { arguments, filter } = by.into_inner();
        self.access(|s| {
            let mut deals = s
                .deals
                .values()
                .filter(|(c, d)| {
                    arguments.cursor().map_or(true, |after| c < after)
                        && filter.matches(d)
                })
                .map(|(c, d)| (*c, d.clone()))
                .collect::<Vec<_>>();
            deals.sort_unstable_by(|(a, _), (b, _)| b.cmp(a));
            arguments.paginate(deals)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Select<By<Vec<Deal>, read::deal::list::Filter>>>
    for Memory<C>
{
    type Ok = Vec<Deal>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Deal>, read::deal::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.access(|s| {
            let mut deals = s
                .deals
                .values()
                .filter(|(_, d)| filter.matches(d))
                .collect::<Vec<_>>();
            deals.sort_unstable_by_key(|(c, _)| *c);
            deals.into_iter().map(|(_, d)| d.clone()).collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<Option<ServiceRequest>, service_request::Id>>>
    for Memory<C>
{
    type Ok = Option<ServiceRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<ServiceRequest>, service_request::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| s.requests.get(&id).map(|(_, r)| r.clone()))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<Option<Pending>, (deal::Id, provider::Kind)>>>
    for Memory<C>
{
    type Ok = Option<Pending>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Pending>, (deal::Id, provider::Kind)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (deal_id, kind) = by.into_inner();
        self.access(|s| {
            s.requests
                .values()
                .map(|(_, r)| r)
                .find(|r| {
                    r.deal_id == deal_id
                        && r.provider_kind == kind
                        && r.status == service_request::Status::Pending
                })
                .cloned()
                .map(Pending)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<ServiceRequest>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(req): Insert<ServiceRequest>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| {
            let cursor = match s.requests.get(&req.id) {
                Some((cursor, _)) => *cursor,
                None => s.next_cursor(),
            };
            drop(s.requests.insert(req.id, (cursor, req)));
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<
        Select<
            By<
                read::service_request::list::Page,
                read::service_request::list::Selector,
            >,
        >,
    > for Memory<C>
{
    type Ok = read::service_request::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<
                read::service_request::list::Page,
                read::service_request::list::Selector,
            >,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::service_request::list::Selector { arguments, filter } =
            by.into_inner();
        self.access(|s| {
            let mut reqs = s
                .requests
                .values()
                .filter(|(c, r)| {
                    arguments.cursor().map_or(true, |after| c < after)
                        && filter.matches(r)
                })
                .map(|(c, r)| (*c, r.clone()))
                .collect::<Vec<_>>();
            reqs.sort_unstable_by(|(a, _), (b, _)| b.cmp(a));
            arguments.paginate(reqs)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<
        Select<By<Vec<ServiceRequest>, read::service_request::list::Filter>>,
    > for Memory<C>
{
    type Ok = Vec<ServiceRequest>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<ServiceRequest>, read::service_request::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.access(|s| {
            let mut reqs = s
                .requests
                .values()
                .filter(|(_, r)| filter.matches(r))
                .collect::<Vec<_>>();
            reqs.sort_unstable_by_key(|(c, _)| *c);
            reqs.into_iter().map(|(_, r)| r.clone()).collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Activity>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(activity): Insert<Activity>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| {
            // Activities are immutable once written.
            if s.activities.values().all(|a| a.id != activity.id) {
                let cursor = s.next_cursor();
                drop(s.activities.insert(cursor, activity));
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<
        Select<By<read::activity::list::Page, read::activity::list::Selector>>,
    > for Memory<C>
{
    type Ok = read::activity::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::activity::list::Page, read::activity::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::activity::list::Selector {
            arguments,
            filter: read::activity::list::Filter { deal_id, until },
        } = by.into_inner();
        self.access(|s| {
            let items = s
                .activities
                .iter()
                .filter(|(c, a)| {
                    a.deal_id == deal_id
                        && arguments.cursor().map_or(true, |after| *c > after)
                        && until.map_or(true, |until| **c <= until)
                })
                .map(|(c, a)| (*c, a.clone()));
            arguments.paginate(items)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<read::activity::list::Latest, deal::Id>>>
    for Memory<C>
{
    type Ok = read::activity::list::Latest;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::activity::list::Latest, deal::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deal_id = by.into_inner();
        self.access(|s| {
            read::activity::list::Latest(
                s.activities
                    .iter()
                    .rev()
                    .find(|(_, a)| a.deal_id == deal_id)
                    .map(|(c, _)| *c),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<Option<Notification>, notification::Id>>>
    for Memory<C>
{
    type Ok = Option<Notification>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Notification>, notification::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.access(|s| s.notifications.values().find(|n| n.id == id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Insert<Notification>> for Memory<C> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(mut notification): Insert<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| {
            let existing = s
                .notifications
                .values_mut()
                .find(|n| n.id == notification.id);
            if let Some(stored) = existing {
                notification.is_read |= stored.is_read;
                *stored = notification;
            } else {
                let cursor = s.next_cursor();
                drop(s.notifications.insert(cursor, notification));
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access> Database<Update<notification::AllRead>> for Memory<C> {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(all): Update<notification::AllRead>,
    ) -> Result<Self::Ok, Self::Err> {
        self.access(|s| {
            let mut marked = 0;
            for n in s.notifications.values_mut() {
                if n.recipient_id == all.recipient_id && !n.is_read {
                    n.is_read = true;
                    marked += 1;
                }
            }
            marked
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<
        Select<
            By<
                read::notification::list::Page,
                read::notification::list::Selector,
            >,
        >,
    > for Memory<C>
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
        self.access(|s| {
            let items = s
                .notifications
                .iter()
                .rev()
                .filter(|(c, n)| {
                    n.recipient_id == recipient_id
                        && arguments.cursor().map_or(true, |after| *c < after)
                })
                .map(|(c, n)| (*c, n.clone()));
            arguments.paginate(items)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<C: Access>
    Database<Select<By<read::notification::list::UnreadCount, user::Id>>>
    for Memory<C>
{
    type Ok = read::notification::list::UnreadCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<read::notification::list::UnreadCount, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let recipient_id = by.into_inner();
        self.access(|s| {
            let count = s
                .notifications
                .values()
                .filter(|n| n.recipient_id == recipient_id && !n.is_read)
                .count();
            u32::try_from(count).unwrap_or(u32::MAX).into()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Commit, Insert, Select, Transact},
        Handler as _,
    };

    use crate::{
        domain::{property, user, Deal},
        infra::Memory,
    };

    #[tokio::test]
    async fn discards_uncommitted_changes() {
        let db = Memory::new();
        let deal = Deal::new(property::Id::new(), user::Id::new(), None);

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(deal.clone())).await.unwrap();
        drop(tx);

        let found = db
            .execute(Select(By::<Option<Deal>, _>::new(deal.id)))
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn applies_committed_changes() {
        let db = Memory::new();
        let deal = Deal::new(property::Id::new(), user::Id::new(), None);

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(deal.clone())).await.unwrap();
        tx.execute(Commit).await.unwrap();

        assert!(tx.execute(Commit).await.is_err());
        let found = db
            .execute(Select(By::<Option<Deal>, _>::new(deal.id)))
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some(deal.id));
    }
}
