//! GraphQL [`Subscription`]s definitions.

use common::DateTime;
use futures::{
    stream::{self, BoxStream},
    FutureExt as _, StreamExt as _,
};
use juniper::graphql_subscription;
use service::{domain, query, Query as _};
use tokio::time;

use crate::{context, AsError, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

impl Subscription {
    /// Name of the [`tracing::Span`] for the subscriptions.
    const SPAN_NAME: &'static str = "GraphQL subscription";
}

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Subscription waiting for the current authenticated session to expire.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired.
    pub async fn wait_session(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<bool, Error>>, Error> {
        let session = ctx.current_session().await?;
        let timeout = session.expires_at - DateTime::now();
        Ok(stream::once(
            tokio::time::sleep(timeout).map(|()| {
                Err(context::AuthError::AuthorizationRequired.into())
            }),
        )
        .boxed())
    }

    /// Number of unread `Notification`s of the current `User`.
    ///
    /// Emits the current number right away, and then every time it changes.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - if the current session is not
    ///                              authenticated or session expired.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "unreadNotificationsCount",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn unread_notifications_count(
        &self,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<i32, Error>>, Error> {
        let user_id: domain::user::Id =
            ctx.current_session().await?.user_id.into();
        let service = ctx.service().clone();
        let interval = time::interval(ctx.poll_interval());

        Ok(stream::unfold(
            (service, interval, None),
            move |(service, mut interval, last)| async move {
                loop {
                    _ = interval.tick().await;

                    let count = service
                        .execute(query::notifications::UnreadCount::by(user_id))
                        .await
                        .map_err(AsError::into_error)
                        .map(|n| {
                            i32::try_from(u32::from(n)).unwrap_or(i32::MAX)
                        });
                    match count {
                        Ok(n) if Some(n) == last => {}
                        Ok(n) => {
                            return Some((Ok(n), (service, interval, Some(n))));
                        }
                        Err(e) => {
                            return Some((Err(e), (service, interval, last)));
                        }
                    }
                }
            },
        )
        .boxed())
    }
}
