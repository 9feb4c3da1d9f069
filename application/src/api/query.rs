//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{domain, query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Deal` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` takes no part in the `Deal`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "deal",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn deal(
        id: api::deal::Id,
        ctx: &Context,
    ) -> Result<api::Deal, Error> {
        let session = ctx.current_session().await?;
        visible_deal(id.into(), &session, ctx).await.map(Into::into)
    }

    /// Returns `Deal`s owned by the current `User`, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "myDeals",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_deals(
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::deal::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let filter = read::deal::list::Filter::Investor(my_id.into());
        deals(filter, first, after, ctx).await
    }

    /// Returns `Deal`s the current `User` is assigned to as a provider,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "providerDeals",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn provider_deals(
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::deal::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let filter = read::deal::list::Filter::Provider(my_id.into());
        deals(filter, first, after, ctx).await
    }

    /// Returns the `ServiceRequest` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `REQUEST_NOT_EXISTS` - the `ServiceRequest` with the specified ID
    ///                          does not exist;
    /// - `UNAUTHORIZED` - the current `User` is neither the investor nor the
    ///                    provider of the `ServiceRequest`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "serviceRequest",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn service_request(
        id: api::service_request::Id,
        ctx: &Context,
    ) -> Result<api::ServiceRequest, Error> {
        let session = ctx.current_session().await?;

        let req = ctx
            .service()
            .execute(query::service_request::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ServiceRequestError::NotExists.into())
            .map_err(ctx.error())?;

        let my_id: domain::user::Id = session.user_id.into();
        if !session.is_admin
            && req.investor_id != my_id
            && req.provider_id != my_id
        {
            return Err(ctx.error()(api::PrivilegeError::Forbidden.into()));
        }

        Ok(req.into())
    }

    /// Returns `ServiceRequest`s made within the specified `Deal`, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` takes no part in the `Deal`;
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            deal.id = %deal_id,
            first = ?first,
            gql.name = "dealServiceRequests",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn deal_service_requests(
        deal_id: api::deal::Id,
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::service_request::list::Connection, Error> {
        let session = ctx.current_session().await?;
        let deal = visible_deal(deal_id.into(), &session, ctx).await?;

        service_requests(
            read::service_request::list::Filter::Deal(deal.id),
            first,
            after,
            ctx,
        )
        .await
    }

    /// Returns `ServiceRequest`s addressed to the current `User`, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "providerServiceRequests",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn provider_service_requests(
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::service_request::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;

        service_requests(
            read::service_request::list::Filter::Provider(my_id.into()),
            first,
            after,
            ctx,
        )
        .await
    }

    /// Returns the activity timeline of the specified `Deal`, oldest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` takes no part in the `Deal`;
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            deal.id = %deal_id,
            first = ?first,
            gql.name = "dealActivity",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn deal_activity(
        deal_id: api::deal::Id,
        first: Option<i32>,
        after: Option<api::activity::list::Cursor>,
        ctx: &Context,
    ) -> Result<api::activity::list::Connection, Error> {
        let session = ctx.current_session().await?;
        let deal = visible_deal(deal_id.into(), &session, ctx).await?;

        api::activity::list::page(deal.id, first, after, ctx).await
    }

    /// Returns the provider assigned to the specified role of the `Deal`, if
    /// any.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` neither takes part in the `Deal`
    ///                    nor is an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %deal_id,
            gql.name = "assignment",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn assignment(
        deal_id: api::deal::Id,
        kind: api::service_request::ProviderKind,
        ctx: &Context,
    ) -> Result<Option<api::User>, Error> {
        let session = ctx.current_session().await?;

        let provider_id = ctx
            .service()
            .execute(query::deal::Assignment {
                deal_id: deal_id.into(),
                kind: kind.into(),
                viewer_id: session.user_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(provider_id.map(|id| {
            #[expect(
                unsafe_code,
                reason = "`Deal` references existing `User`"
            )]
            unsafe {
                api::User::new_unchecked(id)
            }
        }))
    }

    /// Returns the inbox of the current `User`, newest first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_PAGE_SIZE` - `first` is out of `1..=100` range.
    #[tracing::instrument(
        skip_all,
        fields(
            after = ?after,
            first = ?first,
            gql.name = "notifications",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn notifications(
        first: Option<i32>,
        after: Option<api::Cursor>,
        ctx: &Context,
    ) -> Result<api::notification::list::Connection, Error> {
        let my_id = ctx.current_session().await?.user_id;
        let arguments = api::arguments(first, after)
            .map_err(Error::from)
            .map_err(ctx.error())?;

        ctx.service()
            .execute(query::notifications::List::by(
                read::notification::list::Selector {
                    arguments,
                    filter: read::notification::list::Filter {
                        recipient_id: my_id.into(),
                    },
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the number of unread `Notification`s of the current `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "unreadNotificationsCount",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn unread_notifications_count(
        ctx: &Context,
    ) -> Result<i32, Error> {
        let my_id = ctx.current_session().await?.user_id;
        unread_count(my_id.into(), ctx).await
    }

    /// Returns the performance summary of the specified provider, or of the
    /// current `User` if none is specified.
    ///
    /// `null` is returned if the `User` is not a provider.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNAUTHORIZED` - the current `User` is not an admin and asks about
    ///                    another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "providerAnalytics",
            otel.name = Self::SPAN_NAME,
            provider.id = ?provider_id,
        ),
    )]
    pub async fn provider_analytics(
        provider_id: Option<api::user::Id>,
        ctx: &Context,
    ) -> Result<Option<api::analytics::ProviderAnalytics>, Error> {
        let session = ctx.current_session().await?;
        let provider_id = provider_id.unwrap_or(session.user_id);
        if provider_id != session.user_id && !session.is_admin {
            return Err(ctx.error()(api::PrivilegeError::Forbidden.into()));
        }

        ctx.service()
            .execute(query::analytics::ProviderAnalytics {
                provider_id: provider_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|a| a.map(Into::into))
    }
}

/// Loads the [`domain::Deal`] the provided [`Session`] may look at.
///
/// # Errors
///
/// If the [`domain::Deal`] doesn't exist, or the [`Session`] takes no part
/// in it and is not an admin one.
async fn visible_deal(
    id: domain::deal::Id,
    session: &Session,
    ctx: &Context,
) -> Result<domain::Deal, Error> {
    let deal = ctx
        .service()
        .execute(query::deal::ById::by(id))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?
        .ok_or_else(|| DealError::NotExists.into())
        .map_err(ctx.error())?;

    if !session.is_admin && !deal.is_participant(session.user_id.into()) {
        return Err(ctx.error()(api::PrivilegeError::Forbidden.into()));
    }
    Ok(deal)
}

/// Fetches a page of [`domain::Deal`]s matching the provided `filter`.
async fn deals(
    filter: read::deal::list::Filter,
    first: Option<i32>,
    after: Option<api::Cursor>,
    ctx: &Context,
) -> Result<api::deal::list::Connection, Error> {
    let arguments = api::arguments(first, after)
        .map_err(Error::from)
        .map_err(ctx.error())?;

    ctx.service()
        .execute(query::deals::List::by(read::deal::list::Selector {
            arguments,
            filter,
        }))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())
        .map(Into::into)
}

/// Fetches a page of [`domain::ServiceRequest`]s matching the provided
/// `filter`.
async fn service_requests(
    filter: read::service_request::list::Filter,
    first: Option<i32>,
    after: Option<api::Cursor>,
    ctx: &Context,
) -> Result<api::service_request::list::Connection, Error> {
    let arguments = api::arguments(first, after)
        .map_err(Error::from)
        .map_err(ctx.error())?;

    ctx.service()
        .execute(query::service_requests::List::by(
            read::service_request::list::Selector { arguments, filter },
        ))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())
        .map(Into::into)
}

/// Counts unread [`domain::Notification`]s of the provided [`domain::User`].
pub(crate) async fn unread_count(
    user_id: domain::user::Id,
    ctx: &Context,
) -> Result<i32, Error> {
    ctx.service()
        .execute(query::notifications::UnreadCount::by(user_id))
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())
        .map(|count| i32::try_from(u32::from(count)).unwrap_or(i32::MAX))
}

impl AsError for query::deal::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => Some(DealError::NotExists.into()),
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

define_error! {
    enum DealError {
        #[code = "DEAL_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Deal` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum ServiceRequestError {
        #[code = "REQUEST_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`ServiceRequest` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
