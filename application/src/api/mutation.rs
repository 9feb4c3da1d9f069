//! GraphQL [`Mutation`]s definitions.

use common::Money;
use juniper::graphql_object;
use service::{command, domain, Command as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Issues a new `Session` for the specified `User`.
    ///
    /// `User`s are managed by an external directory, so only admins may
    /// issue `Session`s on their behalf.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `UNAUTHORIZED` - the current `User` is not an admin;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createSession",
            otel.name = Self::SPAN_NAME,
            user.id = %user_id,
        ),
    )]
    pub async fn create_session(
        user_id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        if !ctx.current_session().await?.is_admin {
            return Err(ctx.error()(api::PrivilegeError::Forbidden.into()));
        }

        ctx.service()
            .execute(command::CreateUserSession::from(
                domain::user::Id::from(user_id),
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Opens a new `Deal` of the current `User` upon the specified
    /// `Property`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `PROPERTY_NOT_EXISTS` - the `Property` with the specified ID does
    ///                           not exist;
    /// - `NOT_INVESTOR` - the current `User` is not an investor.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createDeal",
            offer_price = ?offer_price,
            otel.name = Self::SPAN_NAME,
            property.id = %property_id,
        ),
    )]
    pub async fn create_deal(
        property_id: api::property::Id,
        offer_price: Option<Money>,
        ctx: &Context,
    ) -> Result<api::Deal, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::CreateDeal {
                property_id: property_id.into(),
                investor_id: my_id.into(),
                offer_price,
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Moves the `Deal` to the specified stage.
    ///
    /// Only the next stage in order or `CANCELLED` is reachable.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` takes no part in the `Deal`;
    /// - `INVALID_TRANSITION` - the stage is unreachable from the current
    ///                          one;
    /// - `ASSIGNMENT_REQUIRED` - the stage requires a provider to be
    ///                           assigned first.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %deal_id,
            gql.name = "transitionDeal",
            otel.name = Self::SPAN_NAME,
            stage = ?stage,
        ),
    )]
    pub async fn transition_deal(
        deal_id: api::deal::Id,
        stage: api::deal::Stage,
        note: Option<api::deal::Note>,
        ctx: &Context,
    ) -> Result<api::Deal, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::TransitionDeal {
                deal_id: deal_id.into(),
                target: stage.into(),
                actor_id: my_id.into(),
                note: note.map(Into::into),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Deletes the `Deal` along with everything attached to it.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` is neither the investor owning
    ///                    the `Deal` nor an admin.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %deal_id,
            gql.name = "deleteDeal",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn delete_deal(
        deal_id: api::deal::Id,
        ctx: &Context,
    ) -> Result<api::Deal, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::DeleteDeal {
                deal_id: deal_id.into(),
                actor_id: my_id.into(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Assigns the provider to the specified role of the `Deal` directly,
    /// bypassing `ServiceRequest`s.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` is not an admin;
    /// - `DEAL_TERMINAL` - the `Deal` is completed or cancelled;
    /// - `NOT_PROVIDER` - the specified `User` is not a provider;
    /// - `PROVIDER_KIND_MISMATCH` - the provider holds another role;
    /// - `ALREADY_ASSIGNED` - the role is taken already.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %deal_id,
            gql.name = "assignProvider",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            provider.id = %provider_id,
        ),
    )]
    pub async fn assign_provider(
        deal_id: api::deal::Id,
        kind: api::service_request::ProviderKind,
        provider_id: api::user::Id,
        ctx: &Context,
    ) -> Result<api::Deal, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::AssignProvider {
                deal_id: deal_id.into(),
                kind: kind.into(),
                provider_id: provider_id.into(),
                actor_id: my_id.into(),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Asks the provider to join the `Deal` of the current `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `DEAL_NOT_EXISTS` - the `Deal` with the specified ID does not exist;
    /// - `UNAUTHORIZED` - the current `User` doesn't own the `Deal`;
    /// - `DEAL_TERMINAL` - the `Deal` is completed or cancelled;
    /// - `NOT_PROVIDER` - the specified `User` is not a provider;
    /// - `PROVIDER_KIND_MISMATCH` - the provider holds another role;
    /// - `ALREADY_ASSIGNED` - the role is taken already;
    /// - `DUPLICATE_PENDING_REQUEST` - another `ServiceRequest` for the role
    ///                                 is still pending.
    #[tracing::instrument(
        skip_all,
        fields(
            deal.id = %deal_id,
            gql.name = "createServiceRequest",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            provider.id = %provider_id,
        ),
    )]
    pub async fn create_service_request(
        deal_id: api::deal::Id,
        provider_id: api::user::Id,
        kind: api::service_request::ProviderKind,
        message: Option<api::service_request::Message>,
        ctx: &Context,
    ) -> Result<api::ServiceRequest, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::CreateServiceRequest {
                deal_id: deal_id.into(),
                investor_id: my_id.into(),
                provider_id: provider_id.into(),
                provider_kind: kind.into(),
                message: message.map(Into::into),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Accepts or declines the `ServiceRequest` addressed to the current
    /// `User`.
    ///
    /// Accepting assigns the current `User` to the `Deal` atomically.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `REQUEST_NOT_EXISTS` - the `ServiceRequest` with the specified ID
    ///                          does not exist;
    /// - `UNAUTHORIZED` - the `ServiceRequest` is addressed to another
    ///                    `User`;
    /// - `ALREADY_RESPONDED` - the `ServiceRequest` is not pending anymore;
    /// - `DEAL_TERMINAL` - accepting into a completed or cancelled `Deal`;
    /// - `ALREADY_ASSIGNED` - the role is taken already.
    #[tracing::instrument(
        skip_all,
        fields(
            decision = ?decision,
            gql.name = "respondToServiceRequest",
            otel.name = Self::SPAN_NAME,
            request.id = %request_id,
        ),
    )]
    pub async fn respond_to_service_request(
        request_id: api::service_request::Id,
        decision: api::service_request::Decision,
        response: Option<api::service_request::Message>,
        ctx: &Context,
    ) -> Result<api::ServiceRequest, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::Retrying(command::RespondToServiceRequest {
                request_id: request_id.into(),
                provider_id: my_id.into(),
                decision: decision.into(),
                response: response.map(Into::into),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Puts a `Notification` into the inbox of the specified `User`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `USER_NOT_EXISTS` - the recipient does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "notify",
            kind = ?kind,
            otel.name = Self::SPAN_NAME,
            recipient.id = %recipient_id,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    pub async fn notify(
        recipient_id: api::user::Id,
        kind: api::notification::Kind,
        title: api::notification::Title,
        message: api::notification::Message,
        link: Option<api::notification::Link>,
        deal_id: Option<api::deal::Id>,
        service_request_id: Option<api::service_request::Id>,
        ctx: &Context,
    ) -> Result<api::Notification, Error> {
        _ = ctx.current_session().await?;

        ctx.service()
            .execute(command::Notify {
                recipient_id: recipient_id.into(),
                kind: kind.into(),
                title: title.into(),
                message: message.into(),
                link: link.map(Into::into),
                metadata: domain::notification::Metadata {
                    deal_id: deal_id.map(Into::into),
                    request_id: service_request_id.map(Into::into),
                },
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks the `Notification` of the current `User` as read.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOTIFICATION_NOT_EXISTS` - the `Notification` with the specified
    ///                               ID does not exist;
    /// - `UNAUTHORIZED` - the `Notification` belongs to another `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markNotificationRead",
            notification.id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_notification_read(
        id: api::notification::Id,
        ctx: &Context,
    ) -> Result<api::Notification, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::MarkNotificationRead {
                notification_id: id.into(),
                user_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Marks every `Notification` of the current `User` as read, returning
    /// the number of `Notification`s affected.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "markAllNotificationsRead",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn mark_all_notifications_read(
        ctx: &Context,
    ) -> Result<i32, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::MarkAllNotificationsRead {
                user_id: my_id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|n| i32::try_from(n).unwrap_or(i32::MAX))
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::create_deal::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PROPERTY_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Property` with the specified ID does not exist"]
                PropertyNotExists,

                #[code = "NOT_INVESTOR"]
                #[status = FORBIDDEN]
                #[message = "Authenticated `User` must be an investor"]
                NotInvestor,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PropertyNotExists(_) => {
                Some(Error::PropertyNotExists.into())
            }
            Self::UserNotInvestor(_) => Some(Error::NotInvestor.into()),
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::transition_deal::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "INVALID_TRANSITION"]
                #[status = CONFLICT]
                #[message = "`Deal` cannot move to the specified stage"]
                InvalidTransition,

                #[code = "ASSIGNMENT_REQUIRED"]
                #[status = CONFLICT]
                #[message = "Stage requires a provider to be assigned first"]
                AssignmentRequired,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => {
                Some(api::query::DealError::NotExists.into())
            }
            Self::InvalidTransition(e) => Some(
                match e {
                    domain::deal::TransitionError::AssignmentRequired {
                        ..
                    } => crate::Error::from(Error::AssignmentRequired),
                    domain::deal::TransitionError::Terminal { .. }
                    | domain::deal::TransitionError::Unreachable { .. }
                    | domain::deal::TransitionError::OutOfOrder { .. } => {
                        Error::InvalidTransition.into()
                    }
                }
                .with_details(e),
            ),
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::delete_deal::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => {
                Some(api::query::DealError::NotExists.into())
            }
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::assign_provider::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyAssigned { .. } => {
                Some(AssignmentError::AlreadyAssigned.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => {
                Some(api::query::DealError::NotExists.into())
            }
            Self::DealTerminal(_) => Some(AssignmentError::DealTerminal.into()),
            Self::ProviderKindMismatch { .. } => {
                Some(AssignmentError::ProviderKindMismatch.into())
            }
            Self::ProviderNotExists(_) => {
                Some(AssignmentError::NotProvider.into())
            }
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::create_service_request::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyAssigned { .. } => {
                Some(AssignmentError::AlreadyAssigned.into())
            }
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => {
                Some(api::query::DealError::NotExists.into())
            }
            Self::DealTerminal(_) => Some(AssignmentError::DealTerminal.into()),
            Self::DuplicatePendingRequest(_) => {
                Some(RequestError::DuplicatePending.into())
            }
            Self::ProviderKindMismatch { .. } => {
                Some(AssignmentError::ProviderKindMismatch.into())
            }
            Self::ProviderNotExists(_) => {
                Some(AssignmentError::NotProvider.into())
            }
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
            Self::UserNotExists(_) => None,
        }
    }
}

impl AsError for command::respond_to_service_request::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::AlreadyAssigned { .. } => {
                Some(AssignmentError::AlreadyAssigned.into())
            }
            Self::AlreadyResponded(_) => Some(
                Error::from(RequestError::AlreadyResponded).with_details(self),
            ),
            Self::Db(e) => e.try_as_error(),
            Self::DealNotExists(_) => {
                Some(api::query::DealError::NotExists.into())
            }
            Self::DealTerminal(_) => Some(AssignmentError::DealTerminal.into()),
            Self::RequestNotExists(_) => {
                Some(api::query::ServiceRequestError::NotExists.into())
            }
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
        }
    }
}

impl AsError for command::notify::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::UserNotExists(_) => {
                Some(api::query::UserError::NotExists.into())
            }
        }
    }
}

impl AsError for command::mark_notification_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "NOTIFICATION_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Notification` with the specified ID does not \
                             exist"]
                NotExists,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::NotificationNotExists(_) => Some(Error::NotExists.into()),
            Self::Unauthorized(_) => {
                Some(api::PrivilegeError::Forbidden.into())
            }
        }
    }
}

impl AsError for command::mark_all_notifications_read::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

define_error! {
    enum AssignmentError {
        #[code = "ALREADY_ASSIGNED"]
        #[status = CONFLICT]
        #[message = "Role is already taken on the `Deal`"]
        AlreadyAssigned,

        #[code = "DEAL_TERMINAL"]
        #[status = CONFLICT]
        #[message = "`Deal` is already completed or cancelled"]
        DealTerminal,

        #[code = "NOT_PROVIDER"]
        #[status = BAD_REQUEST]
        #[message = "Specified `User` is not a provider"]
        NotProvider,

        #[code = "PROVIDER_KIND_MISMATCH"]
        #[status = BAD_REQUEST]
        #[message = "Specified provider holds another role"]
        ProviderKindMismatch,
    }
}

define_error! {
    enum RequestError {
        #[code = "DUPLICATE_PENDING_REQUEST"]
        #[status = CONFLICT]
        #[message = "Another `ServiceRequest` for the role is still pending"]
        DuplicatePending,

        #[code = "ALREADY_RESPONDED"]
        #[status = CONFLICT]
        #[message = "`ServiceRequest` is not pending anymore"]
        AlreadyResponded,
    }
}

#[cfg(test)]
mod error_spec {
    use http::StatusCode;
    use service::{
        command::{respond_to_service_request, transition_deal},
        domain::{
            deal::{Stage, TransitionError},
            provider, service_request,
        },
    };

    use crate::AsError as _;

    #[test]
    fn keeps_stages_of_rejected_transition() {
        let err = transition_deal::ExecutionError::InvalidTransition(
            TransitionError::Unreachable {
                current: Stage::Interest,
                target: Stage::Legal,
            },
        )
        .try_as_error()
        .expect("client error");

        assert_eq!(err.code, "INVALID_TRANSITION");
        assert_eq!(err.status_code, StatusCode::CONFLICT);
        assert!(err.message.contains("`interest`"), "{}", err.message);
        assert!(err.message.contains("`legal`"), "{}", err.message);
    }

    #[test]
    fn keeps_missing_role_of_rejected_transition() {
        let err = transition_deal::ExecutionError::InvalidTransition(
            TransitionError::AssignmentRequired {
                kind: provider::Kind::MortgageAdvisor,
                target: Stage::Mortgage,
            },
        )
        .try_as_error()
        .expect("client error");

        assert_eq!(err.code, "ASSIGNMENT_REQUIRED");
        assert!(err.message.contains("`mortgage`"), "{}", err.message);
        assert!(
            err.message.contains("`mortgage_advisor`"),
            "{}",
            err.message,
        );
    }

    #[test]
    fn keeps_status_of_answered_request() {
        let err = respond_to_service_request::ExecutionError::AlreadyResponded(
            service_request::Status::Declined,
        )
        .try_as_error()
        .expect("client error");

        assert_eq!(err.code, "ALREADY_RESPONDED");
        assert!(err.message.contains("`declined`"), "{}", err.message);
    }
}
