//! [`Command`] definition.

pub mod assign_provider;
pub mod authorize_user_session;
pub mod create_deal;
pub mod create_service_request;
pub mod create_user_session;
pub mod delete_deal;
pub mod mark_all_notifications_read;
pub mod mark_notification_read;
pub mod notify;
pub mod respond_to_service_request;
pub mod retrying;
pub mod transition_deal;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    assign_provider::AssignProvider,
    authorize_user_session::AuthorizeUserSession, create_deal::CreateDeal,
    create_service_request::CreateServiceRequest,
    create_user_session::CreateUserSession, delete_deal::DeleteDeal,
    mark_all_notifications_read::MarkAllNotificationsRead,
    mark_notification_read::MarkNotificationRead, notify::Notify,
    respond_to_service_request::RespondToServiceRequest, retrying::Retrying,
    transition_deal::TransitionDeal,
};
