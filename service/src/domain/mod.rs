//! Domain definitions.

pub mod activity;
pub mod deal;
pub mod notification;
pub mod property;
pub mod provider;
pub mod service_request;
pub mod user;

pub use self::{
    activity::Activity, deal::Deal, notification::Notification,
    property::Property, service_request::ServiceRequest, user::User,
};
