//! Marker types tagging [`DateTimeOf`] moments.
//!
//! [`DateTimeOf`]: crate::DateTimeOf

/// Marker of an entity creation.
#[derive(Clone, Copy, Debug)]
pub struct Creation;

/// Marker of an entity modification.
#[derive(Clone, Copy, Debug)]
pub struct Modification;

/// Marker of a response to a request.
#[derive(Clone, Copy, Debug)]
pub struct Response;

/// Marker of an expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;
