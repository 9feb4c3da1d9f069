//! Postgres database client definitions.
//!
//! [`NonTx`] applies each statement on its own. [`Tx`] backs a single
//! command: it runs serializable, so a conflicting concurrent command aborts
//! it with a serialization failure instead of interleaving.

pub mod non_tx;
pub mod tx;

pub use self::{non_tx::NonTx, tx::Tx};
