//! Wire types for hubrun.
//!
//! This crate contains the serde-serializable types exchanged between the
//! hubrun client and a hub. They describe what a batch looks like, which
//! events a batch emits while agents run it, and the envelopes that carry
//! requests, responses and notifications over the connection.
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond decoding and a few shape predicates
//! - **Stable**: Changes only when the client↔hub messages change
//!
//! Orchestration built on top of these types lives in the `hubrun` crate.

pub mod batch;
pub mod event;
pub mod message;
pub mod result;

pub use batch::*;
pub use event::*;
pub use message::*;
pub use result::*;
