//! # averygate core
//!
//! Domain types, traits, and error definitions for the averygate gateway.
//! This crate has **no framework dependencies**: it defines the model that
//! the records client, the completion provider, the session store and the
//! HTTP layer all implement against.
//!
//! ## Layout
//!
//! - [`message`]: turns, roles, session identifiers and the assembled prompt
//! - [`provider`]: the completion backend trait
//! - [`records`]: the tabular record store trait and its query description
//! - [`session`]: the session history storage trait
//! - [`error`]: one error enum per bounded context

pub mod error;
pub mod message;
pub mod provider;
pub mod records;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{CompletionError, Error, RecordError, Result, SessionError};
pub use message::{Prompt, Role, SessionId, Turn};
pub use provider::{Completion, CompletionRequest, ModelParams, Provider};
pub use records::{FieldMap, Filter, RecordStore, TableQuery};
pub use session::{SessionSnapshot, SessionStore};
