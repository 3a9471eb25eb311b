//! Session storage implementations for averygate.

pub mod in_memory;

pub use in_memory::{InMemorySessionStore, SessionPolicy};
