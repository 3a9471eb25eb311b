//! Records service client for averygate.
//!
//! [`AirtableStore`] implements `averygate_core::RecordStore` over the
//! Airtable REST API. [`RecordsClient`] layers the named lookups the
//! gateway exposes on top of any `RecordStore`, so they can be exercised
//! against an in-memory store in tests.

pub mod airtable;
pub mod fields;
pub mod lookups;

pub use airtable::AirtableStore;
pub use lookups::{ConversationSummary, FromFields, RecordsClient, UserProgress, tables};
