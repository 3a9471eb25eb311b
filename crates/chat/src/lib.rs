//! The chat flow: the heart of averygate.
//!
//! One request walks a fixed pipeline:
//!
//! 1. **Resolve** the session (fresh id, known id, or unknown id preserved)
//! 2. **Enrich** with a one-shot summary of the caller's record data
//! 3. **Assemble** the ordered prompt
//! 4. **Complete** through the configured provider
//! 5. **Update** the session with the user turn and any non-empty reply
//!
//! There are no retries and no loops: each request makes at most one record
//! lookup and one completion call.

pub mod assembler;
pub mod enricher;
pub mod service;
pub mod stage;

#[cfg(test)]
mod test_helpers;

pub use assembler::assemble;
pub use enricher::{ContextEnricher, format_user_data};
pub use service::{ChatReply, ChatRequest, ChatService};
pub use stage::ChatStage;
