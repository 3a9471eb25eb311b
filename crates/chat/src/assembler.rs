//! Prompt assembly.
//!
//! Layout, in order:
//!
//! | Position | Turn | Present |
//! |----------|------|---------|
//! | 1 | Instruction (`system`) | always |
//! | 2 | Enrichment (`system`) | when a record was found |
//! | 3.. | Stored history | as stored, oldest first |
//! | last | New user message | always |
//!
//! Assembly is pure and deterministic. Nothing produced here is stored.

use averygate_core::message::{Prompt, Turn};

/// Build the prompt for one completion call.
pub fn assemble(
    instruction: &str,
    enrichment: Option<Turn>,
    history: &[Turn],
    user_text: &str,
) -> Prompt {
    let mut turns = Vec::with_capacity(history.len() + 3);
    turns.push(Turn::system(instruction));
    turns.extend(enrichment);
    turns.extend_from_slice(history);
    turns.push(Turn::user(user_text));
    Prompt::new(turns)
}
