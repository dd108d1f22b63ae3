//! Token estimation utilities.
//!
//! Character heuristic: ~4 characters per token, rounded up. Monotonic in
//! input length and free of any process state, so the same text always
//! costs the same.

use warren_core::message::Message;

/// Fixed cost of a role label and separators around one rendered turn.
pub const MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// Estimate tokens for a single message including per-message overhead.
pub fn estimate_message_tokens(message: &Message) -> usize {
    MESSAGE_OVERHEAD + estimate_tokens(&message.content)
}
