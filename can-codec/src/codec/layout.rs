//! Deterministic message and signal ordering

use crate::signals::{Message, Signal};
use crate::types::ConfigurationError;

/// Sort messages ascending by CAN ID
///
/// Two definitions sharing an ID would make top-level dispatch ambiguous.
pub fn sort_messages(messages: &mut [Message]) -> Result<(), ConfigurationError> {
    messages.sort_by_key(|msg| msg.id);
    if let Some(pair) = messages.windows(2).find(|pair| pair[0].id == pair[1].id) {
        return Err(ConfigurationError::DuplicateMessageId(pair[0].id));
    }
    Ok(())
}

/// Sort messages ascending by CAN ID and pull out repeated definitions
///
/// The first declaration of an ID stays in `messages`; every later one is
/// returned, in declaration order.
pub fn take_duplicate_ids(messages: &mut Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(|msg| msg.id);
    let mut kept: Vec<Message> = Vec::with_capacity(messages.len());
    let mut duplicates = Vec::new();
    for message in messages.drain(..) {
        match kept.last() {
            Some(last) if last.id == message.id => duplicates.push(message),
            _ => kept.push(message),
        }
    }
    *messages = kept;
    duplicates
}

/// Sort signals by bit length, widest first, keeping declaration order on ties
pub fn sort_signals(signals: &mut [Signal]) {
    signals.sort_by(|a, b| b.bit_length.cmp(&a.bit_length));
}
