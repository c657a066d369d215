//! Multiplexor resolution
//!
//! Finds the single multiplexor of a message and groups its multiplexed
//! signals by switch value. Groups are built through an explicit key map,
//! so they do not depend on the order signals are laid out in.

use crate::signals::Message;
use crate::types::ConfigurationError;
use std::collections::BTreeMap;

/// Multiplexor and its dispatch groups, by signal index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiplexLayout {
    /// Index of the multiplexor signal
    pub multiplexor: usize,
    /// Switch value -> indices of the signals present for that value,
    /// in signal order
    pub groups: BTreeMap<u64, Vec<usize>>,
}

/// Resolve the multiplexor of `message`
///
/// Returns `Ok(None)` for messages without multiplexed signals.
pub fn resolve(message: &Message) -> Result<Option<MultiplexLayout>, ConfigurationError> {
    let qualified = message.qualified_name();
    let mut multiplexor: Option<usize> = None;

    for (idx, signal) in message.signals.iter().enumerate() {
        if !signal.is_multiplexor {
            continue;
        }
        if let Some(first) = multiplexor {
            return Err(ConfigurationError::DuplicateMultiplexor {
                message: qualified,
                first: message.signals[first].name.clone(),
                second: signal.name.clone(),
            });
        }
        if signal.is_multiplexed() {
            return Err(ConfigurationError::NestedMultiplexor {
                message: qualified,
                signal: signal.name.clone(),
            });
        }
        if signal.is_floating {
            return Err(ConfigurationError::FloatMultiplexor {
                message: qualified,
                signal: signal.name.clone(),
            });
        }
        multiplexor = Some(idx);
    }

    let mut groups: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (idx, signal) in message.signals.iter().enumerate() {
        if let Some(switch_value) = signal.switch_value {
            groups.entry(switch_value).or_default().push(idx);
        }
    }

    match multiplexor {
        None => match groups.values().flatten().next() {
            Some(&idx) => Err(ConfigurationError::MissingMultiplexor {
                message: qualified,
                signal: message.signals[idx].name.clone(),
            }),
            None => Ok(None),
        },
        Some(idx) if groups.is_empty() => {
            log::warn!(
                "{}: multiplexor '{}' has no multiplexed signals, treating it as a plain signal",
                qualified,
                message.signals[idx].name
            );
            Ok(None)
        }
        Some(idx) => Ok(Some(MultiplexLayout {
            multiplexor: idx,
            groups,
        })),
    }
}
