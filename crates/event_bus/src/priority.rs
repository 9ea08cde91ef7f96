//! Fixed dispatch phases.

use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Dispatch phase of a listener.
///
/// Phases run in declaration order: every `Highest` listener sees an event
/// before any `High` listener, and so on down to `Lowest`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

impl EventPriority {
    /// Every phase, in dispatch order.
    pub const ALL: [EventPriority; 5] = [
        EventPriority::Highest,
        EventPriority::High,
        EventPriority::Normal,
        EventPriority::Low,
        EventPriority::Lowest,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Position in dispatch order, `Highest` being 0.
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventPriority::Highest => "highest",
            EventPriority::High => "high",
            EventPriority::Normal => "normal",
            EventPriority::Low => "low",
            EventPriority::Lowest => "lowest",
        }
    }
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventPriority {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EventError::UnknownPriority(s.to_string()))
    }
}
