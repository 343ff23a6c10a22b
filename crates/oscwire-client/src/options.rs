//! Dispatcher options

use serde::{Deserialize, Serialize};

/// Options shared by the dispatcher and the [`Osc`](crate::Osc) facade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscOptions {
    /// Drop messages whose timetag has already passed instead of delivering
    /// them immediately
    pub discard_late_messages: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert!(!OscOptions::default().discard_late_messages);
    }
}
