//! Per-recipient dispatch outcome.

use serde::Serialize;

/// Result of one send attempt, produced exactly once per row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    /// Index of the row in the input set.
    pub index: usize,
    pub success: bool,
    /// Recipient address on success, failure reason otherwise.
    pub message: String,
}

impl DispatchOutcome {
    pub fn success(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            success: false,
            message: message.into(),
        }
    }
}
