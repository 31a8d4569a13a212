//! Error types for operator slots and dispatch.

use thiserror::Error;
use topology::MeshError;

use crate::slot::SlotType;

/// Recoverable operator errors.
///
/// Usage errors (wrong lifecycle state, unknown slot code, unknown opcode on
/// init) are not represented here; they panic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    #[error("slot '{slot}' holds {expected:?}, not {found:?}")]
    SlotTypeMismatch {
        slot: &'static str,
        expected: SlotType,
        found: SlotType,
    },

    #[error("invalid value in slot '{slot}': {reason}")]
    InvalidArgument { slot: &'static str, reason: String },

    #[error("unknown operator opcode {0}")]
    UnknownOperator(u32),

    #[error(transparent)]
    Topology(#[from] MeshError),
}

impl OpError {
    pub(crate) fn invalid(slot: &'static str, reason: impl Into<String>) -> Self {
        OpError::InvalidArgument {
            slot,
            reason: reason.into(),
        }
    }
}
