//! Error taxonomy for the command bridge.
//!
//! Every failure the bridge can observe funnels into [`BridgeError`].  None of
//! them propagate out of the control loop: the dispatcher logs the error and
//! skips the offending batch, element or command.  The only way the loop is
//! left is an intentional restart requested by `configureRemote`.
//!
//! All variants are `Copy` so they can be logged and compared without
//! allocation.

use core::fmt;

use crate::app::ports::StorageError;
use crate::link::transport::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// The whole inbound message is not a JSON array of objects.
    /// The batch is dropped and no notification is sent.
    MalformedInput,
    /// One element of a batch could not be decoded (unknown `action` or
    /// wrong field shape).  Only that element is dropped.
    UnknownAction,
    /// A value lies outside its domain.  Numeric values are clamped; string
    /// parameters for a reconfiguration are rejected.
    OutOfRangeValue,
    /// The notification target has no peer attached.  Silently skipped.
    TransportUnavailable,
    /// The persistent store failed to write or commit.  Any restart that
    /// depended on the write is aborted.
    PersistenceFailure,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput => write!(f, "malformed input"),
            Self::UnknownAction => write!(f, "unknown action"),
            Self::OutOfRangeValue => write!(f, "value out of range"),
            Self::TransportUnavailable => write!(f, "transport unavailable"),
            Self::PersistenceFailure => write!(f, "persistence failure"),
        }
    }
}

impl From<StorageError> for BridgeError {
    fn from(_: StorageError) -> Self {
        Self::PersistenceFailure
    }
}

impl From<TransportError> for BridgeError {
    fn from(_: TransportError) -> Self {
        Self::TransportUnavailable
    }
}

/// Bridge-wide `Result` alias.
pub type Result<T> = core::result::Result<T, BridgeError>;
