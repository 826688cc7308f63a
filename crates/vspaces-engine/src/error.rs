use std::{io, result::Result as StdResult};

use thiserror::Error;

use crate::model::SlotId;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the vspaces engine.
///
/// Capture and matching failures never surface here; they degrade to partial
/// results and logs. These variants cover persistence and API misuse.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure while writing or reading the store file.
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store could not be encoded for persistence.
    #[error("store encode error: {0}")]
    Encode(#[from] ron::Error),

    /// The store file could not be decoded.
    #[error("store decode error: {0}")]
    Decode(#[from] ron::error::SpannedError),

    /// A slot number outside the supported range was requested.
    #[error("slot {0} out of range")]
    SlotOutOfRange(SlotId),

    /// Nothing is saved under the requested slot.
    #[error("no arrangement saved in slot {0}")]
    NoSuchSlot(SlotId),

    /// The engine actor has shut down.
    #[error("engine channel closed")]
    ChannelClosed,
}
