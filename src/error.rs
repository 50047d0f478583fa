//! Error types for the placement simulator.
//!
//! Every operation that can violate a memory-model precondition returns a
//! typed error instead of corrupting state. Only configuration errors are
//! meant to stop a caller; the rest are reported and the simulation moves on.
//!
//! # Examples
//!
//! ```rust
//! use fitsim::{Error, Result};
//!
//! fn check_request(requested: usize, capacity: usize) -> Result<()> {
//!     if requested > capacity {
//!         return Err(Error::PlacementFailed { requested });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_request(40, 32).is_err());
//! ```

use crate::process::ProcessId;

/// Main error type for the crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Target range or block is already owned.
    #[error("range starting at {start} (length {length}) is already occupied")]
    AlreadyOccupied {
        /// First unit (or block index) of the rejected range.
        start: usize,
        /// Requested length.
        length: usize,
    },

    /// Free of a range that is not (fully) occupied.
    #[error("range starting at {start} (length {length}) is not resident")]
    NotResident {
        /// First unit of the rejected range.
        start: usize,
        /// Requested length.
        length: usize,
    },

    /// No block is owned by the process.
    #[error("no block owned by process {0}")]
    OwnerNotFound(ProcessId),

    /// Range runs past the end of memory.
    #[error("range {start}..{end} exceeds capacity {capacity}")]
    OutOfBounds {
        /// First unit of the range.
        start: usize,
        /// One past the last unit of the range.
        end: usize,
        /// Memory capacity.
        capacity: usize,
    },

    /// Block is smaller than the request.
    #[error("block of {size} units cannot hold {requested} units")]
    BlockTooSmall {
        /// Block size.
        size: usize,
        /// Requested size.
        requested: usize,
    },

    /// Block index does not exist.
    #[error("block {0} does not exist")]
    InvalidBlock(usize),

    /// No process at this position of the process table.
    #[error("no process at index {0}")]
    UnknownProcess(usize),

    /// The strategy found no region for the request.
    #[error("no free region can hold {requested} units")]
    PlacementFailed {
        /// Requested size.
        requested: usize,
    },

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the simulation continues normally after this error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fitsim::Error;
    ///
    /// assert!(Error::PlacementFailed { requested: 8 }.is_recoverable());
    /// assert!(!Error::config("capacity must be positive").is_recoverable());
    /// ```
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::PlacementFailed { .. } | Self::OwnerNotFound(_))
    }

    /// Get error code for logging.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AlreadyOccupied { .. } => "ALREADY_OCCUPIED",
            Self::NotResident { .. } => "NOT_RESIDENT",
            Self::OwnerNotFound(_) => "OWNER_NOT_FOUND",
            Self::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            Self::BlockTooSmall { .. } => "BLOCK_TOO_SMALL",
            Self::InvalidBlock(_) => "INVALID_BLOCK",
            Self::UnknownProcess(_) => "UNKNOWN_PROCESS",
            Self::PlacementFailed { .. } => "PLACEMENT_FAILED",
            Self::Config(_) => "CONFIG",
        }
    }
}

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;
