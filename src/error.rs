//! Error types and handling for memframe

/// Result type alias for memframe operations
pub type Result<T> = std::result::Result<T, MemFrameError>;

/// Error types for region layout, discovery and the ownership handshake
#[derive(Debug, thiserror::Error)]
pub enum MemFrameError {
    /// I/O related errors (file operations, mmap, /proc access)
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Invalid parameters or configuration
    #[error("Invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Platform-specific errors
    #[error("Platform error: {message}")]
    Platform { message: String },

    /// No magic-marker pair was found in the scanned memory
    #[error("Discovery found no region ({ranges_scanned} ranges scanned)")]
    DiscoveryNotFound { ranges_scanned: usize },

    /// More than one magic-marker pair was found
    #[error("Discovery is ambiguous: {} candidate regions", candidates.len())]
    DiscoveryAmbiguous { candidates: Vec<u64> },

    /// A magic marker no longer matches at its expected offset
    #[error("Layout corrupt: {field} mismatch at offset {offset:#x}")]
    LayoutCorrupt { field: &'static str, offset: usize },

    /// The ownership byte holds a value outside {0, 128}
    #[error("Invalid ownership value: {value}")]
    InvalidOwnershipValue { value: u8 },

    /// The target process does not exist or cannot be accessed
    #[error("Process {pid} unavailable: {message}")]
    ProcessUnavailable { pid: i32, message: String },

    /// An access falls outside the bounds of a region or range
    #[error("Out of bounds: offset {offset} + length {len} exceeds size {size}")]
    OutOfBounds { offset: usize, len: usize, size: usize },

    /// A frame does not match the agreed payload size
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSizeMismatch { expected: usize, actual: usize },
}

impl MemFrameError {
    /// Create an I/O error from a standard I/O error
    pub fn from_io(source: std::io::Error, context: &str) -> Self {
        Self::Io {
            message: format!("{}: {}", context, source),
            source: Some(source),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }

    /// Create a discovery-not-found error
    pub fn discovery_not_found(ranges_scanned: usize) -> Self {
        Self::DiscoveryNotFound { ranges_scanned }
    }

    /// Create an ambiguous discovery error
    pub fn discovery_ambiguous(candidates: Vec<u64>) -> Self {
        Self::DiscoveryAmbiguous { candidates }
    }

    /// Create a layout corruption error
    pub fn layout_corrupt(field: &'static str, offset: usize) -> Self {
        Self::LayoutCorrupt { field, offset }
    }

    /// Create an invalid ownership value error
    pub fn invalid_ownership(value: u8) -> Self {
        Self::InvalidOwnershipValue { value }
    }

    /// Create a process unavailable error
    pub fn process_unavailable(pid: i32, message: impl Into<String>) -> Self {
        Self::ProcessUnavailable {
            pid,
            message: message.into(),
        }
    }

    /// Create an out of bounds error
    pub fn out_of_bounds(offset: usize, len: usize, size: usize) -> Self {
        Self::OutOfBounds { offset, len, size }
    }

    /// Create a frame size mismatch error
    pub fn frame_size_mismatch(expected: usize, actual: usize) -> Self {
        Self::FrameSizeMismatch { expected, actual }
    }

    /// Whether this error is one of the handshake failures the protocol
    /// cannot recover from (corrupt markers or a foreign ownership value)
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::LayoutCorrupt { .. } | Self::InvalidOwnershipValue { .. }
        )
    }
}

// Convert from common error types
impl From<std::io::Error> for MemFrameError {
    fn from(err: std::io::Error) -> Self {
        Self::from_io(err, "I/O operation failed")
    }
}

impl From<nix::Error> for MemFrameError {
    fn from(err: nix::Error) -> Self {
        Self::platform(format!("System call failed: {}", err))
    }
}
