//! Error types for nresolv
//!
//! Every failure inside the resolver is a [`ResolveError`]. Callers that need
//! the classic netdb view reduce it with [`ResolveError::status`] to one of the
//! five [`NetdbStatus`] outcomes.

use std::io;

/// Result type alias using the resolver error
pub type Result<T> = core::result::Result<T, ResolveError>;

/// Internal resolver failure
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No source knows the name or address
    #[error("host not found")]
    NotFound,

    /// Transient failure reported by a transport; the caller may retry
    #[error("temporary failure in name resolution")]
    TryAgain,

    /// Wire data inconsistent with its own declared lengths
    #[error("malformed response: {0}")]
    Malformed(&'static str),

    /// A well-formed answer that contained no usable record
    #[error("no usable answer records")]
    NoAnswer,

    /// The caller's buffer cannot hold the assembled record
    #[error("result buffer exhausted")]
    BufferExhausted,

    #[error("address family {0} not supported")]
    UnsupportedFamily(i32),

    #[error("address length {got} does not match family (expected {expected})")]
    InvalidAddressLength { expected: usize, got: usize },

    /// The proxy channel could not be opened
    #[error("resolver proxy unavailable")]
    TransportUnavailable,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ResolveError {
    /// Reduce to the externally visible outcome
    pub fn status(&self) -> NetdbStatus {
        match self {
            ResolveError::NotFound => NetdbStatus::HostNotFound,
            ResolveError::TryAgain => NetdbStatus::TryAgain,
            ResolveError::Malformed(_) | ResolveError::NoAnswer => NetdbStatus::NoRecovery,
            ResolveError::BufferExhausted
            | ResolveError::UnsupportedFamily(_)
            | ResolveError::InvalidAddressLength { .. }
            | ResolveError::TransportUnavailable
            | ResolveError::Io(_) => NetdbStatus::Internal,
        }
    }

    /// errno companion for `Internal` outcomes, 0 otherwise
    pub fn errno(&self) -> i32 {
        match self {
            ResolveError::BufferExhausted => libc::ERANGE,
            ResolveError::UnsupportedFamily(_) => libc::EAFNOSUPPORT,
            ResolveError::InvalidAddressLength { .. } => libc::EINVAL,
            ResolveError::TransportUnavailable => libc::ECONNREFUSED,
            ResolveError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
            _ => 0,
        }
    }

    /// Whether the dispatcher may move on to the next source
    pub(crate) fn is_miss(&self) -> bool {
        matches!(
            self,
            ResolveError::NotFound | ResolveError::NoAnswer | ResolveError::Malformed(_)
        )
    }
}

// ============================================================================
// h_errno values
// ============================================================================

pub const NETDB_INTERNAL: i32 = -1;
pub const NETDB_SUCCESS: i32 = 0;
pub const HOST_NOT_FOUND: i32 = 1;
pub const TRY_AGAIN: i32 = 2;
pub const NO_RECOVERY: i32 = 3;
pub const NO_DATA: i32 = 4;

/// Five-value outcome of a host lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetdbStatus {
    Success,
    HostNotFound,
    TryAgain,
    NoRecovery,
    /// Out of space or another local failure; see [`ResolveError::errno`]
    Internal,
}

impl NetdbStatus {
    /// Classic h_errno value
    pub const fn as_raw(self) -> i32 {
        match self {
            NetdbStatus::Success => NETDB_SUCCESS,
            NetdbStatus::HostNotFound => HOST_NOT_FOUND,
            NetdbStatus::TryAgain => TRY_AGAIN,
            NetdbStatus::NoRecovery => NO_RECOVERY,
            NetdbStatus::Internal => NETDB_INTERNAL,
        }
    }
}

/// Convert an h_errno value to a static message
pub fn hstrerror_str(code: i32) -> &'static str {
    match code {
        NETDB_SUCCESS => "Success",
        NETDB_INTERNAL => "Resolver internal error",
        HOST_NOT_FOUND => "Unknown host",
        TRY_AGAIN => "Host name lookup failure",
        NO_RECOVERY => "Unknown server error",
        NO_DATA => "No address associated with name",
        _ => "Unknown resolver error",
    }
}
