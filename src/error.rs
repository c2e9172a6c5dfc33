//! Result-code taxonomy shared across the secure-processor simulator.

use core::fmt;

/// Every failure mode the simulator can report. There is no `Success`
/// variant: success is represented by `Ok(_)` per Rust convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecError {
    /// Generic, otherwise-unclassified failure.
    Failure,
    /// A handle (session, key, processor) was invalid or already released.
    InvalidHandle,
    /// Arguments were individually well-formed but inconsistent together.
    InvalidParameters,
    /// An input buffer's length did not match what the operation requires.
    InvalidInputSize,
    /// PKCS#7 padding failed to validate on decrypt.
    InvalidPadding,
    /// The caller's output buffer was too small for the result.
    BufferTooSmall,
    /// No object exists at the requested identifier.
    NoSuchItem,
    /// A generate/provision call targeted an identifier that is already occupied.
    ItemAlreadyProvisioned,
    /// A delete call matched an object, but removal itself failed.
    ItemNonRemovable,
    /// A MAC, signature, or certificate check failed.
    VerificationFailed,
    /// The requested encoding/algorithm/location is recognized but not implemented.
    UnimplementedFeature,
}

impl fmt::Display for SecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failure => write!(f, "failure"),
            Self::InvalidHandle => write!(f, "invalid handle"),
            Self::InvalidParameters => write!(f, "invalid parameters"),
            Self::InvalidInputSize => write!(f, "invalid input size"),
            Self::InvalidPadding => write!(f, "invalid padding"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::NoSuchItem => write!(f, "no such item"),
            Self::ItemAlreadyProvisioned => write!(f, "item already provisioned"),
            Self::ItemNonRemovable => write!(f, "item non-removable"),
            Self::VerificationFailed => write!(f, "verification failed"),
            Self::UnimplementedFeature => write!(f, "unimplemented feature"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SecError {}

pub type SecResult<T> = Result<T, SecError>;
