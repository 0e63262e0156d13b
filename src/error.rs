//! Discriminated failure kinds for the core diff/patch algorithms.

use thiserror::Error;

/// Everything that can go wrong building a patch, applying one, or parsing
/// a wire-format header.
#[derive(Error, Debug)]
pub enum BsdiffError {
    /// An interior buffer (`I`, `V`, the diff/extra byte buffers, the
    /// output buffer) could not be allocated at the requested size. The
    /// core itself allocates with plain `Vec`/`vec!` and aborts on OOM like
    /// the rest of the standard library; this variant is for envelope
    /// callers that pre-flight a size (e.g. a declared `newsize` from an
    /// untrusted patch header) with a fallible `try_reserve` before handing
    /// the buffer to the core, and want to report that failure through the
    /// same error type rather than a bespoke one.
    #[error("failed to allocate {0} bytes")]
    AllocationFailed(usize),

    /// The sink reported a write failure, or the source returned fewer
    /// bytes than requested.
    #[error("stream I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Control values encode `x < 0` or `y < 0`, applying would overrun
    /// `newsize`, a magic header did not match, or a stream was not a
    /// whole number of control tuples.
    #[error("corrupt patch: {0}")]
    CorruptPatch(String),

    /// `oldsize`/`newsize` were negative, or arithmetic on them would
    /// overflow the platform's native integer width.
    #[error("size overflow: {0}")]
    SizeOverflow(String),
}

pub type Result<T> = std::result::Result<T, BsdiffError>;
