//! Error taxonomy for the class-file core.

use thiserror::Error;

/// An error which can occur while decoding, encoding, or mutating a class
/// file or its constant pool.
#[derive(Debug, Error)]
pub enum ClassFileError {
    /// The underlying stream ended before a read completed.
    #[error("truncated stream")]
    Truncated,

    /// A generic I/O error from the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A class file's magic number was not `CA FE BA BE`.
    #[error("bad magic number: {0:#010x}")]
    BadMagicNumber(u32),

    /// A constant pool tag byte did not match any known variant.
    #[error("unknown constant pool tag: {0}")]
    UnknownConstantTag(u8),

    /// A constant was read whose `since` version exceeds the file's
    /// declared major version.
    #[error("{variant} requires class file version {since}.0 or later, file declares {actual}.0")]
    VersionTooLow {
        variant: &'static str,
        since: u16,
        actual: u16,
    },

    /// A cross-constant reference resolved to a constant of the wrong kind.
    #[error("constant at index {at_index} is a {actual}, expected {expected}")]
    KindMismatch {
        expected: &'static str,
        actual: &'static str,
        at_index: u16,
    },

    /// A pool index pointed past the end of the pool, or at an unoccupied
    /// (second-half-of-wide) slot.
    #[error("constant pool index {0} has no entry")]
    NoSuchConstant(u16),

    /// The constant pool's fix-up loop made no progress across a full pass.
    #[error("{0} constant(s) could not be resolved: reference graph is malformed or cyclic")]
    UnresolvableReferences(usize),

    /// An attempt was made to overwrite an already-occupied pool slot.
    #[error("constant pool slot {0} is already occupied")]
    SlotOccupied(u16),

    /// An unknown `MethodHandle` reference kind byte.
    #[error("unknown method handle reference kind: {0}")]
    UnknownReferenceKind(u8),

    /// Bad class/field/method access flag bits.
    #[error("bad {0} access flags")]
    BadAccessFlags(&'static str),

    /// A control-flow-terminating instruction was appended to a block
    /// through the ordinary instruction API.
    #[error("illegal instruction: {0}")]
    IllegalInstruction(&'static str),

    /// A field or method descriptor failed to parse. Carries the offending
    /// text verbatim.
    #[error("invalid descriptor: {0:?}")]
    InvalidDescriptor(String),

    /// Expected a UTF-8 constant and found something else.
    #[error("expected a UTF-8 constant")]
    ExpectedUtf8,
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
