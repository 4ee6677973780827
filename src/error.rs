//! The crate's single error type.

use std::io;

/// Errors that can be produced by the filesystem core.
///
/// This mirrors the error kinds of the original design, which represented
/// them as negative `errno`-style integer codes. `Access`, `Seek` and
/// `IsDir` are never constructed by this crate; they exist so that a VFS
/// shim built on top of it can report its own POSIX-level failures through
/// the same enum instead of inventing a parallel one.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying driver failed to read or write.
    #[error("driver I/O error: {0}")]
    Io(#[from] io::Error),

    /// No free inode or no free data block is available.
    #[error("no space left on device")]
    NoSpace,

    /// The requested operation is outside what the fixed, direct-indexed
    /// inode layout can represent (write past the maximum file size, write
    /// starting beyond the current size, or read of an unallocated block).
    #[error("unsupported operation")]
    Unsupported,

    /// A path or argument was malformed.
    #[error("invalid argument")]
    Invalid,

    /// The path resolver could not find the requested entry.
    #[error("no such file or directory")]
    NotFound,

    /// The target of a create already exists.
    #[error("file exists")]
    Exists,

    /// Reserved for use by a VFS shim: permission denied.
    #[error("permission denied")]
    Access,

    /// Reserved for use by a VFS shim: invalid seek.
    #[error("invalid seek")]
    Seek,

    /// Reserved for use by a VFS shim: operation not valid on a directory.
    #[error("is a directory")]
    IsDir,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
