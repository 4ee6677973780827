//! A small, educational block-based filesystem core.
//!
//! This crate implements the on-disk layout, allocation and path-resolution
//! logic of a single-directory-level, direct-indexed filesystem: a fixed
//! superblock, two bitmaps (inode and data), a flat inode table and a data
//! region, all laid out contiguously and aligned to the filesystem's
//! logical block size. It does not include a VFS shim, a FUSE binding or a
//! command-line tool; it is the mountable core those would be built on.
//!
//! The entry point is [`Filesystem::mount`], given a [`MountOptions`]
//! wrapping any [`BlockDriver`]. [`testing::MemDriver`] and
//! [`testing::FileDriver`] are provided for exercising a mount without a
//! real block device.

mod bitmap;
mod dentry;
mod driver;
mod error;
mod fs;
mod inode;
mod path;
mod raw;
mod superblock;
pub mod testing;

pub use dentry::{Dentry, DentryId};
pub use driver::{BlockDriver, DriverIo};
pub use error::{Error, Result};
pub use fs::{Filesystem, LookupResult, MountOptions};
pub use inode::{FileType, Inode};
pub use path::{calc_lvl, get_fname};
pub use superblock::{INODE_DIRECT_BLOCKS, MAGIC, MAX_INODES, MAX_NAME_LEN, NO_BLOCK, ROOT_INO};
