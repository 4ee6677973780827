//! On-disk and in-memory inode records.

use crate::dentry::DentryId;
use crate::raw::{as_bytes, from_bytes};
use crate::superblock::{INODE_DIRECT_BLOCKS, MAX_NAME_LEN, NO_BLOCK};

/// The type of file a dentry/inode pair names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum FileType {
    File = 0,
    Dir = 1,
    SymLink = 2,
}

impl FileType {
    pub(crate) fn from_u32(v: u32) -> Self {
        match v {
            0 => FileType::File,
            2 => FileType::SymLink,
            // Any other on-disk value (including a directory's `1`) is
            // treated as a directory; a volume produced by this crate
            // never writes anything else, so this only guards against a
            // corrupt or foreign image.
            _ => FileType::Dir,
        }
    }
}

/// On-disk inode record. Must fit within one logical block.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub(crate) struct RawInode {
    pub ino: u32,
    pub size: u32,
    pub ftype: u32,
    pub dir_cnt: u32,
    pub block_pointer: [i32; INODE_DIRECT_BLOCKS],
    pub target_path: [u8; MAX_NAME_LEN],
}

impl RawInode {
    pub fn to_bytes(self) -> Vec<u8> {
        as_bytes(&self).to_vec()
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        from_bytes(buf)
    }
}

/// In-memory inode: the hydrated, mutable counterpart of a [`RawInode`].
pub struct Inode {
    pub ino: u32,
    pub size: u32,
    pub ftype: FileType,
    pub dir_cnt: u32,
    pub block_pointer: [i32; INODE_DIRECT_BLOCKS],
    pub target_path: [u8; MAX_NAME_LEN],
    /// The dentry that names this inode.
    pub self_dentry: DentryId,
    /// Head of this directory's child dentry chain. `None` for files and
    /// symlinks, and for directories not yet populated with children.
    pub children: Option<DentryId>,
}

impl Inode {
    /// Creates a freshly-allocated, empty inode bound to `self_dentry`.
    pub fn new(ino: u32, ftype: FileType, self_dentry: DentryId) -> Self {
        Self {
            ino,
            size: 0,
            ftype,
            dir_cnt: 0,
            block_pointer: [NO_BLOCK; INODE_DIRECT_BLOCKS],
            target_path: [0; MAX_NAME_LEN],
            self_dentry,
            children: None,
        }
    }

    pub(crate) fn to_raw(&self) -> RawInode {
        RawInode {
            ino: self.ino,
            size: self.size,
            ftype: self.ftype as u32,
            dir_cnt: self.dir_cnt,
            block_pointer: self.block_pointer,
            target_path: self.target_path,
        }
    }

    pub(crate) fn from_raw(raw: RawInode, self_dentry: DentryId) -> Self {
        Self {
            ino: raw.ino,
            size: raw.size,
            ftype: FileType::from_u32(raw.ftype),
            dir_cnt: raw.dir_cnt,
            block_pointer: raw.block_pointer,
            target_path: raw.target_path,
            self_dentry,
            children: None,
        }
    }

    /// Maximum file size representable by the six direct block pointers.
    pub fn max_size(io_block: u32) -> u32 {
        io_block * INODE_DIRECT_BLOCKS as u32
    }
}
