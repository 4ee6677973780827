//! The in-memory dentry tree.
//!
//! Dentries live in a flat, append-only arena (there is no unlink in this
//! core, so nothing is ever freed). A [`DentryId`] is simply the dentry's
//! index in that arena, standing in for the pointer the original design
//! used for `parent`/`brother`/`self_dentry` back-references.

use crate::inode::FileType;
use crate::raw::{as_bytes, from_bytes};
use crate::superblock::MAX_NAME_LEN;

/// Index of a dentry within a [`crate::Filesystem`]'s arena.
pub type DentryId = usize;

/// An in-memory directory entry.
pub struct Dentry {
    pub name: String,
    pub ino: u32,
    pub ftype: FileType,
    pub parent: Option<DentryId>,
    /// Next sibling in the parent's head-inserted child chain.
    pub next_sibling: Option<DentryId>,
}

impl Dentry {
    pub fn new(name: impl Into<String>, ftype: FileType, parent: Option<DentryId>) -> Self {
        Self {
            name: name.into(),
            ino: 0,
            ftype,
            parent,
            next_sibling: None,
        }
    }

    /// Length-bounded name comparison, as used by the path resolver: two
    /// names match if they agree over the length of `query`.
    pub fn name_matches(&self, query: &str) -> bool {
        let name_bytes = self.name.as_bytes();
        let query_bytes = query.as_bytes();
        query_bytes.len() <= name_bytes.len() && name_bytes[..query_bytes.len()] == *query_bytes
    }
}

/// On-disk directory entry record, as packed into a directory's data
/// blocks.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub(crate) struct RawDentry {
    pub fname: [u8; MAX_NAME_LEN],
    pub ftype: u32,
    pub ino: u32,
    /// Reserved for tombstoning; always written as `1` and ignored on
    /// read, since this core never deletes directory entries.
    pub valid: u32,
}

impl RawDentry {
    pub fn to_bytes(self) -> Vec<u8> {
        as_bytes(&self).to_vec()
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        from_bytes(buf)
    }

    pub fn from_dentry(dentry: &Dentry) -> Self {
        let mut fname = [0u8; MAX_NAME_LEN];
        let bytes = dentry.name.as_bytes();
        let len = bytes.len().min(MAX_NAME_LEN);
        fname[..len].copy_from_slice(&bytes[..len]);

        Self {
            fname,
            ftype: dentry.ftype as u32,
            ino: dentry.ino,
            valid: 1,
        }
    }
}
