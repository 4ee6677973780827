//! The superblock: the fixed numeric parameters and on-disk layout of a
//! mounted volume.

use crate::raw::{as_bytes, from_bytes};

/// Magic number identifying a formatted volume.
pub const MAGIC: u32 = 0x5241_5453;
/// Maximum byte length of a name in a directory entry, and of a symlink's
/// target path.
pub const MAX_NAME_LEN: usize = 128;
/// Maximum number of inodes a volume can hold.
pub const MAX_INODES: u32 = 1024;
/// Number of direct block pointers in an inode.
pub const INODE_DIRECT_BLOCKS: usize = 6;
/// Sentinel value for an unallocated direct block pointer.
pub const NO_BLOCK: i32 = -1;
/// The inode number of the root directory.
pub const ROOT_INO: u32 = 0;

/// On-disk superblock record. `inode_offset` and `data_offset` are not
/// persisted; they are recomputed from the other fields at mount, since
/// they are a pure function of the layout. `map_data_offset` *is*
/// persisted and trusted as-is.
#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
pub(crate) struct RawSuperblock {
    pub magic: u32,
    pub sz_usage: u32,
    pub max_ino: u32,
    pub map_inode_blks: u32,
    pub map_inode_offset: u32,
    pub map_data_blks: u32,
    pub map_data_offset: u32,
    pub data_blks: u32,
}

impl RawSuperblock {
    pub fn to_bytes(self) -> Vec<u8> {
        as_bytes(&self).to_vec()
    }

    pub fn from_bytes(buf: &[u8]) -> Self {
        from_bytes(buf)
    }
}

/// In-memory superblock: the mounted volume's metadata, including the
/// fields recomputed at mount time rather than persisted.
#[derive(Clone)]
pub struct SuperBlock {
    pub io_block: u32,
    pub sz_usage: u32,
    pub max_ino: u32,
    pub map_inode_blks: u32,
    pub map_inode_offset: u64,
    pub map_data_blks: u32,
    pub map_data_offset: u64,
    pub data_blks: u32,
    pub inode_offset: u64,
    pub data_offset: u64,
}

impl SuperBlock {
    /// Computes the layout of a freshly-formatted volume of `disk_size`
    /// bytes, given the filesystem's logical block size `io_block`
    /// (twice the driver's I/O unit).
    pub fn format(disk_size: u64, io_block: u32) -> Self {
        let blk_num = disk_size / io_block as u64;

        let super_blks: u64 = 1;
        let map_inode_blks =
            div_ceil(div_ceil(MAX_INODES as u64, 8), io_block as u64) as u32;
        let inode_blks = MAX_INODES as u64;
        let map_data_blks: u32 = 1;

        let data_blks = blk_num
            - super_blks
            - map_inode_blks as u64
            - inode_blks
            - map_data_blks as u64;

        let map_inode_offset = super_blks * io_block as u64;
        let map_data_offset = map_inode_offset + map_inode_blks as u64 * io_block as u64;
        let inode_offset = map_data_offset + map_data_blks as u64 * io_block as u64;
        let data_offset = inode_offset + inode_blks * io_block as u64;

        Self {
            io_block,
            sz_usage: 0,
            max_ino: MAX_INODES,
            map_inode_blks,
            map_inode_offset,
            map_data_blks,
            map_data_offset,
            data_blks: data_blks as u32,
            inode_offset,
            data_offset,
        }
    }

    /// Rebuilds the in-memory superblock (including the recomputed
    /// inode/data offsets) from an on-disk record that was just read.
    /// `map_data_offset` is trusted from the persisted record rather than
    /// recomputed; only `inode_offset`/`data_offset` are derived.
    pub(crate) fn from_raw(raw: RawSuperblock, io_block: u32) -> Self {
        let map_data_offset = raw.map_data_offset as u64;
        let inode_offset = map_data_offset + raw.map_data_blks as u64 * io_block as u64;
        let data_offset = inode_offset + raw.max_ino as u64 * io_block as u64;

        Self {
            io_block,
            sz_usage: raw.sz_usage,
            max_ino: raw.max_ino,
            map_inode_blks: raw.map_inode_blks,
            map_inode_offset: raw.map_inode_offset as u64,
            map_data_blks: raw.map_data_blks,
            map_data_offset,
            data_blks: raw.data_blks,
            inode_offset,
            data_offset,
        }
    }

    pub(crate) fn to_raw(&self) -> RawSuperblock {
        RawSuperblock {
            magic: MAGIC,
            sz_usage: self.sz_usage,
            max_ino: self.max_ino,
            map_inode_blks: self.map_inode_blks,
            map_inode_offset: self.map_inode_offset as u32,
            map_data_blks: self.map_data_blks,
            map_data_offset: self.map_data_offset as u32,
            data_blks: self.data_blks,
        }
    }

    /// Offset of inode `ino`'s on-disk record.
    pub fn inode_offset(&self, ino: u32) -> u64 {
        self.inode_offset + ino as u64 * self.io_block as u64
    }

    /// Offset of data block `blk`'s contents.
    pub fn data_block_offset(&self, blk: u32) -> u64 {
        self.data_offset + blk as u64 * self.io_block as u64
    }
}

/// Integer ceiling division.
fn div_ceil(value: u64, div: u64) -> u64 {
    (value + div - 1) / div
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_matches_scenario_1() {
        let sb = SuperBlock::format(4 * 1024 * 1024, 1024);
        assert_eq!(sb.map_inode_blks, 1);
        assert_eq!(sb.map_data_blks, 1);
        assert_eq!(sb.data_blks, 4096 - 1 - 1 - 1024 - 1);
    }

    #[test]
    fn raw_roundtrip() {
        let sb = SuperBlock::format(4 * 1024 * 1024, 1024);
        let raw = sb.to_raw();
        let bytes = raw.to_bytes();
        let raw2 = RawSuperblock::from_bytes(&bytes);
        let (magic, data_blks) = (raw2.magic, raw2.data_blks);
        assert_eq!(magic, MAGIC);
        assert_eq!(data_blks, sb.data_blks);
    }
}
