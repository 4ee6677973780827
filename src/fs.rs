//! The mount/umount orchestrator and the core operations it exposes to a
//! VFS shim built on top of this crate.

use std::collections::HashMap;
use std::mem::size_of;

use log::{debug, info, warn};

use crate::bitmap::Bitmap;
use crate::dentry::{Dentry, DentryId, RawDentry};
use crate::driver::{BlockDriver, DriverIo};
use crate::error::{Error, Result};
use crate::inode::{FileType, Inode, RawInode};
use crate::path::calc_lvl;
use crate::superblock::{RawSuperblock, SuperBlock, INODE_DIRECT_BLOCKS, MAGIC, NO_BLOCK, ROOT_INO};

/// Options describing how to mount a volume.
///
/// Mirrors the source's `custom_options`: today the only thing a caller
/// supplies is the already-open driver. The struct exists (rather than
/// taking the driver as a bare parameter to `mount`) so that later options
/// — a read-only flag, say — can be added without an API break.
pub struct MountOptions<D> {
    pub driver: D,
}

impl<D> MountOptions<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }
}

/// The result of resolving a path (§ path resolver).
pub struct LookupResult {
    pub dentry: DentryId,
    pub found: bool,
    pub is_root: bool,
}

struct Bitmaps {
    inode: Bitmap,
    data: Bitmap,
}

/// A mounted volume.
///
/// Owns every piece of state the original design kept in a process-wide
/// global superblock: the bitmaps, the dentry arena and the hydrated-inode
/// cache. Dropping (or calling [`unmount`](Filesystem::unmount) on) a
/// `Filesystem` is the only way to end a mount, so there is no separate
/// "is mounted" flag to get out of sync.
pub struct Filesystem<D: BlockDriver> {
    driver: DriverIo<D>,
    super_block: SuperBlock,
    bitmaps: Bitmaps,
    dentries: Vec<Dentry>,
    inodes: HashMap<u32, Inode>,
    root: DentryId,
}

impl<D: BlockDriver> Filesystem<D> {
    /// Mounts `options.driver`, formatting it first if it does not already
    /// carry a valid superblock.
    pub fn mount(options: MountOptions<D>) -> Result<Self> {
        let mut driver = DriverIo::new(options.driver)?;
        let disk_size = driver.device_size()?;
        let io_block = (driver.io_size() * 2) as u32;

        let mut raw_buf = vec![0u8; size_of::<RawSuperblock>()];
        driver.read(0, &mut raw_buf)?;
        let raw_super = RawSuperblock::from_bytes(&raw_buf);
        let magic = raw_super.magic;

        let mut dentries = Vec::new();
        let root = dentries.len();
        dentries.push(Dentry::new("/", FileType::Dir, None));

        let (super_block, is_init) = if magic != MAGIC {
            info!("formatting volume: disk_size={disk_size} io_block={io_block}");
            (SuperBlock::format(disk_size, io_block), true)
        } else {
            info!("mounting existing volume: io_block={io_block}");
            (SuperBlock::from_raw(raw_super, io_block), false)
        };

        let inode_bitmap_len = (super_block.map_inode_blks * io_block) as usize;
        let data_bitmap_len = (super_block.map_data_blks * io_block) as usize;
        let mut bitmaps = Bitmaps {
            inode: Bitmap::new(inode_bitmap_len),
            data: Bitmap::new(data_bitmap_len),
        };

        let mut inode_bits = vec![0u8; inode_bitmap_len];
        driver.read(super_block.map_inode_offset, &mut inode_bits)?;
        bitmaps.inode.load(&inode_bits);

        let mut data_bits = vec![0u8; data_bitmap_len];
        driver.read(super_block.map_data_offset, &mut data_bits)?;
        bitmaps.data.load(&data_bits);

        let mut fs = Self {
            driver,
            super_block,
            bitmaps,
            dentries,
            inodes: HashMap::new(),
            root,
        };

        if is_init {
            let ino = fs.alloc_inode(root)?;
            debug_assert_eq!(ino, ROOT_INO);
            fs.sync_inode(ino)?;
        }

        fs.read_inode(root, ROOT_INO)?;

        Ok(fs)
    }

    /// Flushes the dentry tree and bitmaps to disk and consumes the
    /// handle, releasing the driver.
    pub fn unmount(mut self) -> Result<()> {
        let root_ino = self.dentries[self.root].ino;
        self.sync_inode(root_ino)?;

        let raw = self.super_block.to_raw();
        self.driver.write(0, &raw.to_bytes())?;
        self.driver
            .write(self.super_block.map_inode_offset, self.bitmaps.inode.as_bytes())?;
        self.driver
            .write(self.super_block.map_data_offset, self.bitmaps.data.as_bytes())?;

        info!("unmounted volume");
        Ok(())
    }

    /// The root dentry's id.
    pub fn root(&self) -> DentryId {
        self.root
    }

    /// Borrows the dentry at `id`.
    pub fn dentry(&self, id: DentryId) -> &Dentry {
        &self.dentries[id]
    }

    /// Borrows the hydrated inode `ino`, if loaded.
    pub fn inode(&self, ino: u32) -> Result<&Inode> {
        self.inodes.get(&ino).ok_or(Error::Invalid)
    }

    /// Creates a new, unattached dentry named `name` under `parent`. The
    /// caller must still call [`alloc_inode`](Filesystem::alloc_inode) and
    /// [`alloc_dentry`](Filesystem::alloc_dentry) to give it an inode and
    /// attach it to the tree.
    pub fn new_dentry(&mut self, name: &str, ftype: FileType, parent: DentryId) -> DentryId {
        let id = self.dentries.len();
        self.dentries.push(Dentry::new(name, ftype, Some(parent)));
        id
    }

    /// Allocates a free inode number and binds it to `dentry`, creating the
    /// in-memory [`Inode`].
    pub fn alloc_inode(&mut self, dentry: DentryId) -> Result<u32> {
        let ino = self.bitmaps.inode.alloc_first_free(self.super_block.max_ino)?;
        let ftype = self.dentries[dentry].ftype;
        self.dentries[dentry].ino = ino;
        self.inodes.insert(ino, Inode::new(ino, ftype, dentry));
        debug!("alloc_inode -> {ino}");
        Ok(ino)
    }

    /// Head-inserts `child` into `parent_ino`'s child chain and increments
    /// its `dir_cnt`. `parent_ino` must name a hydrated directory inode.
    pub fn alloc_dentry(&mut self, parent_ino: u32, child: DentryId) -> Result<()> {
        let parent = self.inodes.get_mut(&parent_ino).ok_or(Error::Invalid)?;
        self.dentries[child].next_sibling = parent.children;
        parent.children = Some(child);
        parent.dir_cnt += 1;
        Ok(())
    }

    /// Same head-insert as [`alloc_dentry`](Filesystem::alloc_dentry), but
    /// without touching `dir_cnt`: used while hydrating a directory whose
    /// `dir_cnt` already reflects the on-disk truth.
    fn link_child(&mut self, parent_ino: u32, child: DentryId) -> Result<()> {
        let parent = self.inodes.get_mut(&parent_ino).ok_or(Error::Invalid)?;
        self.dentries[child].next_sibling = parent.children;
        parent.children = Some(child);
        Ok(())
    }

    /// Returns the `i`-th child of `parent_ino`'s child chain, in chain
    /// (head-insert) order.
    pub fn get_dentry(&self, parent_ino: u32, index: usize) -> Option<DentryId> {
        let mut cursor = self.inode(parent_ino).ok()?.children;
        let mut i = 0;
        while let Some(id) = cursor {
            if i == index {
                return Some(id);
            }
            i += 1;
            cursor = self.dentries[id].next_sibling;
        }
        None
    }

    /// Reads inode `ino`'s on-disk record into the hydration cache, binding
    /// it to `dentry`. For a directory, also hydrates its immediate
    /// children (but not their own children — lazy).
    pub fn read_inode(&mut self, dentry: DentryId, ino: u32) -> Result<()> {
        let mut buf = vec![0u8; size_of::<RawInode>()];
        let offset = self.super_block.inode_offset(ino);
        self.driver.read(offset, &mut buf)?;
        let raw = RawInode::from_bytes(&buf);

        let inode = Inode::from_raw(raw, dentry);
        self.dentries[dentry].ino = ino;
        let dir_cnt = inode.dir_cnt;
        let ftype = inode.ftype;
        self.inodes.insert(ino, inode);

        if ftype == FileType::Dir {
            let rec_size = size_of::<RawDentry>();
            for i in 0..dir_cnt {
                let mut rec_buf = vec![0u8; rec_size];
                self.inode_read(ino, &mut rec_buf, rec_size, i * rec_size as u32)?;
                let raw_d = RawDentry::from_bytes(&rec_buf);
                let name = decode_name(&raw_d.fname);
                let child_ftype = FileType::from_u32(raw_d.ftype);

                let child_id = self.dentries.len();
                let mut child = Dentry::new(name, child_ftype, Some(dentry));
                child.ino = raw_d.ino;
                self.dentries.push(child);
                self.link_child(ino, child_id)?;
            }
        }

        Ok(())
    }

    /// Writes `buf` into `ino`'s file data at `file_offset`, allocating
    /// data blocks on demand.
    ///
    /// A failing call can leave the inode's block pointers and bitmap
    /// updated while `size` and the written bytes are not fully consistent
    /// — this implementation does not roll back partial writes, matching
    /// the source it is grounded on.
    pub fn inode_write(&mut self, ino: u32, buf: &[u8], file_offset: u32) -> Result<()> {
        let io_block = self.super_block.io_block;
        let max_size = Inode::max_size(io_block) as u64;
        let current_size = self.inode(ino)?.size;

        if file_offset > current_size
            || file_offset as u64 + buf.len() as u64 > max_size
        {
            warn!(
                "inode_write ino={ino} offset={file_offset} len={} rejected: unsupported",
                buf.len()
            );
            return Err(Error::Unsupported);
        }

        let mut slot = (file_offset / io_block) as usize;
        let mut off_in_block = file_offset % io_block;
        let mut written = 0usize;

        while written < buf.len() {
            if self.inode(ino)?.block_pointer[slot] == NO_BLOCK {
                self.alloc_data_block(ino, slot)?;
            }
            let chunk = ((io_block - off_in_block) as usize).min(buf.len() - written);
            let blk = self.inode(ino)?.block_pointer[slot] as u32;
            let offset = self.super_block.data_block_offset(blk) + off_in_block as u64;
            self.driver.write(offset, &buf[written..written + chunk])?;

            written += chunk;
            slot += 1;
            off_in_block = 0;
        }

        let inode = self.inodes.get_mut(&ino).ok_or(Error::Invalid)?;
        inode.size = inode.size.max(file_offset + buf.len() as u32);
        Ok(())
    }

    /// Reads up to `len` bytes (clamped against `inode.size`, not against
    /// `inode.size - file_offset` — preserved verbatim from the source)
    /// from `ino`'s file data at `file_offset` into `buf`, returning the
    /// number of bytes actually read.
    pub fn inode_read(
        &mut self,
        ino: u32,
        buf: &mut [u8],
        len: usize,
        file_offset: u32,
    ) -> Result<usize> {
        let io_block = self.super_block.io_block;
        let mut slot = (file_offset / io_block) as usize;
        let mut off_in_block = file_offset % io_block;

        let inode_size = self.inode(ino)?.size;
        if file_offset > inode_size
            || slot >= INODE_DIRECT_BLOCKS
            || self.inode(ino)?.block_pointer[slot] == NO_BLOCK
        {
            warn!("inode_read ino={ino} offset={file_offset} rejected: unsupported");
            return Err(Error::Unsupported);
        }

        let size = len.min(inode_size as usize);
        let mut remaining = size;
        let mut read = 0usize;

        while remaining > 0 {
            if slot >= INODE_DIRECT_BLOCKS || self.inode(ino)?.block_pointer[slot] == NO_BLOCK {
                return Err(Error::Unsupported);
            }
            let chunk = ((io_block - off_in_block) as usize).min(remaining);
            let blk = self.inode(ino)?.block_pointer[slot] as u32;
            let offset = self.super_block.data_block_offset(blk) + off_in_block as u64;
            self.driver.read(offset, &mut buf[read..read + chunk])?;

            read += chunk;
            remaining -= chunk;
            slot += 1;
            off_in_block = 0;
        }

        Ok(size)
    }

    /// Flushes `ino` and (for a directory) its hydrated descendants' data
    /// and records back to disk, depth-first.
    pub fn sync_inode(&mut self, ino: u32) -> Result<()> {
        let ftype = self.inode(ino)?.ftype;

        if ftype == FileType::Dir {
            let mut cursor = self.inode(ino)?.children;
            let mut offset = 0u32;
            let rec_size = size_of::<RawDentry>() as u32;

            while let Some(child_id) = cursor {
                let raw_d = RawDentry::from_dentry(&self.dentries[child_id]);
                self.inode_write(ino, &raw_d.to_bytes(), offset)?;

                let child_ino = self.dentries[child_id].ino;
                if self.inodes.contains_key(&child_ino) {
                    self.sync_inode(child_ino)?;
                }

                offset += rec_size;
                cursor = self.dentries[child_id].next_sibling;
            }
        }

        let raw = self.inode(ino)?.to_raw();
        let offset = self.super_block.inode_offset(ino);
        self.driver.write(offset, &raw.to_bytes())?;
        Ok(())
    }

    /// Resolves `path` against the dentry tree, hydrating inodes on demand.
    pub fn lookup(&mut self, path: &str) -> Result<LookupResult> {
        let total_lvl = calc_lvl(path);
        if total_lvl == 0 {
            return Ok(LookupResult {
                dentry: self.root,
                found: true,
                is_root: true,
            });
        }

        let components: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut cursor = self.root;
        let mut result = cursor;
        let mut found = false;

        for (i, component) in components.iter().enumerate() {
            let lvl = i + 1;
            self.ensure_hydrated(cursor)?;
            let ino = self.dentries[cursor].ino;
            let ftype = self.inode(ino)?.ftype;

            if ftype == FileType::File && lvl < total_lvl {
                result = self.inode(ino)?.self_dentry;
                found = true;
                break;
            }

            if ftype == FileType::Dir {
                let mut child_cursor = self.inode(ino)?.children;
                let mut hit = None;
                while let Some(cid) = child_cursor {
                    if self.dentries[cid].name_matches(component) {
                        hit = Some(cid);
                        break;
                    }
                    child_cursor = self.dentries[cid].next_sibling;
                }

                match hit {
                    None => {
                        result = self.inode(ino)?.self_dentry;
                        found = false;
                        break;
                    }
                    Some(cid) if lvl == total_lvl => {
                        result = cid;
                        found = true;
                        break;
                    }
                    Some(cid) => {
                        cursor = cid;
                        result = cursor;
                        found = true;
                    }
                }
            } else {
                // A symlink mid-path: treated as terminal, as the core has
                // no notion of following one.
                result = cursor;
                found = true;
                break;
            }
        }

        self.ensure_hydrated(result)?;
        Ok(LookupResult {
            dentry: result,
            found,
            is_root: false,
        })
    }

    fn ensure_hydrated(&mut self, dentry: DentryId) -> Result<()> {
        let ino = self.dentries[dentry].ino;
        if !self.inodes.contains_key(&ino) {
            self.read_inode(dentry, ino)?;
        }
        Ok(())
    }

    fn alloc_data_block(&mut self, ino: u32, slot: usize) -> Result<()> {
        if slot >= INODE_DIRECT_BLOCKS {
            return Err(Error::NoSpace);
        }
        let blk = self.bitmaps.data.alloc_first_free(self.super_block.data_blks)?;
        let inode = self.inodes.get_mut(&ino).ok_or(Error::Invalid)?;
        inode.block_pointer[slot] = blk as i32;
        debug!("alloc_data_block ino={ino} slot={slot} -> {blk}");
        Ok(())
    }
}

/// Decodes a NUL-padded on-disk name field into an owned string, stopping
/// at the first NUL byte.
fn decode_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
