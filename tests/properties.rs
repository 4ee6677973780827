//! Property-based tests for the universal invariants from the testable
//! properties list: monotonic allocation, inode round-trip, file payload
//! round-trip and driver-adapter alignment.

use blockfs::testing::MemDriver;
use blockfs::{DriverIo, FileType, Filesystem, MountOptions, NO_BLOCK};
use proptest::prelude::*;

const DISK_SIZE: u64 = 4 * 1024 * 1024;
const DRIVER_IO: u64 = 512;
const IO_BLOCK: u32 = (DRIVER_IO * 2) as u32;
const MAX_FILE_SIZE: u32 = IO_BLOCK * 6;

fn mounted() -> Filesystem<MemDriver> {
    let driver = MemDriver::new(DISK_SIZE, DRIVER_IO);
    Filesystem::mount(MountOptions::new(driver)).expect("mount")
}

proptest! {
    #[test]
    fn inode_allocation_is_strictly_increasing(count in 1usize..50) {
        let mut fs = mounted();
        let root = fs.root();
        let mut last: Option<u32> = None;
        for i in 0..count {
            let d = fs.new_dentry(&format!("f{i}"), FileType::File, root);
            let ino = fs.alloc_inode(d).unwrap();
            if let Some(prev) = last {
                prop_assert!(ino > prev);
            }
            last = Some(ino);
        }
    }

    #[test]
    fn inode_round_trips_through_sync_and_read(size in 0u32..=MAX_FILE_SIZE) {
        let mut fs = mounted();
        let root = fs.root();
        let root_ino = fs.dentry(root).ino;
        let d = fs.new_dentry("f", FileType::File, root);
        let ino = fs.alloc_inode(d).unwrap();
        fs.alloc_dentry(root_ino, d).unwrap();

        if size > 0 {
            let buf = vec![0x42u8; size as usize];
            fs.inode_write(ino, &buf, 0).unwrap();
        }

        let before = {
            let inode = fs.inode(ino).unwrap();
            (
                inode.ino,
                inode.size,
                inode.ftype,
                inode.dir_cnt,
                inode.block_pointer,
                inode.target_path,
            )
        };

        fs.sync_inode(ino).unwrap();
        fs.read_inode(d, ino).unwrap();

        let after = {
            let inode = fs.inode(ino).unwrap();
            (
                inode.ino,
                inode.size,
                inode.ftype,
                inode.dir_cnt,
                inode.block_pointer,
                inode.target_path,
            )
        };

        prop_assert_eq!(before, after);
    }

    #[test]
    fn file_payload_round_trips(buf in prop::collection::vec(any::<u8>(), 0..=MAX_FILE_SIZE as usize)) {
        let mut fs = mounted();
        let root = fs.root();
        let root_ino = fs.dentry(root).ino;
        let d = fs.new_dentry("f", FileType::File, root);
        let ino = fs.alloc_inode(d).unwrap();
        fs.alloc_dentry(root_ino, d).unwrap();

        fs.inode_write(ino, &buf, 0).unwrap();
        let mut out = vec![0u8; buf.len()];
        if !buf.is_empty() {
            let n = fs.inode_read(ino, &mut out, buf.len(), 0).unwrap();
            prop_assert_eq!(n, buf.len());
            prop_assert_eq!(out, buf);
        }
    }

    #[test]
    fn driver_adapter_reads_back_last_write(
        offset in 0u64..3000,
        payload in prop::collection::vec(any::<u8>(), 1..400),
    ) {
        let mut io = DriverIo::new(MemDriver::new(DISK_SIZE, DRIVER_IO)).unwrap();
        io.write(offset, &payload).unwrap();
        let mut out = vec![0u8; payload.len()];
        io.read(offset, &mut out).unwrap();
        prop_assert_eq!(out, payload);
    }
}

#[test]
fn fresh_format_has_expected_layout_and_root() {
    let mut fs = mounted();
    let root_ino = fs.dentry(fs.root()).ino;
    assert_eq!(root_ino, 0);
    let root = fs.inode(root_ino).unwrap();
    assert_eq!(root.size, 0);
    assert_eq!(root.ftype, FileType::Dir);
    assert_eq!(root.dir_cnt, 0);
    assert!(root.block_pointer.iter().all(|&b| b == NO_BLOCK));
}
