//! End-to-end mount/unmount scenarios exercising a full driver
//! round-trip through a temp file, rather than a single in-process mount.

use blockfs::testing::FileDriver;
use blockfs::{FileType, Filesystem, MountOptions};

const DISK_SIZE: u64 = 4 * 1024 * 1024;
const DRIVER_IO: u64 = 512;

fn new_device() -> tempfile::NamedTempFile {
    let file = tempfile::NamedTempFile::new().expect("create temp file");
    file.as_file().set_len(DISK_SIZE).expect("size temp file");
    file
}

fn mount(device: &tempfile::NamedTempFile) -> Filesystem<FileDriver> {
    let file = device.reopen().expect("reopen device");
    let driver = FileDriver::new(file, DRIVER_IO);
    Filesystem::mount(MountOptions::new(driver)).expect("mount")
}

#[test]
fn format_and_remount() {
    let device = new_device();

    let fs = mount(&device);
    let root_ino = fs.dentry(fs.root()).ino;
    assert_eq!(root_ino, 0);
    let root = fs.inode(root_ino).unwrap();
    assert_eq!(root.dir_cnt, 0);
    assert_eq!(root.size, 0);
    assert_eq!(root.ftype, FileType::Dir);
    fs.unmount().unwrap();

    let mut fs = mount(&device);
    let result = fs.lookup("/").unwrap();
    assert!(result.found);
    assert!(result.is_root);
    let root = fs.inode(fs.dentry(result.dentry).ino).unwrap();
    assert_eq!(root.dir_cnt, 0);
    fs.unmount().unwrap();
}

#[test]
fn create_file_under_root() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let hello = fs.new_dentry("hello", FileType::File, root);
    fs.alloc_inode(hello).unwrap();
    fs.alloc_dentry(root_ino, hello).unwrap();
    fs.unmount().unwrap();

    let mut fs = mount(&device);
    let result = fs.lookup("/hello").unwrap();
    assert!(result.found);
    assert!(!result.is_root);
    let ino = fs.dentry(result.dentry).ino;
    let inode = fs.inode(ino).unwrap();
    assert_eq!(inode.ftype, FileType::File);
    assert_eq!(inode.size, 0);
    fs.unmount().unwrap();
}

#[test]
fn write_across_block_boundary() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let x = fs.new_dentry("x", FileType::File, root);
    let x_ino = fs.alloc_inode(x).unwrap();
    fs.alloc_dentry(root_ino, x).unwrap();

    let payload = vec![0xABu8; 1500];
    fs.inode_write(x_ino, &payload, 0).unwrap();

    let inode = fs.inode(x_ino).unwrap();
    assert_eq!(inode.size, 1500);
    assert_ne!(inode.block_pointer[0], blockfs::NO_BLOCK);
    assert_ne!(inode.block_pointer[1], blockfs::NO_BLOCK);

    let mut out = vec![0u8; 1500];
    let n = fs.inode_read(x_ino, &mut out, 1500, 0).unwrap();
    assert_eq!(n, 1500);
    assert!(out.iter().all(|&b| b == 0xAB));

    fs.unmount().unwrap();
}

#[test]
fn overfill_fails_unsupported() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let big = fs.new_dentry("big", FileType::File, root);
    let big_ino = fs.alloc_inode(big).unwrap();
    fs.alloc_dentry(root_ino, big).unwrap();

    let max_size = blockfs::INODE_DIRECT_BLOCKS as u32 * 1024;
    let payload = vec![0x11u8; max_size as usize];
    fs.inode_write(big_ino, &payload, 0).unwrap();
    assert_eq!(fs.inode(big_ino).unwrap().size, max_size);

    let overflow = fs.inode_write(big_ino, &[0x22], max_size);
    assert!(matches!(overflow, Err(blockfs::Error::Unsupported)));

    fs.unmount().unwrap();
}

#[test]
fn write_past_size_fails_even_in_allocated_block() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let x = fs.new_dentry("x", FileType::File, root);
    let x_ino = fs.alloc_inode(x).unwrap();
    fs.alloc_dentry(root_ino, x).unwrap();

    // Spans slots 0 and 1 (IO_BLOCK = 1024), leaving size = 1500 while
    // slot 1's block is already allocated out to offset 2047.
    let payload = vec![0xABu8; 1500];
    fs.inode_write(x_ino, &payload, 0).unwrap();
    assert_ne!(fs.inode(x_ino).unwrap().block_pointer[1], blockfs::NO_BLOCK);

    let result = fs.inode_write(x_ino, &[0x99], 1600);
    assert!(matches!(result, Err(blockfs::Error::Unsupported)));

    fs.unmount().unwrap();
}

#[test]
fn read_at_block_aligned_size_fails_unsupported() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let x = fs.new_dentry("x", FileType::File, root);
    let x_ino = fs.alloc_inode(x).unwrap();
    fs.alloc_dentry(root_ino, x).unwrap();

    // Exactly one IO_BLOCK, so offset == size lands on the unallocated
    // next direct slot.
    let payload = vec![0x55u8; 1024];
    fs.inode_write(x_ino, &payload, 0).unwrap();
    assert_eq!(fs.inode(x_ino).unwrap().size, 1024);

    let mut out = vec![0u8; 10];
    let result = fs.inode_read(x_ino, &mut out, 10, 1024);
    assert!(matches!(result, Err(blockfs::Error::Unsupported)));

    fs.unmount().unwrap();
}

#[test]
fn directory_persistence() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let a = fs.new_dentry("a", FileType::Dir, root);
    let a_ino = fs.alloc_inode(a).unwrap();
    fs.alloc_dentry(root_ino, a).unwrap();

    let b = fs.new_dentry("b", FileType::File, a);
    let b_ino = fs.alloc_inode(b).unwrap();
    fs.alloc_dentry(a_ino, b).unwrap();

    let payload = vec![7u8; 10];
    fs.inode_write(b_ino, &payload, 0).unwrap();
    fs.unmount().unwrap();

    let mut fs = mount(&device);
    let result = fs.lookup("/a/b").unwrap();
    assert!(result.found);
    let ino = fs.dentry(result.dentry).ino;

    let mut out = vec![0u8; 10];
    let n = fs.inode_read(ino, &mut out, 10, 0).unwrap();
    assert_eq!(n, 10);
    assert_eq!(out, payload);

    fs.unmount().unwrap();
}

#[test]
fn path_miss_returns_containing_directory() {
    let device = new_device();

    let mut fs = mount(&device);
    let root = fs.root();
    let root_ino = fs.dentry(root).ino;
    let a = fs.new_dentry("a", FileType::Dir, root);
    let a_ino = fs.alloc_inode(a).unwrap();
    fs.alloc_dentry(root_ino, a).unwrap();

    let b = fs.new_dentry("b", FileType::File, a);
    let b_ino = fs.alloc_inode(b).unwrap();
    fs.alloc_dentry(a_ino, b).unwrap();
    fs.inode_write(b_ino, &[1, 2, 3], 0).unwrap();
    fs.unmount().unwrap();

    let mut fs = mount(&device);
    let result = fs.lookup("/a/c").unwrap();
    assert!(!result.found);
    assert!(!result.is_root);
    assert_eq!(fs.dentry(result.dentry).name, "a");
    fs.unmount().unwrap();
}
