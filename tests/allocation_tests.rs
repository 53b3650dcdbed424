//! Tests for record placement inside a container
//!
//! These tests verify:
//! - Shrinking an entry frees its leftover bytes for reuse
//! - Growing an entry moves it and frees the whole old slot
//! - Forward-only coalescing of freed slots
//! - New records reuse the index block left by open or flush

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vdir::{Config, OpenMode, VirtualDirectory};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    (temp_dir, path)
}

fn open(path: &Path) -> VirtualDirectory {
    let config = Config::builder().dir(path).sync_on_close(false).build();
    VirtualDirectory::open(config, OpenMode::BOTH).unwrap()
}

fn free_ranges(dir: &VirtualDirectory) -> Vec<(u32, u32)> {
    dir.free_list().iter().collect()
}

// =============================================================================
// Shrink Tests
// =============================================================================

#[test]
fn test_shrink_frees_leftover() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);

    dir.write("big", &[1u8; 100]).unwrap();
    assert_eq!(dir.entry_offset("big"), Some(4));
    assert_eq!(dir.file_size(), 108);

    dir.write("big", &[2u8; 20]).unwrap();

    assert_eq!(dir.entry_offset("big"), Some(4));
    assert_eq!(dir.file_size(), 108);
    assert_eq!(free_ranges(&dir), vec![(28, 80)]);
    assert_eq!(dir.read("big").unwrap(), vec![2u8; 20]);
}

#[test]
fn test_shrink_leftover_is_reused() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("big", &[1u8; 100]).unwrap();
    dir.write("big", &[2u8; 20]).unwrap();

    // 50 + 4 fits in the 80 freed bytes at [28, 108)
    dir.write("small", &[3u8; 50]).unwrap();

    let offset = dir.entry_offset("small").unwrap();
    assert_eq!(offset, 28);
    assert!(offset + 54 <= 108);
    assert_eq!(dir.file_size(), 108);
    assert_eq!(free_ranges(&dir), vec![(82, 26)]);

    // Exact fit consumes the remainder
    dir.write("tiny", &[4u8; 22]).unwrap();
    assert_eq!(dir.entry_offset("tiny"), Some(82));
    assert!(dir.free_list().is_empty());

    assert_eq!(dir.read("big").unwrap(), vec![2u8; 20]);
    assert_eq!(dir.read("small").unwrap(), vec![3u8; 50]);
    assert_eq!(dir.read("tiny").unwrap(), vec![4u8; 22]);
}

#[test]
fn test_same_size_overwrite_frees_nothing() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("a", b"12345").unwrap();

    dir.write("a", b"abcde").unwrap();

    assert_eq!(dir.entry_offset("a"), Some(4));
    assert!(dir.free_list().is_empty());
    assert_eq!(dir.read("a").unwrap(), b"abcde");
}

#[test]
fn test_regrow_within_slot_capacity_moves() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("a", &[1u8; 40]).unwrap();
    dir.write("a", &[2u8; 10]).unwrap();

    // Stored size is now 10, so 30 bytes no longer fit in place; the whole
    // slot [4, 18) merges with the leftover [18, 48) and serves the new write
    dir.write("a", &[3u8; 30]).unwrap();

    assert_eq!(dir.entry_offset("a"), Some(4));
    assert_eq!(free_ranges(&dir), vec![(38, 10)]);
    assert_eq!(dir.read("a").unwrap(), vec![3u8; 30]);
}

// =============================================================================
// Grow Tests
// =============================================================================

#[test]
fn test_grow_relocates_and_frees_old_slot() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("a", &[1u8; 10]).unwrap();
    dir.write("b", &[2u8; 10]).unwrap();
    let first = dir.entry_offset("a").unwrap();

    dir.write("a", &[3u8; 50]).unwrap();

    let second = dir.entry_offset("a").unwrap();
    assert_ne!(first, second);
    assert_eq!(second, 32);
    assert_eq!(dir.file_size(), 86);
    assert_eq!(free_ranges(&dir), vec![(4, 14)]);

    // The old slot takes the next request that fits it
    dir.write("c", &[4u8; 10]).unwrap();
    assert_eq!(dir.entry_offset("c"), Some(first));
    assert!(dir.free_list().is_empty());

    assert_eq!(dir.read("a").unwrap(), vec![3u8; 50]);
    assert_eq!(dir.read("b").unwrap(), vec![2u8; 10]);
    assert_eq!(dir.read("c").unwrap(), vec![4u8; 10]);
}

#[test]
fn test_grow_relocation_survives_reopen() {
    let (_temp, path) = setup_temp_dir();
    {
        let mut dir = open(&path);
        dir.write("a", &[1u8; 10]).unwrap();
        dir.write("b", &[2u8; 10]).unwrap();
        dir.write("a", &[3u8; 50]).unwrap();
        dir.close().unwrap();
    }

    let mut dir = open(&path);
    assert_eq!(free_ranges(&dir), vec![(4, 14)]);
    assert_eq!(dir.read("a").unwrap(), vec![3u8; 50]);

    dir.write("c", &[4u8; 10]).unwrap();
    assert_eq!(dir.entry_offset("c"), Some(4));
}

// =============================================================================
// Coalescing Tests
// =============================================================================

#[test]
fn test_removed_slots_coalesce_forward_only() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("a", &[1u8; 10]).unwrap(); // [4, 18)
    dir.write("b", &[2u8; 10]).unwrap(); // [18, 32)
    dir.write("c", &[3u8; 10]).unwrap(); // [32, 46)

    dir.remove("b").unwrap();
    dir.remove("a").unwrap();
    assert_eq!(free_ranges(&dir), vec![(4, 28)]);

    // [32, 46) follows [4, 32) but is not merged into it
    dir.remove("c").unwrap();
    assert_eq!(free_ranges(&dir), vec![(4, 28), (32, 14)]);

    // So a 38-byte slot does not fit anywhere and is appended
    dir.write("d", &[4u8; 34]).unwrap();
    assert_eq!(dir.entry_offset("d"), Some(46));
}

// =============================================================================
// Index Region Reuse Tests
// =============================================================================

#[test]
fn test_write_after_flush_reuses_index_region() {
    let (_temp, path) = setup_temp_dir();
    let mut dir = open(&path);
    dir.write("a", &[1u8; 10]).unwrap();

    dir.flush().unwrap();
    let extent = dir.flushed_index().unwrap();
    assert_eq!(extent.offset, 18);
    assert_eq!(dir.file_size(), 18);

    dir.write("b", &[2u8; 5]).unwrap();

    assert_eq!(dir.entry_offset("b"), Some(extent.offset));
    assert_eq!(dir.file_size(), 27);
    assert_eq!(dir.flushed_index(), None);

    // Only one record can take the region; the next one appends
    dir.write("c", &[3u8; 5]).unwrap();
    assert_eq!(dir.entry_offset("c"), Some(27));
    dir.close().unwrap();

    let mut dir = open(&path);
    assert_eq!(dir.file_size(), 36);
    assert_eq!(dir.read("a").unwrap(), vec![1u8; 10]);
    assert_eq!(dir.read("b").unwrap(), vec![2u8; 5]);
    assert_eq!(dir.read("c").unwrap(), vec![3u8; 5]);
}

#[test]
fn test_write_after_reopen_reuses_index_region() {
    let (_temp, path) = setup_temp_dir();
    {
        let mut dir = open(&path);
        dir.write("a", &[1u8; 10]).unwrap();
        dir.close().unwrap();
    }

    let mut dir = open(&path);
    let extent = dir.flushed_index().unwrap();
    assert_eq!(extent.offset, 18);

    dir.write("b", &[2u8; 200]).unwrap();

    assert_eq!(dir.entry_offset("b"), Some(18));
    assert_eq!(dir.file_size(), 18 + 204);
    assert_eq!(dir.read("a").unwrap(), vec![1u8; 10]);
    assert_eq!(dir.read("b").unwrap(), vec![2u8; 200]);
}

#[test]
fn test_free_range_preferred_over_index_region() {
    let (_temp, path) = setup_temp_dir();
    {
        let mut dir = open(&path);
        dir.write("a", &[1u8; 10]).unwrap();
        dir.write("b", &[2u8; 10]).unwrap();
        dir.remove("a").unwrap();
        dir.close().unwrap();
    }

    let mut dir = open(&path);
    dir.write("c", &[3u8; 10]).unwrap();

    assert_eq!(dir.entry_offset("c"), Some(4));
    assert!(dir.flushed_index().is_some());
}
