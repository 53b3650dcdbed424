//! Index Manager
//!
//! Owns the entry name → record offset mapping and the free list, and
//! persists both as a single block at the tail of the container.
//!
//! ## Index Block Format
//! ```text
//! ┌──────────────┬─────────────┬──────────────────────────────┐
//! │ BodyLen (4)  │  CRC32 (4)  │  Body (bincode, BodyLen)     │
//! └──────────────┴─────────────┴──────────────────────────────┘
//! ```

mod free_list;

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VdirError};

pub use free_list::FreeList;

/// BodyLen (4) + CRC32 (4)
pub const INDEX_HEADER_SIZE: u32 = 8;

/// In-memory index of a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Entry name → offset of its record's size prefix
    entries: BTreeMap<String, u32>,
    /// Reusable byte ranges
    free: FreeList,
}

impl Index {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record offset for `name`
    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Point `name` at `offset`, returning the previous offset
    pub fn insert(&mut self, name: &str, offset: u32) -> Option<u32> {
        self.entries.insert(name.to_string(), offset)
    }

    pub fn remove(&mut self, name: &str) -> Option<u32> {
        self.entries.remove(name)
    }

    /// Entry names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_list(&self) -> &FreeList {
        &self.free
    }

    pub fn free_list_mut(&mut self) -> &mut FreeList {
        &mut self.free
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Encode into a self-describing index block
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serialize(self)
            .map_err(|e| VdirError::Serialization(format!("Failed to encode index: {}", e)))?;
        let body_len = u32::try_from(body.len())
            .map_err(|_| VdirError::Serialization(format!("Index body too large: {} bytes", body.len())))?;

        let mut block = Vec::with_capacity(INDEX_HEADER_SIZE as usize + body.len());
        block.extend_from_slice(&body_len.to_le_bytes());
        block.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        block.extend_from_slice(&body);

        Ok(block)
    }

    /// Decode an index block produced by `encode`
    pub fn decode(block: &[u8]) -> Result<Self> {
        if block.len() < INDEX_HEADER_SIZE as usize {
            return Err(VdirError::CorruptIndex(format!(
                "Incomplete header: expected {} bytes, got {}",
                INDEX_HEADER_SIZE,
                block.len()
            )));
        }

        let body_len = u32::from_le_bytes([block[0], block[1], block[2], block[3]]) as usize;
        let crc = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);

        let body = &block[INDEX_HEADER_SIZE as usize..];
        if body.len() < body_len {
            return Err(VdirError::CorruptIndex(format!(
                "Incomplete body: expected {} bytes, got {}",
                body_len,
                body.len()
            )));
        }
        let body = &body[..body_len];

        let actual = crc32fast::hash(body);
        if actual != crc {
            return Err(VdirError::CorruptIndex(format!(
                "Checksum mismatch: stored {:#010x}, computed {:#010x}",
                crc, actual
            )));
        }

        let index: Index = bincode::deserialize(body)
            .map_err(|e| VdirError::CorruptIndex(format!("Failed to decode index: {}", e)))?;

        if !index.free.is_paired() {
            return Err(VdirError::CorruptIndex(
                "Free offsets and lengths differ in length".to_string(),
            ));
        }

        Ok(index)
    }

    /// Load the index block stored at `offset`
    ///
    /// Returns the index and the block's length on disk.
    pub fn read_from<R: Read + Seek>(io: &mut R, offset: u32) -> Result<(Self, u32)> {
        let file_len = io.seek(SeekFrom::End(0))?;
        let available = file_len.saturating_sub(offset as u64);
        if available < INDEX_HEADER_SIZE as u64 {
            return Err(VdirError::CorruptIndex(format!(
                "Index pointer {} leaves only {} bytes in a {} byte file",
                offset, available, file_len
            )));
        }

        io.seek(SeekFrom::Start(offset as u64))?;
        let mut header = [0u8; INDEX_HEADER_SIZE as usize];
        io.read_exact(&mut header)?;

        let body_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if body_len as u64 > available - INDEX_HEADER_SIZE as u64 {
            return Err(VdirError::CorruptIndex(format!(
                "Index body of {} bytes runs past end of file",
                body_len
            )));
        }

        let mut block = Vec::with_capacity(INDEX_HEADER_SIZE as usize + body_len as usize);
        block.extend_from_slice(&header);
        block.resize(INDEX_HEADER_SIZE as usize + body_len as usize, 0);
        io.read_exact(&mut block[INDEX_HEADER_SIZE as usize..])?;

        let index = Self::decode(&block)?;
        Ok((index, INDEX_HEADER_SIZE + body_len))
    }
}
