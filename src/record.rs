//! Record I/O
//!
//! Reads and writes the physical pieces of a container file.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (4 bytes)                                        │
//! │   IndexPointer: u32 (0 = unwritten / not closed)        │
//! ├─────────────────────────────────────────────────────────┤
//! │ Records (variable, may be interleaved with free gaps)   │
//! │   [Size: u32][Payload: Size bytes]                      │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (at IndexPointer)                           │
//! │   [BodyLen: u32][CRC: u32][Body]                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. Functions are generic over the I/O traits
//! so they work on both files and in-memory cursors.

use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::{Result, VdirError};

/// Size prefix in front of every record payload
pub const RECORD_HEADER_SIZE: u32 = 4;

/// Bytes `[0, 4)` hold the index pointer
pub const CONTAINER_HEADER_SIZE: u32 = 4;

/// Slot length (`4 + payload`) for a payload of `len` bytes
///
/// Fails when the payload cannot be described by a u32 size prefix.
pub fn slot_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .ok()
        .and_then(|size| size.checked_add(RECORD_HEADER_SIZE))
        .ok_or(VdirError::EntryTooLarge { size: len })
}

/// Read the u32 index pointer at offset 0
pub fn read_index_pointer<R: Read + Seek>(io: &mut R) -> Result<u32> {
    read_u32_at(io, 0)
}

/// Overwrite the u32 index pointer at offset 0
pub fn write_index_pointer<W: Write + Seek>(io: &mut W, pointer: u32) -> Result<()> {
    io.seek(SeekFrom::Start(0))?;
    io.write_all(&pointer.to_le_bytes())?;
    Ok(())
}

/// Read the size prefix of the record starting at `offset`
pub fn read_size<R: Read + Seek>(io: &mut R, offset: u32) -> Result<u32> {
    read_u32_at(io, offset)
}

/// Read the payload of the record starting at `offset`
pub fn read_record<R: Read + Seek>(io: &mut R, offset: u32) -> Result<Vec<u8>> {
    let size = read_size(io, offset)?;
    let mut payload = vec![0u8; size as usize];
    io.read_exact(&mut payload)?;
    Ok(payload)
}

/// Write `[len][data]` at `offset`, returning the offset just past the payload
pub fn write_record<W: Write + Seek>(io: &mut W, offset: u32, data: &[u8]) -> Result<u32> {
    let slot = slot_len(data.len())?;
    let end = offset
        .checked_add(slot)
        .ok_or(VdirError::ContainerFull { required: offset as u64 + slot as u64 })?;

    io.seek(SeekFrom::Start(offset as u64))?;
    io.write_all(&(data.len() as u32).to_le_bytes())?;
    io.write_all(data)?;

    Ok(end)
}

fn read_u32_at<R: Read + Seek>(io: &mut R, offset: u32) -> Result<u32> {
    io.seek(SeekFrom::Start(offset as u64))?;
    let mut bytes = [0u8; 4];
    io.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}
