//! Container Module
//!
//! An open session on a virtual directory's container file.
//!
//! ## Responsibilities
//! - Open or create the container, loading or rebuilding the index
//! - Gate reads and writes on the session's open mode
//! - Decide where each record lands: in place, free list, flushed index
//!   region, or end of data
//! - Persist the index on close
//!
//! ## Lifecycle
//! ```text
//!  open ──► exists / read / write / remove / flush ... ──► close
//!   │                                                        │
//!   └─ pointer == 0 on an existing file: previous session    └─ writes index at
//!      never closed, index reset to empty                       file_size, pointer
//!                                                               at offset 0
//! ```
//!
//! Only one process may have a given container open at a time. Nothing
//! detects or prevents concurrent opens of the same path.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Result, VdirError};
use crate::index::{FreeList, Index};
use crate::mode::OpenMode;
use crate::record::{self, CONTAINER_HEADER_SIZE, RECORD_HEADER_SIZE};

/// Location and length of the most recently written index block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexExtent {
    pub offset: u32,
    pub len: u32,
}

/// An open virtual directory
///
/// ## Durability
/// The index only reaches disk through `close()` or `flush()`. Dropping a
/// session calls `close()` as a last resort, but any error it hits can only be
/// logged. The first mutation of a session zeroes the index pointer, so a
/// session that never closes is detected on the next open and the container
/// comes back empty.
pub struct VirtualDirectory {
    /// Container file path
    path: PathBuf,

    config: Config,

    mode: OpenMode,

    /// `None` once closed
    file: Option<File>,

    index: Index,

    /// Logical end of record data (the index is written here)
    file_size: u32,

    /// Index block still on disk from open or the last flush.
    /// Consumed by the next record placed at end of data.
    flushed_index: Option<IndexExtent>,

    /// Index pointer on disk is zero
    dirty: bool,

    /// Name and offset cached by the last successful `exists`
    last_lookup: Option<(String, u32)>,
}

impl VirtualDirectory {
    /// Open or create the container described by `config`
    ///
    /// On startup:
    /// 1. Create the directory if needed and the container doesn't exist
    /// 2. Read the index pointer
    /// 3. Load the index it points to, or start empty if the previous
    ///    session never closed
    pub fn open(config: Config, mode: OpenMode) -> Result<Self> {
        config.validate()?;
        let path = config.container_path();

        let session = if path.exists() {
            Self::open_existing(config, path, mode)?
        } else {
            Self::create(config, path, mode)?
        };

        info!(
            path = %session.path.display(),
            mode = %mode,
            entries = session.index.len(),
            file_size = session.file_size,
            "opened container"
        );

        Ok(session)
    }

    /// Open with a directory path and mode string (convenience method)
    ///
    /// Uses default config with the specified directory
    pub fn open_path(dir: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let config = Config::builder().dir(dir.as_ref()).build();
        Self::open(config, OpenMode::parse(mode))
    }

    /// Open, run `f`, and close, whatever `f` returns
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn with_session<T, F>(config: Config, mode: OpenMode, f: F) -> Result<T>
    where
        F: FnOnce(&mut VirtualDirectory) -> Result<T>,
    {
        let mut session = Self::open(config, mode)?;
        let outcome = f(&mut session);
        let closed = session.close();
        let value = outcome?;
        closed?;
        Ok(value)
    }

    fn create(config: Config, path: PathBuf, mode: OpenMode) -> Result<Self> {
        if config.create_dirs {
            fs::create_dir_all(&config.dir)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        record::write_index_pointer(&mut file, 0)?;

        Ok(Self::with_state(config, path, mode, file, Index::new(), CONTAINER_HEADER_SIZE, None, true))
    }

    fn open_existing(config: Config, path: PathBuf, mode: OpenMode) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(mode.can_write())
            .open(&path)?;
        let file_len = file.metadata()?.len();

        if file_len <= CONTAINER_HEADER_SIZE as u64 {
            debug!(path = %path.display(), "container holds no data");
            return Ok(Self::with_state(config, path, mode, file, Index::new(), CONTAINER_HEADER_SIZE, None, false));
        }

        let pointer = record::read_index_pointer(&mut file)?;
        if pointer == 0 {
            warn!(
                path = %path.display(),
                "container was not closed properly, its entries are lost"
            );
            return Ok(Self::with_state(config, path, mode, file, Index::new(), CONTAINER_HEADER_SIZE, None, true));
        }

        let loaded = if pointer < CONTAINER_HEADER_SIZE {
            Err(VdirError::CorruptIndex(format!("Index pointer {} inside header", pointer)))
        } else {
            Index::read_from(&mut file, pointer)
        };

        match loaded {
            Ok((index, len)) => {
                let extent = IndexExtent { offset: pointer, len };
                Ok(Self::with_state(config, path, mode, file, index, pointer, Some(extent), false))
            }
            Err(VdirError::CorruptIndex(reason)) => {
                warn!(
                    path = %path.display(),
                    pointer,
                    %reason,
                    "container index is unreadable, its entries are lost"
                );
                Ok(Self::with_state(config, path, mode, file, Index::new(), CONTAINER_HEADER_SIZE, None, false))
            }
            Err(e) => Err(e),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn with_state(
        config: Config,
        path: PathBuf,
        mode: OpenMode,
        file: File,
        index: Index,
        file_size: u32,
        flushed_index: Option<IndexExtent>,
        dirty: bool,
    ) -> Self {
        Self {
            path,
            config,
            mode,
            file: Some(file),
            index,
            file_size,
            flushed_index,
            dirty,
            last_lookup: None,
        }
    }

    // =========================================================================
    // Entry Operations
    // =========================================================================

    /// Check whether `name` is stored, caching its offset for a following read
    pub fn exists(&mut self, name: &str) -> bool {
        match self.index.get(name) {
            Some(offset) => {
                self.last_lookup = Some((name.to_string(), offset));
                true
            }
            None => false,
        }
    }

    /// Read the payload stored under `name`
    ///
    /// Returns:
    /// - `Err(PermissionDenied)`: session not opened for reading
    /// - `Err(Closed)`: session already closed
    /// - `Err(NotFound)`: no such entry
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>> {
        if !self.mode.can_read() {
            return Err(VdirError::PermissionDenied { operation: "read" });
        }
        if self.file.is_none() {
            return Err(VdirError::Closed { operation: "read" });
        }

        let offset = match &self.last_lookup {
            Some((cached, offset)) if cached == name => *offset,
            _ => self
                .index
                .get(name)
                .ok_or_else(|| VdirError::NotFound(name.to_string()))?,
        };

        record::read_record(self.file_mut("read")?, offset)
    }

    /// Store `data` under `name`, replacing any previous payload
    ///
    /// Placement order:
    /// 1. Existing slot, if the new payload fits (leftover bytes become free)
    /// 2. First free range large enough
    /// 3. The index block left on disk by open or the last flush
    /// 4. End of data
    pub fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.check_writable("write")?;
        let slot = record::slot_len(data.len())?;
        let new_size = slot - RECORD_HEADER_SIZE;

        self.mark_dirty()?;

        let previous = match self.index.get(name) {
            Some(offset) => {
                let old_size = record::read_size(self.file_mut("write")?, offset)?;
                if old_size >= new_size {
                    let end = record::write_record(self.file_mut("write")?, offset, data)?;
                    self.index.free_list_mut().register(end, old_size - new_size);
                    debug!(entry = name, offset, old_size, new_size, "overwrote entry in place");
                    return Ok(());
                }
                Some((offset, old_size))
            }
            None => None,
        };

        // Fail before the old slot is released
        if self.file_size as u64 + slot as u64 > u32::MAX as u64 {
            return Err(VdirError::ContainerFull {
                required: self.file_size as u64 + slot as u64,
            });
        }

        // Allocator state to roll back to if the record cannot be written
        let saved_free = self.index.free_list().clone();
        let saved_size = self.file_size;
        let saved_extent = self.flushed_index;

        if let Some((offset, old_size)) = previous {
            self.index
                .free_list_mut()
                .register(offset, old_size + RECORD_HEADER_SIZE);
            debug!(entry = name, offset, old_size, new_size, "entry outgrew its slot");
        }

        let offset = match self.place(data) {
            Ok(offset) => offset,
            Err(e) => {
                *self.index.free_list_mut() = saved_free;
                self.file_size = saved_size;
                self.flushed_index = saved_extent;
                warn!(entry = name, error = %e, "write failed, placement rolled back");
                return Err(e);
            }
        };
        self.index.insert(name, offset);

        if let Some((cached, cached_offset)) = &mut self.last_lookup {
            if cached.as_str() == name {
                *cached_offset = offset;
            }
        }

        Ok(())
    }

    /// Delete `name`, releasing its whole slot to the free list
    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.check_writable("remove")?;
        let offset = self
            .index
            .get(name)
            .ok_or_else(|| VdirError::NotFound(name.to_string()))?;

        self.mark_dirty()?;

        let size = record::read_size(self.file_mut("remove")?, offset)?;
        self.index.remove(name);
        self.index
            .free_list_mut()
            .register(offset, size + RECORD_HEADER_SIZE);

        if matches!(&self.last_lookup, Some((cached, _)) if cached == name) {
            self.last_lookup = None;
        }

        debug!(entry = name, offset, size, "removed entry");
        Ok(())
    }

    /// Persist the index without closing the session
    pub fn flush(&mut self) -> Result<()> {
        self.check_writable("flush")?;
        let extent = self.write_index("flush")?;
        debug!(offset = extent.offset, len = extent.len, "flushed index");
        Ok(())
    }

    /// Close the session
    ///
    /// Writes the index and its pointer if the session may write. Calling
    /// `close` again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }

        let result = if self.mode.can_write() {
            self.write_index("close").map(|_| ())
        } else {
            Ok(())
        };

        // Release the handle on every path
        self.file = None;
        self.last_lookup = None;

        info!(
            path = %self.path.display(),
            entries = self.index.len(),
            file_size = self.file_size,
            "closed container"
        );

        result
    }

    // =========================================================================
    // Accessors (for tooling and testing)
    // =========================================================================

    /// Record offset of `name`, if stored
    pub fn entry_offset(&self, name: &str) -> Option<u32> {
        self.index.get(name)
    }

    /// Payload size of `name`, read from its size prefix
    pub fn entry_size(&mut self, name: &str) -> Result<u32> {
        if !self.mode.can_read() {
            return Err(VdirError::PermissionDenied { operation: "read" });
        }
        let offset = self
            .index
            .get(name)
            .ok_or_else(|| VdirError::NotFound(name.to_string()))?;
        record::read_size(self.file_mut("read")?, offset)
    }

    /// Entry names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.names()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Logical end of record data
    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn free_list(&self) -> &FreeList {
        self.index.free_list()
    }

    /// Index block that the next end-of-data record will overwrite
    pub fn flushed_index(&self) -> Option<IndexExtent> {
        self.flushed_index
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Container file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file_mut(&mut self, operation: &'static str) -> Result<&mut File> {
        self.file.as_mut().ok_or(VdirError::Closed { operation })
    }

    fn check_writable(&self, operation: &'static str) -> Result<()> {
        if !self.mode.can_write() {
            return Err(VdirError::PermissionDenied { operation });
        }
        if self.file.is_none() {
            return Err(VdirError::Closed { operation });
        }
        Ok(())
    }

    /// Zero the on-disk index pointer before the first mutation
    fn mark_dirty(&mut self) -> Result<()> {
        if !self.dirty {
            record::write_index_pointer(self.file_mut("write")?, 0)?;
            self.dirty = true;
        }
        Ok(())
    }

    /// Write a record for a new placement and return its offset
    fn place(&mut self, data: &[u8]) -> Result<u32> {
        let size = data.len() as u32;

        if let Some(offset) = self.index.free_list_mut().allocate(size) {
            record::write_record(self.file_mut("write")?, offset, data)?;
            debug!(offset, size, "placed record in free range");
            return Ok(offset);
        }

        let offset = match self.flushed_index.take() {
            Some(extent) => {
                debug_assert_eq!(extent.offset, self.file_size);
                debug!(
                    offset = extent.offset,
                    index_len = extent.len,
                    size,
                    "placed record over flushed index"
                );
                extent.offset
            }
            None => {
                debug!(offset = self.file_size, size, "appended record");
                self.file_size
            }
        };

        let end = record::write_record(self.file_mut("write")?, offset, data)?;
        self.file_size = end;
        Ok(offset)
    }

    /// Write the index at `file_size`, then point the header at it
    fn write_index(&mut self, operation: &'static str) -> Result<IndexExtent> {
        let block = self.index.encode()?;
        let offset = self.file_size;
        let len = u32::try_from(block.len())
            .map_err(|_| VdirError::Serialization(format!("Index block too large: {} bytes", block.len())))?;
        let sync = self.config.sync_on_close;

        let file = self.file_mut(operation)?;
        file.seek(SeekFrom::Start(offset as u64))?;
        file.write_all(&block)?;
        file.set_len(offset as u64 + len as u64)?;
        record::write_index_pointer(file, offset)?;
        if sync {
            file.sync_all()?;
        }

        let extent = IndexExtent { offset, len };
        self.flushed_index = Some(extent);
        self.dirty = false;
        Ok(extent)
    }
}

impl Drop for VirtualDirectory {
    fn drop(&mut self) {
        if self.file.is_none() {
            return;
        }

        warn!(path = %self.path.display(), "container dropped without close");
        if let Err(e) = self.close() {
            error!(path = %self.path.display(), error = %e, "failed to close container on drop");
        }
    }
}
