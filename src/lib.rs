//! # vdir
//!
//! A single-file container that multiplexes many named byte blobs
//! ("entries") into one physical file, with:
//! - A name → offset index persisted at the tail of the file
//! - First-fit reuse of space left by shrunk, moved and removed entries
//! - Detection of sessions that ended without a clean close
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     VirtualDirectory                         │
//! │          (open / exists / read / write / close)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Index    │          │  Record I/O │
//!   │ (+FreeList) │          │ [size][data]│
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └───────────┬────────────┘
//!                      ▼
//!              ┌──────────────┐
//!              │ 00000000.dir │
//!              └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use vdir::VirtualDirectory;
//!
//! let mut dir = VirtualDirectory::open_path("assets/sprites", "both")?;
//! dir.write("hero.png", b"...")?;
//! if dir.exists("hero.png") {
//!     let bytes = dir.read("hero.png")?;
//!     assert_eq!(bytes, b"...");
//! }
//! dir.close()?;
//! # Ok::<(), vdir::VdirError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod mode;

pub mod record;
pub mod index;
pub mod container;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VdirError, Result};
pub use config::Config;
pub use mode::OpenMode;
pub use container::VirtualDirectory;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vdir
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
